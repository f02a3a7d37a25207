//! A synchronous, single-threaded evaluator with a per-call memo.
use crate::analysis::topology;
use crate::compute::kernel;
use crate::compute::ledger::Ledger;
use crate::error::{DagError, Result};
use crate::graph::ExprGraph;
use crate::store::{NodeId, NodeKind};
use rayon::prelude::*;
use std::collections::HashMap;

/// Variable name to value.
pub type Bindings = HashMap<String, f64>;

pub struct Evaluator<'a> {
    graph: &'a ExprGraph,
    ledger: Ledger,
}

impl<'a> Evaluator<'a> {
    pub fn new(graph: &'a ExprGraph) -> Self {
        Self { graph, ledger: Ledger::new() }
    }

    /// Evaluates `root` under `bindings`.
    ///
    /// The memo is rebuilt from scratch on every call and discarded if the
    /// call fails.
    pub fn evaluate(&mut self, root: NodeId, bindings: &Bindings) -> Result<f64> {
        self.ledger.clear();
        let result = self.run(root, bindings);
        if result.is_err() {
            self.ledger.clear();
        }
        result
    }

    /// Evaluates `root` with `values` matched positionally to its free
    /// variables sorted by name.
    pub fn evaluate_at(&mut self, root: NodeId, values: &[f64]) -> Result<f64> {
        self.graph.check(root)?;
        let vars = self.graph.free_vars(root);
        if vars.len() != values.len() {
            return Err(DagError::ArgumentCount { expected: vars.len(), actual: values.len() });
        }
        let bindings: Bindings = vars
            .iter()
            .zip(values)
            .filter_map(|(&var, &value)| self.graph.variable_name(var).map(|name| (name.to_string(), value)))
            .collect();
        self.evaluate(root, &bindings)
    }

    /// The result tuple cached for a Gradient node by the last evaluation.
    pub fn bundle(&self, gradient: NodeId) -> Option<&[f64]> {
        self.ledger.bundle(gradient)
    }

    pub fn ledger(&self) -> &Ledger { &self.ledger }

    fn run(&mut self, root: NodeId, bindings: &Bindings) -> Result<f64> {
        self.graph.check(root)?;
        let registry = self.graph.registry();
        let reach = topology::reach(registry, root);

        // Fail before doing any arithmetic if the environment is incomplete.
        for &var in &reach.free_vars {
            if let Some(name) = self.graph.variable_name(var) {
                if !bindings.contains_key(name) {
                    return Err(DagError::UnboundVariable { name: name.to_string() });
                }
            }
        }

        self.ledger.ensure_capacity(registry.count());
        for &node in &reach.order {
            let value = self.evaluate_node(node, bindings)?;
            self.ledger.insert(node, value);
        }

        self.value_of(root)
    }

    fn evaluate_node(&mut self, node: NodeId, bindings: &Bindings) -> Result<f64> {
        let graph = self.graph;
        let operands = graph.operands(node);
        match graph.kind(node) {
            NodeKind::Literal(v) => Ok(*v),
            NodeKind::Variable(name) => bindings
                .get(name)
                .copied()
                .ok_or_else(|| DagError::UnboundVariable { name: name.clone() }),
            NodeKind::Unary(op) => Ok(kernel::unary(*op, self.value_of(operands[0])?)),
            NodeKind::Binary(op) => {
                let l = self.value_of(operands[0])?;
                let r = self.value_of(operands[1])?;
                Ok(kernel::binary(*op, l, r))
            }
            NodeKind::Gradient { .. } => {
                let values = operands.iter().map(|&id| self.value_of(id)).collect::<Result<Vec<_>>>()?;
                let primal = values[0];
                self.ledger.insert_bundle(node, values);
                Ok(primal)
            }
        }
    }

    fn value_of(&self, node: NodeId) -> Result<f64> {
        self.ledger
            .get(node)
            .ok_or_else(|| DagError::Misuse(format!("node {:?} was not evaluated before its consumer", node)))
    }
}

/// Evaluates `root` once per value of `var` in `xs`, in parallel.
///
/// Every sample owns its own ledger; the graph is only read.
pub fn sample(graph: &ExprGraph, root: NodeId, var: &str, xs: &[f64], bindings: &Bindings) -> Result<Vec<f64>> {
    xs.par_iter()
        .map(|&x| {
            let mut env = bindings.clone();
            env.insert(var.to_string(), x);
            Evaluator::new(graph).evaluate(root, &env)
        })
        .collect()
}

impl ExprGraph {
    pub fn evaluate(&self, root: NodeId, bindings: &Bindings) -> Result<f64> {
        Evaluator::new(self).evaluate(root, bindings)
    }

    pub fn evaluate_at(&self, root: NodeId, values: &[f64]) -> Result<f64> {
        Evaluator::new(self).evaluate_at(root, values)
    }

    /// Evaluates a Gradient node and returns its full result tuple.
    pub fn evaluate_gradient(&self, gradient: NodeId, bindings: &Bindings) -> Result<Vec<f64>> {
        let mut evaluator = Evaluator::new(self);
        evaluator.evaluate(gradient, bindings)?;
        evaluator
            .bundle(gradient)
            .map(<[f64]>::to_vec)
            .ok_or_else(|| DagError::Misuse(format!("node {:?} is not a gradient", gradient)))
    }
}
