//! dag.rs
//! Wraps the low-level Registry with the expression-level API.
//! Operator constructors live in `rules.rs`; everything here is leaf
//! construction, accessors and whole-store operations.

use crate::analysis::topology;
use crate::error::{DagError, Result};
use crate::store::{NodeId, NodeKind, OutputIter, Registry};
use log::debug;

/// An expression DAG with structural hash-consing.
///
/// Every node is created through this type, so two calls that describe the
/// same structure always return the same [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct ExprGraph {
    pub(crate) store: Registry,
}

impl ExprGraph {
    pub fn new() -> Self { Self::default() }

    /// Start over and forget every node.
    pub fn reset(&mut self) {
        debug!("resetting expression graph ({} nodes)", self.store.count());
        self.store.reset();
    }

    pub fn node_count(&self) -> usize { self.store.count() }

    // --- Leaves ---

    pub fn lit(&mut self, value: f64) -> NodeId {
        // -0.0 and 0.0 share one node.
        let value = if value == 0.0 { 0.0 } else { value };
        self.store.intern(NodeKind::Literal(value), &[])
    }

    pub fn zero(&mut self) -> NodeId { self.lit(0.0) }
    pub fn one(&mut self) -> NodeId { self.lit(1.0) }
    pub fn two(&mut self) -> NodeId { self.lit(2.0) }

    pub fn var(&mut self, name: &str) -> NodeId {
        self.store.intern(NodeKind::Variable(name.to_string()), &[])
    }

    /// Bundles a primal with its partial derivatives.
    ///
    /// `partials[i]` must be the derivative with respect to the variable
    /// `vars[i]`.
    pub fn gradient(&mut self, primal: NodeId, partials: &[NodeId], vars: &[NodeId]) -> Result<NodeId> {
        if partials.len() != vars.len() {
            return Err(DagError::Misuse(format!(
                "gradient has {} partials but {} variables",
                partials.len(),
                vars.len()
            )));
        }
        self.check(primal)?;
        for &id in partials {
            self.check(id)?;
        }
        for &var in vars {
            self.check(var)?;
            if self.variable_name(var).is_none() {
                return Err(DagError::Misuse(format!("node {:?} is not a variable", var)));
            }
        }

        let mut operands = Vec::with_capacity(partials.len() + 1);
        operands.push(primal);
        operands.extend_from_slice(partials);
        Ok(self.store.intern(NodeKind::Gradient { vars: vars.to_vec() }, &operands))
    }

    // --- Accessors ---

    pub fn registry(&self) -> &Registry { &self.store }

    pub fn kind(&self, id: NodeId) -> &NodeKind { self.store.kind(id) }

    pub fn operands(&self, id: NodeId) -> &[NodeId] { self.store.get_parents(id) }

    pub fn outputs(&self, id: NodeId) -> OutputIter<'_> { self.store.outputs(id) }

    pub fn literal_value(&self, id: NodeId) -> Option<f64> { self.kind(id).literal() }

    pub fn is_literal(&self, id: NodeId, value: f64) -> bool {
        self.literal_value(id) == Some(value)
    }

    pub fn variable_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Variable(name) => Some(name),
            _ => None,
        }
    }

    /// Splits a Gradient node into `(primal, partials, vars)`.
    pub fn gradient_parts(&self, id: NodeId) -> Option<(NodeId, &[NodeId], &[NodeId])> {
        match self.kind(id) {
            NodeKind::Gradient { vars } => {
                let operands = self.operands(id);
                Some((operands[0], &operands[1..], vars))
            }
            _ => None,
        }
    }

    /// Free variables reachable from `root`, sorted by name.
    pub fn free_vars(&self, root: NodeId) -> Vec<NodeId> {
        topology::free_variables(&self.store, root)
    }

    pub(crate) fn check(&self, id: NodeId) -> Result<()> {
        if self.store.contains(id) {
            Ok(())
        } else {
            Err(DagError::Misuse(format!("node {:?} does not belong to this graph", id)))
        }
    }
}
