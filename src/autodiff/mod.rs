//! Reverse-mode automatic differentiation producing Gradient nodes.

pub mod adjoint;
pub mod local;

use crate::analysis::topology;
use crate::error::{DagError, Result};
use crate::graph::ExprGraph;
use crate::store::{NodeId, NodeKind};
use adjoint::AdjointTable;
use log::debug;

/// Differentiates `root` with respect to every free variable it reaches.
///
/// The result is a Gradient node bundling `root` with one partial per
/// variable, variables ordered by name.
pub fn backwards(graph: &mut ExprGraph, root: NodeId) -> Result<NodeId> {
    graph.check(root)?;
    if let NodeKind::Gradient { .. } = graph.kind(root) {
        return Err(DagError::Misuse(format!(
            "node {:?} is already a gradient bundle",
            root
        )));
    }

    let reach = topology::reach(graph.registry(), root);
    if reach.order.iter().any(|&n| matches!(graph.kind(n), NodeKind::Gradient { .. })) {
        return Err(DagError::Misuse(format!(
            "the expression under {:?} contains a gradient bundle",
            root
        )));
    }

    let mut table = AdjointTable::new(root, &reach.outputs);
    let mut partials = Vec::with_capacity(reach.free_vars.len());
    for &var in &reach.free_vars {
        partials.push(table.adjoint(graph, var)?);
    }

    debug!(
        "backwards({:?}): {} variables, {} adjoints, graph now has {} nodes",
        root,
        reach.free_vars.len(),
        table.len(),
        graph.node_count()
    );
    graph.gradient(root, &partials, &reach.free_vars)
}

impl ExprGraph {
    pub fn backwards(&mut self, root: NodeId) -> Result<NodeId> {
        backwards(self, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Bindings;
    use crate::error::ErrorCategory;
    use assert_float_eq::assert_float_absolute_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn at(name: &str, value: f64) -> Bindings {
        [(name.to_string(), value)].into_iter().collect()
    }

    #[test]
    fn test_square_plus_sine() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let sq = g.mul(x, x);
        let s = g.sin(x);
        let f = g.add(sq, s);

        let grad = g.backwards(f).unwrap();
        let (primal, partials, vars) = g.gradient_parts(grad).unwrap();
        assert_eq!(primal, f);
        assert_eq!(vars, &[x]);
        let dx = partials[0];

        assert_float_absolute_eq!(g.evaluate(dx, &at("x", 0.0)).unwrap(), 1.0, 1e-12);
        assert_float_absolute_eq!(g.evaluate(dx, &at("x", FRAC_PI_2)).unwrap(), PI, 1e-12);
    }

    #[test]
    fn test_shared_subexpression_sums_each_edge_once() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let a = g.mul(x, x);
        let b = g.mul(x, x);
        assert_eq!(a, b);
        let f = g.add(a, b);

        let grad = g.backwards(f).unwrap();
        let bundle = g.evaluate_gradient(grad, &at("x", 3.0)).unwrap();
        assert_eq!(bundle, vec![18.0, 12.0]);
    }

    #[test]
    fn test_partials_follow_variable_names() {
        let mut g = ExprGraph::new();
        let y = g.var("y");
        let x = g.var("x");
        let f = g.div(y, x);

        let grad = g.backwards(f).unwrap();
        let (_, partials, vars) = g.gradient_parts(grad).unwrap();
        assert_eq!(vars, &[x, y]);
        let (dx, dy) = (partials[0], partials[1]);

        let env: Bindings = [("x".to_string(), 2.0), ("y".to_string(), 6.0)].into_iter().collect();
        assert_float_absolute_eq!(g.evaluate(dx, &env).unwrap(), -1.5, 1e-12);
        assert_float_absolute_eq!(g.evaluate(dy, &env).unwrap(), 0.5, 1e-12);
    }

    #[test]
    fn test_constant_has_empty_gradient() {
        let mut g = ExprGraph::new();
        let c = g.lit(4.0);
        let grad = g.backwards(c).unwrap();
        let (primal, partials, vars) = g.gradient_parts(grad).unwrap();
        assert_eq!(primal, c);
        assert!(partials.is_empty());
        assert!(vars.is_empty());
    }

    #[test]
    fn test_backwards_is_hash_consed() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let f = g.exp(x);
        let first = g.backwards(f).unwrap();
        let count = g.node_count();
        assert_eq!(g.backwards(f), Ok(first));
        assert_eq!(g.node_count(), count);
    }

    #[test]
    fn test_variable_exponent_is_unsupported() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let y = g.var("y");
        let p = g.pow(x, y);
        let err = g.backwards(p).unwrap_err();
        assert!(matches!(err, DagError::UnsupportedDerivative { .. }));
        assert_eq!(err.category(), ErrorCategory::Data);
    }

    #[test]
    fn test_gradient_cannot_be_differentiated() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let f = g.sin(x);
        let grad = g.backwards(f).unwrap();
        let err = g.backwards(grad).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Misuse);
    }

    #[test]
    fn test_deep_sine_chain() {
        let mut g = ExprGraph::new();
        let x = g.var("x");
        let mut f = x;
        let mut value = 0.5_f64;
        let mut slope = 1.0;
        for _ in 0..50_000 {
            f = g.sin(f);
            slope *= value.cos();
            value = value.sin();
        }

        let grad = g.backwards(f).unwrap();
        let bundle = g.evaluate_gradient(grad, &at("x", 0.5)).unwrap();
        assert_float_absolute_eq!(bundle[0], value, 1e-12);
        assert_float_absolute_eq!(bundle[1], slope, 1e-12);
    }
}
