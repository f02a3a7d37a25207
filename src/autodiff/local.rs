//! Symbolic partial derivatives of a single node with respect to one of its
//! operands.
//!
//! Every rule builds its result through the graph's constructors, so local
//! derivatives are simplified and hash-consed like any other node.

use crate::error::{DagError, Result};
use crate::graph::ExprGraph;
use crate::store::{BinaryOp, NodeId, NodeKind, UnaryOp};

/// ∂consumer/∂operand for the operand at `position`.
pub fn derivative(graph: &mut ExprGraph, consumer: NodeId, position: usize) -> Result<NodeId> {
    match graph.kind(consumer).clone() {
        NodeKind::Unary(op) => {
            let x = graph.operands(consumer)[0];
            Ok(unary(graph, op, consumer, x))
        }
        NodeKind::Binary(op) => {
            let (lhs, rhs) = match *graph.operands(consumer) {
                [lhs, rhs] => (lhs, rhs),
                _ => return Err(DagError::Misuse(format!("node {:?} is not a binary operation", consumer))),
            };
            binary(graph, op, consumer, lhs, rhs, position)
        }
        NodeKind::Gradient { .. } => Err(DagError::Misuse(format!(
            "node {:?} is a gradient bundle and cannot be differentiated",
            consumer
        ))),
        NodeKind::Literal(_) | NodeKind::Variable(_) => {
            Err(DagError::Misuse(format!("leaf node {:?} has no operands", consumer)))
        }
    }
}

fn unary(graph: &mut ExprGraph, op: UnaryOp, node: NodeId, x: NodeId) -> NodeId {
    match op {
        UnaryOp::Neg => graph.lit(-1.0),
        UnaryOp::Exp => node,
        UnaryOp::Log => {
            let one = graph.one();
            graph.div(one, x)
        }
        UnaryOp::Sin => graph.cos(x),
        UnaryOp::Cos => {
            let s = graph.sin(x);
            graph.neg(s)
        }
    }
}

fn binary(
    graph: &mut ExprGraph,
    op: BinaryOp,
    node: NodeId,
    lhs: NodeId,
    rhs: NodeId,
    position: usize,
) -> Result<NodeId> {
    // Seeds for the active operand: d(lhs) and d(rhs).
    let (dl, dr) = if position == 0 { (graph.one(), graph.zero()) } else { (graph.zero(), graph.one()) };

    match op {
        BinaryOp::Add => Ok(graph.one()),
        BinaryOp::Sub => Ok(if position == 0 { graph.one() } else { graph.lit(-1.0) }),
        BinaryOp::Mul => {
            let a = graph.mul(dl, rhs);
            let b = graph.mul(lhs, dr);
            Ok(graph.add(a, b))
        }
        BinaryOp::Div => {
            let a = graph.mul(dl, rhs);
            let b = graph.mul(lhs, dr);
            let numerator = graph.sub(a, b);
            let two = graph.two();
            let denominator = graph.pow(rhs, two);
            Ok(graph.div(numerator, denominator))
        }
        BinaryOp::Pow if position == 0 => {
            let one = graph.one();
            let reduced = graph.sub(rhs, one);
            let p = graph.pow(lhs, reduced);
            Ok(graph.mul(rhs, p))
        }
        BinaryOp::Pow => {
            if graph.literal_value(rhs).is_some() {
                Ok(graph.zero())
            } else {
                Err(DagError::UnsupportedDerivative {
                    node,
                    reason: "power with a non-literal exponent".to_string(),
                })
            }
        }
    }
}
