//! Infix rendering of an expression sub-DAG.
use crate::graph::ExprGraph;
use crate::store::{NodeId, NodeKind, UnaryOp};
use std::fmt;

/// Borrowed view of one node that prints as a fully parenthesized
/// expression. Shared sub-expressions are printed at every use.
#[derive(Clone, Copy)]
pub struct Expr<'a> {
    graph: &'a ExprGraph,
    id: NodeId,
}

impl<'a> Expr<'a> {
    pub fn new(graph: &'a ExprGraph, id: NodeId) -> Self { Self { graph, id } }

    fn at(&self, id: NodeId) -> Expr<'a> { Expr { graph: self.graph, id } }
}

impl fmt::Display for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.graph.registry().contains(self.id) {
            return write!(f, "<invalid {:?}>", self.id);
        }
        let operands = self.graph.operands(self.id);
        match self.graph.kind(self.id) {
            NodeKind::Literal(v) => write!(f, "{}", v),
            NodeKind::Variable(name) => write!(f, "{}", name),
            NodeKind::Unary(UnaryOp::Neg) => write!(f, "-({})", self.at(operands[0])),
            NodeKind::Unary(op) => write!(f, "({}({}))", op.name(), self.at(operands[0])),
            NodeKind::Binary(op) => {
                write!(f, "({} {} {})", self.at(operands[0]), op.symbol(), self.at(operands[1]))
            }
            NodeKind::Gradient { .. } => {
                write!(f, "{{")?;
                for (i, &id) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.at(id))?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Debug for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} = {}", self.id, self)
    }
}

impl ExprGraph {
    pub fn display(&self, id: NodeId) -> Expr<'_> {
        Expr::new(self, id)
    }
}
