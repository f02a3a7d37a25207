#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A stable handle to a node owned by a [`Registry`](super::Registry).
///
/// Ids are handed out sequentially and are never reused for a different
/// canonical node while the store lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnaryOp {
    Neg,
    Exp,
    Log,
    Sin,
    Cos,
}

impl UnaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    /// Infix symbol used when printing expressions.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    pub fn is_commutative(&self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Mul)
    }
}

/// The variant tag of a node. Operands live in the registry's topology
/// arrays, not here.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    Literal(f64),
    Variable(String),
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Operands are `[primal, partial_0, .., partial_k]`; `vars[i]` is the
    /// variable that `partial_i` was taken against.
    Gradient { vars: Vec<NodeId> },
}

impl NodeKind {
    pub fn is_literal(&self) -> bool { matches!(self, NodeKind::Literal(_)) }

    pub fn literal(&self) -> Option<f64> {
        match self {
            NodeKind::Literal(v) => Some(*v),
            _ => None,
        }
    }
}

// Literals compare by bit pattern so that the intern table can hash them.
impl PartialEq for NodeKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeKind::Literal(a), NodeKind::Literal(b)) => a.to_bits() == b.to_bits(),
            (NodeKind::Variable(a), NodeKind::Variable(b)) => a == b,
            (NodeKind::Unary(a), NodeKind::Unary(b)) => a == b,
            (NodeKind::Binary(a), NodeKind::Binary(b)) => a == b,
            (NodeKind::Gradient { vars: a }, NodeKind::Gradient { vars: b }) => a == b,
            _ => false,
        }
    }
}

impl Eq for NodeKind {}

impl Hash for NodeKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            NodeKind::Literal(v) => v.to_bits().hash(state),
            NodeKind::Variable(name) => name.hash(state),
            NodeKind::Unary(op) => op.hash(state),
            NodeKind::Binary(op) => op.hash(state),
            NodeKind::Gradient { vars } => vars.hash(state),
        }
    }
}

/// A back-reference from an operand to a node that reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputEdge {
    pub consumer: NodeId,
    pub position: u32,
}
