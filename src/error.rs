//! Error types shared by evaluation, differentiation and emission.
use crate::store::NodeId;
use thiserror::Error;

/// Distinguishes caller bugs from failures that depend on the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The inputs were legitimate but the operation cannot be completed.
    Data,
    /// The API was used in a way it does not support.
    Misuse,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DagError {
    #[error("Unbound variable '{name}'")]
    UnboundVariable { name: String },
    #[error("Expected {expected} values for the free variables, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("Unsupported derivative at node {node:?}: {reason}")]
    UnsupportedDerivative { node: NodeId, reason: String },
    #[error("Misuse: {0}")]
    Misuse(String),
}

impl DagError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DagError::UnboundVariable { .. }
            | DagError::ArgumentCount { .. }
            | DagError::UnsupportedDerivative { .. } => ErrorCategory::Data,
            DagError::Misuse(_) => ErrorCategory::Misuse,
        }
    }
}

pub type Result<T> = std::result::Result<T, DagError>;
