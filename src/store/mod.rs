//! Node storage: ids, variant tags and the hash-consing registry.
pub mod registry;
pub mod types;

pub use registry::{OutputIter, Registry};
pub use types::{BinaryOp, NodeId, NodeKind, OutputEdge, UnaryOp};
