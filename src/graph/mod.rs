//! Expression construction: the hash-consed DAG and its simplification rules.
pub mod dag;
pub mod rules;

pub use dag::ExprGraph;
