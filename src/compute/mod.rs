//! Numeric evaluation of expression DAGs.
pub mod engine;
pub mod kernel;
pub mod ledger;

pub use engine::{sample, Bindings, Evaluator};
pub use ledger::Ledger;
