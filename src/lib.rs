//! Hash-consed scalar expression DAGs.
//!
//! Expressions are built through [`ExprGraph`], which simplifies every node
//! as it is created and returns the canonical id for each distinct
//! structure. On top of the graph sit a memoized evaluator, reverse-mode
//! differentiation producing Gradient nodes, and lowering to LLVM-style
//! textual IR.

pub mod analysis;
pub mod autodiff;
pub mod compute;
pub mod display;
pub mod error;
pub mod graph;
pub mod ir;
pub mod store;

#[cfg(feature = "python")]
pub mod bindings;

pub use compute::{sample, Bindings, Evaluator};
pub use error::{DagError, ErrorCategory, Result};
pub use graph::ExprGraph;
pub use ir::{CallingConvention, EmitOptions, Program};
pub use store::{BinaryOp, NodeId, NodeKind, UnaryOp};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `_core` extension module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<bindings::python::PyExprGraph>()?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
