use crate::compute::{Bindings, Evaluator};
use crate::display::{dot, trace};
use crate::error::{DagError, ErrorCategory};
use crate::graph::ExprGraph;
use crate::ir::{self, EmitOptions};
use crate::store::{BinaryOp, NodeId, UnaryOp};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

impl From<DagError> for PyErr {
    fn from(err: DagError) -> PyErr {
        match err.category() {
            ErrorCategory::Data => PyValueError::new_err(err.to_string()),
            ErrorCategory::Misuse => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

#[pyclass(name = "_ExprGraph")]
#[derive(Debug, Clone, Default)]
pub struct PyExprGraph {
    inner: ExprGraph,
}

impl PyExprGraph {
    fn id(&self, id: usize) -> PyResult<NodeId> {
        let node = NodeId::new(id);
        self.inner.check(node)?;
        Ok(node)
    }
}

#[pymethods]
impl PyExprGraph {
    #[new]
    pub fn new() -> Self { Self::default() }

    pub fn literal(&mut self, value: f64) -> usize { self.inner.lit(value).index() }

    pub fn variable(&mut self, name: &str) -> usize { self.inner.var(name).index() }

    pub fn unary(&mut self, op_name: &str, x: usize) -> PyResult<usize> {
        let op = match op_name {
            "neg" => UnaryOp::Neg,
            "exp" => UnaryOp::Exp,
            "log" => UnaryOp::Log,
            "sin" => UnaryOp::Sin,
            "cos" => UnaryOp::Cos,
            _ => return Err(PyValueError::new_err(format!("Unknown unary operator '{}'", op_name))),
        };
        Ok(self.inner.try_unary(op, NodeId::new(x))?.index())
    }

    pub fn binary(&mut self, op_name: &str, lhs: usize, rhs: usize) -> PyResult<usize> {
        let op = match op_name {
            "add" => BinaryOp::Add,
            "sub" => BinaryOp::Sub,
            "mul" => BinaryOp::Mul,
            "div" => BinaryOp::Div,
            "pow" => BinaryOp::Pow,
            _ => return Err(PyValueError::new_err(format!("Unknown binary operator '{}'", op_name))),
        };
        Ok(self.inner.try_binary(op, NodeId::new(lhs), NodeId::new(rhs))?.index())
    }

    pub fn evaluate(&self, root: usize, bindings: Bindings) -> PyResult<f64> {
        Ok(self.inner.evaluate(self.id(root)?, &bindings)?)
    }

    pub fn evaluate_at(&self, root: usize, values: Vec<f64>) -> PyResult<f64> {
        Ok(self.inner.evaluate_at(self.id(root)?, &values)?)
    }

    pub fn backwards(&mut self, root: usize) -> PyResult<usize> {
        let root = self.id(root)?;
        Ok(self.inner.backwards(root)?.index())
    }

    /// `[primal, d/dvar_0, ...]` for a Gradient node.
    pub fn gradient_values(&self, grad: usize, bindings: Bindings) -> PyResult<Vec<f64>> {
        Ok(self.inner.evaluate_gradient(self.id(grad)?, &bindings)?)
    }

    /// Names of the variables a Gradient's partials are taken against.
    pub fn gradient_vars(&self, grad: usize) -> PyResult<Vec<String>> {
        let (_, _, vars) = self
            .inner
            .gradient_parts(self.id(grad)?)
            .ok_or_else(|| PyRuntimeError::new_err("Not a gradient node"))?;
        Ok(vars.iter().filter_map(|&v| self.inner.variable_name(v).map(str::to_string)).collect())
    }

    #[pyo3(signature = (root, buffer = false, name = None))]
    pub fn emit(&self, root: usize, buffer: bool, name: Option<String>) -> PyResult<String> {
        let mut options = if buffer { EmitOptions::buffer() } else { EmitOptions::default() };
        if let Some(name) = name {
            options.function_name = name;
        }
        Ok(ir::emit(&self.inner, self.id(root)?, &options)?)
    }

    pub fn to_string(&self, root: usize) -> PyResult<String> {
        Ok(self.inner.display(self.id(root)?).to_string())
    }

    pub fn to_dot(&self, root: usize) -> PyResult<String> {
        Ok(dot::to_dot(&self.inner, self.id(root)?))
    }

    pub fn trace_node(&self, root: usize, bindings: Bindings) -> PyResult<String> {
        let root = self.id(root)?;
        let mut evaluator = Evaluator::new(&self.inner);
        evaluator.evaluate(root, &bindings)?;
        Ok(trace::format_trace(&self.inner, evaluator.ledger(), root))
    }

    pub fn free_vars(&self, root: usize) -> PyResult<Vec<String>> {
        let vars = self.inner.free_vars(self.id(root)?);
        Ok(vars.iter().filter_map(|&v| self.inner.variable_name(v).map(str::to_string)).collect())
    }

    pub fn node_count(&self) -> usize { self.inner.node_count() }

    pub fn reset(&mut self) { self.inner.reset() }
}
