//! emitter.rs
//! Lowers a sub-DAG into one textual IR function.

use super::instruction::{format_literal, pointer_register, variable_register, Instruction, ReturnType};
use crate::analysis::topology;
use crate::error::{DagError, Result};
use crate::graph::ExprGraph;
use crate::store::{BinaryOp, NodeId, NodeKind, UnaryOp};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::io;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Intrinsics declared at the top of every program.
pub const INTRINSICS: [(&str, usize); 5] = [("pow", 2), ("log", 1), ("exp", 1), ("sin", 1), ("cos", 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CallingConvention {
    /// One `double` parameter per free variable; the result is returned.
    #[default]
    Scalar,
    /// `(ptr %_input, ptr %_output)`; variables are loaded and results stored.
    Buffer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitOptions {
    pub convention: CallingConvention,
    pub function_name: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { convention: CallingConvention::Scalar, function_name: "kernel".to_string() }
    }
}

impl EmitOptions {
    pub fn buffer() -> Self {
        Self { convention: CallingConvention::Buffer, ..Self::default() }
    }
}

/// A lowered function, split so callers can inspect each part.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    /// `void` for the buffer convention, an aggregate for any Gradient root.
    pub returns: ReturnType,
    /// Formatted parameter list entries, e.g. `double %v.x`.
    pub params: Vec<String>,
    /// Parameter loads (buffer convention only).
    pub prologue: Vec<Instruction>,
    /// One instruction per distinct operator node.
    pub body: Vec<Instruction>,
    /// Stores, aggregate construction and the return.
    pub epilogue: Vec<Instruction>,
}

impl Program {
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.prologue.iter().chain(&self.body).chain(&self.epilogue)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, arity) in INTRINSICS {
            writeln!(f, "declare double @llvm.{}.f64({})", name, vec!["double"; arity].join(", "))?;
        }
        writeln!(f)?;

        writeln!(f, "define {} @{}({}) {{", self.returns, self.name, self.params.join(", "))?;
        writeln!(f, "entry:")?;
        for inst in self.instructions() {
            writeln!(f, "  {}", inst)?;
        }
        writeln!(f, "}}")
    }
}

/// Memoized post-order lowering of one root.
pub struct Emitter<'a> {
    graph: &'a ExprGraph,
    options: &'a EmitOptions,
    // Node -> text of the value holding its result.
    values: HashMap<NodeId, String>,
    prologue: Vec<Instruction>,
    body: Vec<Instruction>,
}

impl<'a> Emitter<'a> {
    pub fn new(graph: &'a ExprGraph, options: &'a EmitOptions) -> Self {
        Self { graph, options, values: HashMap::new(), prologue: Vec::new(), body: Vec::new() }
    }

    pub fn emit_program(mut self, root: NodeId) -> Result<Program> {
        let graph = self.graph;
        graph.check(root)?;
        let vars = topology::free_variables(graph.registry(), root);
        let params = self.bind_parameters(&vars);

        let mut epilogue = Vec::new();
        let returns = match graph.gradient_parts(root) {
            Some((primal, partials, _)) => {
                let mut operands = Vec::with_capacity(partials.len() + 1);
                operands.push(primal);
                operands.extend_from_slice(partials);
                self.store_all(&operands, &mut epilogue)?
            }
            None => {
                let value = self.lower(root)?;
                self.finish(vec![value], false, &mut epilogue)
            }
        };

        let program = Program {
            name: self.options.function_name.clone(),
            returns,
            params,
            prologue: self.prologue,
            body: self.body,
            epilogue,
        };
        debug!(
            "emitted @{} for {:?}: {} params, {} body instructions",
            program.name,
            root,
            vars.len(),
            program.body.len()
        );
        Ok(program)
    }

    fn bind_parameters(&mut self, vars: &[NodeId]) -> Vec<String> {
        let graph = self.graph;
        let names: Vec<(NodeId, &str)> = vars
            .iter()
            .filter_map(|&v| graph.variable_name(v).map(|name| (v, name)))
            .collect();

        match self.options.convention {
            CallingConvention::Scalar => names
                .into_iter()
                .map(|(id, name)| {
                    let reg = variable_register(name);
                    let param = format!("double {}", reg);
                    self.values.insert(id, reg);
                    param
                })
                .collect(),
            CallingConvention::Buffer => {
                for (slot, (id, name)) in names.into_iter().enumerate() {
                    let reg = variable_register(name);
                    let ptr = pointer_register(name);
                    self.prologue.push(Instruction::ElementPtr { dest: ptr.clone(), base: "%_input".into(), index: slot });
                    self.prologue.push(Instruction::Load { dest: reg.clone(), ptr });
                    self.values.insert(id, reg);
                }
                vec!["ptr %_input".to_string(), "ptr %_output".to_string()]
            }
        }
    }

    /// Lowers every operand of a Gradient and hands the results to the
    /// calling convention's output path.
    fn store_all(&mut self, operands: &[NodeId], epilogue: &mut Vec<Instruction>) -> Result<ReturnType> {
        let values = operands.iter().map(|&id| self.lower(id)).collect::<Result<Vec<_>>>()?;
        Ok(self.finish(values, true, epilogue))
    }

    /// Writes the results out. A Gradient (`bundle`) always returns an
    /// aggregate under the scalar convention, whatever its width.
    fn finish(&mut self, values: Vec<String>, bundle: bool, epilogue: &mut Vec<Instruction>) -> ReturnType {
        match self.options.convention {
            CallingConvention::Buffer => {
                for (slot, value) in values.into_iter().enumerate() {
                    let ptr = format!("%_out{}", slot);
                    epilogue.push(Instruction::ElementPtr { dest: ptr.clone(), base: "%_output".into(), index: slot });
                    epilogue.push(Instruction::Store { value, ptr });
                }
                epilogue.push(Instruction::Ret { ty: ReturnType::Void, value: None });
                ReturnType::Void
            }
            CallingConvention::Scalar if !bundle => {
                let value = values.into_iter().next();
                epilogue.push(Instruction::Ret { ty: ReturnType::Double, value });
                ReturnType::Double
            }
            CallingConvention::Scalar => {
                let width = values.len();
                let ty = ReturnType::Aggregate(width);
                let mut aggregate = None;
                for (index, value) in values.into_iter().enumerate() {
                    let dest = format!("%_agg{}", index);
                    epilogue.push(Instruction::InsertValue { dest: dest.clone(), width, aggregate, value, index });
                    aggregate = Some(dest);
                }
                epilogue.push(Instruction::Ret { ty, value: aggregate });
                ty
            }
        }
    }

    /// Returns the text of the value computed by `node`, emitting whatever
    /// instructions are missing.
    ///
    /// Walks the sub-DAG in post-order so every operand is lowered before
    /// its consumer.
    pub fn lower(&mut self, node: NodeId) -> Result<String> {
        if let Some(value) = self.values.get(&node) {
            return Ok(value.clone());
        }
        for id in topology::post_order(self.graph.registry(), node) {
            if !self.values.contains_key(&id) {
                self.lower_one(id)?;
            }
        }
        self.operand(node)
    }

    fn operand(&self, node: NodeId) -> Result<String> {
        self.values
            .get(&node)
            .cloned()
            .ok_or_else(|| DagError::Misuse(format!("node {:?} was not lowered before its consumer", node)))
    }

    fn lower_one(&mut self, node: NodeId) -> Result<()> {
        let graph = self.graph;
        let operands = graph.operands(node);
        let dest = format!("%_{}", node.0);
        let value = match graph.kind(node) {
            NodeKind::Literal(v) => format_literal(*v),
            NodeKind::Variable(name) => {
                return Err(DagError::Misuse(format!("variable '{}' has no parameter binding", name)));
            }
            NodeKind::Unary(op) => {
                let x = self.operand(operands[0])?;
                let inst = match op {
                    UnaryOp::Neg => Instruction::Neg { dest: dest.clone(), operand: x },
                    _ => Instruction::Call { dest: dest.clone(), intrinsic: op.name(), args: vec![x] },
                };
                self.body.push(inst);
                dest
            }
            NodeKind::Binary(op) => {
                let lhs = self.operand(operands[0])?;
                let rhs = self.operand(operands[1])?;
                let inst = match op {
                    BinaryOp::Add => Instruction::Arith { dest: dest.clone(), mnemonic: "fadd", lhs, rhs },
                    BinaryOp::Sub => Instruction::Arith { dest: dest.clone(), mnemonic: "fsub", lhs, rhs },
                    BinaryOp::Mul => Instruction::Arith { dest: dest.clone(), mnemonic: "fmul", lhs, rhs },
                    BinaryOp::Div => Instruction::Arith { dest: dest.clone(), mnemonic: "fdiv", lhs, rhs },
                    BinaryOp::Pow => Instruction::Call { dest: dest.clone(), intrinsic: "pow", args: vec![lhs, rhs] },
                };
                self.body.push(inst);
                dest
            }
            NodeKind::Gradient { .. } => {
                return Err(DagError::Misuse(format!(
                    "gradient {:?} has no single value and can only be emitted as the root",
                    node
                )));
            }
        };

        self.values.insert(node, value);
        Ok(())
    }
}

/// Lowers `root` (an expression or a Gradient) into a program.
pub fn emit_program(graph: &ExprGraph, root: NodeId, options: &EmitOptions) -> Result<Program> {
    Emitter::new(graph, options).emit_program(root)
}

pub fn emit(graph: &ExprGraph, root: NodeId, options: &EmitOptions) -> Result<String> {
    Ok(emit_program(graph, root, options)?.to_string())
}

/// Emits into `writer`. Write failures are reported as misuse of the sink.
pub fn emit_to<W: io::Write>(graph: &ExprGraph, root: NodeId, options: &EmitOptions, writer: &mut W) -> Result<()> {
    let program = emit_program(graph, root, options)?;
    write!(writer, "{}", program).map_err(|e| DagError::Misuse(format!("failed to write IR: {}", e)))
}

impl ExprGraph {
    /// Emits `root` with the default options.
    pub fn emit(&self, root: NodeId) -> Result<String> {
        emit(self, root, &EmitOptions::default())
    }
}
