//! Lowering of expression DAGs to LLVM-style textual IR.

pub mod emitter;
pub mod instruction;

pub use emitter::{emit, emit_program, emit_to, CallingConvention, EmitOptions, Emitter, Program};
pub use instruction::{Instruction, ReturnType};
