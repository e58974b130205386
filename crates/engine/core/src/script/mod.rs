//! Bytecode scripting: container loading, the interpreter and the assembler.
//!
//! A [`Program`] is decoded and fully validated once at engine load. Every
//! jump, call and operand index is checked up front, so the interpreter only
//! has to guard values that arrive on the operand stack at runtime.

mod assembler;
mod context;
mod error;
mod handlers;
mod opcode;
mod program;
mod vm;

pub use assembler::{Assembler, BuildError, Label};
pub use context::{ExecContext, ScriptPhase, ScriptRequests};
pub use error::{BytecodeError, RuntimeErrorKind, ScriptRuntimeError};
pub use opcode::{EntityField, IndexSpace, LEGACY_OPCODES, Opcode, OpcodeRevision, OperandKind};
pub use program::{
    CONTAINER_VERSION, FunctionId, Instruction, MAGIC, Operand, Program, ScriptFunction,
};
pub use vm::{Outcome, ScriptEngine, ScriptLimits};
