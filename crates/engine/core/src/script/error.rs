//! Script loading and execution errors.

use crate::error::{EngineError, ErrorSeverity};

use super::opcode::{IndexSpace, Opcode, OpcodeRevision};
use super::program::FunctionId;

// ============================================================================
// Load-time Errors
// ============================================================================

/// Errors raised while decoding and validating a bytecode blob.
///
/// Every variant is fatal for the load: a program that fails validation is
/// never handed to the VM.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BytecodeError {
    #[error("bad magic {found:02x?}, expected \"RSBC\"")]
    BadMagic { found: [u8; 4] },

    #[error("unsupported container version {version}")]
    UnsupportedVersion { version: u16 },

    #[error("truncated {section} section at byte {offset}")]
    Truncated { section: &'static str, offset: usize },

    #[error("{count} trailing bytes after the code section")]
    TrailingBytes { count: usize },

    #[error("string {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },

    #[error("{count} functions exceeds the limit of {max}")]
    TooManyFunctions { count: usize, max: usize },

    #[error("unknown raw opcode {raw:#04x} at byte {offset} ({revision} revision)")]
    UnknownOpcode {
        raw: u8,
        offset: u32,
        revision: OpcodeRevision,
    },

    #[error("unknown entity field {raw} at byte {offset}")]
    UnknownField { raw: u16, offset: u32 },

    #[error("{op} at byte {offset}: {space} index {index} out of range (len {len})")]
    IndexOutOfRange {
        op: Opcode,
        space: IndexSpace,
        index: u16,
        offset: u32,
        len: usize,
    },

    #[error("call at byte {offset} targets function {function}, only {count} defined")]
    CallOutOfRange {
        function: u16,
        offset: u32,
        count: usize,
    },

    #[error("function {function} name index {index} out of range ({count} strings)")]
    StringOutOfRange {
        function: u16,
        index: u16,
        count: usize,
    },

    #[error("function {function} range {entry}..{end} is empty or outside the code section")]
    FunctionOutOfRange { function: u16, entry: u32, end: u32 },

    #[error("function {function} boundary at byte {offset} splits an instruction")]
    MisalignedFunction { function: u16, offset: u32 },

    #[error("functions {first} and {second} overlap")]
    FunctionOverlap { first: u16, second: u16 },

    #[error("code at byte {offset} belongs to no function")]
    UnownedCode { offset: u32 },

    #[error("duplicate function name \"{name}\"")]
    DuplicateFunction { name: String },

    #[error("{op} at byte {offset} in function {function} jumps to {target}, outside the function or mid-instruction")]
    JumpOutOfRange {
        op: Opcode,
        function: FunctionId,
        offset: u32,
        target: u32,
    },

    #[error("function {function} does not end with End, Return or Jump")]
    MissingTerminator { function: FunctionId },
}

impl EngineError for BytecodeError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        use BytecodeError::*;
        match self {
            BadMagic { .. } => "BYTECODE_BAD_MAGIC",
            UnsupportedVersion { .. } => "BYTECODE_UNSUPPORTED_VERSION",
            Truncated { .. } => "BYTECODE_TRUNCATED",
            TrailingBytes { .. } => "BYTECODE_TRAILING_BYTES",
            InvalidUtf8 { .. } => "BYTECODE_INVALID_UTF8",
            TooManyFunctions { .. } => "BYTECODE_TOO_MANY_FUNCTIONS",
            UnknownOpcode { .. } => "BYTECODE_UNKNOWN_OPCODE",
            UnknownField { .. } => "BYTECODE_UNKNOWN_FIELD",
            IndexOutOfRange { .. } => "BYTECODE_INDEX_OUT_OF_RANGE",
            CallOutOfRange { .. } => "BYTECODE_CALL_OUT_OF_RANGE",
            StringOutOfRange { .. } => "BYTECODE_STRING_OUT_OF_RANGE",
            FunctionOutOfRange { .. } => "BYTECODE_FUNCTION_OUT_OF_RANGE",
            MisalignedFunction { .. } => "BYTECODE_MISALIGNED_FUNCTION",
            FunctionOverlap { .. } => "BYTECODE_FUNCTION_OVERLAP",
            UnownedCode { .. } => "BYTECODE_UNOWNED_CODE",
            DuplicateFunction { .. } => "BYTECODE_DUPLICATE_FUNCTION",
            JumpOutOfRange { .. } => "BYTECODE_JUMP_OUT_OF_RANGE",
            MissingTerminator { .. } => "BYTECODE_MISSING_TERMINATOR",
        }
    }
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// What went wrong inside a running script.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuntimeErrorKind {
    #[error("division by zero")]
    DivisionByZero,

    #[error("operand stack overflow (limit {limit})")]
    StackOverflow { limit: usize },

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("call depth exceeded (limit {limit})")]
    CallDepthExceeded { limit: usize },

    #[error("iterator nesting exceeded (limit {limit})")]
    IteratorDepthExceeded { limit: usize },

    #[error("no active iterator")]
    NoIterator,

    #[error("table {table} index {index} out of range (len {len})")]
    TableIndexOutOfRange { table: u16, index: i32, len: usize },

    #[error("slot {slot} does not hold a live entity")]
    InvalidSlot { slot: i32 },

    #[error("no entity is bound to this invocation")]
    NoEntityContext,

    #[error("object type {type_id} is not registered")]
    UnknownType { type_id: i32 },

    #[error("unknown engine state code {code}")]
    InvalidEngineState { code: i32 },

    #[error("tile layer {layer} does not exist")]
    InvalidLayer { layer: i32 },

    #[error("hitbox {index} would leave a gap ({len} boxes set)")]
    InvalidHitbox { index: u16, len: usize },

    #[error("hitbox kind {kind} is neither solid (0) nor sensor (1)")]
    InvalidHitboxKind { kind: i32 },

    #[error("hitbox edge {value} does not fit in 16 bits")]
    HitboxOutOfRange { value: i32 },

    #[error("button {button} does not exist")]
    InvalidButton { button: i32 },

    #[error("no stage is loaded")]
    NoStage,

    #[error("stage {index} does not exist")]
    InvalidStage { index: i32 },

    #[error("function {id} does not exist")]
    UnknownFunction { id: u16 },
}

/// A script fault, with the function and instruction index it occurred at.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{kind} (function {function}, pc {pc})")]
pub struct ScriptRuntimeError {
    pub kind: RuntimeErrorKind,
    pub function: FunctionId,
    pub pc: usize,
}

impl EngineError for ScriptRuntimeError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        use RuntimeErrorKind::*;
        match self.kind {
            DivisionByZero => "SCRIPT_DIVISION_BY_ZERO",
            StackOverflow { .. } => "SCRIPT_STACK_OVERFLOW",
            StackUnderflow => "SCRIPT_STACK_UNDERFLOW",
            CallDepthExceeded { .. } => "SCRIPT_CALL_DEPTH_EXCEEDED",
            IteratorDepthExceeded { .. } => "SCRIPT_ITERATOR_DEPTH_EXCEEDED",
            NoIterator => "SCRIPT_NO_ITERATOR",
            TableIndexOutOfRange { .. } => "SCRIPT_TABLE_INDEX_OUT_OF_RANGE",
            InvalidSlot { .. } => "SCRIPT_INVALID_SLOT",
            NoEntityContext => "SCRIPT_NO_ENTITY_CONTEXT",
            UnknownType { .. } => "SCRIPT_UNKNOWN_TYPE",
            InvalidEngineState { .. } => "SCRIPT_INVALID_ENGINE_STATE",
            InvalidLayer { .. } => "SCRIPT_INVALID_LAYER",
            InvalidHitbox { .. } => "SCRIPT_INVALID_HITBOX",
            InvalidHitboxKind { .. } => "SCRIPT_INVALID_HITBOX_KIND",
            HitboxOutOfRange { .. } => "SCRIPT_HITBOX_OUT_OF_RANGE",
            InvalidButton { .. } => "SCRIPT_INVALID_BUTTON",
            NoStage => "SCRIPT_NO_STAGE",
            InvalidStage { .. } => "SCRIPT_INVALID_STAGE",
            UnknownFunction { .. } => "SCRIPT_UNKNOWN_FUNCTION",
        }
    }
}
