//! Programmatic bytecode builder.
//!
//! Emits the same container [`Program::load`](super::Program::load) accepts,
//! with symbolic labels for jumps and by-name calls that may refer to
//! functions declared later.
//!
//! ```
//! use engine_core::script::{Assembler, Opcode, OpcodeRevision, Program};
//!
//! let mut asm = Assembler::new();
//! asm.begin_function("tick")
//!     .index(Opcode::LoadGlobal, 0)
//!     .push_int(1)
//!     .op(Opcode::Add)
//!     .index(Opcode::StoreGlobal, 0)
//!     .op(Opcode::End)
//!     .end_function();
//! let bytes = asm.build(OpcodeRevision::Current).unwrap();
//! let program = Program::load(&bytes, OpcodeRevision::Current).unwrap();
//! assert!(program.function_by_name("tick").is_some());
//! ```

use std::collections::HashMap;

use super::opcode::{EntityField, Opcode, OpcodeRevision, OperandKind};
use super::program::{CONTAINER_VERSION, MAGIC};

/// Jump label handed out by [`Assembler::label`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(usize);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("{op} expects a {expected:?} operand")]
    OperandMismatch { op: Opcode, expected: OperandKind },

    #[error("{op} is not available in the {revision} revision")]
    OpcodeUnavailable { op: Opcode, revision: OpcodeRevision },

    #[error("label {0} was never bound")]
    UnboundLabel(usize),

    #[error("label {0} bound twice")]
    LabelRebound(usize),

    #[error("call to undefined function \"{0}\"")]
    UnknownFunction(String),

    #[error("instruction emitted outside a function")]
    OutsideFunction,

    #[error("too many {0} entries")]
    Overflow(&'static str),
}

#[derive(Clone, Debug)]
enum PendingOperand {
    None,
    Int(i32),
    Index(u16),
    Field(EntityField),
    Label(Label),
    RawTarget(u32),
    FunctionName(String),
    RawFunction(u16),
}

#[derive(Clone, Debug)]
struct PendingInstruction {
    op: Opcode,
    operand: PendingOperand,
}

#[derive(Clone, Debug)]
struct PendingFunction {
    name: u16,
    entry: u32,
    end: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct Assembler {
    constants: Vec<i32>,
    strings: Vec<String>,
    tables: Vec<Vec<i32>>,
    functions: Vec<PendingFunction>,
    function_names: HashMap<String, u16>,
    code: Vec<PendingInstruction>,
    code_len: u32,
    labels: Vec<Option<u32>>,
    current: Option<usize>,
    error: Option<BuildError>,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant and returns its index.
    pub fn constant(&mut self, value: i32) -> u16 {
        self.constants.push(value);
        (self.constants.len() - 1) as u16
    }

    /// Adds a lookup table and returns its index.
    pub fn table(&mut self, values: &[i32]) -> u16 {
        self.tables.push(values.to_vec());
        (self.tables.len() - 1) as u16
    }

    fn string(&mut self, value: &str) -> u16 {
        if let Some(index) = self.strings.iter().position(|s| s == value) {
            return index as u16;
        }
        self.strings.push(value.to_owned());
        (self.strings.len() - 1) as u16
    }

    /// Opens a function at the current code offset, closing any open one.
    pub fn begin_function(&mut self, name: &str) -> &mut Self {
        self.end_function();
        let name_index = self.string(name);
        let id = self.functions.len() as u16;
        self.functions.push(PendingFunction {
            name: name_index,
            entry: self.code_len,
            end: None,
        });
        self.function_names.insert(name.to_owned(), id);
        self.current = Some(self.functions.len() - 1);
        self
    }

    pub fn end_function(&mut self) -> &mut Self {
        if let Some(current) = self.current.take() {
            self.functions[current].end = Some(self.code_len);
        }
        self
    }

    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds `label` to the next emitted instruction.
    pub fn bind(&mut self, label: Label) -> &mut Self {
        let offset = self.code_len;
        let bound = match self.labels.get_mut(label.0) {
            Some(slot) if slot.is_none() => {
                *slot = Some(offset);
                true
            }
            _ => false,
        };
        if !bound {
            self.fail(BuildError::LabelRebound(label.0));
        }
        self
    }

    /// Byte offset the next instruction will be emitted at.
    pub fn offset(&self) -> u32 {
        self.code_len
    }

    pub fn op(&mut self, op: Opcode) -> &mut Self {
        self.emit(op, OperandKind::None, PendingOperand::None)
    }

    pub fn push_int(&mut self, value: i32) -> &mut Self {
        self.emit(Opcode::PushInt, OperandKind::Int, PendingOperand::Int(value))
    }

    pub fn index(&mut self, op: Opcode, index: u16) -> &mut Self {
        self.emit(op, OperandKind::Index, PendingOperand::Index(index))
    }

    pub fn field(&mut self, op: Opcode, field: EntityField) -> &mut Self {
        self.emit(op, OperandKind::Field, PendingOperand::Field(field))
    }

    pub fn jump(&mut self, op: Opcode, label: Label) -> &mut Self {
        self.emit(op, OperandKind::Target, PendingOperand::Label(label))
    }

    /// Jump to an absolute code byte offset, unchecked until load.
    pub fn jump_raw(&mut self, op: Opcode, offset: u32) -> &mut Self {
        self.emit(op, OperandKind::Target, PendingOperand::RawTarget(offset))
    }

    /// Call by name; the callee may be declared later.
    pub fn call(&mut self, name: &str) -> &mut Self {
        self.emit(
            Opcode::Call,
            OperandKind::Function,
            PendingOperand::FunctionName(name.to_owned()),
        )
    }

    /// Call by raw function id, unchecked until load.
    pub fn call_raw(&mut self, id: u16) -> &mut Self {
        self.emit(
            Opcode::Call,
            OperandKind::Function,
            PendingOperand::RawFunction(id),
        )
    }

    fn emit(&mut self, op: Opcode, kind: OperandKind, operand: PendingOperand) -> &mut Self {
        if op.operand_kind() != kind {
            self.fail(BuildError::OperandMismatch {
                op,
                expected: op.operand_kind(),
            });
            return self;
        }
        if self.current.is_none() {
            self.fail(BuildError::OutsideFunction);
            return self;
        }
        self.code_len += 1 + kind.width() as u32;
        self.code.push(PendingInstruction { op, operand });
        self
    }

    fn fail(&mut self, error: BuildError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Encodes the container using `revision`'s raw opcode numbers.
    pub fn build(&self, revision: OpcodeRevision) -> Result<Vec<u8>, BuildError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        let mut out = Vec::with_capacity(20 + self.code_len as usize);
        out.extend_from_slice(&MAGIC);
        put_u16(&mut out, CONTAINER_VERSION);
        put_u16(&mut out, 0);
        put_u16(&mut out, count(self.constants.len(), "constant")?);
        put_u16(&mut out, count(self.strings.len(), "string")?);
        put_u16(&mut out, count(self.tables.len(), "table")?);
        put_u16(&mut out, count(self.functions.len(), "function")?);
        out.extend_from_slice(&self.code_len.to_le_bytes());

        for value in &self.constants {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for string in &self.strings {
            put_u16(&mut out, count(string.len(), "string byte")?);
            out.extend_from_slice(string.as_bytes());
        }
        for table in &self.tables {
            put_u16(&mut out, count(table.len(), "table entry")?);
            for value in table {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        for function in &self.functions {
            put_u16(&mut out, function.name);
            out.extend_from_slice(&function.entry.to_le_bytes());
            let end = function.end.unwrap_or(self.code_len);
            out.extend_from_slice(&end.to_le_bytes());
        }

        for instruction in &self.code {
            let raw = revision
                .encode(instruction.op)
                .ok_or(BuildError::OpcodeUnavailable {
                    op: instruction.op,
                    revision,
                })?;
            out.push(raw);
            match &instruction.operand {
                PendingOperand::None => {}
                PendingOperand::Int(value) => out.extend_from_slice(&value.to_le_bytes()),
                PendingOperand::Index(index) => put_u16(&mut out, *index),
                PendingOperand::Field(field) => put_u16(&mut out, *field as u16),
                PendingOperand::Label(label) => {
                    let offset = self
                        .labels
                        .get(label.0)
                        .copied()
                        .flatten()
                        .ok_or(BuildError::UnboundLabel(label.0))?;
                    out.extend_from_slice(&offset.to_le_bytes());
                }
                PendingOperand::RawTarget(offset) => out.extend_from_slice(&offset.to_le_bytes()),
                PendingOperand::FunctionName(name) => {
                    let id = self
                        .function_names
                        .get(name)
                        .ok_or_else(|| BuildError::UnknownFunction(name.clone()))?;
                    put_u16(&mut out, *id);
                }
                PendingOperand::RawFunction(id) => put_u16(&mut out, *id),
            }
        }

        Ok(out)
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn count(len: usize, what: &'static str) -> Result<u16, BuildError> {
    u16::try_from(len).map_err(|_| BuildError::Overflow(what))
}
