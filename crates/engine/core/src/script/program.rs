//! Bytecode container decoding and load-time validation.
//!
//! A [`Program`] is immutable once loaded. Every jump target has been resolved
//! to an instruction index inside its owning function, every call targets a
//! defined function, and every index operand is in range, so the VM never
//! re-checks operand shapes.

use core::fmt::{self, Write as _};
use std::collections::HashSet;

use crate::config::EngineConfig;

use super::error::BytecodeError;
use super::opcode::{EntityField, IndexSpace, Opcode, OpcodeRevision, OperandKind};

/// Container magic.
pub const MAGIC: [u8; 4] = *b"RSBC";

/// Container version written by the assembler and accepted by the loader.
pub const CONTAINER_VERSION: u16 = 1;

/// Number of `Overlap` box-kind modes.
pub const OVERLAP_MODES: usize = 3;

/// Number of `Pointer` axes (x, y, down).
pub const POINTER_AXES: usize = 3;

/// Index of a function in the program's function table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionId(pub u16);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Decoded operand. `Target` holds an instruction index after load.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    None,
    Int(i32),
    Index(u16),
    Field(EntityField),
    Target(usize),
    Function(FunctionId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub operand: Operand,
    /// Byte offset in the code section.
    pub offset: u32,
}

// Operand shapes are validated at load; these accessors return a neutral
// value for the impossible mismatch instead of panicking.
impl Instruction {
    #[inline]
    pub fn int(&self) -> i32 {
        match self.operand {
            Operand::Int(v) => v,
            _ => 0,
        }
    }

    #[inline]
    pub fn index(&self) -> u16 {
        match self.operand {
            Operand::Index(i) => i,
            _ => 0,
        }
    }

    #[inline]
    pub fn field(&self) -> EntityField {
        match self.operand {
            Operand::Field(field) => field,
            _ => EntityField::Type,
        }
    }

    #[inline]
    pub fn target(&self) -> usize {
        match self.operand {
            Operand::Target(pc) => pc,
            _ => 0,
        }
    }

    #[inline]
    pub fn function(&self) -> FunctionId {
        match self.operand {
            Operand::Function(id) => id,
            _ => FunctionId(0),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}  {}", self.offset, self.op)?;
        match self.operand {
            Operand::None => Ok(()),
            Operand::Int(v) => write!(f, " {v}"),
            Operand::Index(i) => write!(f, " #{i}"),
            Operand::Field(field) => write!(f, " .{field}"),
            Operand::Target(pc) => write!(f, " -> {pc}"),
            Operand::Function(id) => write!(f, " fn{id}"),
        }
    }
}

/// Entry point into the instruction stream. `entry..end` are instruction indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptFunction {
    pub id: FunctionId,
    pub name: String,
    pub entry: usize,
    pub end: usize,
}

impl ScriptFunction {
    #[inline]
    pub fn contains(&self, pc: usize) -> bool {
        (self.entry..self.end).contains(&pc)
    }
}

/// A loaded, validated script program.
#[derive(Clone, Debug)]
pub struct Program {
    revision: OpcodeRevision,
    constants: Vec<i32>,
    strings: Vec<String>,
    tables: Vec<Vec<i32>>,
    functions: Vec<ScriptFunction>,
    code: Vec<Instruction>,
}

struct RawFunction {
    name: u16,
    entry: u32,
    end: u32,
}

impl Program {
    /// Decodes and validates a bytecode container.
    pub fn load(bytes: &[u8], revision: OpcodeRevision) -> Result<Self, BytecodeError> {
        let mut reader = Reader::new(bytes);

        let magic = reader.array::<4>("header")?;
        if magic != MAGIC {
            return Err(BytecodeError::BadMagic { found: magic });
        }
        let version = reader.u16("header")?;
        if version != CONTAINER_VERSION {
            return Err(BytecodeError::UnsupportedVersion { version });
        }
        let _reserved = reader.u16("header")?;
        let const_count = reader.u16("header")? as usize;
        let string_count = reader.u16("header")? as usize;
        let table_count = reader.u16("header")? as usize;
        let function_count = reader.u16("header")? as usize;
        let code_len = reader.u32("header")? as usize;

        if function_count > EngineConfig::MAX_FUNCTIONS {
            return Err(BytecodeError::TooManyFunctions {
                count: function_count,
                max: EngineConfig::MAX_FUNCTIONS,
            });
        }

        let constants = (0..const_count)
            .map(|_| reader.i32("constants"))
            .collect::<Result<Vec<_>, _>>()?;

        let mut strings = Vec::with_capacity(string_count);
        for index in 0..string_count {
            let len = reader.u16("strings")? as usize;
            let raw = reader.take(len, "strings")?;
            let text = core::str::from_utf8(raw).map_err(|_| BytecodeError::InvalidUtf8 { index })?;
            strings.push(text.to_owned());
        }

        let mut tables = Vec::with_capacity(table_count);
        for _ in 0..table_count {
            let len = reader.u16("tables")? as usize;
            let values = (0..len)
                .map(|_| reader.i32("tables"))
                .collect::<Result<Vec<_>, _>>()?;
            tables.push(values);
        }

        let mut raw_functions = Vec::with_capacity(function_count);
        for _ in 0..function_count {
            raw_functions.push(RawFunction {
                name: reader.u16("functions")?,
                entry: reader.u32("functions")?,
                end: reader.u32("functions")?,
            });
        }

        let code_bytes = reader.take(code_len, "code")?;
        if reader.remaining() > 0 {
            return Err(BytecodeError::TrailingBytes {
                count: reader.remaining(),
            });
        }

        let limits = IndexLimits {
            constants: constants.len(),
            tables: tables.len(),
            functions: function_count,
        };
        let mut code = decode_code(code_bytes, revision, &limits)?;
        let functions = resolve_functions(&raw_functions, &strings, &mut code, code_len)?;

        tracing::debug!(
            functions = functions.len(),
            instructions = code.len(),
            %revision,
            "bytecode loaded"
        );

        Ok(Self {
            revision,
            constants,
            strings,
            tables,
            functions,
            code,
        })
    }

    pub fn revision(&self) -> OpcodeRevision {
        self.revision
    }

    pub fn constants(&self) -> &[i32] {
        &self.constants
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn tables(&self) -> &[Vec<i32>] {
        &self.tables
    }

    pub fn table(&self, index: u16) -> Option<&[i32]> {
        self.tables.get(index as usize).map(Vec::as_slice)
    }

    pub fn functions(&self) -> &[ScriptFunction] {
        &self.functions
    }

    pub fn function(&self, id: FunctionId) -> Option<&ScriptFunction> {
        self.functions.get(id.0 as usize)
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .find(|function| function.name == name)
            .map(|function| function.id)
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    #[inline]
    pub fn instruction(&self, pc: usize) -> Option<&Instruction> {
        self.code.get(pc)
    }

    /// Human-readable listing, one function after another.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "; {} revision, {} functions, {} constants, {} tables",
            self.revision,
            self.functions.len(),
            self.constants.len(),
            self.tables.len()
        );
        for function in &self.functions {
            let _ = writeln!(out, "\nfn{} {}:", function.id, function.name);
            for pc in function.entry..function.end {
                let instruction = &self.code[pc];
                let _ = write!(out, "  {pc:>5}  {instruction}");
                if let Operand::Function(callee) = instruction.operand {
                    if let Some(target) = self.function(callee) {
                        let _ = write!(out, "  ; {}", target.name);
                    }
                }
                out.push('\n');
            }
        }
        out
    }
}

struct IndexLimits {
    constants: usize,
    tables: usize,
    functions: usize,
}

impl IndexLimits {
    fn len(&self, space: IndexSpace) -> usize {
        match space {
            IndexSpace::Constant => self.constants,
            IndexSpace::Global => EngineConfig::GLOBAL_VARS,
            IndexSpace::Scratch => EngineConfig::SCRATCH_VARS,
            IndexSpace::Scene => EngineConfig::SCENE_VARS,
            IndexSpace::Table => self.tables,
            IndexSpace::Hitbox => EngineConfig::MAX_HITBOXES,
            IndexSpace::OverlapMode => OVERLAP_MODES,
            IndexSpace::PointerAxis => POINTER_AXES,
        }
    }
}

/// Decodes the code stream. Targets are left as raw byte offsets.
fn decode_code(
    bytes: &[u8],
    revision: OpcodeRevision,
    limits: &IndexLimits,
) -> Result<Vec<Instruction>, BytecodeError> {
    let mut reader = Reader::new(bytes);
    let mut code = Vec::new();

    while reader.remaining() > 0 {
        let offset = reader.pos as u32;
        let raw = reader.u8("code")?;
        let op = revision.decode(raw).ok_or(BytecodeError::UnknownOpcode {
            raw,
            offset,
            revision,
        })?;

        let operand = match op.operand_kind() {
            OperandKind::None => Operand::None,
            OperandKind::Int => Operand::Int(reader.i32("code")?),
            OperandKind::Index => {
                let index = reader.u16("code")?;
                if let Some(space) = op.index_space() {
                    let len = limits.len(space);
                    if index as usize >= len {
                        return Err(BytecodeError::IndexOutOfRange {
                            op,
                            space,
                            index,
                            offset,
                            len,
                        });
                    }
                }
                Operand::Index(index)
            }
            OperandKind::Field => {
                let raw = reader.u16("code")?;
                let field = EntityField::from_repr(raw)
                    .ok_or(BytecodeError::UnknownField { raw, offset })?;
                Operand::Field(field)
            }
            OperandKind::Target => Operand::Target(reader.u32("code")? as usize),
            OperandKind::Function => {
                let function = reader.u16("code")?;
                if function as usize >= limits.functions {
                    return Err(BytecodeError::CallOutOfRange {
                        function,
                        offset,
                        count: limits.functions,
                    });
                }
                Operand::Function(FunctionId(function))
            }
        };

        code.push(Instruction {
            op,
            operand,
            offset,
        });
    }

    Ok(code)
}

/// Instruction index starting at `offset`; `code_len` maps one past the end.
fn boundary(code: &[Instruction], code_len: usize, offset: usize) -> Option<usize> {
    if offset == code_len {
        return Some(code.len());
    }
    code.binary_search_by_key(&(offset as u32), |instruction| instruction.offset)
        .ok()
}

fn resolve_functions(
    raw_functions: &[RawFunction],
    strings: &[String],
    code: &mut [Instruction],
    code_len: usize,
) -> Result<Vec<ScriptFunction>, BytecodeError> {
    let mut functions = Vec::with_capacity(raw_functions.len());
    let mut names = HashSet::new();

    for (i, raw) in raw_functions.iter().enumerate() {
        let id = i as u16;
        let name = strings
            .get(raw.name as usize)
            .ok_or(BytecodeError::StringOutOfRange {
                function: id,
                index: raw.name,
                count: strings.len(),
            })?;
        if raw.entry >= raw.end || raw.end as usize > code_len {
            return Err(BytecodeError::FunctionOutOfRange {
                function: id,
                entry: raw.entry,
                end: raw.end,
            });
        }
        let entry = boundary(code, code_len, raw.entry as usize).ok_or(
            BytecodeError::MisalignedFunction {
                function: id,
                offset: raw.entry,
            },
        )?;
        let end = boundary(code, code_len, raw.end as usize).ok_or(
            BytecodeError::MisalignedFunction {
                function: id,
                offset: raw.end,
            },
        )?;
        if !names.insert(name.as_str()) {
            return Err(BytecodeError::DuplicateFunction { name: name.clone() });
        }
        functions.push(ScriptFunction {
            id: FunctionId(id),
            name: name.clone(),
            entry,
            end,
        });
    }

    let mut by_entry: Vec<&ScriptFunction> = functions.iter().collect();
    by_entry.sort_by_key(|function| function.entry);
    for pair in by_entry.windows(2) {
        if pair[1].entry < pair[0].end {
            return Err(BytecodeError::FunctionOverlap {
                first: pair[0].id.0,
                second: pair[1].id.0,
            });
        }
    }

    let mut owned = vec![false; code.len()];
    for function in &functions {
        owned[function.entry..function.end].fill(true);
    }
    if let Some(pc) = owned.iter().position(|is_owned| !is_owned) {
        return Err(BytecodeError::UnownedCode {
            offset: code[pc].offset,
        });
    }

    for function in &functions {
        let last = &code[function.end - 1];
        if !last.op.is_terminator() {
            return Err(BytecodeError::MissingTerminator {
                function: function.id,
            });
        }

        let entry_byte = code[function.entry].offset as usize;
        let end_byte = code
            .get(function.end)
            .map_or(code_len, |instruction| instruction.offset as usize);

        for pc in function.entry..function.end {
            let Operand::Target(raw) = code[pc].operand else {
                continue;
            };
            let resolved = if (entry_byte..end_byte).contains(&raw) {
                boundary(code, code_len, raw)
            } else {
                None
            };
            let Some(target) = resolved else {
                return Err(BytecodeError::JumpOutOfRange {
                    op: code[pc].op,
                    function: function.id,
                    offset: code[pc].offset,
                    target: raw as u32,
                });
            };
            code[pc].operand = Operand::Target(target);
        }
    }

    Ok(functions)
}

/// Little-endian cursor over the container bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize, section: &'static str) -> Result<&'a [u8], BytecodeError> {
        if self.remaining() < len {
            return Err(BytecodeError::Truncated {
                section,
                offset: self.pos,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, section: &'static str) -> Result<[u8; N], BytecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, section)?);
        Ok(out)
    }

    fn u8(&mut self, section: &'static str) -> Result<u8, BytecodeError> {
        Ok(self.array::<1>(section)?[0])
    }

    fn u16(&mut self, section: &'static str) -> Result<u16, BytecodeError> {
        Ok(u16::from_le_bytes(self.array(section)?))
    }

    fn u32(&mut self, section: &'static str) -> Result<u32, BytecodeError> {
        Ok(u32::from_le_bytes(self.array(section)?))
    }

    fn i32(&mut self, section: &'static str) -> Result<i32, BytecodeError> {
        Ok(i32::from_le_bytes(self.array(section)?))
    }
}
