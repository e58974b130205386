//! Opcode catalog, operand shapes and the two raw-numbering revisions.
//!
//! [`Opcode`] is the canonical, revision-independent tag. Bytecode stores raw
//! `u8` numbers which are mapped through an [`OpcodeRevision`] table. The
//! current revision numbers opcodes in declaration order; the legacy revision
//! is the table shipped with the earliest data files and is kept verbatim in
//! [`LEGACY_OPCODES`].

use strum::{EnumCount, IntoEnumIterator};

/// Operations understood by the script VM.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumCount,
    strum::EnumIter,
    strum::FromRepr,
    strum::IntoStaticStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Opcode {
    // control
    Nop,
    End,
    Return,
    Jump,
    JumpIfZero,
    JumpIfNotZero,
    Call,
    // stack
    PushInt,
    PushConst,
    Pop,
    Dup,
    Swap,
    // variables
    LoadGlobal,
    StoreGlobal,
    LoadLocal,
    StoreLocal,
    LoadScene,
    StoreScene,
    // entity fields
    GetField,
    SetField,
    GetFieldOf,
    SetFieldOf,
    SelfSlot,
    PlayerSlot,
    SetHitbox,
    // integer math
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Not,
    Abs,
    // fixed-point math
    FixMul,
    FixDiv,
    Sin,
    Cos,
    ATan2,
    // comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // tables
    TableGet,
    TableLen,
    TileAt,
    // pool
    Spawn,
    Destroy,
    DestroyOther,
    ForEach,
    Next,
    IterSlot,
    // collision
    Overlap,
    // delegated intrinsics
    PlaySound,
    StopSound,
    PlayMusic,
    StopMusic,
    SetAnimation,
    AnimFrame,
    DrawSprite,
    DrawRect,
    PaletteColor,
    InputHeld,
    InputPressed,
    Pointer,
    Random,
    SetEngineState,
    LoadStage,
    ReadUserdata,
    WriteUserdata,
    Log,
}

/// Shape of the operand that follows a raw opcode in the code stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperandKind {
    None,
    /// `i32` immediate.
    Int,
    /// `u16` index into the space given by [`Opcode::index_space`].
    Index,
    /// `u16` [`EntityField`] id.
    Field,
    /// `u32` byte offset into the code stream, resolved at load.
    Target,
    /// `u16` function id.
    Function,
}

impl OperandKind {
    /// Encoded operand width in bytes.
    pub const fn width(self) -> usize {
        match self {
            OperandKind::None => 0,
            OperandKind::Index | OperandKind::Field | OperandKind::Function => 2,
            OperandKind::Int | OperandKind::Target => 4,
        }
    }
}

/// Index spaces validated by the loader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IndexSpace {
    Constant,
    Global,
    Scratch,
    Scene,
    Table,
    Hitbox,
    OverlapMode,
    PointerAxis,
}

impl Opcode {
    pub fn operand_kind(self) -> OperandKind {
        use Opcode::*;
        match self {
            PushInt => OperandKind::Int,
            PushConst | LoadGlobal | StoreGlobal | LoadLocal | StoreLocal | LoadScene
            | StoreScene | TableGet | TableLen | SetHitbox | Overlap | Pointer => {
                OperandKind::Index
            }
            GetField | SetField | GetFieldOf | SetFieldOf => OperandKind::Field,
            Jump | JumpIfZero | JumpIfNotZero | ForEach | Next => OperandKind::Target,
            Call => OperandKind::Function,
            _ => OperandKind::None,
        }
    }

    pub fn index_space(self) -> Option<IndexSpace> {
        use Opcode::*;
        match self {
            PushConst => Some(IndexSpace::Constant),
            LoadGlobal | StoreGlobal => Some(IndexSpace::Global),
            LoadLocal | StoreLocal => Some(IndexSpace::Scratch),
            LoadScene | StoreScene => Some(IndexSpace::Scene),
            TableGet | TableLen => Some(IndexSpace::Table),
            SetHitbox => Some(IndexSpace::Hitbox),
            Overlap => Some(IndexSpace::OverlapMode),
            Pointer => Some(IndexSpace::PointerAxis),
            _ => None,
        }
    }

    /// Instructions that may close a function body.
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::End | Opcode::Return | Opcode::Jump)
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Raw opcode numbering in effect for a bytecode blob.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OpcodeRevision {
    #[default]
    Current,
    Legacy,
}

/// Opcode numbering of the earliest data files. Index is the raw number.
///
/// The legacy table predates `Swap`, `Abs`, `FixDiv`, `ATan2`, `Pointer` and
/// the userdata intrinsics, and groups arithmetic before control flow.
pub const LEGACY_OPCODES: &[Opcode] = &[
    Opcode::Nop,
    Opcode::End,
    Opcode::Return,
    Opcode::PushInt,
    Opcode::PushConst,
    Opcode::Pop,
    Opcode::Dup,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Mod,
    Opcode::Neg,
    Opcode::BitAnd,
    Opcode::BitOr,
    Opcode::BitXor,
    Opcode::Shl,
    Opcode::Shr,
    Opcode::Not,
    Opcode::Eq,
    Opcode::Ne,
    Opcode::Lt,
    Opcode::Le,
    Opcode::Gt,
    Opcode::Ge,
    Opcode::Jump,
    Opcode::JumpIfZero,
    Opcode::JumpIfNotZero,
    Opcode::Call,
    Opcode::LoadGlobal,
    Opcode::StoreGlobal,
    Opcode::LoadLocal,
    Opcode::StoreLocal,
    Opcode::LoadScene,
    Opcode::StoreScene,
    Opcode::GetField,
    Opcode::SetField,
    Opcode::GetFieldOf,
    Opcode::SetFieldOf,
    Opcode::SelfSlot,
    Opcode::PlayerSlot,
    Opcode::SetHitbox,
    Opcode::FixMul,
    Opcode::Sin,
    Opcode::Cos,
    Opcode::TableGet,
    Opcode::TableLen,
    Opcode::TileAt,
    Opcode::Spawn,
    Opcode::Destroy,
    Opcode::DestroyOther,
    Opcode::ForEach,
    Opcode::Next,
    Opcode::IterSlot,
    Opcode::Overlap,
    Opcode::PlaySound,
    Opcode::StopSound,
    Opcode::PlayMusic,
    Opcode::StopMusic,
    Opcode::SetAnimation,
    Opcode::AnimFrame,
    Opcode::DrawSprite,
    Opcode::DrawRect,
    Opcode::PaletteColor,
    Opcode::InputHeld,
    Opcode::InputPressed,
    Opcode::Random,
    Opcode::SetEngineState,
    Opcode::LoadStage,
    Opcode::Log,
];

impl OpcodeRevision {
    /// Maps a raw number from the code stream to an opcode.
    pub fn decode(self, raw: u8) -> Option<Opcode> {
        match self {
            OpcodeRevision::Current => Opcode::from_repr(raw),
            OpcodeRevision::Legacy => LEGACY_OPCODES.get(raw as usize).copied(),
        }
    }

    /// Raw number for `op`, `None` when the revision lacks it.
    pub fn encode(self, op: Opcode) -> Option<u8> {
        match self {
            OpcodeRevision::Current => Some(op as u8),
            OpcodeRevision::Legacy => LEGACY_OPCODES
                .iter()
                .position(|candidate| *candidate == op)
                .map(|raw| raw as u8),
        }
    }

    /// Number of raw opcodes defined by this revision.
    pub fn len(self) -> usize {
        match self {
            OpcodeRevision::Current => Opcode::COUNT,
            OpcodeRevision::Legacy => LEGACY_OPCODES.len(),
        }
    }

    /// Opcodes available in this revision, in raw-number order.
    pub fn opcodes(self) -> Vec<Opcode> {
        match self {
            OpcodeRevision::Current => Opcode::iter().collect(),
            OpcodeRevision::Legacy => LEGACY_OPCODES.to_vec(),
        }
    }
}

/// Entity fields addressable through `GetField`/`SetField`.
///
/// Positions and velocities are raw 16.16 fixed-point values; flag fields
/// read as 0/1 and treat any non-zero write as set.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumCount,
    strum::EnumIter,
    strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum EntityField {
    Type,
    X,
    Y,
    XVel,
    YVel,
    State,
    Substate,
    Subtype,
    Direction,
    Animation,
    Frame,
    DrawLayer,
    Group,
    Angle,
    OnGround,
    Visible,
    TileCollision,
    PauseExempt,
    HitWall,
    HitCeiling,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn current_revision_numbers_in_declaration_order() {
        for op in Opcode::iter() {
            let raw = OpcodeRevision::Current.encode(op).unwrap();
            assert_eq!(OpcodeRevision::Current.decode(raw), Some(op));
        }
        assert_eq!(OpcodeRevision::Current.decode(Opcode::COUNT as u8), None);
    }

    #[test]
    fn legacy_table_is_unique_and_lacks_newer_opcodes() {
        let unique: HashSet<_> = LEGACY_OPCODES.iter().collect();
        assert_eq!(unique.len(), LEGACY_OPCODES.len());
        assert_eq!(LEGACY_OPCODES.len(), Opcode::COUNT - 7);

        for missing in [
            Opcode::Swap,
            Opcode::Abs,
            Opcode::FixDiv,
            Opcode::ATan2,
            Opcode::Pointer,
            Opcode::ReadUserdata,
            Opcode::WriteUserdata,
        ] {
            assert_eq!(OpcodeRevision::Legacy.encode(missing), None, "{missing}");
        }
    }

    #[test]
    fn revisions_disagree_on_raw_numbers() {
        let raw = OpcodeRevision::Legacy.encode(Opcode::Add).unwrap();
        assert_eq!(raw, 7);
        assert_eq!(OpcodeRevision::Current.decode(raw), Some(Opcode::PushInt));
        assert_eq!(OpcodeRevision::Legacy.decode(raw), Some(Opcode::Add));
    }

    #[test]
    fn revision_parses_from_config_strings() {
        assert_eq!("legacy".parse::<OpcodeRevision>().unwrap(), OpcodeRevision::Legacy);
        assert_eq!("Current".parse::<OpcodeRevision>().unwrap(), OpcodeRevision::Current);
    }

    #[test]
    fn operand_kinds_cover_jump_family() {
        assert_eq!(Opcode::Jump.operand_kind(), OperandKind::Target);
        assert_eq!(Opcode::ForEach.operand_kind(), OperandKind::Target);
        assert_eq!(Opcode::Call.operand_kind(), OperandKind::Function);
        assert_eq!(Opcode::Add.operand_kind(), OperandKind::None);
        assert_eq!(Opcode::PushInt.operand_kind().width(), 4);
    }
}
