use core::fmt;

use crate::collision::CollisionBoxSet;
use crate::config::EngineConfig;
use crate::fixed::Fixed;
use crate::script::EntityField;

/// Index of an entity slot in the object pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotId(pub u16);

impl SlotId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Converts a script value to a slot id; negative or oversized values are `None`.
    pub fn from_script(value: i32) -> Option<Self> {
        u16::try_from(value).ok().map(SlotId)
    }

    #[inline]
    pub const fn to_script(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index into the type registry installed by the current stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectTypeId(pub u16);

impl ObjectTypeId {
    /// The blank object: no functions, never updated.
    pub const BLANK: ObjectTypeId = ObjectTypeId(0);
}

impl fmt::Display for ObjectTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags::bitflags! {
    /// Per-entity status bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct EntityFlags: u16 {
        const ON_GROUND = 1 << 0;
        const VISIBLE = 1 << 1;
        const TILE_COLLISION = 1 << 2;
        const PAUSE_EXEMPT = 1 << 3;
        /// Set after a script fault; the entity is skipped until destroyed.
        const FROZEN = 1 << 4;
        const PLAYER = 1 << 5;
        const HIT_WALL = 1 << 6;
        const HIT_CEILING = 1 << 7;
    }
}

/// One pool slot's worth of simulation state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectEntity {
    pub type_id: ObjectTypeId,
    pub x: Fixed,
    pub y: Fixed,
    pub xvel: Fixed,
    pub yvel: Fixed,
    pub state: i32,
    pub substate: i32,
    pub subtype: i32,
    pub scratch: [i32; EngineConfig::SCRATCH_VARS],
    pub animation: u16,
    pub frame: u16,
    pub direction: u8,
    pub boxes: CollisionBoxSet,
    pub draw_layer: u8,
    pub group: u8,
    /// Surface angle in 256ths of a turn.
    pub angle: u8,
    pub flags: EntityFlags,
}

impl ObjectEntity {
    pub fn new(type_id: ObjectTypeId, x: Fixed, y: Fixed) -> Self {
        Self {
            type_id,
            x,
            y,
            flags: EntityFlags::VISIBLE,
            ..Self::default()
        }
    }

    /// Origin floored to whole pixels.
    #[inline]
    pub fn pixel_position(&self) -> (i32, i32) {
        (self.x.to_int(), self.y.to_int())
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.flags.contains(EntityFlags::FROZEN)
    }

    #[inline]
    pub fn on_ground(&self) -> bool {
        self.flags.contains(EntityFlags::ON_GROUND)
    }

    #[inline]
    pub fn is_pause_exempt(&self) -> bool {
        self.flags.contains(EntityFlags::PAUSE_EXEMPT)
    }

    /// Whether this entity runs while the engine is paused or not.
    #[inline]
    pub fn is_runnable(&self, paused: bool) -> bool {
        !self.is_frozen() && (!paused || self.is_pause_exempt())
    }

    pub fn field(&self, field: EntityField) -> i32 {
        let flag = |bit: EntityFlags| self.flags.contains(bit) as i32;
        match field {
            EntityField::Type => self.type_id.0 as i32,
            EntityField::X => self.x.raw(),
            EntityField::Y => self.y.raw(),
            EntityField::XVel => self.xvel.raw(),
            EntityField::YVel => self.yvel.raw(),
            EntityField::State => self.state,
            EntityField::Substate => self.substate,
            EntityField::Subtype => self.subtype,
            EntityField::Direction => self.direction as i32,
            EntityField::Animation => self.animation as i32,
            EntityField::Frame => self.frame as i32,
            EntityField::DrawLayer => self.draw_layer as i32,
            EntityField::Group => self.group as i32,
            EntityField::Angle => self.angle as i32,
            EntityField::OnGround => flag(EntityFlags::ON_GROUND),
            EntityField::Visible => flag(EntityFlags::VISIBLE),
            EntityField::TileCollision => flag(EntityFlags::TILE_COLLISION),
            EntityField::PauseExempt => flag(EntityFlags::PAUSE_EXEMPT),
            EntityField::HitWall => flag(EntityFlags::HIT_WALL),
            EntityField::HitCeiling => flag(EntityFlags::HIT_CEILING),
        }
    }

    /// Writes a field. Narrow fields truncate; `Type` is validated by the caller.
    pub fn set_field(&mut self, field: EntityField, value: i32) {
        match field {
            EntityField::Type => self.type_id = ObjectTypeId(value as u16),
            EntityField::X => self.x = Fixed::from_raw(value),
            EntityField::Y => self.y = Fixed::from_raw(value),
            EntityField::XVel => self.xvel = Fixed::from_raw(value),
            EntityField::YVel => self.yvel = Fixed::from_raw(value),
            EntityField::State => self.state = value,
            EntityField::Substate => self.substate = value,
            EntityField::Subtype => self.subtype = value,
            EntityField::Direction => self.direction = value as u8,
            EntityField::Animation => self.animation = value as u16,
            EntityField::Frame => self.frame = value as u16,
            EntityField::DrawLayer => self.draw_layer = value as u8,
            EntityField::Group => self.group = value as u8,
            EntityField::Angle => self.angle = value as u8,
            EntityField::OnGround => self.flags.set(EntityFlags::ON_GROUND, value != 0),
            EntityField::Visible => self.flags.set(EntityFlags::VISIBLE, value != 0),
            EntityField::TileCollision => self.flags.set(EntityFlags::TILE_COLLISION, value != 0),
            EntityField::PauseExempt => self.flags.set(EntityFlags::PAUSE_EXEMPT, value != 0),
            EntityField::HitWall => self.flags.set(EntityFlags::HIT_WALL, value != 0),
            EntityField::HitCeiling => self.flags.set(EntityFlags::HIT_CEILING, value != 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn slot_from_script_rejects_negative() {
        assert_eq!(SlotId::from_script(-1), None);
        assert_eq!(SlotId::from_script(7), Some(SlotId(7)));
        assert_eq!(SlotId::from_script(0x1_0000), None);
    }

    #[test]
    fn every_field_reads_back_what_was_written() {
        let mut entity = ObjectEntity::new(ObjectTypeId(2), Fixed::ZERO, Fixed::ZERO);
        for field in EntityField::iter() {
            entity.set_field(field, 1);
            assert_eq!(entity.field(field), 1, "{field}");
        }
    }

    #[test]
    fn positions_are_raw_fixed_point() {
        let mut entity = ObjectEntity::new(ObjectTypeId(1), Fixed::from_int(100), Fixed::from_int(50));
        assert_eq!(entity.field(EntityField::X), 100 << 16);
        entity.set_field(EntityField::Y, 0x18000);
        assert_eq!(entity.pixel_position(), (100, 1));
    }
}
