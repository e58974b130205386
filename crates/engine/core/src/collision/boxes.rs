//! Entity-relative collision boxes and the entity-vs-entity overlap query.

use arrayvec::ArrayVec;

use crate::config::EngineConfig;
use crate::object::ObjectEntity;

/// Role of a hitbox.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::FromRepr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum BoxKind {
    /// Blocks tiles and is reported to solid queries.
    #[default]
    Solid = 0,
    /// Detects overlaps only.
    Sensor = 1,
}

/// Rectangle relative to the entity origin, in pixels. `right`/`bottom` are exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hitbox {
    pub left: i16,
    pub top: i16,
    pub right: i16,
    pub bottom: i16,
    #[cfg_attr(feature = "serde", serde(default))]
    pub kind: BoxKind,
}

impl Hitbox {
    pub const fn new(left: i16, top: i16, right: i16, bottom: i16, kind: BoxKind) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            kind,
        }
    }

    pub const fn solid(left: i16, top: i16, right: i16, bottom: i16) -> Self {
        Self::new(left, top, right, bottom, BoxKind::Solid)
    }

    pub const fn sensor(left: i16, top: i16, right: i16, bottom: i16) -> Self {
        Self::new(left, top, right, bottom, BoxKind::Sensor)
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// World-space rectangle for an entity whose origin is at pixel `(x, y)`.
    pub fn at(&self, x: i32, y: i32) -> Rect {
        Rect {
            left: x + self.left as i32,
            top: y + self.top as i32,
            right: x + self.right as i32,
            bottom: y + self.bottom as i32,
        }
    }
}

pub type CollisionBoxSet = ArrayVec<Hitbox, { EngineConfig::MAX_HITBOXES }>;

/// World-space rectangle in whole pixels, half-open on the right and bottom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    #[inline]
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }
}

/// Which box kinds an overlap query pairs up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[strum(serialize_all = "snake_case")]
#[repr(u16)]
pub enum OverlapMode {
    /// Any box of `a` against any box of `b`.
    Any = 0,
    /// Sensor boxes of `a` against solid boxes of `b`.
    SensorVsSolid = 1,
    /// Solid boxes of both.
    SolidVsSolid = 2,
}

impl OverlapMode {
    fn accepts(self, a: BoxKind, b: BoxKind) -> bool {
        match self {
            OverlapMode::Any => true,
            OverlapMode::SensorVsSolid => a == BoxKind::Sensor && b == BoxKind::Solid,
            OverlapMode::SolidVsSolid => a == BoxKind::Solid && b == BoxKind::Solid,
        }
    }
}

/// Whether any box pair of `a` and `b` selected by `mode` intersects.
///
/// Entities sharing a non-zero group never overlap.
pub fn overlaps(a: &ObjectEntity, b: &ObjectEntity, mode: OverlapMode) -> bool {
    if a.group != 0 && a.group == b.group {
        return false;
    }
    let (ax, ay) = a.pixel_position();
    let (bx, by) = b.pixel_position();

    a.boxes.iter().filter(|boxed| !boxed.is_empty()).any(|left| {
        let left_rect = left.at(ax, ay);
        b.boxes
            .iter()
            .filter(|right| !right.is_empty() && mode.accepts(left.kind, right.kind))
            .any(|right| left_rect.intersects(&right.at(bx, by)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use crate::object::ObjectTypeId;

    fn entity(x: i32, y: i32, boxes: &[Hitbox]) -> ObjectEntity {
        let mut entity = ObjectEntity::new(ObjectTypeId(1), Fixed::from_int(x), Fixed::from_int(y));
        entity.boxes.extend(boxes.iter().copied());
        entity
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = entity(0, 0, &[Hitbox::solid(0, 0, 16, 16)]);
        let b = entity(16, 0, &[Hitbox::solid(0, 0, 16, 16)]);
        assert!(!overlaps(&a, &b, OverlapMode::Any));
        let c = entity(15, 15, &[Hitbox::solid(0, 0, 16, 16)]);
        assert!(overlaps(&a, &c, OverlapMode::Any));
    }

    #[test]
    fn mode_filters_box_kinds() {
        let ring = entity(0, 0, &[Hitbox::sensor(-8, -8, 8, 8)]);
        let player = entity(4, 4, &[Hitbox::solid(-8, -16, 8, 16)]);
        assert!(overlaps(&ring, &player, OverlapMode::SensorVsSolid));
        assert!(!overlaps(&player, &ring, OverlapMode::SensorVsSolid));
        assert!(!overlaps(&ring, &player, OverlapMode::SolidVsSolid));
        assert!(overlaps(&player, &ring, OverlapMode::Any));
    }

    #[test]
    fn shared_group_never_overlaps() {
        let mut a = entity(0, 0, &[Hitbox::solid(0, 0, 16, 16)]);
        let mut b = entity(4, 4, &[Hitbox::solid(0, 0, 16, 16)]);
        a.group = 3;
        b.group = 3;
        assert!(!overlaps(&a, &b, OverlapMode::Any));
        b.group = 4;
        assert!(overlaps(&a, &b, OverlapMode::Any));
    }
}
