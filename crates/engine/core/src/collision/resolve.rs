//! Per-tick movement and tile resolution.

use crate::fixed::Fixed;
use crate::object::{EntityFlags, ObjectEntity, ObjectPool};
use crate::scene::Stage;

use super::boxes::{BoxKind, Hitbox, Rect};
use super::probe::TileProbe;

/// Highest ledge a grounded entity climbs, and deepest drop it sticks to, per pixel moved.
pub const STEP_HEIGHT: i32 = 8;

/// Furthest an embedded box is searched out of solid terrain.
pub const EJECT_RANGE: i32 = 64;

/// Counts for one resolution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionReport {
    pub moved: usize,
    pub ejected: usize,
    pub landed: usize,
    pub walls: usize,
}

/// Integrates velocities and snaps tile-colliding entities out of the collision layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollisionEngine {
    step_height: i32,
    eject_range: i32,
}

impl Default for CollisionEngine {
    fn default() -> Self {
        Self {
            step_height: STEP_HEIGHT,
            eject_range: EJECT_RANGE,
        }
    }
}

/// Per-entity outcome flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Resolution {
    ejected: bool,
    landed: bool,
    wall: bool,
}

impl CollisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_height(mut self, step_height: i32) -> Self {
        self.step_height = step_height.max(0);
        self
    }

    /// Moves every runnable active entity by its velocity.
    ///
    /// Entities with tile collision and a solid box are resolved against the
    /// stage's collision layer; everything else moves freely.
    pub fn resolve(&self, pool: &mut ObjectPool, stage: Option<&Stage>, paused: bool) -> CollisionReport {
        let mut report = CollisionReport::default();
        let probe = stage
            .filter(|stage| stage.collision_layer.is_some())
            .map(TileProbe::new);

        for index in 0..pool.active().len() {
            let slot = pool.active()[index];
            let Some(entity) = pool.get_mut(slot) else {
                continue;
            };
            if !entity.is_runnable(paused) {
                continue;
            }
            report.moved += 1;

            let solid = solid_box(entity);
            match (probe, solid) {
                (Some(probe), Some(hitbox)) if entity.flags.contains(EntityFlags::TILE_COLLISION) => {
                    let resolution = self.resolve_entity(entity, hitbox, &probe);
                    report.ejected += resolution.ejected as usize;
                    report.landed += resolution.landed as usize;
                    report.walls += resolution.wall as usize;
                }
                _ => {
                    entity.x += entity.xvel;
                    entity.y += entity.yvel;
                }
            }
        }
        report
    }

    fn resolve_entity(&self, entity: &mut ObjectEntity, hitbox: Hitbox, probe: &TileProbe<'_>) -> Resolution {
        let mut resolution = Resolution::default();
        entity
            .flags
            .remove(EntityFlags::HIT_WALL | EntityFlags::HIT_CEILING);

        resolution.ejected = self.eject(entity, &bounds(entity, &hitbox), probe);

        // Horizontal, one pixel at a time.
        let target_x = entity.x + entity.xvel;
        let steps = target_x.to_int() - entity.x.to_int();
        let dx = steps.signum();
        let grounded = entity.on_ground();
        let mut moved = 0;
        while moved < steps.abs() {
            let current = bounds(entity, &hitbox);
            if !probe.blocked(current.offset(dx, 0), dx, 0) {
                entity.x += Fixed::from_int(dx);
                moved += 1;
                continue;
            }
            let climb = grounded
                .then(|| {
                    (1..=self.step_height).find(|h| !probe.blocked(current.offset(dx, -h), dx, 0))
                })
                .flatten();
            match climb {
                Some(h) => {
                    entity.x += Fixed::from_int(dx);
                    entity.y -= Fixed::from_int(h);
                    moved += 1;
                }
                None => {
                    entity.x = Fixed::from_int(entity.x.to_int());
                    entity.xvel = Fixed::ZERO;
                    entity.flags.insert(EntityFlags::HIT_WALL);
                    resolution.wall = true;
                    break;
                }
            }
        }
        if !resolution.wall {
            // Same pixel as the stepped position, plus the sub-pixel remainder.
            entity.x = target_x;
        }

        // Follow the ground down slopes and small drops.
        if grounded && entity.yvel.raw() >= 0 && !probe.supported(bounds(entity, &hitbox)) {
            match (1..=self.step_height).find(|h| probe.supported(bounds(entity, &hitbox).offset(0, *h))) {
                Some(h) => entity.y += Fixed::from_int(h),
                None => entity.flags.remove(EntityFlags::ON_GROUND),
            }
        }

        // Vertical, one pixel at a time.
        let target_y = entity.y + entity.yvel;
        let steps = target_y.to_int() - entity.y.to_int();
        let dy = steps.signum();
        let mut stopped = false;
        for _ in 0..steps.abs() {
            let current = bounds(entity, &hitbox);
            if probe.blocked(current.offset(0, dy), 0, dy) {
                stopped = true;
                break;
            }
            entity.y += Fixed::from_int(dy);
        }
        if stopped {
            entity.y = Fixed::from_int(entity.y.to_int());
            entity.yvel = Fixed::ZERO;
            if dy > 0 {
                let was_grounded = entity.on_ground();
                entity.flags.insert(EntityFlags::ON_GROUND);
                entity.angle = probe.surface_angle(bounds(entity, &hitbox));
                resolution.landed = !was_grounded;
            } else {
                entity.flags.insert(EntityFlags::HIT_CEILING);
                entity.flags.remove(EntityFlags::ON_GROUND);
            }
        } else {
            entity.y = target_y;
            if entity.yvel.raw() < 0 {
                entity.flags.remove(EntityFlags::ON_GROUND);
            } else {
                let current = bounds(entity, &hitbox);
                let supported = probe.supported(current);
                let was_grounded = entity.on_ground();
                entity.flags.set(EntityFlags::ON_GROUND, supported);
                if supported {
                    entity.angle = probe.surface_angle(current);
                    resolution.landed = !was_grounded;
                }
            }
        }
        resolution
    }

    /// Pushes a box out of solid terrain along the shortest free offset, so
    /// the distance moved is the penetration depth on that axis.
    ///
    /// Ties prefer up, then left, right, down.
    fn eject(&self, entity: &mut ObjectEntity, rect: &Rect, probe: &TileProbe<'_>) -> bool {
        if !probe.embedded(*rect) {
            return false;
        }
        for distance in 1..=self.eject_range {
            let candidates = [(0, -distance), (-distance, 0), (distance, 0), (0, distance)];
            if let Some((dx, dy)) = candidates
                .into_iter()
                .find(|(dx, dy)| !probe.embedded(rect.offset(*dx, *dy)))
            {
                entity.x += Fixed::from_int(dx);
                entity.y += Fixed::from_int(dy);
                tracing::trace!(dx, dy, "entity ejected from solid terrain");
                return true;
            }
        }
        false
    }
}

fn bounds(entity: &ObjectEntity, hitbox: &Hitbox) -> Rect {
    let (x, y) = entity.pixel_position();
    hitbox.at(x, y)
}

fn solid_box(entity: &ObjectEntity) -> Option<Hitbox> {
    entity
        .boxes
        .iter()
        .find(|hitbox| hitbox.kind == BoxKind::Solid && !hitbox.is_empty())
        .copied()
}
