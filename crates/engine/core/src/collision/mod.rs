//! Entity boxes, the overlap query and tile collision resolution.
//!
//! Entity-vs-entity contact is never resolved here. Scripts ask for it with
//! the `Overlap` intrinsic and decide what happens. Tile resolution only
//! snaps entities against the stage's collision layer.

mod boxes;
mod probe;
mod resolve;

pub use boxes::{overlaps, BoxKind, CollisionBoxSet, Hitbox, OverlapMode, Rect};
pub use probe::TileProbe;
pub use resolve::{CollisionEngine, CollisionReport, EJECT_RANGE, STEP_HEIGHT};
