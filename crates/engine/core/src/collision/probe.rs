//! Pixel queries against the stage's collision layer.

use crate::config::EngineConfig;
use crate::scene::{Solidity, Stage};

use super::boxes::Rect;

const TILE: i32 = EngineConfig::TILE_SIZE;

/// Read-only view of the collision layer in world pixels.
#[derive(Clone, Copy, Debug)]
pub struct TileProbe<'a> {
    stage: &'a Stage,
}

impl<'a> TileProbe<'a> {
    pub fn new(stage: &'a Stage) -> Self {
        Self { stage }
    }

    /// Whether pixel `(x, y)` is inside a tile solid on `side`.
    pub fn solid(&self, x: i32, y: i32, side: Solidity) -> bool {
        let mask = self.stage.mask_at(x, y);
        if !mask.solidity.contains(side) {
            return false;
        }
        let col = x.rem_euclid(TILE) as usize;
        y.rem_euclid(TILE) >= mask.column_top(col)
    }

    /// Whether moving one pixel by `(dx, dy)` put `moved`'s leading edge into a
    /// surface it was not already inside.
    ///
    /// Exactly one of `dx`, `dy` is non-zero and it is `±1`.
    pub fn blocked(&self, moved: Rect, dx: i32, dy: i32) -> bool {
        let entering = |x: i32, y: i32, side: Solidity| {
            self.solid(x, y, side) && !self.solid(x - dx, y - dy, side)
        };
        match (dx, dy) {
            (1, 0) => (moved.top..moved.bottom).any(|y| entering(moved.right - 1, y, Solidity::LEFT)),
            (-1, 0) => (moved.top..moved.bottom).any(|y| entering(moved.left, y, Solidity::RIGHT)),
            (0, 1) => (moved.left..moved.right).any(|x| entering(x, moved.bottom - 1, Solidity::TOP)),
            (0, -1) => (moved.left..moved.right).any(|x| entering(x, moved.top, Solidity::BOTTOM)),
            _ => false,
        }
    }

    /// Whether `rect` rests on a surface directly below it.
    pub fn supported(&self, rect: Rect) -> bool {
        self.blocked(rect.offset(0, 1), 0, 1)
    }

    /// Angle of the first surface under `rect`, scanning left to right.
    pub fn surface_angle(&self, rect: Rect) -> u8 {
        (rect.left..rect.right)
            .find(|x| {
                self.solid(*x, rect.bottom, Solidity::TOP)
                    && !self.solid(*x, rect.bottom - 1, Solidity::TOP)
            })
            .map_or(0, |x| self.stage.mask_at(x, rect.bottom).angle)
    }

    /// Whether any pixel of `rect` lies inside terrain solid on every side.
    ///
    /// One-way surfaces never embed; a box may pass through them.
    pub fn embedded(&self, rect: Rect) -> bool {
        if rect.right <= rect.left || rect.bottom <= rect.top {
            return false;
        }
        (rect.left..rect.right).any(|x| self.column_embedded(x, rect.top, rect.bottom))
    }

    /// Whether rows `[top, bottom)` of pixel column `x` reach a solid profile.
    fn column_embedded(&self, x: i32, top: i32, bottom: i32) -> bool {
        let col = x.rem_euclid(TILE) as usize;
        let (ty0, ty1) = (top.div_euclid(TILE), (bottom - 1).div_euclid(TILE));
        (ty0..=ty1).any(|ty| {
            let tile_top = ty * TILE;
            let mask = self.stage.mask_at(x, tile_top);
            if mask.solidity != Solidity::ALL {
                return false;
            }
            let solid_top = tile_top + mask.column_top(col);
            solid_top.max(top) < (tile_top + TILE).min(bottom)
        })
    }
}
