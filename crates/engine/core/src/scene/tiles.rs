//! Tile collision masks.

use crate::config::EngineConfig;

bitflags::bitflags! {
    /// Sides of a tile that block movement into it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Solidity: u8 {
        /// Blocks entities moving down onto the tile.
        const TOP = 1 << 0;
        /// Blocks entities moving up into the tile.
        const BOTTOM = 1 << 1;
        /// Blocks entities moving right into the tile.
        const LEFT = 1 << 2;
        /// Blocks entities moving left into the tile.
        const RIGHT = 1 << 3;
        const ALL = Self::TOP.bits() | Self::BOTTOM.bits() | Self::LEFT.bits() | Self::RIGHT.bits();
    }
}

/// Columns in a height profile.
pub const MASK_COLUMNS: usize = EngineConfig::TILE_SIZE as usize;

/// Collision shape of one tile id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileMask {
    pub solidity: Solidity,
    /// Surface angle in 256ths of a turn, fed to entities standing on it.
    pub angle: u8,
    /// Per column, the number of empty pixels above the surface. `None` is a full block.
    pub heights: Option<[u8; MASK_COLUMNS]>,
}

impl TileMask {
    pub const EMPTY: TileMask = TileMask {
        solidity: Solidity::empty(),
        angle: 0,
        heights: None,
    };

    pub const fn block() -> Self {
        Self {
            solidity: Solidity::ALL,
            angle: 0,
            heights: None,
        }
    }

    pub const fn slope(heights: [u8; MASK_COLUMNS], angle: u8) -> Self {
        Self {
            solidity: Solidity::ALL,
            angle,
            heights: Some(heights),
        }
    }

    /// Solid rows `[top, 16)` of column `col` (0..16), relative to the tile top.
    #[inline]
    pub fn column_top(&self, col: usize) -> i32 {
        match &self.heights {
            Some(heights) => heights[col.min(MASK_COLUMNS - 1)] as i32,
            None => 0,
        }
    }

    /// Solid on every side with no height profile.
    pub fn is_full_block(&self) -> bool {
        self.solidity == Solidity::ALL && self.heights.is_none()
    }
}

/// Masks indexed by tile id. Ids without a mask are empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TileSet {
    masks: Vec<TileMask>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, tile: u16, mask: TileMask) {
        let index = tile as usize;
        if self.masks.len() <= index {
            self.masks.resize(index + 1, TileMask::EMPTY);
        }
        self.masks[index] = mask;
    }

    pub fn mask(&self, tile: u16) -> &TileMask {
        self.masks.get(tile as usize).unwrap_or(&TileMask::EMPTY)
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}
