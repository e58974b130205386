use crate::config::EngineConfig;
use crate::fixed::Fixed;

/// How a layer scrolls relative to the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum ScrollAxis {
    #[default]
    Horizontal,
    Vertical,
    /// Never scrolls.
    Fixed,
}

/// Grid of 16x16 tiles. Tile id 0 is empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileLayer {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<u16>,
    pub axis: ScrollAxis,
    /// Fraction of camera movement applied to this layer.
    pub parallax: Fixed,
    /// Constant drift per tick.
    pub scroll_speed: Fixed,
}

impl TileLayer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![0; (width * height) as usize],
            axis: ScrollAxis::Horizontal,
            parallax: Fixed::ONE,
            scroll_speed: Fixed::ZERO,
        }
    }

    /// Tile at grid coordinates; outside the layer is `None`.
    pub fn tile(&self, tx: i32, ty: i32) -> Option<u16> {
        if tx < 0 || ty < 0 || tx >= self.width as i32 || ty >= self.height as i32 {
            return None;
        }
        self.tiles
            .get(ty as usize * self.width as usize + tx as usize)
            .copied()
    }

    pub fn set_tile(&mut self, tx: u32, ty: u32, tile: u16) {
        if tx < self.width && ty < self.height {
            self.tiles[(ty * self.width + tx) as usize] = tile;
        }
    }

    /// Tile under world pixel `(x, y)`.
    #[inline]
    pub fn tile_at(&self, x: i32, y: i32) -> Option<u16> {
        self.tile(
            x.div_euclid(EngineConfig::TILE_SIZE),
            y.div_euclid(EngineConfig::TILE_SIZE),
        )
    }

    pub fn pixel_width(&self) -> i32 {
        self.width as i32 * EngineConfig::TILE_SIZE
    }

    pub fn pixel_height(&self) -> i32 {
        self.height as i32 * EngineConfig::TILE_SIZE
    }

    /// Scroll position along the layer's axis for a camera position and tick count,
    /// wrapped to the layer size.
    pub fn scroll_offset(&self, camera_x: Fixed, camera_y: Fixed, frame: u64) -> Fixed {
        let (camera, span) = match self.axis {
            ScrollAxis::Horizontal => (camera_x, self.pixel_width()),
            ScrollAxis::Vertical => (camera_y, self.pixel_height()),
            ScrollAxis::Fixed => return Fixed::ZERO,
        };
        let drift = Fixed::from_raw(self.scroll_speed.raw().wrapping_mul(frame as i32));
        let offset = camera.mul(self.parallax) + drift;
        if span <= 0 {
            return offset;
        }
        Fixed::from_raw((offset.raw() as i64).rem_euclid((span as i64) << 16) as i32)
    }
}
