use crate::config::EngineConfig;
use crate::fixed::Fixed;

use super::layer::TileLayer;
use super::manifest::{SpawnPoint, StageBlueprint};
use super::tiles::{TileMask, TileSet};

/// The instantiated current stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    pub index: usize,
    pub name: String,
    pub layers: Vec<TileLayer>,
    pub collision_layer: Option<usize>,
    pub tiles: TileSet,
    pub spawns: Vec<SpawnPoint>,
    /// Scene-scoped script variables, zeroed on every load.
    pub vars: [i32; EngineConfig::SCENE_VARS],
    pub camera_x: Fixed,
    pub camera_y: Fixed,
}

impl Stage {
    pub fn from_blueprint(index: usize, blueprint: &StageBlueprint) -> Self {
        Self {
            index,
            name: blueprint.name.clone(),
            layers: blueprint.layers.clone(),
            collision_layer: blueprint.collision_layer,
            tiles: blueprint.tiles.clone(),
            spawns: blueprint.spawns.clone(),
            vars: [0; EngineConfig::SCENE_VARS],
            camera_x: Fixed::ZERO,
            camera_y: Fixed::ZERO,
        }
    }

    pub fn layer(&self, index: usize) -> Option<&TileLayer> {
        self.layers.get(index)
    }

    /// Tile id at world pixel `(x, y)` of `layer`. `None` when outside the layer.
    pub fn tile_at(&self, layer: usize, x: i32, y: i32) -> Option<u16> {
        self.layers.get(layer)?.tile_at(x, y)
    }

    /// Collision mask under world pixel `(x, y)`; empty outside the collision layer.
    pub fn mask_at(&self, x: i32, y: i32) -> &TileMask {
        let tile = self
            .collision_layer
            .and_then(|layer| self.tile_at(layer, x, y))
            .unwrap_or(0);
        self.tiles.mask(tile)
    }

    pub fn set_camera(&mut self, x: Fixed, y: Fixed) {
        self.camera_x = x;
        self.camera_y = y;
    }

    /// Scroll position of `layer` at tick `frame`.
    pub fn scroll_offset(&self, layer: usize, frame: u64) -> Option<Fixed> {
        self.layers
            .get(layer)
            .map(|l| l.scroll_offset(self.camera_x, self.camera_y, frame))
    }
}
