//! Stage data: tile layers, collision masks, manifests and the scene manager.

mod error;
mod layer;
mod manager;
mod manifest;
mod stage;
mod tiles;

pub use error::SceneError;
pub use layer::{ScrollAxis, TileLayer};
pub use manager::{SceneManager, SpawnSummary};
pub use manifest::{
    LayerSpec, ObjectTypeSpec, SceneManifest, SpawnPoint, SpawnSpec, StageBlueprint, TileMaskSpec,
};
pub use stage::Stage;
pub use tiles::{MASK_COLUMNS, Solidity, TileMask, TileSet};
