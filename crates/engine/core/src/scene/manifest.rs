//! Scene manifests: the authored description of one stage.
//!
//! Manifests name script functions and object types by string. Compiling a
//! manifest against a loaded [`Program`] resolves every name once, producing
//! a [`StageBlueprint`] the scene manager can instantiate any number of times.

use std::collections::HashSet;

use crate::collision::{CollisionBoxSet, Hitbox};
use crate::config::EngineConfig;
use crate::fixed::Fixed;
use crate::object::{ObjectType, ObjectTypeId, ScriptFunctionSet, TypeFlags, TypeRegistry};
use crate::script::{FunctionId, Program};

use super::error::SceneError;
use super::layer::{ScrollAxis, TileLayer};
use super::tiles::{MASK_COLUMNS, Solidity, TileMask, TileSet};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneManifest {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub object_types: Vec<ObjectTypeSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub layers: Vec<LayerSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub collision_layer: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tile_masks: Vec<TileMaskSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spawns: Vec<SpawnSpec>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ObjectTypeSpec {
    pub name: String,
    pub startup: Option<String>,
    pub main: Option<String>,
    pub player_interaction: Option<String>,
    pub draw: Option<String>,
    pub hitboxes: Vec<Hitbox>,
    pub player: bool,
    pub pause_exempt: bool,
    pub tile_collision: bool,
}

impl ObjectTypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Tile layer. `parallax` and `scroll_speed` are raw 16.16 values.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerSpec {
    pub width: u32,
    pub height: u32,
    pub tiles: Vec<u16>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub axis: ScrollAxis,
    #[cfg_attr(feature = "serde", serde(default = "unit_parallax"))]
    pub parallax: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scroll_speed: i32,
}

#[cfg(feature = "serde")]
fn unit_parallax() -> i32 {
    Fixed::ONE.raw()
}

impl Default for LayerSpec {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            tiles: Vec::new(),
            axis: ScrollAxis::Horizontal,
            parallax: Fixed::ONE.raw(),
            scroll_speed: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileMaskSpec {
    pub tile: u16,
    #[cfg_attr(feature = "serde", serde(default = "all_sides"))]
    pub solidity: Solidity,
    #[cfg_attr(feature = "serde", serde(default))]
    pub angle: u8,
    #[cfg_attr(feature = "serde", serde(default))]
    pub heights: Option<Vec<u8>>,
}

#[cfg(feature = "serde")]
fn all_sides() -> Solidity {
    Solidity::ALL
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpawnSpec {
    pub object: String,
    pub x: i32,
    pub y: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub subtype: i32,
}

/// Placement of an entity at stage load. Coordinates are whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnPoint {
    pub type_id: ObjectTypeId,
    pub x: i32,
    pub y: i32,
    pub subtype: i32,
}

/// A validated stage with every name resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageBlueprint {
    pub name: String,
    pub registry: TypeRegistry,
    pub layers: Vec<TileLayer>,
    pub collision_layer: Option<usize>,
    pub tiles: TileSet,
    pub spawns: Vec<SpawnPoint>,
}

impl StageBlueprint {
    pub fn compile(manifest: &SceneManifest, program: &Program) -> Result<Self, SceneError> {
        let registry = compile_registry(manifest, program)?;

        if manifest.layers.len() > EngineConfig::MAX_LAYERS {
            return Err(SceneError::TooManyLayers {
                count: manifest.layers.len(),
                max: EngineConfig::MAX_LAYERS,
            });
        }
        let layers = manifest
            .layers
            .iter()
            .enumerate()
            .map(|(index, spec)| compile_layer(index, spec))
            .collect::<Result<Vec<_>, _>>()?;

        let collision_layer = if layers.is_empty() {
            None
        } else if manifest.collision_layer < layers.len() {
            Some(manifest.collision_layer)
        } else {
            return Err(SceneError::InvalidCollisionLayer {
                index: manifest.collision_layer,
                layers: layers.len(),
            });
        };

        let mut tiles = TileSet::new();
        for spec in &manifest.tile_masks {
            tiles.set(spec.tile, compile_mask(spec)?);
        }

        let spawns = manifest
            .spawns
            .iter()
            .map(|spawn| {
                let type_id =
                    registry
                        .by_name(&spawn.object)
                        .ok_or_else(|| SceneError::UnknownObjectType {
                            name: spawn.object.clone(),
                        })?;
                if Fixed::checked_from_int(spawn.x).is_none()
                    || Fixed::checked_from_int(spawn.y).is_none()
                {
                    return Err(SceneError::SpawnOutOfRange {
                        object: spawn.object.clone(),
                        x: spawn.x,
                        y: spawn.y,
                        max: Fixed::MAX_INT,
                    });
                }
                Ok(SpawnPoint {
                    type_id,
                    x: spawn.x,
                    y: spawn.y,
                    subtype: spawn.subtype,
                })
            })
            .collect::<Result<Vec<_>, SceneError>>()?;

        Ok(Self {
            name: manifest.name.clone(),
            registry,
            layers,
            collision_layer,
            tiles,
            spawns,
        })
    }
}

fn compile_registry(manifest: &SceneManifest, program: &Program) -> Result<TypeRegistry, SceneError> {
    let mut registry = TypeRegistry::new();
    let mut seen = HashSet::new();

    for spec in &manifest.object_types {
        if !seen.insert(spec.name.as_str()) || registry.by_name(&spec.name).is_some() {
            return Err(SceneError::DuplicateType {
                name: spec.name.clone(),
            });
        }

        let resolve = |name: &Option<String>| -> Result<Option<FunctionId>, SceneError> {
            match name {
                None => Ok(None),
                Some(function) => program.function_by_name(function).map(Some).ok_or_else(|| {
                    SceneError::UnknownFunction {
                        object: spec.name.clone(),
                        function: function.clone(),
                    }
                }),
            }
        };
        let functions = ScriptFunctionSet {
            startup: resolve(&spec.startup)?,
            main: resolve(&spec.main)?,
            player_interaction: resolve(&spec.player_interaction)?,
            draw: resolve(&spec.draw)?,
        };

        if spec.hitboxes.len() > EngineConfig::MAX_HITBOXES {
            return Err(SceneError::TooManyHitboxes {
                object: spec.name.clone(),
                count: spec.hitboxes.len(),
                max: EngineConfig::MAX_HITBOXES,
            });
        }
        let hitboxes: CollisionBoxSet = spec.hitboxes.iter().copied().collect();

        let mut flags = TypeFlags::empty();
        flags.set(TypeFlags::PLAYER, spec.player);
        flags.set(TypeFlags::PAUSE_EXEMPT, spec.pause_exempt);
        flags.set(TypeFlags::TILE_COLLISION, spec.tile_collision);

        registry
            .register(ObjectType {
                name: spec.name.clone(),
                functions,
                hitboxes,
                flags,
            })
            .ok_or(SceneError::TooManyTypes {
                max: EngineConfig::MAX_OBJECT_TYPES,
            })?;
    }

    Ok(registry)
}

fn compile_layer(index: usize, spec: &LayerSpec) -> Result<TileLayer, SceneError> {
    let max_tiles = (Fixed::MAX_INT / EngineConfig::TILE_SIZE) as u32;
    if spec.width > max_tiles || spec.height > max_tiles {
        return Err(SceneError::LayerTooLarge {
            layer: index,
            width: spec.width,
            height: spec.height,
            max: Fixed::MAX_INT,
        });
    }
    let expected = spec.width as usize * spec.height as usize;
    if spec.tiles.len() != expected {
        return Err(SceneError::LayerSizeMismatch {
            layer: index,
            expected,
            found: spec.tiles.len(),
        });
    }
    Ok(TileLayer {
        width: spec.width,
        height: spec.height,
        tiles: spec.tiles.clone(),
        axis: spec.axis,
        parallax: Fixed::from_raw(spec.parallax),
        scroll_speed: Fixed::from_raw(spec.scroll_speed),
    })
}

fn compile_mask(spec: &TileMaskSpec) -> Result<TileMask, SceneError> {
    let heights = match &spec.heights {
        None => None,
        Some(profile) => {
            let columns: [u8; MASK_COLUMNS] =
                profile
                    .as_slice()
                    .try_into()
                    .map_err(|_| SceneError::InvalidHeightProfile {
                        tile: spec.tile,
                        len: profile.len(),
                    })?;
            Some(columns.map(|h| h.min(MASK_COLUMNS as u8)))
        }
    };
    Ok(TileMask {
        solidity: spec.solidity,
        angle: spec.angle,
        heights,
    })
}
