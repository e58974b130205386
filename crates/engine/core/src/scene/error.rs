use crate::error::{EngineError, ErrorSeverity};

/// Errors raised while compiling a scene manifest or selecting a stage.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("object type \"{object}\" references undefined function \"{function}\"")]
    UnknownFunction { object: String, function: String },

    #[error("object type \"{name}\" declared twice")]
    DuplicateType { name: String },

    #[error("more than {max} object types")]
    TooManyTypes { max: usize },

    #[error("object type \"{object}\" declares {count} hitboxes, at most {max} allowed")]
    TooManyHitboxes {
        object: String,
        count: usize,
        max: usize,
    },

    #[error("spawn point references unknown object type \"{name}\"")]
    UnknownObjectType { name: String },

    #[error("spawn of \"{object}\" at ({x}, {y}) is outside the fixed-point range of ±{max}")]
    SpawnOutOfRange {
        object: String,
        x: i32,
        y: i32,
        max: i32,
    },

    #[error("layer {layer} spans {width}x{height} tiles, more than {max} pixels on a side")]
    LayerTooLarge {
        layer: usize,
        width: u32,
        height: u32,
        max: i32,
    },

    #[error("{count} layers exceeds the limit of {max}")]
    TooManyLayers { count: usize, max: usize },

    #[error("layer {layer} holds {found} tiles, {expected} expected")]
    LayerSizeMismatch {
        layer: usize,
        expected: usize,
        found: usize,
    },

    #[error("collision layer {index} out of range ({layers} layers)")]
    InvalidCollisionLayer { index: usize, layers: usize },

    #[error("tile {tile} height profile has {len} columns, 16 expected")]
    InvalidHeightProfile { tile: u16, len: usize },

    #[error("stage {index} does not exist ({count} stages)")]
    UnknownStage { index: usize, count: usize },
}

impl EngineError for SceneError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            SceneError::UnknownStage { .. } => ErrorSeverity::Validation,
            _ => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        use SceneError::*;
        match self {
            UnknownFunction { .. } => "SCENE_UNKNOWN_FUNCTION",
            DuplicateType { .. } => "SCENE_DUPLICATE_TYPE",
            TooManyTypes { .. } => "SCENE_TOO_MANY_TYPES",
            TooManyHitboxes { .. } => "SCENE_TOO_MANY_HITBOXES",
            UnknownObjectType { .. } => "SCENE_UNKNOWN_OBJECT_TYPE",
            SpawnOutOfRange { .. } => "SCENE_SPAWN_OUT_OF_RANGE",
            LayerTooLarge { .. } => "SCENE_LAYER_TOO_LARGE",
            TooManyLayers { .. } => "SCENE_TOO_MANY_LAYERS",
            LayerSizeMismatch { .. } => "SCENE_LAYER_SIZE_MISMATCH",
            InvalidCollisionLayer { .. } => "SCENE_INVALID_COLLISION_LAYER",
            InvalidHeightProfile { .. } => "SCENE_INVALID_HEIGHT_PROFILE",
            UnknownStage { .. } => "SCENE_UNKNOWN_STAGE",
        }
    }
}
