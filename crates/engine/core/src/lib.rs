//! Deterministic core of a 2D platformer engine.
//!
//! `engine-core` owns the simulation: the bytecode [`script`] interpreter,
//! the fixed-capacity [`object`] pool, [`scene`] data, tile [`collision`] and
//! the [`engine`] state machine with its fixed-timestep driver. It performs no
//! I/O; drawing, audio, input and persistence are reached through the
//! collaborator traits in [`services`]. All state mutation flows through
//! [`Engine::step`], so the same program, stages and input always produce the
//! same [`Engine::digest`].
pub mod collision;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod object;
pub mod rng;
pub mod scene;
pub mod script;
pub mod services;

pub use collision::{
    BoxKind, CollisionBoxSet, CollisionEngine, CollisionReport, Hitbox, OverlapMode, Rect,
    STEP_HEIGHT, overlaps,
};
pub use config::EngineConfig;
pub use engine::{
    Engine, EngineSnapshot, EngineState, GameLoop, HostRequest, LoopReport, TickReport,
};
pub use error::{EngineError, ErrorSeverity};
pub use fixed::{Fixed, atan2, cos512, sin512};
pub use object::{
    CommitReport, EntityFlags, ObjectEntity, ObjectManager, ObjectPool, ObjectType, ObjectTypeId,
    PoolError, ScriptFunctionSet, SlotId, TypeFlags, TypeRegistry, UpdateReport,
};
pub use rng::PcgRng;
pub use scene::{SceneError, SceneManager, SceneManifest, Stage, StageBlueprint};
pub use script::{
    Assembler, BytecodeError, FunctionId, Opcode, OpcodeRevision, Program, ScriptEngine,
    ScriptRuntimeError,
};
pub use services::{DebugEvent, DebugSink, InputSnapshot, Services};

/// Content that cannot be turned into a running engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("bytecode rejected: {0}")]
    Bytecode(#[from] BytecodeError),

    #[error("stage rejected: {0}")]
    Scene(#[from] SceneError),
}

impl EngineError for LoadError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            LoadError::Bytecode(inner) => inner.error_code(),
            LoadError::Scene(inner) => inner.error_code(),
        }
    }
}
