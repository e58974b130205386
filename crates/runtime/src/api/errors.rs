//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination and engine requests so clients can
//! bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use engine_core::SceneError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("simulation worker command channel closed")]
    CommandChannelClosed,

    #[error("simulation worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("simulation worker input channel closed")]
    InputChannelClosed,

    #[error("simulation worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("runtime requires an engine before building")]
    MissingEngine,

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("snapshot encoding failed")]
    Snapshot(#[source] bincode::Error),
}
