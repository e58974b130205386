use crate::engine::EngineState;
use crate::error::EngineError;
use crate::object::{ObjectTypeId, SlotId};
use crate::script::ScriptRuntimeError;

use super::DebugSink;

/// Diagnostics raised by the engine while it keeps running.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DebugEvent {
    /// A script invocation aborted; the entity (if any) is frozen.
    ScriptFault {
        slot: Option<SlotId>,
        type_id: ObjectTypeId,
        error: ScriptRuntimeError,
    },
    /// A spawn was dropped because every slot is in use.
    PoolExhausted {
        capacity: usize,
        type_id: ObjectTypeId,
    },
    /// Value emitted by the `Log` intrinsic.
    ScriptLog { slot: Option<SlotId>, value: i32 },
    StateChanged { from: EngineState, to: EngineState },
    StageLoaded {
        index: usize,
        spawned: usize,
        dropped: usize,
    },
}

/// Writes every event through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDebugSink;

impl DebugSink for TracingDebugSink {
    fn report(&mut self, event: &DebugEvent) {
        match event {
            DebugEvent::ScriptFault {
                slot,
                type_id,
                error,
            } => tracing::error!(
                slot = ?slot,
                type_id = type_id.0,
                code = error.error_code(),
                error = %error,
                "script fault"
            ),
            DebugEvent::PoolExhausted { capacity, type_id } => tracing::warn!(
                capacity,
                type_id = type_id.0,
                "object pool exhausted, spawn dropped"
            ),
            DebugEvent::ScriptLog { slot, value } => {
                tracing::debug!(slot = ?slot, value, "script log")
            }
            DebugEvent::StateChanged { from, to } => {
                tracing::info!(%from, %to, "engine state changed")
            }
            DebugEvent::StageLoaded {
                index,
                spawned,
                dropped,
            } => tracing::info!(stage = index, spawned, dropped, "stage loaded"),
        }
    }
}
