//! Event types for different topics.

use engine_core::{EngineState, LoopReport};
use serde::{Deserialize, Serialize};

/// Summary of one `run_ticks` or `advance` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEvent {
    /// Engine frame counter after the call.
    pub frame: u64,
    pub state: EngineState,
    pub ticks: u32,
    pub rendered: u32,
    pub dropped: u32,
    /// Hex SHA-256 of the state, when digests are enabled.
    pub digest: Option<String>,
}

impl FrameEvent {
    pub fn new(frame: u64, state: EngineState, report: LoopReport) -> Self {
        Self {
            frame,
            state,
            ticks: report.ticks,
            rendered: report.rendered,
            dropped: report.dropped,
            digest: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    StateChanged {
        from: EngineState,
        to: EngineState,
    },
    StageLoaded {
        index: usize,
        spawned: usize,
        dropped: usize,
    },
    /// The engine reached `EndGame`; further ticks are ignored.
    Finished { frame: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticEvent {
    ScriptFault {
        slot: Option<u16>,
        type_id: u16,
        code: String,
        message: String,
        function: u16,
        pc: usize,
    },
    PoolExhausted {
        capacity: usize,
        type_id: u16,
    },
    ScriptLog {
        slot: Option<u16>,
        value: i32,
    },
}
