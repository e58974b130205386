//! Bridge from the engine's debug sink to the event bus.

use engine_core::services::{DebugEvent, DebugSink, TracingDebugSink};
use engine_core::EngineError;

use super::bus::{Event, EventBus};
use super::types::{DiagnosticEvent, EngineEvent};

/// Logs every engine diagnostic through `tracing` and republishes it on the bus.
#[derive(Clone)]
pub struct BusDebugSink {
    bus: EventBus,
}

impl BusDebugSink {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl DebugSink for BusDebugSink {
    fn report(&mut self, event: &DebugEvent) {
        TracingDebugSink.report(event);
        self.bus.publish(convert(event));
    }
}

fn convert(event: &DebugEvent) -> Event {
    match event {
        DebugEvent::ScriptFault {
            slot,
            type_id,
            error,
        } => Event::Diagnostic(DiagnosticEvent::ScriptFault {
            slot: slot.map(|slot| slot.0),
            type_id: type_id.0,
            code: error.error_code().to_string(),
            message: error.kind.to_string(),
            function: error.function.0,
            pc: error.pc,
        }),
        DebugEvent::PoolExhausted { capacity, type_id } => {
            Event::Diagnostic(DiagnosticEvent::PoolExhausted {
                capacity: *capacity,
                type_id: type_id.0,
            })
        }
        DebugEvent::ScriptLog { slot, value } => Event::Diagnostic(DiagnosticEvent::ScriptLog {
            slot: slot.map(|slot| slot.0),
            value: *value,
        }),
        DebugEvent::StateChanged { from, to } => Event::Engine(EngineEvent::StateChanged {
            from: *from,
            to: *to,
        }),
        DebugEvent::StageLoaded {
            index,
            spawned,
            dropped,
        } => Event::Engine(EngineEvent::StageLoaded {
            index: *index,
            spawned: *spawned,
            dropped: *dropped,
        }),
    }
}
