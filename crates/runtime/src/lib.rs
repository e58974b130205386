//! Async host for the deterministic engine.
//!
//! One [`engine_core::Engine`] lives inside a simulation worker running on a
//! tokio task. Consumers never touch it directly: they drive it through a
//! cloneable [`RuntimeHandle`] (commands with oneshot replies) and observe it
//! through the topic-based [`EventBus`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides the topic-based event bus and the debug-sink bridge
//! - [`input`] feeds host input into the worker's engine
//! - `workers` keeps the background task internal to the crate
pub mod api;
pub mod events;
pub mod input;
pub mod runtime;

mod workers;

pub use api::{EngineStatus, Result, RuntimeError, RuntimeHandle};
pub use events::{
    BusDebugSink, DiagnosticEvent, EngineEvent, Event, EventBus, FrameEvent, Topic,
};
pub use input::SharedInput;
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
