//! Cloneable façade for issuing commands to the runtime.
//!
//! [`RuntimeHandle`] hides channel plumbing and offers async helpers for
//! stepping the simulation, sending host requests or streaming events from
//! specific topics.
use core::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use engine_core::services::Buttons;
use engine_core::{EngineSnapshot, EngineState, HostRequest, LoopReport};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Lightweight view of the worker's engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub frame: u64,
    pub frames_since_load: u64,
    pub state: EngineState,
    pub stage: Option<usize>,
    pub active_entities: usize,
    pub speed: u32,
    pub master_paused: bool,
}

/// Client-facing handle to interact with the runtime
#[derive(Clone)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    input_tx: watch::Sender<Buttons>,
    event_bus: EventBus,
}

impl RuntimeHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        input_tx: watch::Sender<Buttons>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            command_tx,
            input_tx,
            event_bus,
        }
    }

    async fn call<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Run `ticks` ticks back to back, ignoring wall-clock time.
    pub async fn run_ticks(&self, ticks: u32) -> Result<LoopReport> {
        self.call(|reply| Command::RunTicks { ticks, reply }).await
    }

    /// Feed elapsed wall-clock time to the fixed-timestep loop.
    pub async fn advance(&self, elapsed: Duration) -> Result<LoopReport> {
        self.call(|reply| Command::Advance { elapsed, reply }).await
    }

    /// Queue a host request for the start of the next tick.
    pub async fn request(&self, request: HostRequest) -> Result<()> {
        self.call(|reply| Command::Request { request, reply }).await??;
        Ok(())
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(HostRequest::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(HostRequest::Resume).await
    }

    pub async fn load_stage(&self, index: usize) -> Result<()> {
        self.request(HostRequest::LoadStage(index)).await
    }

    pub async fn quit(&self) -> Result<()> {
        self.request(HostRequest::Quit).await
    }

    /// Speed multiplier for [`advance`](Self::advance); returns the clamped value.
    pub async fn set_speed(&self, speed: u32) -> Result<u32> {
        self.call(|reply| Command::SetSpeed { speed, reply }).await
    }

    /// Stop (or restart) ticking without touching the engine's own state.
    pub async fn set_master_pause(&self, paused: bool) -> Result<()> {
        self.call(|reply| Command::SetMasterPause { paused, reply })
            .await
    }

    /// While master-paused, run exactly one tick on the next advance.
    pub async fn frame_step(&self) -> Result<()> {
        self.call(|reply| Command::FrameStep { reply }).await
    }

    pub async fn status(&self) -> Result<EngineStatus> {
        self.call(|reply| Command::Status { reply }).await
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    /// Snapshot encoded with bincode, suitable for writing to disk.
    pub async fn snapshot_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = self.snapshot().await?;
        bincode::serialize(&snapshot).map_err(RuntimeError::Snapshot)
    }

    /// SHA-256 of the simulation state.
    pub async fn digest(&self) -> Result<[u8; 32]> {
        self.call(|reply| Command::Digest { reply }).await
    }

    /// Buttons held from now on; sampled at the start of every tick.
    pub fn set_input(&self, held: Buttons) -> Result<()> {
        self.input_tx
            .send(held)
            .map_err(|_| RuntimeError::InputChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Frame` - one summary per run/advance call
    /// - `Topic::Engine` - state changes, stage loads, end of game
    /// - `Topic::Diagnostics` - script faults, pool exhaustion, script logs
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> std::collections::HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
