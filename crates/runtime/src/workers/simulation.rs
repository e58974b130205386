//! Simulation worker that owns the authoritative [`Engine`].
//!
//! Receives commands from [`RuntimeHandle`](crate::RuntimeHandle), drives the
//! fixed-timestep [`GameLoop`], and publishes frame summaries to the EventBus.
//! Engine diagnostics reach the bus through the engine's own debug sink.

use core::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use engine_core::{Engine, EngineSnapshot, GameLoop, HostRequest, LoopReport};

use crate::api::{EngineStatus, Result};
use crate::events::{EngineEvent, Event, EventBus, FrameEvent};

/// Commands that can be sent to the simulation worker
pub enum Command {
    /// Run a fixed number of ticks regardless of wall-clock time.
    RunTicks {
        ticks: u32,
        reply: oneshot::Sender<LoopReport>,
    },
    /// Feed elapsed wall-clock time to the fixed-timestep loop.
    Advance {
        elapsed: Duration,
        reply: oneshot::Sender<LoopReport>,
    },
    /// Queue a host request; stage indices are validated immediately.
    Request {
        request: HostRequest,
        reply: oneshot::Sender<Result<()>>,
    },
    SetSpeed {
        speed: u32,
        reply: oneshot::Sender<u32>,
    },
    SetMasterPause {
        paused: bool,
        reply: oneshot::Sender<()>,
    },
    FrameStep { reply: oneshot::Sender<()> },
    Status { reply: oneshot::Sender<EngineStatus> },
    Snapshot { reply: oneshot::Sender<EngineSnapshot> },
    Digest { reply: oneshot::Sender<[u8; 32]> },
}

/// Background task that processes engine commands.
pub struct SimulationWorker {
    engine: Engine,
    game_loop: GameLoop,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    publish_digests: bool,
    finished_reported: bool,
}

impl SimulationWorker {
    pub fn new(
        engine: Engine,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        publish_digests: bool,
    ) -> Self {
        let game_loop = GameLoop::new(engine.config());
        info!(
            stage = ?engine.scenes().current_index(),
            active = engine.active_entities().count(),
            tick = ?game_loop.tick_duration(),
            "SimulationWorker initialized"
        );

        Self {
            engine,
            game_loop,
            command_rx,
            event_bus,
            publish_digests,
            finished_reported: false,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    self.handle_command(cmd);
                }
                else => break,
            }
        }
        info!(frame = self.engine.frame(), "SimulationWorker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::RunTicks { ticks, reply } => {
                let report = self.game_loop.run_ticks(&mut self.engine, ticks);
                self.publish_frame(report);
                if reply.send(report).is_err() {
                    debug!("RunTicks reply channel closed (caller dropped)");
                }
            }
            Command::Advance { elapsed, reply } => {
                let report = self.game_loop.advance(&mut self.engine, elapsed);
                self.publish_frame(report);
                if reply.send(report).is_err() {
                    debug!("Advance reply channel closed (caller dropped)");
                }
            }
            Command::Request { request, reply } => {
                let result = self.engine.request(request).map_err(Into::into);
                if reply.send(result).is_err() {
                    debug!("Request reply channel closed (caller dropped)");
                }
            }
            Command::SetSpeed { speed, reply } => {
                self.game_loop.set_speed(speed);
                if reply.send(self.game_loop.speed()).is_err() {
                    debug!("SetSpeed reply channel closed (caller dropped)");
                }
            }
            Command::SetMasterPause { paused, reply } => {
                self.game_loop.set_master_pause(paused);
                if reply.send(()).is_err() {
                    debug!("SetMasterPause reply channel closed (caller dropped)");
                }
            }
            Command::FrameStep { reply } => {
                self.game_loop.request_frame_step();
                if reply.send(()).is_err() {
                    debug!("FrameStep reply channel closed (caller dropped)");
                }
            }
            Command::Status { reply } => {
                if reply.send(self.status()).is_err() {
                    debug!("Status reply channel closed (caller dropped)");
                }
            }
            Command::Snapshot { reply } => {
                if reply.send(self.engine.snapshot()).is_err() {
                    debug!("Snapshot reply channel closed (caller dropped)");
                }
            }
            Command::Digest { reply } => {
                if reply.send(self.engine.digest()).is_err() {
                    debug!("Digest reply channel closed (caller dropped)");
                }
            }
        }
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            frame: self.engine.frame(),
            frames_since_load: self.engine.frames_since_load(),
            state: self.engine.state(),
            stage: self.engine.scenes().current_index(),
            active_entities: self.engine.active_entities().count(),
            speed: self.game_loop.speed(),
            master_paused: self.game_loop.is_master_paused(),
        }
    }

    fn publish_frame(&mut self, report: LoopReport) {
        let mut event = FrameEvent::new(self.engine.frame(), self.engine.state(), report);
        if self.publish_digests {
            event.digest = Some(hex::encode(self.engine.digest()));
        }
        self.event_bus.publish(Event::Frame(event));

        if self.engine.is_finished() && !self.finished_reported {
            self.finished_reported = true;
            info!(frame = self.engine.frame(), "engine finished");
            self.event_bus.publish(Event::Engine(EngineEvent::Finished {
                frame: self.engine.frame(),
            }));
        }
    }
}
