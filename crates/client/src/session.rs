//! Drives a running engine to completion.

use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use engine_core::{Engine, EngineState};
use runtime::{
    DiagnosticEvent, EngineEvent, EngineStatus, Event, Runtime, RuntimeConfig, RuntimeHandle,
    Topic,
};

/// Ticks per `run_ticks` call in headless mode.
const HEADLESS_CHUNK: u32 = 60;

/// Where a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub status: EngineStatus,
    pub digest: Option<String>,
    pub globals: Vec<i32>,
}

pub struct Session {
    runtime: Runtime,
    handle: RuntimeHandle,
    tick: Duration,
    logger: JoinHandle<()>,
}

impl Session {
    /// Starts the runtime. Must be called inside a tokio runtime.
    pub fn start(engine: Engine, digests: bool) -> Result<Self> {
        let tick = Duration::from_secs(1) / engine.config().tick_rate.max(1);
        let runtime = Runtime::builder()
            .config(RuntimeConfig {
                publish_digests: digests,
                ..RuntimeConfig::default()
            })
            .engine(engine)
            .build()?;
        let handle = runtime.handle();
        let logger = spawn_event_logger(&handle);

        Ok(Self {
            runtime,
            handle,
            tick,
            logger,
        })
    }

    pub fn handle(&self) -> &RuntimeHandle {
        &self.handle
    }

    /// Runs up to `ticks` ticks as fast as possible, stopping early at `EndGame`.
    pub async fn run_headless(&self, ticks: u32) -> Result<()> {
        let mut remaining = ticks;
        while remaining > 0 {
            let chunk = remaining.min(HEADLESS_CHUNK);
            let report = self.handle.run_ticks(chunk).await?;
            remaining -= chunk;
            if report.ticks < chunk || self.handle.status().await?.state == EngineState::EndGame {
                break;
            }
        }
        Ok(())
    }

    /// Runs in real time until the game ends or Ctrl-C.
    pub async fn run_realtime(&self) -> Result<()> {
        let mut interval = tokio::time::interval(self.tick);
        let mut last = Instant::now();
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = Instant::now();
                    let report = self.handle.advance(now - last).await?;
                    last = now;
                    if report.dropped > 0 {
                        tracing::warn!(dropped = report.dropped, "host fell behind");
                    }
                    if self.handle.status().await?.state == EngineState::EndGame {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupted");
                    self.handle.quit().await?;
                    self.handle.run_ticks(1).await?;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Collects the final status and stops the runtime.
    pub async fn finish(self, digest: bool) -> Result<SessionSummary> {
        let status = self.handle.status().await?;
        let snapshot = self.handle.snapshot().await?;
        let digest = digest.then(|| hex::encode(snapshot.digest()));
        let summary = SessionSummary {
            status,
            digest,
            globals: snapshot.globals,
        };

        drop(self.handle);
        self.runtime.shutdown().await?;
        if let Err(err) = self.logger.await {
            tracing::debug!(error = %err, "event logger ended abnormally");
        }
        Ok(summary)
    }
}

/// Logs engine and diagnostic events until the bus closes.
fn spawn_event_logger(handle: &RuntimeHandle) -> JoinHandle<()> {
    let mut engine_rx = handle.subscribe(Topic::Engine);
    let mut diagnostics_rx = handle.subscribe(Topic::Diagnostics);
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = engine_rx.recv() => event,
                event = diagnostics_rx.recv() => event,
            };
            match event {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &Event) {
    match event {
        Event::Engine(EngineEvent::StageLoaded {
            index,
            spawned,
            dropped,
        }) => tracing::info!(index, spawned, dropped, "stage loaded"),
        Event::Engine(EngineEvent::StateChanged { from, to }) => {
            tracing::info!(%from, %to, "engine state")
        }
        Event::Engine(EngineEvent::Finished { frame }) => tracing::info!(frame, "game over"),
        Event::Diagnostic(DiagnosticEvent::ScriptFault { code, message, .. }) => {
            tracing::error!(code = %code, message = %message, "script fault")
        }
        Event::Diagnostic(DiagnosticEvent::PoolExhausted { capacity, type_id }) => {
            tracing::warn!(capacity, type_id, "spawn dropped")
        }
        Event::Diagnostic(DiagnosticEvent::ScriptLog { slot, value }) => {
            tracing::debug!(?slot, value, "script log")
        }
        Event::Frame(_) => {}
    }
}
