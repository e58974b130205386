//! Fixed-timestep driver.
//!
//! Wall-clock time goes in, whole ticks come out. Rendering is decoupled from
//! ticking through the frame-skip setting, and a catch-up cap keeps a stalled
//! host from running an unbounded burst of ticks.

use core::time::Duration;

use crate::config::EngineConfig;

use super::Engine;

/// What one [`GameLoop::advance`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub ticks: u32,
    pub rendered: u32,
    /// Ticks discarded by the catch-up cap.
    pub dropped: u32,
}

#[derive(Clone, Debug)]
pub struct GameLoop {
    tick: Duration,
    accumulator: Duration,
    speed: u32,
    max_speed: u32,
    frame_skip: u32,
    max_catch_up: u32,
    since_render: u32,
    master_paused: bool,
    frame_step: bool,
}

impl GameLoop {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            tick: Duration::from_secs(1) / config.tick_rate.max(1),
            accumulator: Duration::ZERO,
            speed: 1,
            max_speed: config.fast_forward_speed.max(1),
            frame_skip: config.frame_skip,
            max_catch_up: config.max_catch_up_ticks.max(1),
            since_render: 0,
            master_paused: false,
            frame_step: false,
        }
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Game speed multiplier, clamped to `1..=fast_forward_speed`.
    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed.clamp(1, self.max_speed);
    }

    pub fn is_master_paused(&self) -> bool {
        self.master_paused
    }

    /// Stops ticking entirely, independent of the engine's own pause state.
    pub fn set_master_pause(&mut self, paused: bool) {
        self.master_paused = paused;
        self.accumulator = Duration::ZERO;
    }

    /// While master-paused, runs exactly one tick on the next `advance`.
    pub fn request_frame_step(&mut self) {
        self.frame_step = true;
    }

    /// Runs as many ticks as `elapsed` (scaled by game speed) covers.
    pub fn advance(&mut self, engine: &mut Engine, elapsed: Duration) -> LoopReport {
        let mut report = LoopReport::default();

        if self.master_paused {
            if core::mem::take(&mut self.frame_step) {
                self.tick_once(engine, &mut report);
            }
            return report;
        }

        self.accumulator += elapsed.saturating_mul(self.speed);
        let budget = self.max_catch_up.saturating_mul(self.speed);
        while self.accumulator >= self.tick && report.ticks < budget && !engine.is_finished() {
            self.accumulator -= self.tick;
            self.tick_once(engine, &mut report);
        }
        if engine.is_finished() {
            self.accumulator = Duration::ZERO;
        } else if self.accumulator >= self.tick {
            report.dropped = (self.accumulator.as_nanos() / self.tick.as_nanos().max(1)) as u32;
            self.accumulator = Duration::ZERO;
            tracing::warn!(dropped = report.dropped, "tick backlog dropped");
        }
        report
    }

    /// Runs `ticks` ticks back to back, ignoring wall-clock time.
    pub fn run_ticks(&mut self, engine: &mut Engine, ticks: u32) -> LoopReport {
        let mut report = LoopReport::default();
        for _ in 0..ticks {
            if engine.is_finished() {
                break;
            }
            self.tick_once(engine, &mut report);
        }
        report
    }

    fn tick_once(&mut self, engine: &mut Engine, report: &mut LoopReport) {
        let input = engine.services_mut().input.poll();
        engine.step(input);
        report.ticks += 1;

        self.since_render += 1;
        if self.since_render > self.frame_skip {
            self.since_render = 0;
            if engine.render().is_some() {
                report.rendered += 1;
            }
        }
    }
}
