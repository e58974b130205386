//! The engine context: one value owning every subsystem.
//!
//! [`Engine::step`] runs exactly one simulation tick: host requests, the
//! state machine, the entity update passes, collision, camera and the stage
//! transition check. Rendering is separate ([`Engine::render`]) so the game
//! loop can skip frames without skipping ticks.

mod snapshot;
mod state;
mod timestep;

pub use snapshot::EngineSnapshot;
pub use state::{EngineState, HostRequest};
pub use timestep::{GameLoop, LoopReport};

use crate::collision::{CollisionEngine, CollisionReport};
use crate::config::EngineConfig;
use crate::fixed::Fixed;
use crate::object::{ObjectEntity, ObjectManager, SlotId, UpdateContext, UpdateReport};
use crate::scene::{SceneError, SceneManager, SceneManifest, Stage, StageBlueprint};
use crate::script::{Program, ScriptEngine, ScriptLimits, ScriptRequests};
use crate::services::{DebugEvent, InputSnapshot, Services};
use crate::LoadError;

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    pub state: EngineState,
    /// `None` when the state machine froze the simulation.
    pub update: Option<UpdateReport>,
    pub collision: Option<CollisionReport>,
    /// Stage loaded at the end of this tick.
    pub stage_loaded: Option<usize>,
}

impl TickReport {
    pub fn simulated(&self) -> bool {
        self.update.is_some()
    }
}

pub struct Engine {
    config: EngineConfig,
    scripts: ScriptEngine,
    objects: ObjectManager,
    scenes: SceneManager,
    collision: CollisionEngine,
    services: Services,
    state: EngineState,
    wait_remaining: u32,
    frame: u64,
    frames_since_load: u64,
    requests: Vec<HostRequest>,
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("frame", &self.frame)
            .field("stage", &self.scenes.current_index())
            .field("active", &self.objects.pool().active().len())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Wires an already validated program and stage catalog. No stage is loaded yet.
    pub fn new(
        config: EngineConfig,
        program: Program,
        catalog: Vec<StageBlueprint>,
        services: Services,
    ) -> Self {
        let limits = ScriptLimits::from_config(&config);
        Self {
            scripts: ScriptEngine::new(program, limits, config.rng_seed),
            objects: ObjectManager::new(config.effective_pool_capacity()),
            scenes: SceneManager::new(catalog),
            collision: CollisionEngine::new(),
            services,
            state: EngineState::MainGame,
            wait_remaining: 0,
            frame: 0,
            frames_since_load: 0,
            requests: Vec::new(),
            config,
        }
    }

    /// Decodes bytecode, compiles every manifest against it and loads the first stage.
    pub fn load(
        config: EngineConfig,
        bytecode: &[u8],
        manifests: &[SceneManifest],
        services: Services,
    ) -> Result<Self, LoadError> {
        let program = Program::load(bytecode, config.opcode_revision)?;
        let catalog = manifests
            .iter()
            .map(|manifest| StageBlueprint::compile(manifest, &program))
            .collect::<Result<Vec<_>, SceneError>>()?;
        tracing::info!(
            functions = program.functions().len(),
            stages = catalog.len(),
            revision = %config.opcode_revision,
            "engine content loaded"
        );

        let mut engine = Self::new(config, program, catalog, services);
        if engine.scenes.stage_count() > 0 {
            engine.load_stage(0)?;
        }
        Ok(engine)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn frames_since_load(&self) -> u64 {
        self.frames_since_load
    }

    pub fn scripts(&self) -> &ScriptEngine {
        &self.scripts
    }

    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn stage(&self) -> Option<&Stage> {
        self.scenes.current()
    }

    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    /// Active entities in update order, (draw layer, slot).
    pub fn active_entities(&self) -> impl Iterator<Item = (SlotId, &ObjectEntity)> + '_ {
        self.objects.pool().iter_active()
    }

    pub fn entity(&self, slot: SlotId) -> Option<&ObjectEntity> {
        self.objects.pool().get(slot)
    }

    pub fn is_finished(&self) -> bool {
        self.state == EngineState::EndGame
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            frame: self.frame,
            frames_since_load: self.frames_since_load,
            state: self.state,
            stage: self.scenes.current_index(),
            globals: self.scripts.globals().to_vec(),
            scene_vars: self
                .scenes
                .current()
                .map(|stage| stage.vars.to_vec())
                .unwrap_or_default(),
            rng: *self.scripts.rng(),
            entities: self
                .active_entities()
                .map(|(slot, entity)| (slot, entity.clone()))
                .collect(),
        }
    }

    /// SHA-256 of [`Engine::snapshot`].
    pub fn digest(&self) -> [u8; 32] {
        self.snapshot().digest()
    }

    // ========================================================================
    // Host control
    // ========================================================================

    /// Queues a request for the start of the next tick.
    ///
    /// Stage indices are checked immediately.
    pub fn request(&mut self, request: HostRequest) -> Result<(), SceneError> {
        if let HostRequest::LoadStage(index) = request {
            self.scenes.blueprint(index)?;
        }
        self.requests.push(request);
        Ok(())
    }

    pub fn pause(&mut self) {
        self.requests.push(HostRequest::Pause);
    }

    pub fn resume(&mut self) {
        self.requests.push(HostRequest::Resume);
    }

    /// Reloads the current stage from its blueprint.
    pub fn reset_stage(&mut self) -> Result<(), LoadError> {
        let index = self.scenes.current_index().unwrap_or(0);
        self.load_stage(index)
    }

    /// Tears down the current stage and loads `index`.
    ///
    /// Flushes every entity, installs the stage's types, zeroes scene vars,
    /// reseeds the RNG, runs each type's startup once and expands spawn points.
    pub fn load_stage(&mut self, index: usize) -> Result<(), LoadError> {
        self.scenes.blueprint(index)?;
        self.scenes.unload(self.objects.pool_mut());
        let registry = self.scenes.activate(index)?;
        self.objects.install_registry(registry);
        self.scripts.reseed(self.config.rng_seed);
        self.frames_since_load = 0;

        let input = InputSnapshot::default();
        let mut requests = ScriptRequests::default();
        let stage_count = self.scenes.stage_count();
        let startup = self.objects.run_startup(
            &mut self.scripts,
            UpdateContext {
                stage: self.scenes.current_mut(),
                stage_count,
                services: &mut self.services,
                input: &input,
                requests: &mut requests,
                camera: (Fixed::ZERO, Fixed::ZERO),
                paused: false,
            },
        );

        let (registry, pool) = self.objects.split_mut();
        let spawns = self
            .scenes
            .expand_spawns(registry, pool, self.services.debug.as_mut());
        self.objects.refresh_players();
        self.follow_camera();

        self.services.debug.report(&DebugEvent::StageLoaded {
            index,
            spawned: spawns.spawned.len(),
            dropped: spawns.dropped,
        });
        // A stage request from startup would reload forever; only state requests apply.
        if let Some(state) = requests.state {
            self.set_state(state);
        }
        if startup.faulted() {
            self.set_state(EngineState::ScriptError);
        }
        Ok(())
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Runs one fixed-timestep tick.
    pub fn step(&mut self, input: InputSnapshot) -> TickReport {
        self.apply_host_requests();
        self.advance_state_machine();

        let mut report = TickReport::default();
        if self.state.runs_simulation() && self.scenes.current().is_some() {
            let paused = self.state == EngineState::Paused;
            let mut requests = ScriptRequests::default();
            let update = self.run_update(&input, &mut requests, paused);
            let stage = self.scenes.current();
            let collision = self
                .collision
                .resolve(self.objects.pool_mut(), stage, paused);
            self.follow_camera();
            self.frames_since_load += 1;

            if let Some(state) = requests.state {
                self.set_state(state);
            }
            if update.faulted() {
                self.set_state(EngineState::ScriptError);
            }
            if let Some(index) = requests.stage {
                if let Err(err) = self.scenes.request_transition(index) {
                    tracing::warn!(error = %err, "stage transition rejected");
                }
            }
            report.update = Some(update);
            report.collision = Some(collision);
        }

        if let Some(index) = self.scenes.take_transition() {
            match self.load_stage(index) {
                Ok(()) => report.stage_loaded = Some(index),
                Err(err) => {
                    tracing::error!(stage = index, error = %err, "stage load failed");
                    self.set_state(EngineState::ScriptError);
                }
            }
        }

        self.frame += 1;
        report.frame = self.frame;
        report.state = self.state;
        report
    }

    /// Draws the current frame through the drawing collaborator.
    pub fn render(&mut self) -> Option<UpdateReport> {
        if self.state == EngineState::EndGame {
            return None;
        }
        let camera = self.camera();
        let stage_count = self.scenes.stage_count();
        let input = InputSnapshot::default();
        let mut requests = ScriptRequests::default();
        let stage = self.scenes.current_mut()?;
        let report = self.objects.draw(
            &mut self.scripts,
            UpdateContext {
                stage: Some(stage),
                stage_count,
                services: &mut self.services,
                input: &input,
                requests: &mut requests,
                camera,
                paused: false,
            },
        );
        if report.faulted() {
            self.set_state(EngineState::ScriptError);
        }
        Some(report)
    }

    fn run_update(
        &mut self,
        input: &InputSnapshot,
        requests: &mut ScriptRequests,
        paused: bool,
    ) -> UpdateReport {
        let camera = self.camera();
        let stage_count = self.scenes.stage_count();
        self.objects.update(
            &mut self.scripts,
            UpdateContext {
                stage: self.scenes.current_mut(),
                stage_count,
                services: &mut self.services,
                input,
                requests,
                camera,
                paused,
            },
        )
    }

    fn camera(&self) -> (Fixed, Fixed) {
        self.scenes
            .current()
            .map_or((Fixed::ZERO, Fixed::ZERO), |stage| (stage.camera_x, stage.camera_y))
    }

    /// Centers the first player on screen, clamped to the collision layer.
    fn follow_camera(&mut self) {
        let Some(player) = self.objects.primary_player() else {
            return;
        };
        let Some((px, py)) = self.objects.pool().get(player).map(|e| (e.x, e.y)) else {
            return;
        };
        let half_w = Fixed::from_int(self.config.screen_width as i32 / 2);
        let half_h = Fixed::from_int(self.config.screen_height as i32 / 2);
        let screen_w = self.config.screen_width as i32;
        let screen_h = self.config.screen_height as i32;
        let Some(stage) = self.scenes.current_mut() else {
            return;
        };
        let bounds = stage
            .collision_layer
            .and_then(|index| stage.layer(index))
            .map(|layer| (layer.pixel_width(), layer.pixel_height()));
        let clamp = |value: Fixed, span: Option<i32>, screen: i32| {
            let max = Fixed::from_int(span.map_or(i32::MAX >> 16, |span| (span - screen).max(0)));
            value.max(Fixed::ZERO).min(max)
        };
        let x = clamp(px - half_w, bounds.map(|b| b.0), screen_w);
        let y = clamp(py - half_h, bounds.map(|b| b.1), screen_h);
        stage.set_camera(x, y);
    }

    // ========================================================================
    // State machine
    // ========================================================================

    fn set_state(&mut self, to: EngineState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        if to == EngineState::Wait {
            self.wait_remaining = self.config.wait_ticks;
        }
        self.state = to;
        self.services
            .debug
            .report(&DebugEvent::StateChanged { from, to });
    }

    fn apply_host_requests(&mut self) {
        for request in core::mem::take(&mut self.requests) {
            tracing::debug!(?request, state = %self.state, "host request");
            match request {
                HostRequest::Pause => {
                    if self.state == EngineState::MainGame {
                        self.set_state(EngineState::InitPause);
                    }
                }
                HostRequest::Resume => match self.state {
                    EngineState::Paused | EngineState::InitPause => {
                        self.set_state(EngineState::ExitPause)
                    }
                    EngineState::ScriptError | EngineState::Wait => {
                        self.set_state(EngineState::MainGame)
                    }
                    state if state.is_menu() => self.set_state(EngineState::MainGame),
                    _ => {}
                },
                HostRequest::Reset => self.set_state(EngineState::ResetGame),
                HostRequest::Quit => self.set_state(EngineState::EndGame),
                HostRequest::LoadStage(index) => {
                    if let Err(err) = self.scenes.request_transition(index) {
                        tracing::warn!(error = %err, "host stage request rejected");
                    }
                }
            }
        }
    }

    /// Resolves transient states before the tick's simulation runs.
    fn advance_state_machine(&mut self) {
        match self.state {
            EngineState::InitPause => self.set_state(EngineState::Paused),
            EngineState::ExitPause => self.set_state(EngineState::MainGame),
            EngineState::InitDevMenu => self.set_state(EngineState::DevMenu),
            EngineState::Wait => {
                self.wait_remaining = self.wait_remaining.saturating_sub(1);
                if self.wait_remaining == 0 {
                    self.set_state(EngineState::MainGame);
                }
            }
            EngineState::ResetGame => {
                self.scripts.reset(self.config.rng_seed);
                self.set_state(EngineState::MainGame);
                if self.scenes.stage_count() > 0 {
                    if let Err(err) = self.load_stage(0) {
                        tracing::error!(error = %err, "reset failed");
                        self.set_state(EngineState::ScriptError);
                    }
                }
            }
            _ => {}
        }
    }
}
