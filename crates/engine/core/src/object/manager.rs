//! Per-tick entity update passes.
//!
//! [`ObjectManager::update`] runs the `main` pass over the committed active
//! list, then the player-interaction pass, then commits every spawn and
//! destroy the scripts requested. Nothing a script does during a pass changes
//! which entities that pass visits.

use arrayvec::ArrayVec;

use crate::config::EngineConfig;
use crate::fixed::Fixed;
use crate::scene::Stage;
use crate::script::{
    ExecContext, FunctionId, Outcome, ScriptEngine, ScriptPhase, ScriptRequests,
    ScriptRuntimeError,
};
use crate::services::{DebugEvent, InputSnapshot, Services, SpriteDraw};

use super::entity::{EntityFlags, ObjectTypeId, SlotId};
use super::pool::{CommitReport, ObjectPool};
use super::registry::{ScriptFunctionSet, TypeRegistry};

/// Engine parts a pass borrows besides the pool and the registry.
pub struct UpdateContext<'a> {
    pub stage: Option<&'a mut Stage>,
    pub stage_count: usize,
    pub services: &'a mut Services,
    pub input: &'a InputSnapshot,
    pub requests: &'a mut ScriptRequests,
    pub camera: (Fixed, Fixed),
    /// Only pause-exempt entities run while set.
    pub paused: bool,
}

/// What one update pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Script invocations that ran, faulted ones included.
    pub invocations: usize,
    pub faults: Vec<(Option<SlotId>, ScriptRuntimeError)>,
    pub commit: CommitReport,
}

impl UpdateReport {
    pub fn faulted(&self) -> bool {
        !self.faults.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct ObjectManager {
    pool: ObjectPool,
    registry: TypeRegistry,
    players: ArrayVec<SlotId, { EngineConfig::MAX_PLAYERS }>,
}

impl ObjectManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: ObjectPool::new(capacity),
            registry: TypeRegistry::new(),
            players: ArrayVec::new(),
        }
    }

    pub fn pool(&self) -> &ObjectPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut ObjectPool {
        &mut self.pool
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Registry and pool together, for spawning outside a pass.
    pub fn split_mut(&mut self) -> (&TypeRegistry, &mut ObjectPool) {
        (&self.registry, &mut self.pool)
    }

    /// Players in active-list order, at most [`EngineConfig::MAX_PLAYERS`].
    pub fn players(&self) -> &[SlotId] {
        &self.players
    }

    pub fn primary_player(&self) -> Option<SlotId> {
        self.players.first().copied()
    }

    /// Flushes every entity and installs the registry of a freshly loaded stage.
    pub fn install_registry(&mut self, registry: TypeRegistry) {
        self.pool.flush();
        self.players.clear();
        tracing::debug!(types = registry.len(), "type registry installed");
        self.registry = registry;
    }

    /// Frees every slot; the registry stays installed.
    pub fn clear(&mut self) {
        self.pool.flush();
        self.players.clear();
    }

    /// Recomputes the player list from the active list.
    pub fn refresh_players(&mut self) {
        self.players.clear();
        for (slot, entity) in self.pool.iter_active() {
            if entity.flags.contains(EntityFlags::PLAYER) && !self.players.is_full() {
                self.players.push(slot);
            }
        }
    }

    fn functions(&self, type_id: ObjectTypeId) -> ScriptFunctionSet {
        self.registry
            .get(type_id)
            .map(|object_type| object_type.functions)
            .unwrap_or_default()
    }

    fn invoke(
        &mut self,
        scripts: &mut ScriptEngine,
        env: &mut UpdateContext<'_>,
        function: FunctionId,
        this: Option<SlotId>,
        player: Option<SlotId>,
        phase: ScriptPhase,
    ) -> Result<Outcome, ScriptRuntimeError> {
        let mut ctx = ExecContext {
            pool: &mut self.pool,
            registry: &self.registry,
            stage: env.stage.as_deref_mut(),
            stage_count: env.stage_count,
            services: &mut *env.services,
            input: env.input,
            requests: &mut *env.requests,
            this,
            player,
            phase,
            camera: env.camera,
        };
        scripts.execute(function, &mut ctx)
    }

    /// Freezes the offending entity and reports the fault.
    fn fault(
        &mut self,
        env: &mut UpdateContext<'_>,
        report: &mut UpdateReport,
        slot: Option<SlotId>,
        type_id: ObjectTypeId,
        error: ScriptRuntimeError,
    ) {
        if let Some(entity) = slot.and_then(|slot| self.pool.get_mut(slot)) {
            entity.flags.insert(EntityFlags::FROZEN);
        }
        env.services.debug.report(&DebugEvent::ScriptFault {
            slot,
            type_id,
            error: error.clone(),
        });
        report.faults.push((slot, error));
    }

    /// Runs every registered type's `startup` once, with no entity bound.
    pub fn run_startup(
        &mut self,
        scripts: &mut ScriptEngine,
        mut env: UpdateContext<'_>,
    ) -> UpdateReport {
        let mut report = UpdateReport::default();
        let startups: Vec<(ObjectTypeId, FunctionId)> = self
            .registry
            .iter()
            .filter_map(|(id, object_type)| object_type.functions.startup.map(|f| (id, f)))
            .collect();

        for (type_id, function) in startups {
            report.invocations += 1;
            if let Err(error) =
                self.invoke(scripts, &mut env, function, None, None, ScriptPhase::Startup)
            {
                self.fault(&mut env, &mut report, None, type_id, error);
            }
        }
        report.commit = self.pool.commit();
        self.refresh_players();
        report
    }

    /// One tick of entity logic: `main` pass, interaction pass, commit.
    ///
    /// A faulting script freezes only its own entity; the pass continues.
    pub fn update(&mut self, scripts: &mut ScriptEngine, mut env: UpdateContext<'_>) -> UpdateReport {
        let mut report = UpdateReport::default();
        let player = self.primary_player();

        for index in 0..self.pool.active().len() {
            let slot = self.pool.active()[index];
            let Some(entity) = self.pool.get(slot) else {
                continue;
            };
            if !entity.is_runnable(env.paused) {
                continue;
            }
            let type_id = entity.type_id;
            let Some(main) = self.functions(type_id).main else {
                continue;
            };
            report.invocations += 1;
            if let Err(error) =
                self.invoke(scripts, &mut env, main, Some(slot), player, ScriptPhase::Main)
            {
                self.fault(&mut env, &mut report, Some(slot), type_id, error);
            }
        }

        let players = self.players.clone();
        for player in players {
            for index in 0..self.pool.active().len() {
                let slot = self.pool.active()[index];
                if slot == player {
                    continue;
                }
                let runnable = |slot| {
                    self.pool
                        .get(slot)
                        .is_some_and(|entity| entity.is_runnable(env.paused))
                };
                if !runnable(player) || !runnable(slot) {
                    continue;
                }
                let Some(type_id) = self.pool.get(slot).map(|entity| entity.type_id) else {
                    continue;
                };
                let Some(interaction) = self.functions(type_id).player_interaction else {
                    continue;
                };
                report.invocations += 1;
                if let Err(error) = self.invoke(
                    scripts,
                    &mut env,
                    interaction,
                    Some(slot),
                    Some(player),
                    ScriptPhase::Interaction,
                ) {
                    self.fault(&mut env, &mut report, Some(slot), type_id, error);
                }
            }
        }

        report.commit = self.pool.commit();
        self.refresh_players();
        report
    }

    /// Draws every visible active entity in (draw layer, slot) order.
    ///
    /// Types with a `draw` function render themselves; the rest get one
    /// sprite at their screen position.
    pub fn draw(&mut self, scripts: &mut ScriptEngine, mut env: UpdateContext<'_>) -> UpdateReport {
        let mut report = UpdateReport::default();
        let (camera_x, camera_y) = env.camera;
        let player = self.primary_player();

        for index in 0..self.pool.active().len() {
            let slot = self.pool.active()[index];
            let Some(entity) = self.pool.get(slot) else {
                continue;
            };
            if !entity.flags.contains(EntityFlags::VISIBLE) {
                continue;
            }
            let type_id = entity.type_id;
            match self.functions(type_id).draw {
                Some(draw) if !entity.is_frozen() => {
                    report.invocations += 1;
                    if let Err(error) =
                        self.invoke(scripts, &mut env, draw, Some(slot), player, ScriptPhase::Draw)
                    {
                        self.fault(&mut env, &mut report, Some(slot), type_id, error);
                    }
                }
                _ => {
                    let sprite = SpriteDraw {
                        slot,
                        animation: entity.animation,
                        frame: entity.frame,
                        x: (entity.x - camera_x).to_int(),
                        y: (entity.y - camera_y).to_int(),
                        direction: entity.direction,
                        layer: entity.draw_layer,
                    };
                    env.services.drawing.draw_sprite(&sprite);
                }
            }
        }
        env.services.drawing.present();

        // Draw scripts may spawn or destroy too.
        report.commit = self.pool.commit();
        self.refresh_players();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{ObjectType, TypeFlags};
    use crate::script::{Assembler, EntityField, Opcode, OpcodeRevision, Program, ScriptLimits};

    struct World {
        scripts: ScriptEngine,
        objects: ObjectManager,
        services: Services,
        requests: ScriptRequests,
        input: InputSnapshot,
    }

    impl World {
        fn new(build: impl FnOnce(&mut Assembler), types: Vec<ObjectType>) -> Self {
            let mut asm = Assembler::new();
            build(&mut asm);
            let bytes = asm.build(OpcodeRevision::Current).unwrap();
            let program = Program::load(&bytes, OpcodeRevision::Current).unwrap();
            let mut registry = TypeRegistry::new();
            for object_type in types {
                registry.register(object_type);
            }
            let mut objects = ObjectManager::new(8);
            objects.install_registry(registry);
            Self {
                scripts: ScriptEngine::new(program, ScriptLimits::default(), 7),
                objects,
                services: Services::default(),
                requests: ScriptRequests::default(),
                input: InputSnapshot::default(),
            }
        }

        fn spawn(&mut self, type_id: u16) -> SlotId {
            let entity = self
                .objects
                .registry()
                .instantiate(ObjectTypeId(type_id), Fixed::ZERO, Fixed::ZERO)
                .unwrap();
            let slot = self.objects.pool_mut().spawn_immediate(entity).unwrap();
            self.objects.refresh_players();
            slot
        }

        fn update(&mut self, paused: bool) -> UpdateReport {
            let env = UpdateContext {
                stage: None,
                stage_count: 0,
                services: &mut self.services,
                input: &self.input,
                requests: &mut self.requests,
                camera: (Fixed::ZERO, Fixed::ZERO),
                paused,
            };
            self.objects.update(&mut self.scripts, env)
        }
    }

    fn typed(name: &str, main: Option<u16>, interaction: Option<u16>, flags: TypeFlags) -> ObjectType {
        ObjectType {
            name: name.into(),
            functions: ScriptFunctionSet {
                main: main.map(FunctionId),
                player_interaction: interaction.map(FunctionId),
                ..ScriptFunctionSet::default()
            },
            flags,
            ..ObjectType::default()
        }
    }

    /// fn 0 increments State, fn 1 divides by zero.
    fn counter_and_crasher(asm: &mut Assembler) {
        asm.begin_function("count")
            .field(Opcode::GetField, EntityField::State)
            .push_int(1)
            .op(Opcode::Add)
            .field(Opcode::SetField, EntityField::State)
            .op(Opcode::End)
            .begin_function("crash")
            .push_int(1)
            .push_int(0)
            .op(Opcode::Div)
            .op(Opcode::End);
    }

    #[test]
    fn faulting_entity_is_frozen_and_others_keep_running() {
        let mut world = World::new(
            counter_and_crasher,
            vec![
                typed("counter", Some(0), None, TypeFlags::empty()),
                typed("crasher", Some(1), None, TypeFlags::empty()),
            ],
        );
        let a = world.spawn(1);
        let bad = world.spawn(2);
        let b = world.spawn(1);

        let report = world.update(false);
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].0, Some(bad));
        assert!(world.objects.pool().get(bad).unwrap().is_frozen());

        let report = world.update(false);
        assert!(!report.faulted());
        let pool = world.objects.pool();
        assert_eq!(pool.get(a).unwrap().state, 2);
        assert_eq!(pool.get(b).unwrap().state, 2);
    }

    #[test]
    fn pause_runs_only_exempt_entities() {
        let mut world = World::new(
            counter_and_crasher,
            vec![
                typed("counter", Some(0), None, TypeFlags::empty()),
                typed("hud", Some(0), None, TypeFlags::PAUSE_EXEMPT),
            ],
        );
        let ordinary = world.spawn(1);
        let exempt = world.spawn(2);

        world.update(true);
        assert_eq!(world.objects.pool().get(ordinary).unwrap().state, 0);
        assert_eq!(world.objects.pool().get(exempt).unwrap().state, 1);
    }

    #[test]
    fn interaction_pass_sees_player_slot() {
        let mut world = World::new(
            |asm| {
                asm.begin_function("touch")
                    .op(Opcode::PlayerSlot)
                    .field(Opcode::SetField, EntityField::Substate)
                    .op(Opcode::End);
            },
            vec![
                typed("player", None, None, TypeFlags::PLAYER),
                typed("ring", None, Some(0), TypeFlags::empty()),
            ],
        );
        let ring = world.spawn(2);
        let player = world.spawn(1);
        assert_eq!(world.objects.players(), &[player]);

        world.update(false);
        assert_eq!(
            world.objects.pool().get(ring).unwrap().substate,
            player.to_script()
        );
    }

    #[test]
    fn commit_applies_spawns_and_destroys_after_the_pass() {
        let mut world = World::new(
            |asm| {
                asm.begin_function("split")
                    .push_int(1)
                    .push_int(0)
                    .push_int(0)
                    .op(Opcode::Spawn)
                    .op(Opcode::Pop)
                    .op(Opcode::Destroy)
                    .op(Opcode::End);
            },
            vec![typed("splitter", Some(0), None, TypeFlags::empty())],
        );
        let first = world.spawn(1);
        let second = world.spawn(1);

        let report = world.update(false);
        assert_eq!(report.invocations, 2);
        assert_eq!(report.commit.spawned.len(), 2);
        assert_eq!(report.commit.destroyed, vec![first, second]);
        let active = world.objects.pool().active();
        assert_eq!(active.len(), 2);
        assert!(report.commit.spawned.iter().all(|slot| active.contains(slot)));
    }
}
