//! End-to-end ticks through `Engine::step`.

mod common;

use std::collections::BTreeSet;

use common::*;
use engine_core::collision::Hitbox;
use engine_core::script::{EntityField, Opcode, RuntimeErrorKind};
use engine_core::services::DebugEvent;
use engine_core::{
    Engine, EngineConfig, EngineState, HostRequest, InputSnapshot, ObjectTypeId, OpcodeRevision,
    SlotId,
};

const PLAYER: u16 = 1;
const RING: u16 = 2;
const RING_SOUND: i32 = 7;

/// Player walks right 4 px per tick; its startup spawns a ring at (100, 50).
/// The ring's interaction destroys it and plays a sound once the player's
/// solid box touches its sensor box.
fn ring_engine(recorders: &Recorders) -> Engine {
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("player_startup")
            .push_int(RING as i32)
            .push_int(px(100))
            .push_int(px(50))
            .op(Opcode::Spawn)
            .op(Opcode::Pop)
            .op(Opcode::End);

        asm.begin_function("player_main")
            .field(Opcode::GetField, EntityField::X)
            .push_int(px(4))
            .op(Opcode::Add)
            .field(Opcode::SetField, EntityField::X)
            .op(Opcode::End);

        let done = asm.label();
        asm.begin_function("ring_touch")
            .op(Opcode::PlayerSlot)
            .index(Opcode::Overlap, 1)
            .jump(Opcode::JumpIfZero, done)
            .push_int(RING_SOUND)
            .op(Opcode::PlaySound)
            .op(Opcode::Destroy)
            .bind(done)
            .op(Opcode::End);
    });

    let mut player = object("player");
    player.startup = Some("player_startup".into());
    player.main = Some("player_main".into());
    player.player = true;
    player.hitboxes = vec![Hitbox::solid(-8, -16, 8, 16)];

    let mut ring = object("ring");
    ring.player_interaction = Some("ring_touch".into());
    ring.hitboxes = vec![Hitbox::sensor(-8, -8, 8, 8)];

    let stage = manifest("ring", vec![player, ring], vec![spawn("player", 60, 50)]);
    engine(EngineConfig::default(), &bytes, &[stage], recorders)
}

fn ring_slot(engine: &Engine) -> Option<SlotId> {
    engine
        .active_entities()
        .find(|(_, entity)| entity.type_id == ObjectTypeId(RING))
        .map(|(slot, _)| slot)
}

#[test]
fn ring_is_collected_once_on_contact() {
    let recorders = Recorders::new();
    let mut engine = ring_engine(&recorders);

    assert_eq!(engine.active_entities().count(), 2);
    let ring = ring_slot(&engine).expect("startup spawned the ring");
    assert_eq!(engine.entity(ring).unwrap().x.to_int(), 100);

    let first = engine.step(InputSnapshot::default());
    assert!(first.simulated());
    assert!(recorders.sounds().is_empty());
    let after_first = engine.entity(ring).expect("ring survives the first tick");
    assert_eq!((after_first.x.to_int(), after_first.y.to_int()), (100, 50));

    let mut collected_at = None;
    for tick in 2..=20 {
        let report = engine.step(InputSnapshot::default());
        if collected_at.is_none() && report.update.as_ref().unwrap().commit.destroyed.contains(&ring) {
            collected_at = Some(tick);
        }
    }

    // Player right edge passes the ring's left edge (92) at x = 88, the 7th tick.
    assert_eq!(collected_at, Some(7));
    assert_eq!(recorders.sounds(), vec![RING_SOUND]);
    assert!(ring_slot(&engine).is_none());
    assert_eq!(engine.active_entities().count(), 1);
}

#[test]
fn spawn_points_beyond_capacity_are_dropped_and_reported() {
    let recorders = Recorders::new();
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("idle").op(Opcode::End);
    });
    let stage = manifest(
        "crowded",
        vec![object("rock")],
        vec![spawn("rock", 0, 0), spawn("rock", 16, 0), spawn("rock", 32, 0)],
    );
    let config = EngineConfig::default().with_pool_capacity(2);
    let engine = engine(config, &bytes, &[stage], &recorders);

    assert_eq!(engine.active_entities().count(), 2);
    let events = recorders.debug.events();
    let exhausted: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, DebugEvent::PoolExhausted { capacity: 2, .. }))
        .collect();
    assert_eq!(exhausted.len(), 1);
    assert!(events.iter().any(|event| matches!(
        event,
        DebugEvent::StageLoaded {
            index: 0,
            spawned: 2,
            dropped: 1
        }
    )));
}

#[test]
fn identical_runs_produce_identical_digests() {
    let run = || {
        let recorders = Recorders::new();
        let mut engine = ring_engine(&recorders);
        (0..30)
            .map(|_| {
                engine.step(InputSnapshot::default());
                engine.digest()
            })
            .collect::<Vec<_>>()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_ne!(first[0], first[1]);
}

#[test]
fn runaway_recursion_faults_only_its_entity() {
    let recorders = Recorders::new();
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("recurse").call("recurse").op(Opcode::Return);
        asm.begin_function("count")
            .field(Opcode::GetField, EntityField::State)
            .push_int(1)
            .op(Opcode::Add)
            .field(Opcode::SetField, EntityField::State)
            .op(Opcode::End);
    });
    let mut bomb = object("bomb");
    bomb.main = Some("recurse".into());
    let mut counter = object("counter");
    counter.main = Some("count".into());
    let stage = manifest(
        "faults",
        vec![bomb, counter],
        vec![spawn("counter", 0, 0), spawn("bomb", 16, 0), spawn("counter", 32, 0)],
    );
    let mut engine = engine(EngineConfig::default(), &bytes, &[stage], &recorders);

    let report = engine.step(InputSnapshot::default());
    let update = report.update.unwrap();
    assert_eq!(update.faults.len(), 1);
    assert_eq!(
        update.faults[0].1.kind,
        RuntimeErrorKind::CallDepthExceeded {
            limit: EngineConfig::DEFAULT_CALL_DEPTH_LIMIT
        }
    );
    assert_eq!(engine.state(), EngineState::ScriptError);

    let states: Vec<i32> = engine
        .active_entities()
        .filter(|(_, e)| e.type_id != ObjectTypeId(1))
        .map(|(_, e)| e.state)
        .collect();
    assert_eq!(states, vec![1, 1]);
    let bomb = engine.entity(SlotId(1)).unwrap();
    assert!(bomb.is_frozen());

    // Frozen simulation until the host resumes.
    assert!(!engine.step(InputSnapshot::default()).simulated());
    engine.resume();
    let report = engine.step(InputSnapshot::default());
    assert!(report.simulated());
    assert!(!report.update.unwrap().faulted());
    assert_eq!(engine.entity(SlotId(0)).unwrap().state, 2);
}

#[test]
fn active_list_follows_commits_exactly() {
    let recorders = Recorders::new();
    // Every entity spawns a child while its state is even and destroys
    // itself once it has lived three ticks.
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        let no_spawn = asm.label();
        let alive = asm.label();
        asm.begin_function("cell")
            .field(Opcode::GetField, EntityField::State)
            .push_int(1)
            .op(Opcode::Add)
            .op(Opcode::Dup)
            .field(Opcode::SetField, EntityField::State)
            .push_int(2)
            .op(Opcode::Mod)
            .jump(Opcode::JumpIfNotZero, no_spawn)
            .push_int(1)
            .push_int(0)
            .push_int(0)
            .op(Opcode::Spawn)
            .op(Opcode::Pop)
            .bind(no_spawn)
            .field(Opcode::GetField, EntityField::State)
            .push_int(3)
            .op(Opcode::Lt)
            .jump(Opcode::JumpIfNotZero, alive)
            .op(Opcode::Destroy)
            .bind(alive)
            .op(Opcode::End);
    });
    let mut cell = object("cell");
    cell.main = Some("cell".into());
    let stage = manifest("cells", vec![cell], vec![spawn("cell", 0, 0), spawn("cell", 8, 0)]);
    let config = EngineConfig::default().with_pool_capacity(16);
    let mut engine = engine(config, &bytes, &[stage], &recorders);

    for _ in 0..12 {
        let before: BTreeSet<SlotId> = engine.active_entities().map(|(slot, _)| slot).collect();
        let report = engine.step(InputSnapshot::default());
        let commit = report.update.unwrap().commit;
        let after: Vec<SlotId> = engine.active_entities().map(|(slot, _)| slot).collect();
        let after_set: BTreeSet<SlotId> = after.iter().copied().collect();

        assert_eq!(after.len(), after_set.len(), "duplicate slot in active list");
        let mut expected = before.clone();
        for slot in &commit.spawned {
            expected.insert(*slot);
        }
        for slot in &commit.destroyed {
            expected.remove(slot);
        }
        assert_eq!(after_set, expected);
        assert!(after.iter().all(|slot| engine.entity(*slot).is_some()));
    }
}

#[test]
fn pause_freezes_ordinary_entities_but_not_exempt_ones() {
    let recorders = Recorders::new();
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("count")
            .field(Opcode::GetField, EntityField::State)
            .push_int(1)
            .op(Opcode::Add)
            .field(Opcode::SetField, EntityField::State)
            .op(Opcode::End);
    });
    let mut walker = object("walker");
    walker.main = Some("count".into());
    let mut hud = object("hud");
    hud.main = Some("count".into());
    hud.pause_exempt = true;
    let stage = manifest("pause", vec![walker, hud], vec![spawn("walker", 0, 0), spawn("hud", 0, 0)]);
    let mut engine = engine(EngineConfig::default(), &bytes, &[stage], &recorders);

    engine.step(InputSnapshot::default());
    engine.pause();
    for _ in 0..3 {
        engine.step(InputSnapshot::default());
    }
    assert_eq!(engine.state(), EngineState::Paused);
    assert_eq!(engine.entity(SlotId(0)).unwrap().state, 1);
    assert_eq!(engine.entity(SlotId(1)).unwrap().state, 4);

    engine.request(HostRequest::Resume).unwrap();
    engine.step(InputSnapshot::default());
    assert_eq!(engine.state(), EngineState::MainGame);
    assert_eq!(engine.entity(SlotId(0)).unwrap().state, 2);
}

#[test]
fn script_requested_wait_counts_down() {
    let recorders = Recorders::new();
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("wait")
            .push_int(EngineState::Wait.code().unwrap())
            .op(Opcode::SetEngineState)
            .op(Opcode::End);
    });
    let mut waiter = object("waiter");
    waiter.main = Some("wait".into());
    let stage = manifest("wait", vec![waiter], vec![spawn("waiter", 0, 0)]);
    let config = EngineConfig {
        wait_ticks: 3,
        ..EngineConfig::default()
    };
    let mut engine = engine(config, &bytes, &[stage], &recorders);

    engine.step(InputSnapshot::default());
    assert_eq!(engine.state(), EngineState::Wait);
    assert!(!engine.step(InputSnapshot::default()).simulated());
    assert!(!engine.step(InputSnapshot::default()).simulated());
    // The countdown expires at the start of the fourth tick, which simulates again.
    assert!(engine.step(InputSnapshot::default()).simulated());
}

#[test]
fn script_stage_request_loads_at_end_of_tick() {
    let recorders = Recorders::new();
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("exit")
            .push_int(1)
            .op(Opcode::LoadStage)
            .op(Opcode::End);
    });
    let mut door = object("door");
    door.main = Some("exit".into());
    let first = manifest("first", vec![door], vec![spawn("door", 0, 0)]);
    let second = manifest("second", vec![object("rock")], vec![spawn("rock", 4, 4), spawn("rock", 8, 8)]);
    let mut engine = engine(EngineConfig::default(), &bytes, &[first, second], &recorders);

    let report = engine.step(InputSnapshot::default());
    assert_eq!(report.stage_loaded, Some(1));
    assert_eq!(engine.stage().unwrap().name, "second");
    assert_eq!(engine.frames_since_load(), 0);
    assert_eq!(engine.active_entities().count(), 2);
}
