use std::time::Duration;

use engine_core::scene::{LayerSpec, ObjectTypeSpec, SceneManifest, SpawnSpec};
use engine_core::script::{Assembler, EntityField, Opcode};
use engine_core::services::Buttons;
use engine_core::{
    Engine, EngineConfig, EngineSnapshot, EngineState, OpcodeRevision, Services, SlotId,
};
use runtime::{DiagnosticEvent, EngineEvent, Event, Runtime, RuntimeConfig, RuntimeHandle, Topic};
use tokio::sync::broadcast;
use tokio::time::timeout;

const A_BUTTON: i32 = 4;

/// "hero" counts ticks in `state` and mirrors the A button into `substate`.
/// "bomb" divides by zero once its state reaches 3.
fn engine() -> Engine {
    let mut asm = Assembler::new();
    asm.begin_function("hero")
        .field(Opcode::GetField, EntityField::State)
        .push_int(1)
        .op(Opcode::Add)
        .field(Opcode::SetField, EntityField::State)
        .push_int(A_BUTTON)
        .op(Opcode::InputHeld)
        .field(Opcode::SetField, EntityField::Substate)
        .op(Opcode::End);
    let safe = asm.label();
    asm.begin_function("bomb")
        .field(Opcode::GetField, EntityField::State)
        .push_int(1)
        .op(Opcode::Add)
        .op(Opcode::Dup)
        .field(Opcode::SetField, EntityField::State)
        .push_int(3)
        .op(Opcode::Lt)
        .jump(Opcode::JumpIfNotZero, safe)
        .push_int(1)
        .push_int(0)
        .op(Opcode::Div)
        .op(Opcode::Pop)
        .bind(safe)
        .op(Opcode::End);
    let bytes = asm.build(OpcodeRevision::Current).unwrap();

    let mut hero = ObjectTypeSpec::new("hero");
    hero.main = Some("hero".into());
    hero.player = true;
    let mut bomb = ObjectTypeSpec::new("bomb");
    bomb.main = Some("bomb".into());

    let stage = |name: &str, spawns: Vec<SpawnSpec>| SceneManifest {
        name: name.into(),
        object_types: vec![hero.clone(), bomb.clone()],
        layers: vec![LayerSpec {
            width: 4,
            height: 4,
            tiles: vec![0; 16],
            ..LayerSpec::default()
        }],
        spawns,
        ..SceneManifest::default()
    };
    let hero_at = |x| SpawnSpec {
        object: "hero".into(),
        x,
        y: 0,
        subtype: 0,
    };
    let bomb_at = |x| SpawnSpec {
        object: "bomb".into(),
        x,
        y: 0,
        subtype: 0,
    };

    let stages = [
        stage("calm", vec![hero_at(8)]),
        stage("armed", vec![hero_at(8), bomb_at(24)]),
    ];
    Engine::load(EngineConfig::default(), &bytes, &stages, Services::default()).unwrap()
}

fn start(config: RuntimeConfig) -> (Runtime, RuntimeHandle) {
    let runtime = Runtime::builder().config(config).engine(engine()).build().unwrap();
    let handle = runtime.handle();
    (runtime, handle)
}

async fn next(rx: &mut broadcast::Receiver<Event>) -> Event {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("event in time")
        .expect("bus open")
}

#[tokio::test]
async fn runs_ticks_and_reports_frames() {
    let (runtime, handle) = start(RuntimeConfig {
        publish_digests: true,
        ..RuntimeConfig::default()
    });
    let mut frames = handle.subscribe(Topic::Frame);

    let report = handle.run_ticks(10).await.unwrap();
    assert_eq!(report.ticks, 10);

    let Event::Frame(frame) = next(&mut frames).await else {
        panic!("frame topic carries frame events");
    };
    assert_eq!(frame.frame, 10);
    assert_eq!(frame.ticks, 10);
    assert_eq!(frame.state, EngineState::MainGame);
    let digest = handle.digest().await.unwrap();
    assert_eq!(frame.digest, Some(hex::encode(digest)));

    let status = handle.status().await.unwrap();
    assert_eq!(status.frame, 10);
    assert_eq!(status.stage, Some(0));
    assert_eq!(status.active_entities, 1);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn host_input_reaches_scripts() {
    let (runtime, handle) = start(RuntimeConfig::default());

    handle.run_ticks(1).await.unwrap();
    assert_eq!(handle.snapshot().await.unwrap().entities[0].1.substate, 0);

    handle.set_input(Buttons::A).unwrap();
    handle.run_ticks(1).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.entities[0].0, SlotId(0));
    assert_eq!(snapshot.entities[0].1.substate, 1);
    assert_eq!(snapshot.entities[0].1.state, 2);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn pause_and_resume_publish_state_changes() {
    let (runtime, handle) = start(RuntimeConfig::default());
    let mut engine_rx = handle.subscribe(Topic::Engine);

    handle.pause().await.unwrap();
    handle.run_ticks(2).await.unwrap();
    assert_eq!(handle.status().await.unwrap().state, EngineState::Paused);

    assert_eq!(
        next(&mut engine_rx).await,
        Event::Engine(EngineEvent::StateChanged {
            from: EngineState::MainGame,
            to: EngineState::InitPause,
        })
    );
    assert_eq!(
        next(&mut engine_rx).await,
        Event::Engine(EngineEvent::StateChanged {
            from: EngineState::InitPause,
            to: EngineState::Paused,
        })
    );

    handle.resume().await.unwrap();
    handle.run_ticks(1).await.unwrap();
    assert_eq!(handle.status().await.unwrap().state, EngineState::MainGame);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn script_faults_surface_as_diagnostics() {
    let (runtime, handle) = start(RuntimeConfig::default());
    let mut diagnostics = handle.subscribe(Topic::Diagnostics);
    let mut engine_rx = handle.subscribe(Topic::Engine);

    handle.load_stage(1).await.unwrap();
    handle.run_ticks(1).await.unwrap();
    assert_eq!(
        next(&mut engine_rx).await,
        Event::Engine(EngineEvent::StageLoaded {
            index: 1,
            spawned: 2,
            dropped: 0,
        })
    );

    handle.run_ticks(3).await.unwrap();
    let Event::Diagnostic(DiagnosticEvent::ScriptFault { slot, code, .. }) =
        next(&mut diagnostics).await
    else {
        panic!("expected a script fault");
    };
    assert_eq!(slot, Some(1));
    assert_eq!(code, "SCRIPT_DIVISION_BY_ZERO");
    assert_eq!(handle.status().await.unwrap().state, EngineState::ScriptError);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_stage_request_is_rejected() {
    let (runtime, handle) = start(RuntimeConfig::default());
    let err = handle.load_stage(9).await.unwrap_err();
    assert!(matches!(err, runtime::RuntimeError::Scene(_)));
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn snapshot_bytes_round_trip_through_bincode() {
    let (runtime, handle) = start(RuntimeConfig::default());
    handle.run_ticks(5).await.unwrap();

    let bytes = handle.snapshot_bytes().await.unwrap();
    let decoded: EngineSnapshot = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded.frame, 5);
    assert_eq!(decoded.digest(), handle.digest().await.unwrap());

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn master_pause_and_quit() {
    let (runtime, handle) = start(RuntimeConfig::default());
    let mut engine_rx = handle.subscribe(Topic::Engine);

    handle.set_master_pause(true).await.unwrap();
    let report = handle.advance(Duration::from_secs(1)).await.unwrap();
    assert_eq!(report.ticks, 0);
    handle.frame_step().await.unwrap();
    let report = handle.advance(Duration::ZERO).await.unwrap();
    assert_eq!(report.ticks, 1);
    handle.set_master_pause(false).await.unwrap();
    assert_eq!(handle.set_speed(100).await.unwrap(), EngineConfig::DEFAULT_FAST_FORWARD_SPEED);

    handle.quit().await.unwrap();
    handle.run_ticks(3).await.unwrap();
    assert_eq!(
        next(&mut engine_rx).await,
        Event::Engine(EngineEvent::StateChanged {
            from: EngineState::MainGame,
            to: EngineState::EndGame,
        })
    );
    assert_eq!(
        next(&mut engine_rx).await,
        Event::Engine(EngineEvent::Finished { frame: 2 })
    );
    assert_eq!(handle.run_ticks(3).await.unwrap().ticks, 0);

    runtime.shutdown().await.unwrap();
}
