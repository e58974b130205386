mod common;

use common::*;
use engine_core::scene::SceneError;
use engine_core::script::{BuildError, EntityField, Opcode};
use engine_core::Fixed;
use engine_core::{BytecodeError, Engine, EngineConfig, InputSnapshot, LoadError, OpcodeRevision, SlotId};

fn counter_program(revision: OpcodeRevision) -> Vec<u8> {
    bytecode(revision, |asm| {
        asm.begin_function("count")
            .field(Opcode::GetField, EntityField::State)
            .push_int(1)
            .op(Opcode::Add)
            .field(Opcode::SetField, EntityField::State)
            .op(Opcode::End);
    })
}

fn counter_stage() -> engine_core::SceneManifest {
    let mut counter = object("counter");
    counter.main = Some("count".into());
    manifest("counter", vec![counter], vec![spawn("counter", 0, 0)])
}

fn load(config: EngineConfig, bytes: &[u8]) -> Result<Engine, LoadError> {
    Engine::load(config, bytes, &[counter_stage()], Recorders::new().services())
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = counter_program(OpcodeRevision::Current);
    bytes[0] = b'X';
    let err = load(EngineConfig::default(), &bytes).unwrap_err();
    assert!(matches!(err, LoadError::Bytecode(BytecodeError::BadMagic { .. })));
}

#[test]
fn rejects_jump_outside_function() {
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("count")
            .jump_raw(Opcode::Jump, 9_999)
            .op(Opcode::End);
    });
    let err = load(EngineConfig::default(), &bytes).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Bytecode(BytecodeError::JumpOutOfRange { target: 9_999, .. })
    ));
}

#[test]
fn rejects_unknown_opcode_number() {
    // The code section closes the container; its last byte is the `End` opcode.
    let mut bytes = counter_program(OpcodeRevision::Current);
    let last = bytes.len() - 1;
    bytes[last] = 0xFF;
    let err = load(EngineConfig::default(), &bytes).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Bytecode(BytecodeError::UnknownOpcode {
            raw: 0xFF,
            revision: OpcodeRevision::Current,
            ..
        })
    ));
}

#[test]
fn legacy_numbering_rejects_current_only_opcode_number() {
    let beyond_legacy = OpcodeRevision::Legacy.len() as u8;
    assert!(OpcodeRevision::Current.decode(beyond_legacy).is_some());

    let mut bytes = counter_program(OpcodeRevision::Legacy);
    let last = bytes.len() - 1;
    bytes[last] = beyond_legacy;
    let config = EngineConfig::default().with_opcode_revision(OpcodeRevision::Legacy);
    let err = load(config, &bytes).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Bytecode(BytecodeError::UnknownOpcode {
            raw,
            revision: OpcodeRevision::Legacy,
            ..
        }) if raw == beyond_legacy
    ));
}

#[test]
fn rejects_call_to_missing_function_index() {
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("count").call_raw(7).op(Opcode::End);
    });
    let err = load(EngineConfig::default(), &bytes).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Bytecode(BytecodeError::CallOutOfRange {
            function: 7,
            count: 1,
            ..
        })
    ));
}

#[test]
fn rejects_spawn_outside_fixed_range() {
    let bytes = counter_program(OpcodeRevision::Current);
    let mut stage = counter_stage();
    stage.spawns[0].x = 40_000;
    let err = Engine::load(EngineConfig::default(), &bytes, &[stage], Recorders::new().services())
        .unwrap_err();
    assert_eq!(
        err,
        LoadError::Scene(SceneError::SpawnOutOfRange {
            object: "counter".into(),
            x: 40_000,
            y: 0,
            max: Fixed::MAX_INT,
        })
    );
}

#[test]
fn rejects_manifest_naming_missing_function() {
    let bytes = counter_program(OpcodeRevision::Current);
    let mut ghost = object("ghost");
    ghost.main = Some("haunt".into());
    let stage = manifest("haunted", vec![ghost], Vec::new());
    let err = Engine::load(EngineConfig::default(), &bytes, &[stage], Recorders::new().services())
        .unwrap_err();
    assert_eq!(
        err,
        LoadError::Scene(SceneError::UnknownFunction {
            object: "ghost".into(),
            function: "haunt".into(),
        })
    );
}

#[test]
fn legacy_numbering_loads_and_runs() {
    let bytes = counter_program(OpcodeRevision::Legacy);
    let config = EngineConfig::default().with_opcode_revision(OpcodeRevision::Legacy);
    let mut engine = load(config, &bytes).unwrap();
    for _ in 0..3 {
        engine.step(InputSnapshot::default());
    }
    assert_eq!(engine.entity(SlotId(0)).unwrap().state, 3);
}

#[test]
fn legacy_numbering_lacks_newer_opcodes() {
    let mut asm = engine_core::Assembler::new();
    asm.begin_function("swap")
        .push_int(1)
        .push_int(2)
        .op(Opcode::Swap)
        .op(Opcode::End);
    assert_eq!(
        asm.build(OpcodeRevision::Legacy),
        Err(BuildError::OpcodeUnavailable {
            op: Opcode::Swap,
            revision: OpcodeRevision::Legacy,
        })
    );
    assert!(asm.build(OpcodeRevision::Current).is_ok());
}

#[test]
fn host_stage_request_is_validated() {
    let bytes = counter_program(OpcodeRevision::Current);
    let mut engine = load(EngineConfig::default(), &bytes).unwrap();
    let err = engine
        .request(engine_core::HostRequest::LoadStage(4))
        .unwrap_err();
    assert_eq!(err, SceneError::UnknownStage { index: 4, count: 1 });
}
