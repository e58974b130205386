mod common;

use common::*;
use engine_core::collision::Hitbox;
use engine_core::scene::{SceneManifest, Solidity, TileMaskSpec};
use engine_core::script::{EntityField, Opcode};
use engine_core::{Engine, EngineConfig, Fixed, InputSnapshot, OpcodeRevision, SlotId};

const FLOOR_ROW: usize = 10;

/// Solid floor along tile row 10, i.e. pixel row 160.
fn floored(mut manifest: SceneManifest) -> SceneManifest {
    let layer = &mut manifest.layers[0];
    let width = layer.width as usize;
    for column in 0..width {
        layer.tiles[FLOOR_ROW * width + column] = 1;
    }
    manifest.tile_masks.push(TileMaskSpec {
        tile: 1,
        solidity: Solidity::ALL,
        angle: 0,
        heights: None,
    });
    manifest
}

fn walker(name: &str, main: Option<&str>) -> engine_core::scene::ObjectTypeSpec {
    let mut spec = object(name);
    spec.main = main.map(Into::into);
    spec.tile_collision = true;
    spec.hitboxes = vec![Hitbox::solid(-8, -16, 8, 0)];
    spec
}

fn gravity_engine() -> Engine {
    let bytes = bytecode(OpcodeRevision::Current, |asm| {
        asm.begin_function("fall")
            .field(Opcode::GetField, EntityField::YVel)
            .push_int(Fixed::ONE.raw() / 4)
            .op(Opcode::Add)
            .field(Opcode::SetField, EntityField::YVel)
            .op(Opcode::End);
    });
    let stage = floored(manifest(
        "floor",
        vec![walker("faller", Some("fall")), walker("statue", None)],
        vec![spawn("faller", 40, 100), spawn("statue", 120, 160)],
    ));
    Engine::load(EngineConfig::default(), &bytes, &[stage], Recorders::new().services())
        .expect("content loads")
}

#[test]
fn falling_entity_lands_on_the_floor_and_stays() {
    let mut engine = gravity_engine();
    for _ in 0..60 {
        engine.step(InputSnapshot::default());
    }
    let landed = engine.entity(SlotId(0)).unwrap();
    assert_eq!(landed.pixel_position(), (40, 160));
    assert!(landed.on_ground());

    for _ in 0..30 {
        engine.step(InputSnapshot::default());
        let entity = engine.entity(SlotId(0)).unwrap();
        assert_eq!(entity.pixel_position(), (40, 160));
        assert!(entity.on_ground());
    }
}

#[test]
fn resting_entity_is_unchanged_by_resolution() {
    let mut engine = gravity_engine();
    engine.step(InputSnapshot::default());
    let before = engine.entity(SlotId(1)).unwrap().clone();
    assert!(before.on_ground());

    for _ in 0..10 {
        let report = engine.step(InputSnapshot::default());
        assert_eq!(report.collision.unwrap().ejected, 0);
        let after = engine.entity(SlotId(1)).unwrap();
        assert_eq!((after.x, after.y), (before.x, before.y));
        assert_eq!(after.flags, before.flags);
    }
}
