//! Built-in two-stage demo, used when no content directory is configured.
//!
//! The player runs right over a flat floor, collecting rings (global 0 counts
//! them). Holding A jumps. The goal of the first stage loads the second; the
//! goal of the second ends the game.

use anyhow::Context;

use engine_content::Content;
use engine_core::collision::Hitbox;
use engine_core::scene::{
    LayerSpec, ObjectTypeSpec, SceneManifest, Solidity, SpawnSpec, TileMaskSpec,
};
use engine_core::script::{Assembler, EntityField, Opcode};
use engine_core::{EngineConfig, EngineState, Fixed, OpcodeRevision, OverlapMode, Program};

pub const RING_SOUND: i32 = 1;
/// Global variable holding the ring count.
pub const RING_GLOBAL: u16 = 0;
pub const STAGE_RINGS: [usize; 2] = [20, 10];

const WIDTH: u32 = 64;
const HEIGHT: u32 = 15;
const FLOOR_ROW: u32 = 12;
const FLOOR_Y: i32 = (FLOOR_ROW as i32) * EngineConfig::TILE_SIZE;
const A_BUTTON: i32 = 4;

fn px(n: i32) -> i32 {
    Fixed::from_int(n).raw()
}

pub fn program(revision: OpcodeRevision) -> anyhow::Result<Vec<u8>> {
    let mut asm = Assembler::new();

    let grounded = asm.label();
    asm.begin_function("player_main")
        .push_int(px(2))
        .field(Opcode::SetField, EntityField::XVel)
        .field(Opcode::GetField, EntityField::YVel)
        .push_int(px(1) / 4)
        .op(Opcode::Add)
        .field(Opcode::SetField, EntityField::YVel)
        .push_int(A_BUTTON)
        .op(Opcode::InputHeld)
        .jump(Opcode::JumpIfZero, grounded)
        .field(Opcode::GetField, EntityField::OnGround)
        .jump(Opcode::JumpIfZero, grounded)
        .push_int(-px(4))
        .field(Opcode::SetField, EntityField::YVel)
        .bind(grounded)
        .op(Opcode::End);

    let missed = asm.label();
    asm.begin_function("ring_touch")
        .op(Opcode::PlayerSlot)
        .index(Opcode::Overlap, OverlapMode::SensorVsSolid as u16)
        .jump(Opcode::JumpIfZero, missed)
        .push_int(RING_SOUND)
        .op(Opcode::PlaySound)
        .index(Opcode::LoadGlobal, RING_GLOBAL)
        .push_int(1)
        .op(Opcode::Add)
        .op(Opcode::Dup)
        .index(Opcode::StoreGlobal, RING_GLOBAL)
        .op(Opcode::Log)
        .op(Opcode::Destroy)
        .bind(missed)
        .op(Opcode::End);

    let not_yet = asm.label();
    asm.begin_function("goal_next")
        .op(Opcode::PlayerSlot)
        .index(Opcode::Overlap, OverlapMode::SensorVsSolid as u16)
        .jump(Opcode::JumpIfZero, not_yet)
        .push_int(1)
        .op(Opcode::LoadStage)
        .bind(not_yet)
        .op(Opcode::End);

    let running = asm.label();
    let end_code = EngineState::EndGame.code().unwrap_or_default();
    asm.begin_function("goal_end")
        .op(Opcode::PlayerSlot)
        .index(Opcode::Overlap, OverlapMode::SensorVsSolid as u16)
        .jump(Opcode::JumpIfZero, running)
        .push_int(end_code)
        .op(Opcode::SetEngineState)
        .bind(running)
        .op(Opcode::End);

    asm.build(revision).context("Failed to assemble demo program")
}

fn object_types(goal: &str) -> Vec<ObjectTypeSpec> {
    let mut player = ObjectTypeSpec::new("player");
    player.main = Some("player_main".into());
    player.player = true;
    player.tile_collision = true;
    player.hitboxes = vec![Hitbox::solid(-8, -16, 8, 0)];

    let mut ring = ObjectTypeSpec::new("ring");
    ring.player_interaction = Some("ring_touch".into());
    ring.hitboxes = vec![Hitbox::sensor(-8, -8, 8, 8)];

    let mut post = ObjectTypeSpec::new("goal");
    post.player_interaction = Some(goal.into());
    post.hitboxes = vec![Hitbox::sensor(-8, -32, 8, 0)];

    vec![player, ring, post]
}

fn stage(name: &str, goal_fn: &str, rings: usize, goal_x: i32) -> SceneManifest {
    let mut tiles = vec![0u16; (WIDTH * HEIGHT) as usize];
    for row in FLOOR_ROW..HEIGHT {
        for column in 0..WIDTH {
            tiles[(row * WIDTH + column) as usize] = 1;
        }
    }

    let mut spawns = vec![SpawnSpec {
        object: "player".into(),
        x: 24,
        y: 150,
        subtype: 0,
    }];
    spawns.extend((0..rings).map(|i| SpawnSpec {
        object: "ring".into(),
        x: 80 + 40 * i as i32,
        y: FLOOR_Y - 8,
        subtype: 0,
    }));
    spawns.push(SpawnSpec {
        object: "goal".into(),
        x: goal_x,
        y: FLOOR_Y,
        subtype: 0,
    });

    SceneManifest {
        name: name.into(),
        object_types: object_types(goal_fn),
        layers: vec![LayerSpec {
            width: WIDTH,
            height: HEIGHT,
            tiles,
            ..LayerSpec::default()
        }],
        collision_layer: 0,
        tile_masks: vec![TileMaskSpec {
            tile: 1,
            solidity: Solidity::ALL,
            angle: 0,
            heights: None,
        }],
        spawns,
    }
}

pub fn scenes() -> Vec<SceneManifest> {
    vec![
        stage("demo_zone_1", "goal_next", STAGE_RINGS[0], 900),
        stage("demo_zone_2", "goal_end", STAGE_RINGS[1], 500),
    ]
}

pub fn content(revision: OpcodeRevision) -> anyhow::Result<Content> {
    let bytecode = program(revision)?;
    let program = Program::load(&bytecode, revision).context("Demo program failed validation")?;
    Ok(Content {
        title: "Demo Zone".into(),
        config: EngineConfig::default().with_opcode_revision(revision),
        bytecode,
        program,
        scenes: scenes(),
    })
}
