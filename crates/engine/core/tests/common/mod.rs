#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use engine_core::scene::{LayerSpec, ObjectTypeSpec, SceneManifest, SpawnSpec};
use engine_core::services::{Audio, DebugEvent, DebugSink, TracingDebugSink};
use engine_core::{Assembler, Engine, EngineConfig, Fixed, OpcodeRevision, Services};

/// Sounds played, shared with the test body.
#[derive(Clone, Default)]
pub struct RecordingAudio(pub Arc<Mutex<Vec<i32>>>);

impl Audio for RecordingAudio {
    fn play_sound(&mut self, sound: i32) {
        self.0.lock().unwrap().push(sound);
    }
    fn stop_sound(&mut self, _sound: i32) {}
    fn play_music(&mut self, _track: i32) {}
    fn stop_music(&mut self) {}
}

/// Debug events, forwarded to tracing as well.
#[derive(Clone, Default)]
pub struct RecordingDebug(pub Arc<Mutex<Vec<DebugEvent>>>);

impl DebugSink for RecordingDebug {
    fn report(&mut self, event: &DebugEvent) {
        TracingDebugSink.report(event);
        self.0.lock().unwrap().push(event.clone());
    }
}

impl RecordingDebug {
    pub fn events(&self) -> Vec<DebugEvent> {
        self.0.lock().unwrap().clone()
    }
}

pub struct Recorders {
    pub sounds: RecordingAudio,
    pub debug: RecordingDebug,
}

impl Recorders {
    pub fn new() -> Self {
        Self {
            sounds: RecordingAudio::default(),
            debug: RecordingDebug::default(),
        }
    }

    pub fn services(&self) -> Services {
        Services::new()
            .with_audio(self.sounds.clone())
            .with_debug(self.debug.clone())
    }

    pub fn sounds(&self) -> Vec<i32> {
        self.sounds.0.lock().unwrap().clone()
    }
}

pub fn px(n: i32) -> i32 {
    Fixed::from_int(n).raw()
}

pub fn bytecode(revision: OpcodeRevision, build: impl FnOnce(&mut Assembler)) -> Vec<u8> {
    let mut asm = Assembler::new();
    build(&mut asm);
    asm.build(revision).expect("assembler input is valid")
}

pub fn object(name: &str) -> ObjectTypeSpec {
    ObjectTypeSpec::new(name)
}

pub fn spawn(object: &str, x: i32, y: i32) -> SpawnSpec {
    SpawnSpec {
        object: object.into(),
        x,
        y,
        subtype: 0,
    }
}

/// A stage with one empty 32x16 layer.
pub fn manifest(name: &str, object_types: Vec<ObjectTypeSpec>, spawns: Vec<SpawnSpec>) -> SceneManifest {
    SceneManifest {
        name: name.into(),
        object_types,
        layers: vec![LayerSpec {
            width: 32,
            height: 16,
            tiles: vec![0; 32 * 16],
            ..LayerSpec::default()
        }],
        collision_layer: 0,
        tile_masks: Vec::new(),
        spawns,
    }
}

pub fn engine(
    config: EngineConfig,
    bytes: &[u8],
    manifests: &[SceneManifest],
    recorders: &Recorders,
) -> Engine {
    Engine::load(config, bytes, manifests, recorders.services()).expect("content loads")
}
