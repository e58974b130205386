//! Collaborators the engine delegates to.
//!
//! Rendering, audio, animation assets, input polling, palettes and persisted
//! userdata live outside the engine. Scripts reach them through intrinsics;
//! the engine only ever calls the traits below. Every call is fire-and-forget
//! from the script's point of view, so implementations must not block.
//!
//! The [`Services`] bundle owns one implementation of each. Its default wires
//! null implementations plus a [`TracingDebugSink`].

mod debug;
mod input;

use core::fmt;
use std::collections::BTreeMap;

pub use debug::{DebugEvent, TracingDebugSink};
pub use input::{Buttons, InputSnapshot, NullInput, PointerState, ReplayInput};

use crate::object::SlotId;

/// Sprite draw request issued by `DrawSprite` or the default draw path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteDraw {
    pub slot: SlotId,
    pub animation: u16,
    pub frame: u16,
    /// Screen position in whole pixels.
    pub x: i32,
    pub y: i32,
    pub direction: u8,
    pub layer: u8,
}

pub trait Drawing: Send {
    fn draw_sprite(&mut self, sprite: &SpriteDraw);
    fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: u32);

    /// Called once after every entity of a rendered frame was drawn.
    fn present(&mut self) {}
}

pub trait Audio: Send {
    fn play_sound(&mut self, sound: i32);
    fn stop_sound(&mut self, sound: i32);
    fn play_music(&mut self, track: i32);
    fn stop_music(&mut self);
}

/// Animation-frame assets live outside the engine; scripts only ask for frames.
pub trait Animation: Send {
    fn set_animation(&mut self, slot: SlotId, animation: u16);

    /// Frame to show for `slot` this tick.
    fn current_frame(&mut self, slot: SlotId, animation: u16) -> u16;
}

pub trait Input: Send {
    fn poll(&mut self) -> InputSnapshot;
}

pub trait Palette: Send {
    /// 0xRRGGBB for palette `index`.
    fn color(&self, index: u8) -> u32;
}

pub trait Userdata: Send {
    fn read(&self, key: i32) -> i32;
    fn write(&mut self, key: i32, value: i32);
}

pub trait DebugSink: Send {
    fn report(&mut self, event: &DebugEvent);
}

// ============================================================================
// Null implementations
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct NullDrawing;

impl Drawing for NullDrawing {
    fn draw_sprite(&mut self, _sprite: &SpriteDraw) {}
    fn draw_rect(&mut self, _x: i32, _y: i32, _width: i32, _height: i32, _color: u32) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullAudio;

impl Audio for NullAudio {
    fn play_sound(&mut self, _sound: i32) {}
    fn stop_sound(&mut self, _sound: i32) {}
    fn play_music(&mut self, _track: i32) {}
    fn stop_music(&mut self) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullAnimation;

impl Animation for NullAnimation {
    fn set_animation(&mut self, _slot: SlotId, _animation: u16) {}

    fn current_frame(&mut self, _slot: SlotId, _animation: u16) -> u16 {
        0
    }
}

/// Grayscale ramp.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPalette;

impl Palette for NullPalette {
    fn color(&self, index: u8) -> u32 {
        let v = index as u32;
        (v << 16) | (v << 8) | v
    }
}

/// Userdata kept in memory for the session.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserdata {
    values: BTreeMap<i32, i32>,
}

impl Userdata for MemoryUserdata {
    fn read(&self, key: i32) -> i32 {
        self.values.get(&key).copied().unwrap_or(0)
    }

    fn write(&mut self, key: i32, value: i32) {
        self.values.insert(key, value);
    }
}

// ============================================================================
// Bundle
// ============================================================================

pub struct Services {
    pub drawing: Box<dyn Drawing>,
    pub audio: Box<dyn Audio>,
    pub animation: Box<dyn Animation>,
    pub input: Box<dyn Input>,
    pub palette: Box<dyn Palette>,
    pub userdata: Box<dyn Userdata>,
    pub debug: Box<dyn DebugSink>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            drawing: Box::new(NullDrawing),
            audio: Box::new(NullAudio),
            animation: Box::new(NullAnimation),
            input: Box::new(NullInput),
            palette: Box::new(NullPalette),
            userdata: Box::new(MemoryUserdata::default()),
            debug: Box::new(TracingDebugSink),
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drawing(mut self, drawing: impl Drawing + 'static) -> Self {
        self.drawing = Box::new(drawing);
        self
    }

    pub fn with_audio(mut self, audio: impl Audio + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_animation(mut self, animation: impl Animation + 'static) -> Self {
        self.animation = Box::new(animation);
        self
    }

    pub fn with_input(mut self, input: impl Input + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn with_palette(mut self, palette: impl Palette + 'static) -> Self {
        self.palette = Box::new(palette);
        self
    }

    pub fn with_userdata(mut self, userdata: impl Userdata + 'static) -> Self {
        self.userdata = Box::new(userdata);
        self
    }

    pub fn with_debug(mut self, debug: impl DebugSink + 'static) -> Self {
        self.debug = Box::new(debug);
        self
    }
}
