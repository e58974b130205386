use super::Input;

bitflags::bitflags! {
    /// Controller buttons. Scripts address them by bit index.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Buttons: u16 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const A = 1 << 4;
        const B = 1 << 5;
        const C = 1 << 6;
        const X = 1 << 7;
        const Y = 1 << 8;
        const Z = 1 << 9;
        const START = 1 << 10;
        const SELECT = 1 << 11;
    }
}

impl Buttons {
    /// Number of addressable buttons.
    pub const COUNT: i32 = 12;

    /// Button for a script bit index, `None` outside `0..COUNT`.
    pub fn from_index(index: i32) -> Option<Buttons> {
        if (0..Self::COUNT).contains(&index) {
            Buttons::from_bits(1 << index)
        } else {
            None
        }
    }
}

/// Touch or mouse state in screen pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointerState {
    pub x: i32,
    pub y: i32,
    pub down: bool,
}

/// Input captured once at the start of a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InputSnapshot {
    pub held: Buttons,
    /// Buttons that went down this tick.
    pub pressed: Buttons,
    pub pointer: Option<PointerState>,
}

impl InputSnapshot {
    /// Snapshot for `held`, deriving `pressed` from the previous tick's held set.
    pub fn from_held(held: Buttons, previous: Buttons) -> Self {
        Self {
            held,
            pressed: held & !previous,
            pointer: None,
        }
    }

    pub fn with_pointer(mut self, pointer: PointerState) -> Self {
        self.pointer = Some(pointer);
        self
    }
}

/// No buttons, no pointer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullInput;

impl Input for NullInput {
    fn poll(&mut self) -> InputSnapshot {
        InputSnapshot::default()
    }
}

/// Plays back a fixed sequence of held-button frames, then releases everything.
#[derive(Clone, Debug, Default)]
pub struct ReplayInput {
    frames: Vec<Buttons>,
    cursor: usize,
    previous: Buttons,
}

impl ReplayInput {
    pub fn new(frames: Vec<Buttons>) -> Self {
        Self {
            frames,
            cursor: 0,
            previous: Buttons::empty(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len().saturating_sub(self.cursor)
    }
}

impl Input for ReplayInput {
    fn poll(&mut self) -> InputSnapshot {
        let held = self.frames.get(self.cursor).copied().unwrap_or_default();
        self.cursor += 1;
        let snapshot = InputSnapshot::from_held(held, self.previous);
        self.previous = held;
        snapshot
    }
}
