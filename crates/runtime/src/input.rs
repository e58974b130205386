//! Host input fed into the worker's engine.

use tokio::sync::watch;

use engine_core::services::{Buttons, Input, InputSnapshot};

/// [`Input`] backed by a watch channel the [`RuntimeHandle`](crate::RuntimeHandle) writes.
///
/// Each poll samples the latest held set; `pressed` is derived from the
/// previous poll, so a tap shorter than a tick is lost.
pub struct SharedInput {
    held: watch::Receiver<Buttons>,
    previous: Buttons,
}

impl SharedInput {
    pub fn channel() -> (watch::Sender<Buttons>, SharedInput) {
        let (tx, rx) = watch::channel(Buttons::empty());
        (
            tx,
            SharedInput {
                held: rx,
                previous: Buttons::empty(),
            },
        )
    }
}

impl Input for SharedInput {
    fn poll(&mut self) -> InputSnapshot {
        let held = *self.held.borrow_and_update();
        let snapshot = InputSnapshot::from_held(held, self.previous);
        self.previous = held;
        snapshot
    }
}
