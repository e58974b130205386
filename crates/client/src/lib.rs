//! Headless host for the engine.
//!
//! The `retro` binary is the composition root: it reads [`ClientConfig`] from
//! the environment, installs logging, loads content (a directory or the
//! built-in [`demo`]), starts the [`runtime`] and drives it either for a fixed
//! number of ticks or in real time until the game ends.

pub mod config;
pub mod demo;
pub mod logging;
pub mod services;
pub mod session;

pub use config::ClientConfig;
pub use session::{Session, SessionSummary};
