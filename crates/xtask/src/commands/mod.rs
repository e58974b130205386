//! Command implementations for xtask
//!
//! Each command is a separate module that implements its own CLI args and execution logic.

mod check;
mod clean;
mod disasm;
mod read_scene;
mod tail_logs;

pub use check::Check;
pub use clean::Clean;
pub use disasm::Disasm;
pub use read_scene::ReadScene;
pub use tail_logs::TailLogs;
