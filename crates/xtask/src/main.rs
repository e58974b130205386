//! Development tasks for the retro engine
//!
//! This binary provides development utilities using the cargo-xtask pattern.
//! Run with: `cargo xtask <command>`

mod commands;
mod dirs;

use anyhow::Result;
use clap::Parser;
use commands::{Check, Clean, Disasm, ReadScene, TailLogs};

/// Development tasks for the retro engine
#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tools for the retro engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Disassemble a bytecode file
    Disasm(Disasm),

    /// Load a content directory, boot it and run it headless
    Check(Check),

    /// Read and inspect a scene manifest
    ReadScene(ReadScene),

    /// Monitor client logs in real-time
    TailLogs(TailLogs),

    /// Clean client logs
    Clean(Clean),
}

fn main() -> Result<()> {
    // Load .env file if it exists (for RETRO_LOG_DIR and other env vars)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Command::Disasm(cmd) => cmd.execute(),
        Command::Check(cmd) => cmd.execute(),
        Command::ReadScene(cmd) => cmd.execute(),
        Command::TailLogs(cmd) => cmd.execute(),
        Command::Clean(cmd) => cmd.execute(),
    }
}
