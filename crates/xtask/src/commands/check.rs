//! Check a content directory
//!
//! Loads the manifest, program and stages exactly as the client does, boots
//! the engine and runs it headless with no input, reporting every diagnostic.

use anyhow::Result;
use clap::Parser;
use console::style;
use std::path::PathBuf;
use std::sync::mpsc;

use engine_content::ContentFactory;
use engine_core::{
    DebugEvent, DebugSink, EngineError, EngineState, InputSnapshot, OpcodeRevision, Services,
};

/// Load a content directory, boot it and run it headless
#[derive(Parser)]
pub struct Check {
    /// Directory holding `game.toml`
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Ticks to simulate after boot
    #[arg(short, long, default_value = "600")]
    ticks: u32,

    /// Override the opcode numbering named by the manifest
    #[arg(short, long)]
    revision: Option<OpcodeRevision>,

    /// Fail when any script faults
    #[arg(long)]
    strict: bool,
}

/// Forwards diagnostics out of the engine.
struct ChannelSink(mpsc::Sender<DebugEvent>);

impl DebugSink for ChannelSink {
    fn report(&mut self, event: &DebugEvent) {
        let _ = self.0.send(event.clone());
    }
}

impl Check {
    pub fn execute(self) -> Result<()> {
        let content = ContentFactory::new(&self.dir)
            .opcode_revision(self.revision)
            .load()?;

        println!("{} {}", style("Title:").bold().cyan(), content.title);
        println!(
            "{} {} ({} functions)",
            style("Program:").bold().cyan(),
            content.config.opcode_revision,
            content.program.functions().len()
        );
        println!("{} {}", style("Stages:").bold().cyan(), content.scenes.len());
        println!();

        let (tx, rx) = mpsc::channel();
        let mut engine = content.into_engine(Services::default().with_debug(ChannelSink(tx)))?;

        let mut ran = 0;
        while ran < self.ticks && !engine.is_finished() {
            engine.step(InputSnapshot::default());
            ran += 1;
        }

        let mut faults = 0;
        for event in rx.try_iter() {
            match event {
                DebugEvent::ScriptFault { slot, type_id, error } => {
                    faults += 1;
                    println!(
                        "  {} {} type {} slot {:?}: {}",
                        style("fault").red().bold(),
                        style(error.error_code()).red(),
                        type_id,
                        slot,
                        error
                    );
                }
                DebugEvent::PoolExhausted { capacity, type_id } => println!(
                    "  {} pool of {} full, type {} dropped",
                    style("warn").yellow().bold(),
                    capacity,
                    type_id
                ),
                DebugEvent::StageLoaded {
                    index,
                    spawned,
                    dropped,
                } => println!(
                    "  {} stage {} ({} spawned, {} dropped)",
                    style("load").green(),
                    index,
                    spawned,
                    dropped
                ),
                DebugEvent::StateChanged { from, to } => {
                    println!("  {} {} -> {}", style("state").cyan(), from, to)
                }
                DebugEvent::ScriptLog { .. } => {}
            }
        }

        println!();
        println!("{} {}", style("Ticks:").bold().cyan(), ran);
        println!("{} {}", style("State:").bold().cyan(), engine.state());
        match engine.stage() {
            Some(stage) => println!(
                "{} {} ({})",
                style("Stage:").bold().cyan(),
                stage.index,
                stage.name
            ),
            None => println!("{} none", style("Stage:").bold().cyan()),
        }
        println!(
            "{} {}",
            style("Entities:").bold().cyan(),
            engine.active_entities().count()
        );
        println!(
            "{} {}",
            style("Digest:").bold().cyan(),
            hex::encode(engine.digest())
        );

        if engine.state() == EngineState::ScriptError || (self.strict && faults > 0) {
            anyhow::bail!("{} script fault(s)", faults);
        }
        println!();
        println!("{}", style("✓ Content OK").green().bold());
        Ok(())
    }
}
