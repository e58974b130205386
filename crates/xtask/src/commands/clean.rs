//! Clean client logs command
//!
//! Safety: Always prompts for confirmation before deletion.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::io::{self, Write};

use crate::dirs;

/// Clean client logs
#[derive(Parser, Debug)]
pub struct Clean {
    /// Skip confirmation prompt (dangerous!)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Specific session to clean (defaults to every session)
    #[arg(long)]
    pub session: Option<String>,
}

impl Clean {
    pub fn execute(self) -> Result<()> {
        let log_dir = dirs::log_dir()?;

        let target = match &self.session {
            Some(session_id) => {
                let session_dir = log_dir.join(session_id);
                if !session_dir.exists() {
                    eprintln!(
                        "{} Session not found: {}",
                        style("✗").red().bold(),
                        style(session_id).cyan()
                    );
                    anyhow::bail!("Session directory does not exist");
                }
                (format!("Session logs ({})", session_id), session_dir)
            }
            None if log_dir.exists() => {
                let count = dirs::list_sessions(&log_dir)?.len();
                (format!("All logs ({} sessions)", count), log_dir)
            }
            None => {
                println!("{}", style("Nothing to clean - no logs yet").dim());
                return Ok(());
            }
        };

        let (label, path) = target;
        println!("{}", style("Clean client logs").yellow().bold());
        println!();
        println!("The following will be deleted:");
        println!("  {} {}", style("→").cyan(), style(&label).bold());
        println!("    {}", style(path.display()).dim());
        println!();

        if !self.yes && !confirm()? {
            println!("{}", style("Cancelled").dim());
            return Ok(());
        }

        print!("Deleting {}... ", label);
        io::stdout().flush()?;
        std::fs::remove_dir_all(&path)
            .with_context(|| format!("Failed to delete: {}", path.display()))?;
        println!("{}", style("✓").green());

        Ok(())
    }
}

/// Prompt user for confirmation
fn confirm() -> Result<bool> {
    print!("{} ", style("Proceed? [y/N]").yellow().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
