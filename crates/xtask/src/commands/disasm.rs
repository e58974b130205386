//! Disassemble bytecode files
//!
//! Validates the file under the chosen opcode numbering, then lists every
//! function with its instructions.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::PathBuf;

use engine_core::{OpcodeRevision, Program};

/// Disassemble a bytecode file
#[derive(Parser)]
pub struct Disasm {
    /// Bytecode file to read
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Opcode numbering the file was built with
    #[arg(short, long, default_value = "current")]
    revision: OpcodeRevision,

    /// Only show this function
    #[arg(short, long, value_name = "NAME")]
    function: Option<String>,

    /// Print the constant pool and tables as well
    #[arg(long)]
    pools: bool,
}

impl Disasm {
    pub fn execute(self) -> Result<()> {
        let bytes = std::fs::read(&self.file)
            .with_context(|| format!("Failed to read bytecode: {}", self.file.display()))?;
        let program = Program::load(&bytes, self.revision)
            .with_context(|| format!("Rejected bytecode: {}", self.file.display()))?;

        println!("{} {}", style("File:").bold().cyan(), self.file.display());
        println!("{} {}", style("Revision:").bold().cyan(), program.revision());
        println!(
            "{} {} functions, {} instructions",
            style("Size:").bold().cyan(),
            program.functions().len(),
            program.code().len()
        );

        if self.pools {
            print_pools(&program);
        }

        match &self.function {
            Some(name) => {
                let id = program
                    .function_by_name(name)
                    .with_context(|| format!("No function named {:?}", name))?;
                let Some(function) = program.function(id) else {
                    anyhow::bail!("Function {} missing from table", id);
                };
                println!();
                println!("{} {}", style(format!("fn{}", function.id)).bold().green(), function.name);
                for pc in function.entry..function.end {
                    if let Some(instruction) = program.instruction(pc) {
                        println!("  {}  {}", style(format!("{pc:>5}")).dim(), instruction);
                    }
                }
            }
            None => {
                println!();
                print!("{}", program.disassemble());
            }
        }

        Ok(())
    }
}

fn print_pools(program: &Program) {
    println!();
    println!("{}", style("Constants:").bold().yellow());
    for (index, value) in program.constants().iter().enumerate() {
        println!("  [{index}] {value}");
    }
    if !program.strings().is_empty() {
        println!("{}", style("Strings:").bold().yellow());
        for (index, value) in program.strings().iter().enumerate() {
            println!("  [{index}] {value:?}");
        }
    }
    println!("{}", style("Tables:").bold().yellow());
    for (index, table) in program.tables().iter().enumerate() {
        println!("  [{index}] {} entries {:?}", table.len(), table);
    }
}
