//! Read and inspect scene manifests
//!
//! Parses a RON stage file the way the content loader does and displays it.

use anyhow::Result;
use clap::Parser;
use console::style;
use std::collections::BTreeMap;
use std::path::PathBuf;

use engine_content::SceneLoader;
use engine_core::SceneManifest;

/// Read and inspect a scene manifest
#[derive(Parser)]
pub struct ReadScene {
    /// Stage file to read (RON)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "summary")]
    format: OutputFormat,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Object types, layers and spawn counts
    Summary,
    /// Full JSON output
    Json,
    /// Pretty-printed debug format
    Debug,
}

impl ReadScene {
    pub fn execute(self) -> Result<()> {
        let manifest = SceneLoader::load(&self.file)?;

        match self.format {
            OutputFormat::Summary => print_summary(&manifest),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&manifest)?),
            OutputFormat::Debug => println!("{:#?}", manifest),
        }

        Ok(())
    }
}

fn print_summary(manifest: &SceneManifest) {
    println!("{}", style(format!("=== {} ===", manifest.name)).bold().green());
    println!();

    println!("{}", style("Object Types:").bold().yellow());
    for spec in &manifest.object_types {
        let mut flags = Vec::new();
        if spec.player {
            flags.push("player");
        }
        if spec.pause_exempt {
            flags.push("pause-exempt");
        }
        if spec.tile_collision {
            flags.push("tiles");
        }
        let hooks: Vec<String> = [
            ("startup", &spec.startup),
            ("main", &spec.main),
            ("interact", &spec.player_interaction),
            ("draw", &spec.draw),
        ]
        .into_iter()
        .filter_map(|(hook, function)| function.as_ref().map(|f| format!("{hook}={f}")))
        .collect();
        println!(
            "  {} [{}] {} ({} hitboxes)",
            style(&spec.name).cyan(),
            flags.join(","),
            hooks.join(" "),
            spec.hitboxes.len()
        );
    }
    println!();

    println!("{}", style("Layers:").bold().yellow());
    for (index, layer) in manifest.layers.iter().enumerate() {
        let marker = if index == manifest.collision_layer { " (collision)" } else { "" };
        let filled = layer.tiles.iter().filter(|tile| **tile != 0).count();
        println!(
            "  [{index}] {}x{} tiles, {} filled{}",
            layer.width, layer.height, filled, marker
        );
    }
    println!("  Tile masks: {}", manifest.tile_masks.len());
    println!();

    let mut spawns: BTreeMap<&str, usize> = BTreeMap::new();
    for spawn in &manifest.spawns {
        *spawns.entry(spawn.object.as_str()).or_default() += 1;
    }
    println!(
        "{} {}",
        style("Spawns:").bold().yellow(),
        manifest.spawns.len()
    );
    for (object, count) in spawns {
        println!("  {object}: {count}");
    }
}
