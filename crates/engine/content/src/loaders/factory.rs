//! Content factory for building an engine from a content directory.

use std::path::{Path, PathBuf};

use engine_core::{Engine, EngineConfig, OpcodeRevision, Program, SceneManifest, Services};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, ProgramLoader, SceneLoader, read_file};

/// `game.toml`: engine settings plus the files that make up the game.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameManifest {
    #[serde(default)]
    pub title: String,
    /// Bytecode container, relative to the content directory.
    pub bytecode: String,
    /// Stage manifests in stage-index order.
    pub stages: Vec<String>,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Everything an [`Engine`] needs, read and validated.
#[derive(Clone, Debug)]
pub struct Content {
    pub title: String,
    pub config: EngineConfig,
    pub bytecode: Vec<u8>,
    pub program: Program,
    pub scenes: Vec<SceneManifest>,
}

impl Content {
    /// Boots an engine on stage 0.
    pub fn into_engine(self, services: Services) -> LoadResult<Engine> {
        Engine::load(self.config, &self.bytecode, &self.scenes, services)
            .map_err(|e| anyhow::anyhow!("Content for \"{}\" rejected: {}", self.title, e))
    }
}

/// Content factory that loads all game content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// content_dir/
/// ├── game.toml
/// ├── game.rsbc
/// └── stages/
///     ├── green_hill_1.ron
///     └── green_hill_2.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
    revision: Option<OpcodeRevision>,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            revision: None,
        }
    }

    /// Decode bytecode with `revision` instead of the one `game.toml` names.
    pub fn opcode_revision(mut self, revision: Option<OpcodeRevision>) -> Self {
        self.revision = revision;
        self
    }

    /// Load `game.toml`, applying the revision override if one is set.
    pub fn load_manifest(&self) -> LoadResult<GameManifest> {
        let path = self.data_dir.join("game.toml");
        let content = read_file(&path)?;
        let mut manifest: GameManifest = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        if let Some(revision) = self.revision {
            manifest.engine.opcode_revision = revision;
        }
        Ok(manifest)
    }

    /// Load the bytecode named by the manifest under its configured revision.
    pub fn load_program(&self, manifest: &GameManifest) -> LoadResult<(Vec<u8>, Program)> {
        ProgramLoader::load(
            &self.data_dir.join(&manifest.bytecode),
            manifest.engine.opcode_revision,
        )
    }

    /// Load every stage manifest in order.
    pub fn load_scenes(&self, manifest: &GameManifest) -> LoadResult<Vec<SceneManifest>> {
        manifest
            .stages
            .iter()
            .map(|stage| SceneLoader::load(&self.data_dir.join(stage)))
            .collect()
    }

    /// Load the whole directory.
    pub fn load(&self) -> LoadResult<Content> {
        let manifest = self.load_manifest()?;
        let (bytecode, program) = self.load_program(&manifest)?;
        let scenes = self.load_scenes(&manifest)?;
        tracing::info!(
            dir = %self.data_dir.display(),
            title = %manifest.title,
            stages = scenes.len(),
            "content loaded"
        );
        Ok(Content {
            title: manifest.title,
            config: manifest.engine,
            bytecode,
            program,
            scenes,
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::script::{Assembler, EntityField};
    use engine_core::{EngineState, InputSnapshot, Opcode, OpcodeRevision};

    const GAME: &str = r#"
title = "Test Zone"
bytecode = "game.rsbc"
stages = ["stages/one.ron"]

[engine]
pool_capacity = 8
opcode_revision = "legacy"
"#;

    const STAGE: &str = r#"(
        name: "one",
        object_types: [(name: "walker", main: Some("walk"))],
        layers: [(width: 2, height: 2, tiles: [0, 0, 0, 0])],
        spawns: [(object: "walker", x: 4, y: 4)],
    )"#;

    fn write_content(dir: &Path, revision: OpcodeRevision) {
        let mut asm = Assembler::new();
        asm.begin_function("walk")
            .field(Opcode::GetField, EntityField::X)
            .push_int(1 << 16)
            .op(Opcode::Add)
            .field(Opcode::SetField, EntityField::X)
            .op(Opcode::End);
        std::fs::create_dir_all(dir.join("stages")).unwrap();
        std::fs::write(dir.join("game.toml"), GAME).unwrap();
        std::fs::write(dir.join("game.rsbc"), asm.build(revision).unwrap()).unwrap();
        std::fs::write(dir.join("stages/one.ron"), STAGE).unwrap();
    }

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
    }

    #[test]
    fn loads_directory_and_boots_engine() {
        let dir = tempfile::tempdir().unwrap();
        write_content(dir.path(), OpcodeRevision::Legacy);

        let content = ContentFactory::new(dir.path()).load().unwrap();
        assert_eq!(content.title, "Test Zone");
        assert_eq!(content.config.pool_capacity, 8);
        assert_eq!(content.scenes.len(), 1);

        let mut engine = content.into_engine(Services::default()).unwrap();
        engine.step(InputSnapshot::default());
        assert_eq!(engine.state(), EngineState::MainGame);
        let (_, walker) = engine.active_entities().next().unwrap();
        assert_eq!(walker.pixel_position(), (5, 4));
    }

    #[test]
    fn revision_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_content(dir.path(), OpcodeRevision::Current);
        let err = ContentFactory::new(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("Invalid bytecode"), "{err}");
    }

    #[test]
    fn revision_override_wins_over_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_content(dir.path(), OpcodeRevision::Current);
        let content = ContentFactory::new(dir.path())
            .opcode_revision(Some(OpcodeRevision::Current))
            .load()
            .unwrap();
        assert_eq!(content.config.opcode_revision, OpcodeRevision::Current);
    }

    #[test]
    fn missing_stage_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write_content(dir.path(), OpcodeRevision::Legacy);
        std::fs::remove_file(dir.path().join("stages/one.ron")).unwrap();
        let err = ContentFactory::new(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("one.ron"), "{err}");
    }
}
