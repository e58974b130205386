//! Data-driven content for the engine.
//!
//! Loads the files a game ships with into `engine-core` types:
//! - Engine configuration (TOML)
//! - Scene manifests (RON)
//! - Compiled script bytecode (RSBC containers)
//! - A content directory tying them together through `game.toml`
//!
//! Nothing here runs scripts. Validation stops at what `engine-core`
//! checks while loading, so a directory that loads here also boots.

pub mod loaders;

pub use loaders::{
    Content, ContentFactory, ConfigLoader, GameManifest, LoadResult, ProgramLoader, SceneLoader,
};
