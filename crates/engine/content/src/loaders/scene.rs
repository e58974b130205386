//! Scene manifest loader.

use std::path::Path;

use engine_core::SceneManifest;

use crate::loaders::{LoadResult, read_file};

/// Loader for scene manifests from RON files.
///
/// ```ron
/// (
///     name: "green_hill_1",
///     object_types: [
///         (name: "player", main: Some("player_main"), player: true, tile_collision: true,
///          hitboxes: [(left: -8, top: -16, right: 8, bottom: 0)]),
///     ],
///     layers: [(width: 4, height: 2, tiles: [0, 0, 0, 0, 1, 1, 1, 1])],
///     tile_masks: [(tile: 1)],
///     spawns: [(object: "player", x: 16, y: 0)],
/// )
/// ```
pub struct SceneLoader;

impl SceneLoader {
    pub fn load(path: &Path) -> LoadResult<SceneManifest> {
        let content = read_file(path)?;
        Self::parse(&content).map_err(|e| anyhow::anyhow!("{} in {}", e, path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<SceneManifest> {
        ron::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse scene RON: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::scene::Solidity;
    use engine_core::{BoxKind, Fixed};

    const STAGE: &str = r#"(
        name: "green_hill_1",
        object_types: [
            (
                name: "player",
                main: Some("player_main"),
                player: true,
                tile_collision: true,
                hitboxes: [(left: -8, top: -16, right: 8, bottom: 0)],
            ),
            (name: "ring", hitboxes: [(left: -8, top: -8, right: 8, bottom: 8, kind: sensor)]),
        ],
        layers: [(width: 4, height: 2, tiles: [0, 0, 0, 0, 1, 1, 1, 1])],
        tile_masks: [(tile: 1), (tile: 2, solidity: "TOP", heights: Some([8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8]))],
        spawns: [(object: "player", x: 16, y: 0), (object: "ring", x: 40, y: 8, subtype: 2)],
    )"#;

    #[test]
    fn parses_manifest_with_defaults() {
        let manifest = SceneLoader::parse(STAGE).unwrap();
        assert_eq!(manifest.name, "green_hill_1");
        assert_eq!(manifest.object_types.len(), 2);
        assert!(manifest.object_types[0].player);
        assert_eq!(manifest.object_types[0].hitboxes[0].kind, BoxKind::Solid);
        assert_eq!(manifest.object_types[1].hitboxes[0].kind, BoxKind::Sensor);
        assert_eq!(manifest.layers[0].parallax, Fixed::ONE.raw());
        assert_eq!(manifest.collision_layer, 0);
        assert_eq!(manifest.tile_masks[0].solidity, Solidity::ALL);
        assert_eq!(manifest.tile_masks[1].solidity, Solidity::TOP);
        assert_eq!(manifest.spawns[1].subtype, 2);
    }

    #[test]
    fn reports_syntax_errors() {
        let err = SceneLoader::parse("(name: ").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse scene RON"));
    }
}
