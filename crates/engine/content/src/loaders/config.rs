//! Engine configuration loader.

use std::path::Path;

use engine_core::EngineConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for engine configuration from TOML files.
///
/// Every key is optional; missing keys keep [`EngineConfig::default`] values.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("{} in {}", e, path.display()))
    }

    pub fn parse(content: &str) -> LoadResult<EngineConfig> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        if config.pool_capacity > EngineConfig::MAX_POOL_CAPACITY {
            tracing::warn!(
                requested = config.pool_capacity,
                max = EngineConfig::MAX_POOL_CAPACITY,
                "pool capacity clamped"
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::OpcodeRevision;

    #[test]
    fn missing_keys_keep_defaults() {
        let config = ConfigLoader::parse("pool_capacity = 64\nopcode_revision = \"legacy\"\n").unwrap();
        assert_eq!(config.pool_capacity, 64);
        assert_eq!(config.opcode_revision, OpcodeRevision::Legacy);
        assert_eq!(config.tick_rate, EngineConfig::DEFAULT_TICK_RATE);
        assert_eq!(config.call_depth_limit, EngineConfig::DEFAULT_CALL_DEPTH_LIMIT);
    }

    #[test]
    fn rejects_unknown_revision() {
        let err = ConfigLoader::parse("opcode_revision = \"future\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config TOML"));
    }
}
