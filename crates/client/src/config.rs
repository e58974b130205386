//! Client configuration read from the process environment.
use std::env;
use std::path::PathBuf;

use engine_core::OpcodeRevision;

/// Configuration required to bootstrap the engine runtime.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Content directory with `game.toml`; the built-in demo runs when unset.
    pub content_dir: Option<PathBuf>,
    /// Run exactly this many ticks as fast as possible, then exit.
    pub ticks: Option<u32>,
    pub log_dir: Option<PathBuf>,
    pub session_id: Option<String>,
    /// Overrides the revision named by the content.
    pub opcode_revision: Option<OpcodeRevision>,
    /// Attach state digests to frame events and log the final one.
    pub digests: bool,
}

impl ClientConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `RETRO_CONTENT_DIR` - Content directory (default: built-in demo)
    /// - `RETRO_TICKS` - Headless tick count (default: run in real time)
    /// - `RETRO_LOG_DIR` - Log directory (default: platform cache dir)
    /// - `RETRO_SESSION_ID` - Session identifier for log files (default: timestamp)
    /// - `RETRO_OPCODE_REVISION` - `current` or `legacy`
    /// - `RETRO_DIGESTS` - Publish state digests (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let opcode_revision = read("RETRO_OPCODE_REVISION").and_then(|value| {
            let parsed = value.parse().ok();
            if parsed.is_none() {
                tracing::warn!(%value, "ignoring unknown RETRO_OPCODE_REVISION");
            }
            parsed
        });

        Self {
            content_dir: read("RETRO_CONTENT_DIR").map(PathBuf::from),
            ticks: read("RETRO_TICKS").and_then(|value| value.parse().ok()),
            log_dir: read("RETRO_LOG_DIR").map(PathBuf::from),
            session_id: read("RETRO_SESSION_ID"),
            opcode_revision,
            digests: read("RETRO_DIGESTS")
                .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    /// Configured log directory, or the platform cache directory.
    pub fn resolved_log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "retro")
                .map(|dirs| dirs.cache_dir().join("logs"))
                .unwrap_or_else(|| PathBuf::from("/tmp/retro/logs"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_is_default() {
        assert_eq!(config(&[]), ClientConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("RETRO_CONTENT_DIR", "/games/zone"),
            ("RETRO_TICKS", "600"),
            ("RETRO_LOG_DIR", "/tmp/logs"),
            ("RETRO_SESSION_ID", "run-1"),
            ("RETRO_OPCODE_REVISION", "Legacy"),
            ("RETRO_DIGESTS", "true"),
        ]);
        assert_eq!(config.content_dir, Some(PathBuf::from("/games/zone")));
        assert_eq!(config.ticks, Some(600));
        assert_eq!(config.resolved_log_dir(), PathBuf::from("/tmp/logs"));
        assert_eq!(config.session_id.as_deref(), Some("run-1"));
        assert_eq!(config.opcode_revision, Some(OpcodeRevision::Legacy));
        assert!(config.digests);
    }

    #[test]
    fn malformed_values_are_ignored() {
        let config = config(&[("RETRO_TICKS", "lots"), ("RETRO_OPCODE_REVISION", "v9")]);
        assert_eq!(config.ticks, None);
        assert_eq!(config.opcode_revision, None);
    }
}
