//! Platform-specific directory utilities
//!
//! Mirrors the client's log location so `tail-logs` and `clean` find the
//! same session directories.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Get the log directory used by the client
///
/// `RETRO_LOG_DIR` wins; otherwise platform conventions:
/// - macOS: `~/Library/Caches/retro/logs`
/// - Linux: `~/.cache/retro/logs` (or `$XDG_CACHE_HOME/retro/logs`)
/// - Windows: `%LOCALAPPDATA%\retro\logs`
/// - Fallback: `/tmp/retro/logs`
pub fn log_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("RETRO_LOG_DIR") {
        return Ok(PathBuf::from(dir));
    }

    let base_dir = directories::ProjectDirs::from("", "", "retro")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/retro"));

    Ok(base_dir.join("logs"))
}

/// List all session directories in the log directory
///
/// Returns a vector of (session_id, path) tuples, sorted by modification time (newest first)
pub fn list_sessions(log_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !log_dir.exists() {
        return Ok(Vec::new());
    }

    let mut sessions: Vec<(String, PathBuf, std::time::SystemTime)> = Vec::new();

    for entry in std::fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {}", log_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir()
            && let Some(session_id) = path.file_name().and_then(|n| n.to_str())
        {
            let modified = entry.metadata()?.modified()?;
            sessions.push((session_id.to_string(), path.clone(), modified));
        }
    }

    sessions.sort_by(|a, b| b.2.cmp(&a.2));

    Ok(sessions
        .into_iter()
        .map(|(id, path, _)| (id, path))
        .collect())
}

/// Find the log file for a specific session
pub fn find_session_log(log_dir: &Path, session_id: &str) -> Result<PathBuf> {
    let log_path = log_dir.join(session_id).join("client.log");

    if !log_path.exists() {
        anyhow::bail!("Log file not found: {}", log_path.display());
    }

    Ok(log_path)
}

/// Find the most recent session's log file
pub fn find_latest_log(log_dir: &Path) -> Result<(String, PathBuf)> {
    let sessions = list_sessions(log_dir)?;

    let Some((session_id, session_path)) = sessions.first() else {
        anyhow::bail!("No sessions found in log directory");
    };
    let log_path = session_path.join("client.log");

    if !log_path.exists() {
        anyhow::bail!(
            "Log file not found for latest session: {}",
            log_path.display()
        );
    }

    Ok((session_id.clone(), log_path))
}
