//! Configuration for the history core.
//!
//! Loaded from `<data-dir>/clipkeep/config.json`. Both fields are optional
//! in the file; missing fields (or a missing file) fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{HistoryError, Result};

/// Default maximum number of history entries retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Default in-memory image cache budget in megabytes.
pub const DEFAULT_CACHE_BUDGET_MB: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of history entries (oldest evicted beyond this).
    #[serde(default = "default_history_limit", rename = "historyLimit")]
    pub history_limit: usize,
    /// Budget for the decoded-image cache, in megabytes.
    #[serde(default = "default_cache_budget_mb", rename = "cacheBudgetMB")]
    pub cache_budget_mb: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_cache_budget_mb() -> usize {
    DEFAULT_CACHE_BUDGET_MB
}

impl Default for Config {
    fn default() -> Self {
        Config {
            history_limit: DEFAULT_HISTORY_LIMIT,
            cache_budget_mb: DEFAULT_CACHE_BUDGET_MB,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file is missing. A malformed file is an error; silently resetting a
    /// user's limits would be worse than failing loudly.
    pub fn load(path: &Path) -> Result<Config> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No config file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(HistoryError::io(path, e)),
        };

        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| HistoryError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;

        info!(
            history_limit = config.history_limit,
            cache_budget_mb = config.cache_budget_mb,
            "Loaded config"
        );
        Ok(config)
    }

    /// Both limits must be positive; a zero-entry history or zero-byte cache
    /// is never what the user meant.
    pub fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(HistoryError::InvalidConfig(
                "historyLimit must be greater than 0".into(),
            ));
        }
        if self.cache_budget_mb == 0 {
            return Err(HistoryError::InvalidConfig(
                "cacheBudgetMB must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Cache budget converted to bytes for cost accounting.
    pub fn cache_budget_bytes(&self) -> u64 {
        self.cache_budget_mb as u64 * 1024 * 1024
    }
}

/// Load config from the default location, warning and falling back to
/// defaults on any failure. Used by the daemon; tests use `Config::load`.
pub fn load_or_default(path: &Path) -> Config {
    match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.cache_budget_mb, 50);
        assert_eq!(config.cache_budget_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"historyLimit": 25}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.history_limit, 25);
        assert_eq!(config.cache_budget_mb, DEFAULT_CACHE_BUDGET_MB);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"historyLimit": 0}"#).unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_malformed_json_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(Config::load(&path).is_err());
    }
}
