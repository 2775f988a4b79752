// src/config.rs

//! Configuration loading.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "NOVELSYNC_CONFIG";

/// Default config location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "data/config.toml";

/// Load configuration, falling back to defaults when the file is unusable.
///
/// The result is validated either way.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path);
    config.validate()?;
    Ok(config)
}

/// Load configuration that must exist and be valid.
pub fn load_config_strict(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(AppError::config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    let config = Config::load(path)?;
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid config {}: {e}", path.display())))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.sync.ttl_minutes, 1200);
    }

    #[test]
    fn test_strict_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_strict(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_strict_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sync]\nttl_minutes = 0\n").unwrap();
        assert!(load_config_strict(&path).is_err());
    }

    #[test]
    fn test_strict_reads_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[visits]\nwindow_secs = 60\n\n[[providers]]\nid = \"syosetu\"\nid_stability = \"unstable\"\n",
        )
        .unwrap();

        let config = load_config_strict(&path).unwrap();
        assert_eq!(config.visits.window_secs, 60);
        assert_eq!(config.providers.len(), 1);
    }
}
