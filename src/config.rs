//! Application configuration and credential loading.
//!
//! Settings live in `~/.github_repo_manager/config.json`. Every field has a
//! default, so a partial file only overrides the keys it names. Keys this
//! version does not know about are carried through a load/save cycle.

use crate::error::{ManagerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Name of the per-user settings directory under `$HOME`.
pub const CONFIG_DIR_NAME: &str = ".github_repo_manager";

/// Settings file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable holding the GitHub personal access token.
pub const PAT_ENV_VAR: &str = "GITHUB_PAT";

/// Secondary variable checked when [`PAT_ENV_VAR`] is unset.
pub const FALLBACK_TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Default public GitHub API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Persistent application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory new clones are placed under.
    pub clone_base_path: PathBuf,
    /// Branch name assumed for new repositories.
    pub default_branch: String,
    /// One of DEBUG, INFO, WARNING, ERROR, CRITICAL.
    pub log_level: String,
    /// GitHub API base URL (override for GitHub Enterprise).
    pub api_url: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            clone_base_path: home.join("github_repos"),
            default_branch: "main".into(),
            log_level: "INFO".into(),
            api_url: DEFAULT_API_URL.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// Get the per-user settings directory (`~/.github_repo_manager`).
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .ok_or_else(|| ManagerError::InvalidConfig("Could not determine home directory".into()))
}

/// Reads and writes [`AppConfig`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at `~/.github_repo_manager/config.json`.
    pub fn default_location() -> Result<Self> {
        Ok(Self::at(config_dir()?.join(CONFIG_FILE_NAME)))
    }

    /// Store at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the settings, falling back to defaults.
    ///
    /// A missing file is normal on first run. A file that cannot be read or
    /// parsed is reported through the log and replaced by defaults in memory;
    /// it is not overwritten until the next [`save`](Self::save).
    pub fn load(&self) -> AppConfig {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no config file, using defaults");
            return AppConfig::default();
        }

        match self.try_load() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to load config, using defaults");
                AppConfig::default()
            }
        }
    }

    /// Load the settings, surfacing read and parse errors.
    pub fn try_load(&self) -> Result<AppConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the settings, creating the parent directory if needed.
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        tracing::info!(path = %self.path.display(), "config saved");
        Ok(())
    }

    /// The directory new clones go to.
    pub fn clone_base_path(&self) -> PathBuf {
        self.load().clone_base_path
    }

    /// Persist a new clone base directory.
    pub fn set_clone_base_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let mut config = self.load();
        config.clone_base_path = path.into();
        self.save(&config)
    }
}

/// Load the GitHub personal access token.
///
/// A `.env` file in the working directory is read first, then
/// `GITHUB_PAT` and `GITHUB_TOKEN` are checked in that order. Blank values
/// count as unset.
pub fn load_github_pat() -> Option<String> {
    dotenv::dotenv().ok();

    for var in [PAT_ENV_VAR, FALLBACK_TOKEN_ENV_VAR] {
        if let Ok(token) = std::env::var(var) {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    tracing::warn!("{} is not set", PAT_ENV_VAR);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"));

        let config = store.load();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.log_level, "INFO");
        assert!(config.clone_base_path.ends_with("github_repos"));
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"log_level": "DEBUG", "theme": "dark"}"#).unwrap();

        let config = ConfigStore::at(&path).load();
        assert_eq!(config.log_level, "DEBUG");
        assert_eq!(config.default_branch, "main");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.extra.get("theme"), Some(&serde_json::json!("dark")));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = ConfigStore::at(&path);
        assert_eq!(store.load(), AppConfig::default());
        assert!(store.try_load().is_err());
    }

    #[test]
    fn test_set_clone_base_path_persists_and_keeps_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::at(&path);

        let mut config = AppConfig::default();
        config
            .extra
            .insert("window_size".into(), serde_json::json!([800, 600]));
        store.save(&config).unwrap();

        store.set_clone_base_path("/srv/clones").unwrap();

        let reloaded = store.try_load().unwrap();
        assert_eq!(reloaded.clone_base_path, PathBuf::from("/srv/clones"));
        assert_eq!(
            reloaded.extra.get("window_size"),
            Some(&serde_json::json!([800, 600]))
        );
        assert_eq!(store.clone_base_path(), PathBuf::from("/srv/clones"));
    }
}
