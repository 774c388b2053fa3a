//! Local clone directory layout.

use crate::config::AppConfig;
use crate::error::{ManagerError, Result};
use crate::github::validate_repo_name;
use std::path::{Path, PathBuf};

/// The directory holding local clones, one folder per repository name.
#[derive(Debug, Clone)]
pub struct Workspace {
    base: PathBuf,
}

impl Workspace {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.clone_base_path)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Where a clone of `name` lives (whether or not it exists).
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.base.join(name)
    }

    /// The clone of `name`, if there is a directory for it.
    pub fn local_repo(&self, name: &str) -> Option<PathBuf> {
        let path = self.path_for(name);
        path.is_dir().then_some(path)
    }

    /// Rename a clone folder to `new_name` within the same parent directory.
    pub fn rename_folder(&self, old_path: &Path, new_name: &str) -> Result<PathBuf> {
        validate_repo_name(new_name)?;

        if !old_path.exists() {
            return Err(ManagerError::NotFound(old_path.display().to_string()));
        }

        let parent = old_path.parent().unwrap_or(&self.base);
        let new_path = parent.join(new_name);
        if new_path.exists() {
            return Err(ManagerError::PathExists(new_path));
        }

        std::fs::rename(old_path, &new_path)?;
        tracing::info!(from = %old_path.display(), to = %new_path.display(), "renamed local clone");
        Ok(new_path)
    }
}
