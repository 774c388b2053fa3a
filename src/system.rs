//! Environment checks run before doing real work.

use crate::config::config_dir;
use crate::git::GitCli;
use std::path::Path;

/// What the host provides.
#[derive(Debug, Clone)]
pub struct SystemReport {
    pub os: &'static str,
    pub is_macos: bool,
    pub macos_version: Option<String>,
    pub git_version: Option<String>,
    pub config_dir_writable: bool,
    pub home_writable: bool,
}

impl SystemReport {
    /// git is on `PATH` and settings can be saved. macOS is reported but
    /// not required.
    pub fn all_requirements_met(&self) -> bool {
        self.git_version.is_some() && self.config_dir_writable
    }
}

/// Check whether a file can be created in `dir`.
pub fn check_write_permission(dir: &Path) -> bool {
    let marker = dir.join(".permission_test");
    let result = std::fs::write(&marker, "test").and_then(|_| std::fs::remove_file(&marker));
    if let Err(e) = &result {
        tracing::warn!(path = %dir.display(), error = %e, "directory is not writable");
    }
    result.is_ok()
}

fn macos_version(git: &GitCli) -> Option<String> {
    if !cfg!(target_os = "macos") {
        return None;
    }
    let mut command = tokio::process::Command::new("sw_vers");
    command.arg("-productVersion");
    match crate::process::run_with_timeout(command, git.timeout()) {
        Ok(crate::process::Outcome::Completed(output)) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        _ => None,
    }
}

/// Inspect the host: OS, git availability and writable directories.
pub fn check_system_requirements(git: &GitCli) -> SystemReport {
    let git_version = match git.version() {
        Ok(v) => {
            tracing::info!(version = %v, "git available");
            Some(v)
        }
        Err(e) => {
            tracing::warn!(error = %e, "git is not available");
            None
        }
    };

    let config_dir_writable = config_dir()
        .map(|dir| std::fs::create_dir_all(&dir).is_ok() && check_write_permission(&dir))
        .unwrap_or(false);
    let home_writable = dirs::home_dir()
        .map(|home| check_write_permission(&home))
        .unwrap_or(false);

    SystemReport {
        os: std::env::consts::OS,
        is_macos: cfg!(target_os = "macos"),
        macos_version: macos_version(git),
        git_version,
        config_dir_writable,
        home_writable,
    }
}
