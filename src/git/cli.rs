//! Invoking the `git` executable.
//!
//! Network-facing operations (clone, remote updates) shell out to `git` so
//! the user's credential helpers, SSH configuration and proxies apply.

use crate::error::{ManagerError, Result};
use crate::process::{Outcome, run_with_timeout};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Default limit for a single git invocation.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default limit for `git clone`, which transfers the whole history.
pub const DEFAULT_CLONE_TIMEOUT: Duration = Duration::from_secs(600);

/// Runs `git` subcommands without a shell.
#[derive(Debug, Clone, Copy)]
pub struct GitCli {
    timeout: Duration,
    clone_timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_TIMEOUT).with_clone_timeout(DEFAULT_CLONE_TIMEOUT)
    }
}

impl GitCli {
    /// Limit every command, clones included, to `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            clone_timeout: timeout,
        }
    }

    pub fn with_clone_timeout(mut self, timeout: Duration) -> Self {
        self.clone_timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn clone_timeout(&self) -> Duration {
        self.clone_timeout
    }

    /// Run `git <args>` in `cwd` and return trimmed stdout.
    pub fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<String> {
        self.run_for(args, cwd, self.timeout)
    }

    fn run_for(&self, args: &[&str], cwd: Option<&Path>, timeout: Duration) -> Result<String> {
        let shown = display_args(args);

        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let outcome = run_with_timeout(command, timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound && cwd.is_none_or(|d| d.exists()) {
                ManagerError::GitNotInstalled
            } else {
                ManagerError::Io(e)
            }
        })?;

        match outcome {
            Outcome::Completed(output) if output.status.success() => {
                tracing::info!(command = %shown, "git command succeeded");
                Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            Outcome::Completed(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                tracing::error!(command = %shown, stderr = %stderr, "git command failed");
                Err(ManagerError::GitCommand {
                    command: shown,
                    message: stderr,
                })
            }
            Outcome::TimedOut => {
                tracing::error!(command = %shown, secs = timeout.as_secs(), "git command timed out");
                Err(ManagerError::GitTimeout {
                    command: shown,
                    secs: timeout.as_secs(),
                })
            }
        }
    }

    /// The output of `git --version`.
    pub fn version(&self) -> Result<String> {
        self.run(&["--version"], None)
    }

    pub fn is_installed(&self) -> bool {
        self.version().is_ok()
    }

    /// Whether `path` is inside a git working tree.
    pub fn is_work_tree(&self, path: &Path) -> bool {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "path does not exist");
            return false;
        }
        self.run(&["rev-parse", "--is-inside-work-tree"], Some(path))
            .is_ok_and(|out| out == "true")
    }

    /// Clone `url` into `path`, optionally checking out `branch`.
    ///
    /// `path` must not exist yet; missing parent directories are created.
    /// A failed or timed-out clone removes whatever it left at `path`.
    pub fn clone(&self, url: &str, path: &Path, branch: Option<&str>) -> Result<()> {
        if path.exists() {
            return Err(ManagerError::PathExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().into_owned();
        let mut args = vec!["clone"];
        if let Some(branch) = branch {
            args.extend(["--branch", branch]);
        }
        args.extend(["--", url, path_str.as_str()]);

        let result = self.run_for(&args, None, self.clone_timeout);
        if result.is_err() && path.exists() {
            match std::fs::remove_dir_all(path) {
                Ok(()) => tracing::info!(path = %path.display(), "removed partial clone"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not remove partial clone")
                }
            }
        }
        result.map(|_| ())
    }

    /// Point `remote` of the repository at `repo_path` to `url`.
    pub fn set_remote_url(&self, repo_path: &Path, remote: &str, url: &str) -> Result<()> {
        if !self.is_work_tree(repo_path) {
            return Err(ManagerError::RepoNotFound(repo_path.to_path_buf()));
        }
        self.run(&["remote", "set-url", remote, url], Some(repo_path))?;
        Ok(())
    }
}

fn display_args(args: &[&str]) -> String {
    args.iter()
        .map(|a| redact_credentials(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip any user/password embedded in an URL argument.
pub(crate) fn redact_credentials(arg: &str) -> String {
    match url::Url::parse(arg) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => arg.to_string(),
    }
}
