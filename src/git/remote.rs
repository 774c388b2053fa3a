//! Git remote configuration.

use crate::error::{ManagerError, Result};
use crate::git::GitOps;

/// Remote inspection and configuration for GitOps.
pub trait RemoteOps {
    /// Get the URL for a remote.
    fn remote_url(&self, remote_name: &str) -> Result<String>;

    /// Change the URL of an existing remote.
    fn set_remote_url(&self, remote_name: &str, url: &str) -> Result<()>;

    /// Check if a remote exists.
    fn remote_exists(&self, remote_name: &str) -> bool;

    /// List all remotes.
    fn list_remotes(&self) -> Result<Vec<String>>;
}

impl RemoteOps for GitOps {
    fn remote_url(&self, remote_name: &str) -> Result<String> {
        let remote = self.repo.find_remote(remote_name)?;
        remote.url().map(String::from).ok_or_else(|| {
            ManagerError::InvalidConfig(format!("Remote '{}' has no URL", remote_name))
        })
    }

    fn set_remote_url(&self, remote_name: &str, url: &str) -> Result<()> {
        if !self.remote_exists(remote_name) {
            return Err(ManagerError::InvalidConfig(format!(
                "Remote '{}' not found",
                remote_name
            )));
        }
        self.repo.remote_set_url(remote_name, url)?;
        tracing::info!(remote = remote_name, url = %super::redact_credentials(url), "updated remote URL");
        Ok(())
    }

    fn remote_exists(&self, remote_name: &str) -> bool {
        self.repo.find_remote(remote_name).is_ok()
    }

    fn list_remotes(&self) -> Result<Vec<String>> {
        let remotes = self.repo.remotes()?;
        Ok(remotes.iter().filter_map(|r| r.map(String::from)).collect())
    }
}
