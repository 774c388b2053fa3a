//! Local git repository operations.
//!
//! Inspection and branch switching go through `git2`; operations that talk
//! to a remote go through the `git` executable ([`GitCli`]).

mod branch;
mod cli;
mod history;
mod remote;

pub use branch::BranchOps;
pub use cli::{DEFAULT_CLONE_TIMEOUT, DEFAULT_GIT_TIMEOUT, GitCli};
pub(crate) use cli::redact_credentials;
pub use history::{HistoryOps, LocalCommit};
pub use remote::RemoteOps;

use crate::error::{ManagerError, Result};
use git2::Repository;
use std::path::Path;

/// Git operations wrapper over a local repository.
///
/// # Example
///
/// ```rust,no_run
/// use repo_manager::git::{BranchOps, GitOps};
///
/// let git = GitOps::open("./my-repo")?;
/// for branch in git.list_branches()? {
///     println!("{}", branch);
/// }
/// git.checkout_branch("develop")?;
/// # Ok::<(), repo_manager::error::ManagerError>(())
/// ```
pub struct GitOps {
    repo: Repository,
}

impl GitOps {
    /// Open an existing repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => ManagerError::RepoNotFound(path.to_path_buf()),
            _ => ManagerError::Git(e),
        })?;
        Ok(Self { repo })
    }

    /// Discover and open a repository from a path within it.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::discover(path).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => ManagerError::RepoNotFound(path.to_path_buf()),
            _ => ManagerError::Git(e),
        })?;
        Ok(Self { repo })
    }

    /// Whether `path` is the root of a repository.
    pub fn is_repository(path: impl AsRef<Path>) -> bool {
        Repository::open(path.as_ref()).is_ok()
    }

    /// Get a reference to the underlying git2::Repository.
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Get the repository's working directory path.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }
}
