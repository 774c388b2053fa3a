//! Workflows that span GitHub, the local workspace and git.

use crate::error::{ManagerError, Result};
use crate::git::{BranchOps, GitCli, GitOps, RemoteOps};
use crate::github::{
    CloneOps, GitHubClient, GitHubRepo, RepoOps, RepoRef, validate_repo_name,
};
use crate::tasks::TaskPool;
use crate::workspace::Workspace;
use std::path::PathBuf;

/// Options for [`RepoManager::clone_repo`].
#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    /// Branch to check out instead of the default one.
    pub branch: Option<String>,
    /// Destination; defaults to `<clone base>/<name>`.
    pub target: Option<PathBuf>,
    /// When the destination is already a directory, repoint its `origin`
    /// instead of failing.
    pub update_existing: bool,
}

/// What [`RepoManager::clone_repo`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    Cloned(PathBuf),
    RemoteUpdated(PathBuf),
}

/// Result of a rename.
#[derive(Debug, Clone)]
pub struct RenameOutcome {
    pub repo: GitHubRepo,
    /// The local clone after the rename, if there is one.
    pub local_path: Option<PathBuf>,
}

/// Local branches of a clone.
#[derive(Debug, Clone)]
pub struct LocalBranches {
    pub names: Vec<String>,
    /// `None` on a detached HEAD.
    pub current: Option<String>,
}

/// Everything shown for a single repository.
#[derive(Debug, Clone)]
pub struct RepoDetails {
    pub repo: GitHubRepo,
    pub local_path: Option<PathBuf>,
    pub readme: Option<String>,
    pub branches: Option<LocalBranches>,
}

/// Per-repository result of [`RepoManager::sync`].
#[derive(Debug, Clone)]
pub enum SyncStatus {
    Cloned(PathBuf),
    AlreadyPresent(PathBuf),
    Failed(String),
}

/// Read the branch list of the clone at `path`.
pub fn local_branches(path: &std::path::Path) -> Result<LocalBranches> {
    let git = GitOps::open(path)?;
    Ok(LocalBranches {
        names: git.list_branches()?,
        current: git.current_branch().ok(),
    })
}

/// Coordinates the GitHub client with local clones.
#[derive(Clone)]
pub struct RepoManager {
    client: GitHubClient,
    workspace: Workspace,
    git: GitCli,
}

impl RepoManager {
    pub fn new(client: GitHubClient, workspace: Workspace, git: GitCli) -> Self {
        Self {
            client,
            workspace,
            git,
        }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn git(&self) -> &GitCli {
        &self.git
    }

    /// Clone a repository into the workspace.
    pub fn clone_repo(&self, reference: &RepoRef, options: CloneOptions) -> Result<CloneOutcome> {
        let repo = self.client.resolve_repo(reference)?;
        let target = options
            .target
            .unwrap_or_else(|| self.workspace.path_for(&repo.name));

        if target.exists() {
            if !target.is_dir() {
                return Err(ManagerError::NotADirectory(target));
            }
            if !options.update_existing {
                return Err(ManagerError::PathExists(target));
            }
            self.git.set_remote_url(&target, "origin", &repo.clone_url)?;
            tracing::info!(path = %target.display(), "existing clone repointed to {}", repo.clone_url);
            return Ok(CloneOutcome::RemoteUpdated(target));
        }

        self.client
            .clone_repo(&self.git, &repo, &target, options.branch.as_deref())?;
        Ok(CloneOutcome::Cloned(target))
    }

    /// Rename a repository on GitHub and keep the local clone in step.
    pub fn rename(&self, reference: &RepoRef, new_name: &str) -> Result<RenameOutcome> {
        let new_name = new_name.trim();
        validate_repo_name(new_name)?;

        let current = self.client.resolve_repo(reference)?;
        let local = self.workspace.local_repo(&current.name);

        if current.name == new_name {
            tracing::info!(repo = %current.full_name, "name unchanged; nothing to do");
            return Ok(RenameOutcome {
                repo: current,
                local_path: local,
            });
        }

        let updated = self.client.rename_repo(&current.to_ref(), new_name)?;

        let local_path = match local {
            Some(old_path) => Some(self.rename_local(&old_path, &updated).map_err(|e| {
                ManagerError::PartialRename {
                    new_name: updated.name.clone(),
                    message: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(RenameOutcome {
            repo: updated,
            local_path,
        })
    }

    fn rename_local(&self, old_path: &std::path::Path, updated: &GitHubRepo) -> Result<PathBuf> {
        let new_path = self.workspace.rename_folder(old_path, &updated.name)?;
        if GitOps::is_repository(&new_path) {
            let git = GitOps::open(&new_path)?;
            if git.remote_exists("origin") {
                git.set_remote_url("origin", &updated.clone_url)?;
            }
        }
        Ok(new_path)
    }

    /// Delete a repository on GitHub. Local clones are left on disk.
    pub fn delete(&self, reference: &RepoRef) -> Result<GitHubRepo> {
        let repo = self.client.resolve_repo(reference)?;
        self.client.delete_repo(&repo.to_ref())?;
        if let Some(path) = self.workspace.local_repo(&repo.name) {
            tracing::info!(path = %path.display(), "local clone kept");
        }
        Ok(repo)
    }

    /// Gather repository metadata, README and local branch state.
    pub fn details(&self, reference: &RepoRef) -> Result<RepoDetails> {
        let repo = self.client.resolve_repo(reference)?;
        let readme = self.client.get_readme(&repo.to_ref())?;
        let local_path = self.workspace.local_repo(&repo.name);

        let branches = local_path
            .as_deref()
            .and_then(|path| match local_branches(path) {
                Ok(branches) => Some(branches),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not read local branches");
                    None
                }
            });

        Ok(RepoDetails {
            repo,
            local_path,
            readme,
            branches,
        })
    }

    /// Clone every repository in `repos` that has no local folder yet,
    /// running up to `workers` clones at once.
    pub fn sync(&self, repos: Vec<GitHubRepo>, workers: usize) -> Vec<(String, SyncStatus)> {
        let pool = TaskPool::new(workers);

        let handles: Vec<_> = repos
            .into_iter()
            .map(|repo| {
                let full_name = repo.full_name.clone();
                let target = self.workspace.path_for(&repo.name);
                let client = self.client.clone();
                let git = self.git;

                let handle = pool.submit(move || {
                    if target.exists() {
                        return SyncStatus::AlreadyPresent(target);
                    }
                    match client.clone_repo(&git, &repo, &target, None) {
                        Ok(()) => SyncStatus::Cloned(target),
                        Err(e) => SyncStatus::Failed(e.to_string()),
                    }
                });
                (full_name, handle)
            })
            .collect();

        let results = handles
            .into_iter()
            .map(|(name, handle)| {
                let status = handle
                    .wait()
                    .unwrap_or_else(|| SyncStatus::Failed("clone task did not run".into()));
                (name, status)
            })
            .collect();

        pool.shutdown();
        results
    }
}
