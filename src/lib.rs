//! # Repo Manager
//!
//! Manage GitHub repositories and their local clones.
//!
//! This crate provides:
//! - A GitHub client for listing, creating, renaming and deleting
//!   repositories, reading READMEs and commit history, and working with
//!   pull requests
//! - Cloning into a configurable workspace directory
//! - Local branch inspection and switching through `git2`
//! - A local CI runner driven by a `.local_ci.yaml` in the repository
//! - A bounded worker pool for background work such as bulk cloning
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use repo_manager::prelude::*;
//!
//! let config = ConfigStore::default_location()?.load();
//! let client = GitHubClient::from_env()?;
//! let manager = RepoManager::new(client, Workspace::from_config(&config), GitCli::default());
//!
//! let outcome = manager.clone_repo(&"my-project".parse()?, CloneOptions::default())?;
//! println!("{:?}", outcome);
//! # Ok::<(), repo_manager::error::ManagerError>(())
//! ```
//!
//! ## Local CI
//!
//! ```rust,no_run
//! use repo_manager::ci::run_pipeline;
//!
//! let report = run_pipeline(std::path::Path::new("./my-project"))?;
//! if let Some(step) = report.failed_step() {
//!     eprintln!("{} failed: {}", step.name, step.stderr);
//! }
//! # Ok::<(), repo_manager::error::ManagerError>(())
//! ```

pub mod ci;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod logging;
pub mod manager;
pub(crate) mod process;
pub mod system;
pub mod tasks;
pub mod workspace;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::ci::{Pipeline, PipelineReport, PipelineRunner, Step, StepEvent, StepResult};
    pub use crate::config::{AppConfig, ConfigStore};
    pub use crate::error::{ManagerError, Result};
    pub use crate::git::{BranchOps, GitCli, GitOps, HistoryOps, LocalCommit, RemoteOps};
    pub use crate::github::{
        CloneOps, CommitHistoryOps, CommitSummary, CreatePullRequest, CreateRepo, GitHubClient,
        GitHubRepo, PageRequest, PrState, PullRequest, PullRequestOps, RepoFilterExt, RepoOps,
        RepoRef,
    };
    pub use crate::manager::{
        CloneOptions, CloneOutcome, RenameOutcome, RepoDetails, RepoManager, SyncStatus,
    };
    pub use crate::system::{SystemReport, check_system_requirements};
    pub use crate::tasks::{TaskHandle, TaskPool};
    pub use crate::workspace::Workspace;
}

pub use prelude::*;
