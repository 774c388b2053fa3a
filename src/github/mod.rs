//! GitHub API integration.
//!
//! This module provides a client for interacting with the GitHub API to:
//! - List, create, rename and delete repositories
//! - Read READMEs and commit history
//! - List and create pull requests
//! - Clone repositories
//!
//! # Example
//!
//! ```rust,no_run
//! use repo_manager::github::{GitHubClient, RepoFilterExt, RepoOps};
//!
//! let client = GitHubClient::new("ghp_your_token_here")?;
//!
//! for repo in client.list_own_repos()?.matching("cli") {
//!     println!("{}: {}", repo.name, repo.clone_url);
//! }
//! # Ok::<(), repo_manager::error::ManagerError>(())
//! ```

mod client;
mod clone;
mod commits;
mod pr;
mod repos;

pub use client::{GitHubClient, GitHubUser};
pub use clone::CloneOps;
pub use commits::{CommitHistoryOps, CommitSummary, PageRequest};
pub use pr::{CreatePullRequest, PrState, PullRequest, PullRequestOps, PullRequestRef};
pub use repos::{CreateRepo, GitHubRepo, RepoFilterExt, RepoOps, RepoRef, validate_repo_name};
