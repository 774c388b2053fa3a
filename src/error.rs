//! Error types for repository management.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for repository management operations.
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub client error: {0}")]
    Octocrab(#[from] octocrab::Error),

    #[error("GitHub API error: {message}")]
    GitHub { message: String },

    #[error("GitHub authentication failed: {message}")]
    Auth { message: String },

    #[error("GitHub rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not a git repository: {0}")]
    RepoNotFound(PathBuf),

    #[error("git {command} failed: {message}")]
    GitCommand { command: String, message: String },

    #[error("git {command} timed out after {secs}s")]
    GitTimeout { command: String, secs: u64 },

    #[error("git executable not found; is git installed?")]
    GitNotInstalled,

    #[error("Branch operation failed: {message}")]
    BranchError { message: String },

    #[error("Clone failed for {repo}: {message}")]
    CloneError { repo: String, message: String },

    #[error("Path already exists: {0}")]
    PathExists(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Invalid repository name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Repository renamed to '{new_name}' on GitHub, but the local clone was not: {message}")]
    PartialRename { new_name: String, message: String },

    #[error("Pull request operation failed: {message}")]
    PullRequestError { message: String },

    #[error("CI configuration error: {message}")]
    CiConfig { message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A specialized Result type for repository management operations.
pub type Result<T> = std::result::Result<T, ManagerError>;
