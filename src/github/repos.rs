//! GitHub repository operations.

use crate::error::{ManagerError, Result};
use crate::github::GitHubClient;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Repository information from GitHub API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub clone_url: String,
    pub ssh_url: String,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub topics: Vec<String>,
    pub language: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "private")]
    pub is_private: bool,
}

impl GitHubRepo {
    /// Owner login, taken from `full_name`.
    pub fn owner(&self) -> &str {
        self.full_name
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or_default()
    }

    /// A reference that addresses this repository unambiguously.
    pub fn to_ref(&self) -> RepoRef {
        RepoRef::new(self.owner(), &self.name)
    }
}

/// A repository named either as `name` (owned by the authenticated user)
/// or as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: Option<String>,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            name: name.into(),
        }
    }

    /// A repository owned by the authenticated user.
    pub fn own(name: impl Into<String>) -> Self {
        Self {
            owner: None,
            name: name.into(),
        }
    }
}

impl FromStr for RepoRef {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_end_matches(".git");
        let invalid = |reason: &str| ManagerError::InvalidName {
            name: s.to_string(),
            reason: reason.to_string(),
        };

        match s.split_once('/') {
            Some((owner, name)) => {
                if owner.is_empty() || name.is_empty() || name.contains('/') {
                    return Err(invalid("expected 'name' or 'owner/name'"));
                }
                validate_repo_name(name)?;
                Ok(Self::new(owner, name))
            }
            None if s.is_empty() => Err(invalid("name is empty")),
            None => {
                validate_repo_name(s)?;
                Ok(Self::own(s))
            }
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}/{}", owner, self.name),
            None => f.write_str(&self.name),
        }
    }
}

static REPO_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid repository name regex"));

/// Check that `name` is usable as a GitHub repository name and as a
/// single local directory component.
pub fn validate_repo_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(ManagerError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.len() > 100 {
        return invalid("name is longer than 100 characters");
    }
    if name == "." || name == ".." {
        return invalid("name is reserved");
    }
    if !REPO_NAME.is_match(name) {
        return invalid("only ASCII letters, digits, '.', '-' and '_' are allowed");
    }
    Ok(())
}

/// Request body for creating a repository.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRepo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub private: bool,
    pub auto_init: bool,
    #[serde(skip)]
    pub org: Option<String>,
}

impl CreateRepo {
    /// A public repository initialized with a README.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            private: false,
            auto_init: true,
            org: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    pub fn private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    pub fn auto_init(mut self, auto_init: bool) -> Self {
        self.auto_init = auto_init;
        self
    }

    /// Create the repository under an organization instead of the user.
    pub fn in_org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    fn endpoint(&self) -> String {
        match &self.org {
            Some(org) => format!("/orgs/{}/repos", org),
            None => "/user/repos".to_string(),
        }
    }
}

/// Repository listing and management operations.
pub trait RepoOps {
    /// List every repository the authenticated user can access.
    fn list_own_repos(&self) -> Result<Vec<GitHubRepo>>;

    /// List all repositories in an organization.
    fn list_org_repos(&self, org: &str) -> Result<Vec<GitHubRepo>>;

    /// List all public repositories for a user.
    fn list_user_repos(&self, user: &str) -> Result<Vec<GitHubRepo>>;

    /// Get a specific repository.
    fn get_repo(&self, owner: &str, name: &str) -> Result<GitHubRepo>;

    /// Get a repository, defaulting the owner to the authenticated user.
    fn resolve_repo(&self, repo: &RepoRef) -> Result<GitHubRepo>;

    /// Fetch the README as text. A repository without one yields `None`.
    fn get_readme(&self, repo: &RepoRef) -> Result<Option<String>>;

    /// Create a new repository.
    fn create_repo(&self, request: &CreateRepo) -> Result<GitHubRepo>;

    /// Rename a repository and return its updated metadata.
    fn rename_repo(&self, repo: &RepoRef, new_name: &str) -> Result<GitHubRepo>;

    /// Permanently delete a repository.
    fn delete_repo(&self, repo: &RepoRef) -> Result<()>;
}

impl GitHubClient {
    fn owner_of(&self, repo: &RepoRef) -> Result<String> {
        match &repo.owner {
            Some(owner) => Ok(owner.clone()),
            None => self.login(),
        }
    }

    fn list_paged(&self, base: &str) -> Result<Vec<GitHubRepo>> {
        let separator = if base.contains('?') { '&' } else { '?' };
        let mut all_repos = Vec::new();
        let mut page = 1;

        loop {
            let endpoint = format!("{}{}per_page=100&page={}", base, separator, page);
            let repos: Vec<GitHubRepo> = self.get(&endpoint)?;

            if repos.is_empty() {
                break;
            }

            all_repos.extend(repos);
            page += 1;

            // Safety limit to prevent infinite loops
            if page > 100 {
                break;
            }
        }

        Ok(all_repos)
    }
}

impl RepoOps for GitHubClient {
    fn list_own_repos(&self) -> Result<Vec<GitHubRepo>> {
        let repos = self.list_paged("/user/repos")?;
        tracing::info!(count = repos.len(), "listed repositories");
        Ok(repos)
    }

    fn list_org_repos(&self, org: &str) -> Result<Vec<GitHubRepo>> {
        self.list_paged(&format!("/orgs/{}/repos?type=all", org))
    }

    fn list_user_repos(&self, user: &str) -> Result<Vec<GitHubRepo>> {
        self.list_paged(&format!("/users/{}/repos", user))
    }

    fn get_repo(&self, owner: &str, name: &str) -> Result<GitHubRepo> {
        let endpoint = format!("/repos/{}/{}", owner, name);
        self.get(&endpoint).map_err(|e| match e {
            ManagerError::NotFound(_) => {
                ManagerError::NotFound(format!("repository {}/{}", owner, name))
            }
            other => other,
        })
    }

    fn resolve_repo(&self, repo: &RepoRef) -> Result<GitHubRepo> {
        let owner = self.owner_of(repo)?;
        self.get_repo(&owner, &repo.name)
    }

    fn get_readme(&self, repo: &RepoRef) -> Result<Option<String>> {
        let owner = self.owner_of(repo)?;
        let endpoint = format!("/repos/{}/{}/readme", owner, repo.name);
        let readme = self.get_text_optional(&endpoint, "application/vnd.github.raw+json")?;
        if readme.is_none() {
            tracing::warn!(repo = %repo, "repository has no README");
        }
        Ok(readme)
    }

    fn create_repo(&self, request: &CreateRepo) -> Result<GitHubRepo> {
        validate_repo_name(&request.name)?;
        let repo: GitHubRepo = self.post(&request.endpoint(), request)?;
        tracing::info!(repo = %repo.full_name, "created repository");
        Ok(repo)
    }

    fn rename_repo(&self, repo: &RepoRef, new_name: &str) -> Result<GitHubRepo> {
        validate_repo_name(new_name)?;

        #[derive(Serialize)]
        struct Rename<'a> {
            name: &'a str,
        }

        let owner = self.owner_of(repo)?;
        let endpoint = format!("/repos/{}/{}", owner, repo.name);
        let updated: GitHubRepo = self.patch(&endpoint, &Rename { name: new_name })?;
        tracing::info!(from = %repo.name, to = %updated.name, "renamed repository");
        Ok(updated)
    }

    fn delete_repo(&self, repo: &RepoRef) -> Result<()> {
        let owner = self.owner_of(repo)?;
        self.delete(&format!("/repos/{}/{}", owner, repo.name))?;
        tracing::info!(repo = %format!("{}/{}", owner, repo.name), "deleted repository");
        Ok(())
    }
}

/// Extension methods for filtering repository lists.
pub trait RepoFilterExt {
    /// Case-insensitive search over name and description. Empty text keeps
    /// everything.
    fn matching(self, text: &str) -> Self;

    /// Filter to non-archived repositories.
    fn active(self) -> Self;

    /// Filter to non-fork repositories.
    fn source_only(self) -> Self;

    /// Filter by language.
    fn with_language(self, lang: &str) -> Self;

    fn private_only(self) -> Self;

    fn public_only(self) -> Self;
}

impl RepoFilterExt for Vec<GitHubRepo> {
    fn matching(self, text: &str) -> Self {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return self;
        }
        self.into_iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&needle)
                    || r
                        .description
                        .as_ref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .collect()
    }

    fn active(self) -> Self {
        self.into_iter().filter(|r| !r.archived).collect()
    }

    fn source_only(self) -> Self {
        self.into_iter().filter(|r| !r.fork).collect()
    }

    fn with_language(self, lang: &str) -> Self {
        self.into_iter()
            .filter(|r| {
                r.language
                    .as_ref()
                    .is_some_and(|l| l.eq_ignore_ascii_case(lang))
            })
            .collect()
    }

    fn private_only(self) -> Self {
        self.into_iter().filter(|r| r.is_private).collect()
    }

    fn public_only(self) -> Self {
        self.into_iter().filter(|r| !r.is_private).collect()
    }
}
