//! Pull request operations using octocrab.

use crate::error::{ManagerError, Result};
use crate::github::{GitHubClient, PageRequest};
use chrono::{DateTime, Utc};
use octocrab::models::pulls::PullRequest as OctocrabPR;
use std::fmt;
use std::str::FromStr;

/// A pull request on GitHub.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub id: u64,
    pub number: u64,
    pub html_url: String,
    pub state: String,
    pub title: String,
    pub body: Option<String>,
    pub user: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
    pub draft: bool,
    pub merged: bool,
}

impl From<OctocrabPR> for PullRequest {
    fn from(pr: OctocrabPR) -> Self {
        Self {
            id: pr.id.0,
            number: pr.number,
            html_url: pr.html_url.map(|u| u.to_string()).unwrap_or_default(),
            state: pr.state.map(|s| format!("{:?}", s).to_lowercase()).unwrap_or_default(),
            title: pr.title.unwrap_or_default(),
            body: pr.body,
            user: pr.user.map(|u| u.login).unwrap_or_else(|| "Unknown".into()),
            created_at: pr.created_at,
            updated_at: pr.updated_at,
            head: PullRequestRef {
                ref_name: pr.head.ref_field,
                sha: pr.head.sha,
            },
            base: PullRequestRef {
                ref_name: pr.base.ref_field,
                sha: pr.base.sha,
            },
            draft: pr.draft.unwrap_or(false),
            merged: pr.merged_at.is_some() || pr.merged.unwrap_or(false),
        }
    }
}

/// A reference (branch) in a pull request.
#[derive(Debug, Clone)]
pub struct PullRequestRef {
    pub ref_name: String,
    pub sha: String,
}

/// State filter for listing pull requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrState {
    Open,
    Closed,
    #[default]
    All,
}

impl FromStr for PrState {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            "all" => Ok(Self::All),
            other => Err(ManagerError::InvalidConfig(format!(
                "unknown pull request state '{}' (expected open, closed or all)",
                other
            ))),
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        })
    }
}

impl From<PrState> for octocrab::params::State {
    fn from(state: PrState) -> Self {
        match state {
            PrState::Open => Self::Open,
            PrState::Closed => Self::Closed,
            PrState::All => Self::All,
        }
    }
}

/// Request body for creating a pull request.
#[derive(Debug, Clone)]
pub struct CreatePullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub draft: Option<bool>,
    pub maintainer_can_modify: Option<bool>,
}

impl CreatePullRequest {
    /// Create a new pull request.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        head: impl Into<String>,
        base: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            head: head.into(),
            base: base.into(),
            draft: None,
            maintainer_can_modify: None,
        }
    }

    /// Set the pull request as a draft.
    pub fn draft(mut self) -> Self {
        self.draft = Some(true);
        self
    }

    /// Allow maintainers to modify the pull request.
    pub fn maintainer_can_modify(mut self) -> Self {
        self.maintainer_can_modify = Some(true);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ManagerError::PullRequestError {
                message: "Pull request title is required".into(),
            });
        }
        if self.head.trim().is_empty() {
            return Err(ManagerError::PullRequestError {
                message: "Pull request head branch is required".into(),
            });
        }
        if self.head == self.base {
            return Err(ManagerError::PullRequestError {
                message: format!("head and base are both '{}'", self.head),
            });
        }
        Ok(())
    }
}

/// Pull request operations.
pub trait PullRequestOps {
    /// Create a new pull request.
    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: CreatePullRequest,
    ) -> Result<PullRequest>;

    /// List one page of pull requests in the given state.
    fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: PrState,
        page: PageRequest,
    ) -> Result<Vec<PullRequest>>;

    /// Get a specific pull request.
    fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest>;

    /// Check if an open pull request exists for a branch.
    fn pull_request_exists(&self, owner: &str, repo: &str, head_branch: &str) -> Result<bool>;
}

impl PullRequestOps for GitHubClient {
    fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pr: CreatePullRequest,
    ) -> Result<PullRequest> {
        pr.validate()?;

        let octocrab = self.octocrab.clone();
        let owner = owner.to_string();
        let repo = repo.to_string();

        let created = self.block_on(async move {
            let pulls = octocrab.pulls(&owner, &repo);
            let mut builder = pulls.create(&pr.title, &pr.head, &pr.base);
            builder = builder.body(&pr.body);

            if let Some(true) = pr.draft {
                builder = builder.draft(true);
            }

            if let Some(true) = pr.maintainer_can_modify {
                builder = builder.maintainer_can_modify(true);
            }

            let result = builder.send().await.map_err(|e| {
                let msg = e.to_string();
                if msg.contains("422") || msg.contains("Validation Failed") {
                    ManagerError::PullRequestError {
                        message: format!(
                            "Failed to create PR (branch may not exist or PR already exists): {}",
                            msg
                        ),
                    }
                } else {
                    ManagerError::PullRequestError {
                        message: format!("Failed to create PR: {}", msg),
                    }
                }
            })?;

            Ok::<_, ManagerError>(PullRequest::from(result))
        })?;

        tracing::info!(number = created.number, url = %created.html_url, "created pull request");
        Ok(created)
    }

    fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: PrState,
        page: PageRequest,
    ) -> Result<Vec<PullRequest>> {
        let octocrab = self.octocrab.clone();
        let owner = owner.to_string();
        let repo = repo.to_string();

        let prs = self.block_on(async move {
            let prs = octocrab
                .pulls(&owner, &repo)
                .list()
                .state(state.into())
                .per_page(page.per_page())
                .page(page.page())
                .send()
                .await
                .map_err(|e| ManagerError::GitHub {
                    message: format!("Failed to list pull requests: {}", e),
                })?;

            Ok::<_, ManagerError>(prs.items.into_iter().map(PullRequest::from).collect::<Vec<_>>())
        })?;

        tracing::info!(count = prs.len(), %state, "listed pull requests");
        Ok(prs)
    }

    fn get_pull_request(&self, owner: &str, repo: &str, number: u64) -> Result<PullRequest> {
        let octocrab = self.octocrab.clone();
        let owner = owner.to_string();
        let repo = repo.to_string();

        self.block_on(async move {
            let pr = octocrab
                .pulls(&owner, &repo)
                .get(number)
                .await
                .map_err(|e| ManagerError::GitHub {
                    message: format!("Failed to get pull request #{}: {}", number, e),
                })?;

            Ok(PullRequest::from(pr))
        })
    }

    fn pull_request_exists(&self, owner: &str, repo: &str, head_branch: &str) -> Result<bool> {
        let page = PageRequest::new(PageRequest::MAX_PER_PAGE, 1)?;
        let prs = self.list_pull_requests(owner, repo, PrState::Open, page)?;
        Ok(prs.iter().any(|pr| pr.head.ref_name == head_branch))
    }
}
