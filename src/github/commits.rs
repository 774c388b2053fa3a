//! Commit history from the GitHub API.

use crate::error::{ManagerError, Result};
use crate::github::{GitHubClient, RepoRef};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    per_page: u8,
    page: u32,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u8 = 30;
    pub const MAX_PER_PAGE: u8 = 100;

    /// Build a page request. Pages are 1-based; GitHub caps `per_page` at 100.
    pub fn new(per_page: u8, page: u32) -> Result<Self> {
        if per_page == 0 || per_page > Self::MAX_PER_PAGE {
            return Err(ManagerError::InvalidConfig(format!(
                "per_page must be between 1 and {}",
                Self::MAX_PER_PAGE
            )));
        }
        if page == 0 {
            return Err(ManagerError::InvalidConfig("page numbers start at 1".into()));
        }
        Ok(Self { per_page, page })
    }

    pub fn per_page(&self) -> u8 {
        self.per_page
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            per_page: Self::DEFAULT_PER_PAGE,
            page: 1,
        }
    }
}

/// A commit as listed by the API.
#[derive(Debug, Clone)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    pub html_url: String,
}

impl CommitSummary {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }

    /// First line of the commit message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct ApiCommit {
    sha: String,
    html_url: String,
    commit: ApiCommitDetail,
}

#[derive(Deserialize)]
struct ApiCommitDetail {
    message: String,
    author: Option<ApiSignature>,
}

#[derive(Deserialize)]
struct ApiSignature {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

impl From<ApiCommit> for CommitSummary {
    fn from(c: ApiCommit) -> Self {
        let (author, date) = match c.commit.author {
            Some(sig) => (sig.name.unwrap_or_else(|| "Unknown".into()), sig.date),
            None => ("Unknown".into(), None),
        };
        Self {
            sha: c.sha,
            message: c.commit.message,
            author,
            date,
            html_url: c.html_url,
        }
    }
}

/// Remote commit history operations.
pub trait CommitHistoryOps {
    /// List one page of commits, newest first. `branch` of `None` means the
    /// repository's default branch.
    fn list_commits(
        &self,
        repo: &RepoRef,
        branch: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<CommitSummary>>;
}

impl CommitHistoryOps for GitHubClient {
    fn list_commits(
        &self,
        repo: &RepoRef,
        branch: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<CommitSummary>> {
        let owner = match &repo.owner {
            Some(owner) => owner.clone(),
            None => self.login()?,
        };

        let mut endpoint = format!(
            "/repos/{}/{}/commits?per_page={}&page={}",
            owner,
            repo.name,
            page.per_page(),
            page.page()
        );
        if let Some(branch) = branch {
            endpoint.push_str("&sha=");
            endpoint.push_str(&urlencoding::encode(branch));
        }

        let commits: Vec<ApiCommit> = self.get(&endpoint)?;
        let commits: Vec<CommitSummary> = commits.into_iter().map(CommitSummary::from).collect();
        tracing::info!(repo = %repo, count = commits.len(), "listed commits");
        Ok(commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(0, 1).is_err());
        assert!(PageRequest::new(101, 1).is_err());
        assert!(PageRequest::new(30, 0).is_err());
        let page = PageRequest::new(100, 3).unwrap();
        assert_eq!((page.per_page(), page.page()), (100, 3));
        assert_eq!(PageRequest::default(), PageRequest::new(30, 1).unwrap());
    }

    #[test]
    fn test_commit_from_api_payload() {
        let json = r#"[
            {
                "sha": "0123456789abcdef",
                "html_url": "https://github.com/octo/widgets/commit/0123456789abcdef",
                "commit": {
                    "message": "Fix parser\n\nLonger body",
                    "author": {"name": "Mona", "email": "m@example.com", "date": "2024-05-01T10:00:00Z"}
                }
            },
            {
                "sha": "fedcba",
                "html_url": "https://github.com/octo/widgets/commit/fedcba",
                "commit": {"message": "Initial commit", "author": null}
            }
        ]"#;
        let commits: Vec<CommitSummary> = serde_json::from_str::<Vec<ApiCommit>>(json)
            .unwrap()
            .into_iter()
            .map(CommitSummary::from)
            .collect();

        assert_eq!(commits[0].author, "Mona");
        assert_eq!(commits[0].short_sha(), "0123456");
        assert_eq!(commits[0].title(), "Fix parser");
        assert!(commits[0].date.is_some());

        assert_eq!(commits[1].author, "Unknown");
        assert_eq!(commits[1].short_sha(), "fedcba");
        assert!(commits[1].date.is_none());
    }
}
