//! Local commit log.

use crate::error::Result;
use crate::git::GitOps;
use chrono::{DateTime, TimeZone, Utc};

/// A commit read from the local object database.
#[derive(Debug, Clone)]
pub struct LocalCommit {
    pub sha: String,
    pub summary: String,
    pub author: String,
    pub time: Option<DateTime<Utc>>,
}

impl LocalCommit {
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

/// History operations for GitOps.
pub trait HistoryOps {
    /// Up to `limit` commits reachable from HEAD, newest first.
    fn recent_commits(&self, limit: usize) -> Result<Vec<LocalCommit>>;
}

impl HistoryOps for GitOps {
    fn recent_commits(&self, limit: usize) -> Result<Vec<LocalCommit>> {
        let mut walk = self.repo.revwalk()?;
        walk.push_head()?;
        walk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;

        let mut commits = Vec::new();
        for oid in walk.take(limit) {
            let commit = self.repo.find_commit(oid?)?;
            let author = commit.author();
            commits.push(LocalCommit {
                sha: commit.id().to_string(),
                summary: commit.summary().unwrap_or_default().to_string(),
                author: author.name().unwrap_or("Unknown").to_string(),
                time: Utc.timestamp_opt(commit.time().seconds(), 0).single(),
            });
        }

        Ok(commits)
    }
}
