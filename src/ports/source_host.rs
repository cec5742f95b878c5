//! Source host port for querying a hosted git provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit as reported by the source host.
///
/// This is the only commit shape the rest of the system sees; provider
/// response formats never leak past the adapter. It is also the shape
/// serialized into the commit cache, so it must stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Full commit hash.
    pub sha: String,
    /// Full commit message.
    pub message: String,
    /// Author display name.
    pub author: String,
    /// Author timestamp.
    pub timestamp: DateTime<Utc>,
}

/// One issue as reported by the source host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoIssue {
    /// Issue number within the repository.
    pub number: u64,
    /// Issue title.
    pub title: String,
    /// Current state (e.g. "open", "closed").
    pub state: String,
}

/// Read access to a hosted git provider.
///
/// Abstracting the provider allows testing linking and caching behavior
/// without network access, and keeps provider request logic in one place.
pub trait SourceHost: Send + Sync {
    /// Lists commit history for a branch, newest first.
    ///
    /// `repo` is the full repository name (e.g. `org/repo`).
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached or rejects the
    /// request.
    fn list_commits(
        &self,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<CommitSummary>, Box<dyn std::error::Error + Send + Sync>>;

    /// Lists open issues for a repository.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot be reached or rejects the
    /// request.
    fn list_issues(
        &self,
        repo: &str,
    ) -> Result<Vec<RepoIssue>, Box<dyn std::error::Error + Send + Sync>>;
}
