//! Live adapter for the `SourceHost` port using the GitHub REST API.

use std::env;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::ports::source_host::{CommitSummary, RepoIssue, SourceHost};

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "tracelink";
const PER_PAGE: u32 = 100;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Live source host that calls the GitHub REST API.
///
/// Reads `GITHUB_TOKEN` from the environment when present; unauthenticated
/// requests work for public repositories at a lower rate limit.
pub struct LiveGitHubHost {
    client: Client,
}

impl LiveGitHubHost {
    /// Creates a new live GitHub adapter.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Runs a request future to completion on a current-thread runtime.
    ///
    /// The port traits are synchronous; async stays confined to this adapter.
    fn block_on<F, T>(future: F) -> Result<T, BoxError>
    where
        F: std::future::Future<Output = Result<T, BoxError>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| -> BoxError { format!("Failed to start runtime: {e}").into() })?;
        runtime.block_on(future)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, BoxError> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        if let Ok(token) = env::var("GITHUB_TOKEN") {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| -> BoxError { format!("GitHub API request failed: {e}").into() })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| -> BoxError { format!("Failed to read GitHub API response: {e}").into() })?;

        if !status.is_success() {
            let msg = serde_json::from_str::<GitHubError>(&response_text)
                .map(|e| e.message)
                .unwrap_or(response_text);
            return Err(format!("GitHub API error ({}): {msg}", status.as_u16()).into());
        }

        serde_json::from_str(&response_text)
            .map_err(|e| -> BoxError { format!("Failed to parse GitHub API response: {e}").into() })
    }
}

impl Default for LiveGitHubHost {
    fn default() -> Self {
        Self::new()
    }
}

/// One element of the GitHub commits listing.
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    commit: GitHubCommitDetail,
}

/// Nested commit detail in the GitHub commits listing.
#[derive(Deserialize)]
struct GitHubCommitDetail {
    message: String,
    author: Option<GitHubCommitAuthor>,
}

/// Author block inside a GitHub commit.
#[derive(Deserialize)]
struct GitHubCommitAuthor {
    name: Option<String>,
    date: Option<DateTime<Utc>>,
}

/// One element of the GitHub issues listing.
#[derive(Deserialize)]
struct GitHubIssue {
    number: u64,
    title: String,
    state: String,
    /// Present only for pull requests; used to filter them out.
    pull_request: Option<serde_json::Value>,
}

/// Error response body from the GitHub API.
#[derive(Deserialize)]
struct GitHubError {
    message: String,
}

impl SourceHost for LiveGitHubHost {
    fn list_commits(&self, repo: &str, branch: &str) -> Result<Vec<CommitSummary>, BoxError> {
        let url =
            format!("{GITHUB_API_URL}/repos/{repo}/commits?sha={branch}&per_page={PER_PAGE}");
        let commits: Vec<GitHubCommit> = Self::block_on(self.get_json(&url))?;

        Ok(commits
            .into_iter()
            .map(|c| {
                let author = c.commit.author.as_ref();
                CommitSummary {
                    sha: c.sha,
                    message: c.commit.message.clone(),
                    author: author
                        .and_then(|a| a.name.clone())
                        .unwrap_or_else(|| "unknown".to_string()),
                    timestamp: author.and_then(|a| a.date).unwrap_or_else(Utc::now),
                }
            })
            .collect())
    }

    fn list_issues(&self, repo: &str) -> Result<Vec<RepoIssue>, BoxError> {
        let url = format!("{GITHUB_API_URL}/repos/{repo}/issues?state=open&per_page={PER_PAGE}");
        let issues: Vec<GitHubIssue> = Self::block_on(self.get_json(&url))?;

        // GitHub's issues endpoint includes pull requests.
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(|i| RepoIssue { number: i.number, title: i.title, state: i.state })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commit_listing_shape() {
        let body = r#"[{
            "sha": "abc123",
            "commit": {
                "message": "TASK-001: fix parser",
                "author": {"name": "Dev", "date": "2024-06-15T10:30:00Z"}
            }
        }]"#;
        let commits: Vec<GitHubCommit> = serde_json::from_str(body).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "abc123");
        assert_eq!(commits[0].commit.author.as_ref().unwrap().name.as_deref(), Some("Dev"));
    }

    #[test]
    fn parses_commit_without_author() {
        let body = r#"[{"sha": "def456", "commit": {"message": "initial", "author": null}}]"#;
        let commits: Vec<GitHubCommit> = serde_json::from_str(body).unwrap();
        assert!(commits[0].commit.author.is_none());
    }

    #[test]
    fn parses_issue_listing_and_detects_pull_requests() {
        let body = r#"[
            {"number": 7, "title": "Bug", "state": "open"},
            {"number": 8, "title": "PR", "state": "open", "pull_request": {"url": "x"}}
        ]"#;
        let issues: Vec<GitHubIssue> = serde_json::from_str(body).unwrap();
        assert!(issues[0].pull_request.is_none());
        assert!(issues[1].pull_request.is_some());
    }
}
