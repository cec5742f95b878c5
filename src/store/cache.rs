//! Commit-cache rows: one snapshot of branch history per (repo, branch).

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{parse_timestamp, TraceStore};
use crate::error::TraceError;

/// One cached commit-history snapshot.
#[derive(Clone, Debug)]
pub struct CacheRow {
    /// Opaque row id.
    pub id: String,
    /// Repository full name.
    pub repo_full_name: String,
    /// Branch name.
    pub branch: String,
    /// Commit list as a JSON array of [`crate::ports::CommitSummary`].
    pub commits_json: String,
    /// When the snapshot was fetched from the source host.
    pub fetched_at: DateTime<Utc>,
}

impl TraceStore {
    /// Looks up the cached snapshot for a (repo, branch) pair.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn cache_entry(&self, repo: &str, branch: &str) -> Result<Option<CacheRow>, TraceError> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, repo_full_name, branch, commits, fetched_at \
                 FROM github_commit_cache \
                 WHERE repo_full_name = ?1 AND branch = ?2",
                params![repo, branch],
                |row| {
                    Ok(CacheRow {
                        id: row.get(0)?,
                        repo_full_name: row.get(1)?,
                        branch: row.get(2)?,
                        commits_json: row.get(3)?,
                        fetched_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
                    })
                },
            )
            .optional()?)
    }

    /// Replaces the cached snapshot for a (repo, branch) pair wholesale.
    ///
    /// Last write wins: both the commit list and `fetched_at` come from the
    /// new snapshot, never merged with stale data.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn replace_cache_entry(
        &self,
        repo: &str,
        branch: &str,
        commits_json: &str,
        row_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), TraceError> {
        self.conn().execute(
            "INSERT INTO github_commit_cache(id, repo_full_name, branch, commits, fetched_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(repo_full_name, branch) \
             DO UPDATE SET commits = excluded.commits, fetched_at = excluded.fetched_at",
            params![row_id, repo, branch, commits_json, fetched_at.to_rfc3339()],
        )?;
        Ok(())
    }
}
