//! Link tables: branch links, commit links, and version commit snapshots.
//!
//! All three tables share the same shape: the (owner, repo, ref) triple is
//! the row identity, and an upsert on an existing triple updates only the
//! `source` column. The `KeepManual` mode is the storage-level half of the
//! "auto never downgrades manual" rule: the guard lives inside a single
//! `ON CONFLICT ... DO UPDATE ... WHERE` statement, so two writers racing on
//! one triple converge to manual regardless of arrival order.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{parse_timestamp, LinkSource, TaskRow, TraceStore};
use crate::error::TraceError;

/// How an upsert treats an existing row's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// Overwrite `source` unconditionally (manual action always wins).
    Force,
    /// Leave the row untouched when its current `source` is `manual`.
    KeepManual,
}

/// A task-to-branch link row.
#[derive(Clone, Debug)]
pub struct BranchLinkRow {
    /// Opaque row id.
    pub id: String,
    /// Linked task.
    pub task_id: String,
    /// Repository full name (`org/repo`).
    pub repo_full_name: String,
    /// Branch name within the repository.
    pub branch_name: String,
    /// Provenance of the link.
    pub source: LinkSource,
    /// Creation time; untouched by later upserts.
    pub created_at: DateTime<Utc>,
}

/// A task-to-commit link row.
#[derive(Clone, Debug)]
pub struct CommitLinkRow {
    /// Opaque row id.
    pub id: String,
    /// Linked task.
    pub task_id: String,
    /// Commit hash.
    pub commit_sha: String,
    /// Repository full name.
    pub repo_full_name: String,
    /// Provenance of the link.
    pub source: LinkSource,
    /// Creation time; untouched by later upserts.
    pub created_at: DateTime<Utc>,
}

/// A version-to-commit snapshot row. Always deliberate, so no provenance.
#[derive(Clone, Debug)]
pub struct VersionCommitRow {
    /// Opaque row id.
    pub id: String,
    /// Owning project version.
    pub project_version_id: String,
    /// Commit hash.
    pub commit_sha: String,
    /// Repository full name.
    pub repo_full_name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl TraceStore {
    /// Inserts or updates a task-to-branch link.
    ///
    /// On triple conflict only `source` changes; `id` and `created_at` keep
    /// their original values. Returns the row as it exists after the write.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure (including a missing task,
    /// surfaced as a foreign-key violation).
    pub fn upsert_branch_link(
        &self,
        task_id: &str,
        repo: &str,
        branch: &str,
        source: LinkSource,
        mode: UpsertMode,
        row_id: &str,
        now: DateTime<Utc>,
    ) -> Result<BranchLinkRow, TraceError> {
        let sql = match mode {
            UpsertMode::Force => {
                "INSERT INTO task_branch_links(id, task_id, repo_full_name, branch_name, source, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(task_id, repo_full_name, branch_name) \
                 DO UPDATE SET source = excluded.source"
            }
            UpsertMode::KeepManual => {
                "INSERT INTO task_branch_links(id, task_id, repo_full_name, branch_name, source, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(task_id, repo_full_name, branch_name) \
                 DO UPDATE SET source = excluded.source \
                 WHERE task_branch_links.source != 'manual'"
            }
        };
        self.conn().execute(
            sql,
            params![row_id, task_id, repo, branch, source.as_str(), now.to_rfc3339()],
        )?;
        self.get_branch_link(task_id, repo, branch)?
            .ok_or_else(|| TraceError::NotFound(format!("branch link for task {task_id}")))
    }

    /// Looks up one branch link by its triple key.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn get_branch_link(
        &self,
        task_id: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<BranchLinkRow>, TraceError> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, task_id, repo_full_name, branch_name, source, created_at \
                 FROM task_branch_links \
                 WHERE task_id = ?1 AND repo_full_name = ?2 AND branch_name = ?3",
                params![task_id, repo, branch],
                map_branch_link,
            )
            .optional()?)
    }

    /// Deletes a branch link by its triple key; no error if absent.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn remove_branch_link(
        &self,
        task_id: &str,
        repo: &str,
        branch: &str,
    ) -> Result<(), TraceError> {
        self.conn().execute(
            "DELETE FROM task_branch_links \
             WHERE task_id = ?1 AND repo_full_name = ?2 AND branch_name = ?3",
            params![task_id, repo, branch],
        )?;
        Ok(())
    }

    /// All branch links for a task, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn branch_links_for_task(&self, task_id: &str) -> Result<Vec<BranchLinkRow>, TraceError> {
        let mut stmt = self.conn().prepare(
            "SELECT id, task_id, repo_full_name, branch_name, source, created_at \
             FROM task_branch_links WHERE task_id = ?1 \
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![task_id], map_branch_link)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Tasks linked to a branch, scoped to one project.
    ///
    /// The project scope prevents cross-project leakage when two projects
    /// use repositories with colliding branch names.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn tasks_for_branch(
        &self,
        project_id: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<TaskRow>, TraceError> {
        let mut stmt = self.conn().prepare(
            "SELECT t.id, t.project_id, t.title, t.status, t.created_at \
             FROM tasks t \
             JOIN task_branch_links l ON l.task_id = t.id \
             WHERE t.project_id = ?1 AND l.repo_full_name = ?2 AND l.branch_name = ?3 \
             ORDER BY l.created_at DESC, l.rowid DESC",
        )?;
        let rows = stmt.query_map(params![project_id, repo, branch], super::map_task_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Inserts or updates a task-to-commit link. Same contract as
    /// [`TraceStore::upsert_branch_link`].
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn upsert_commit_link(
        &self,
        task_id: &str,
        sha: &str,
        repo: &str,
        source: LinkSource,
        mode: UpsertMode,
        row_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CommitLinkRow, TraceError> {
        let sql = match mode {
            UpsertMode::Force => {
                "INSERT INTO task_commit_links(id, task_id, commit_sha, repo_full_name, source, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(task_id, commit_sha, repo_full_name) \
                 DO UPDATE SET source = excluded.source"
            }
            UpsertMode::KeepManual => {
                "INSERT INTO task_commit_links(id, task_id, commit_sha, repo_full_name, source, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT(task_id, commit_sha, repo_full_name) \
                 DO UPDATE SET source = excluded.source \
                 WHERE task_commit_links.source != 'manual'"
            }
        };
        self.conn().execute(
            sql,
            params![row_id, task_id, sha, repo, source.as_str(), now.to_rfc3339()],
        )?;
        self.get_commit_link(task_id, sha, repo)?
            .ok_or_else(|| TraceError::NotFound(format!("commit link for task {task_id}")))
    }

    /// Looks up one commit link by its triple key.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn get_commit_link(
        &self,
        task_id: &str,
        sha: &str,
        repo: &str,
    ) -> Result<Option<CommitLinkRow>, TraceError> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, task_id, commit_sha, repo_full_name, source, created_at \
                 FROM task_commit_links \
                 WHERE task_id = ?1 AND commit_sha = ?2 AND repo_full_name = ?3",
                params![task_id, sha, repo],
                map_commit_link,
            )
            .optional()?)
    }

    /// Deletes a commit link by its triple key; no error if absent.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn remove_commit_link(
        &self,
        task_id: &str,
        sha: &str,
        repo: &str,
    ) -> Result<(), TraceError> {
        self.conn().execute(
            "DELETE FROM task_commit_links \
             WHERE task_id = ?1 AND commit_sha = ?2 AND repo_full_name = ?3",
            params![task_id, sha, repo],
        )?;
        Ok(())
    }

    /// All commit links for a task, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn commit_links_for_task(&self, task_id: &str) -> Result<Vec<CommitLinkRow>, TraceError> {
        let mut stmt = self.conn().prepare(
            "SELECT id, task_id, commit_sha, repo_full_name, source, created_at \
             FROM task_commit_links WHERE task_id = ?1 \
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![task_id], map_commit_link)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Tasks linked to a commit, scoped to one project.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn tasks_for_commit(
        &self,
        project_id: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<TaskRow>, TraceError> {
        let mut stmt = self.conn().prepare(
            "SELECT t.id, t.project_id, t.title, t.status, t.created_at \
             FROM tasks t \
             JOIN task_commit_links l ON l.task_id = t.id \
             WHERE t.project_id = ?1 AND l.repo_full_name = ?2 AND l.commit_sha = ?3 \
             ORDER BY l.created_at DESC, l.rowid DESC",
        )?;
        let rows = stmt.query_map(params![project_id, repo, sha], super::map_task_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Attaches a commit to a version snapshot. Idempotent on the triple.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn upsert_version_commit(
        &self,
        version_id: &str,
        sha: &str,
        repo: &str,
        row_id: &str,
        now: DateTime<Utc>,
    ) -> Result<VersionCommitRow, TraceError> {
        self.conn().execute(
            "INSERT INTO project_version_commits(id, project_version_id, commit_sha, repo_full_name, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(project_version_id, commit_sha, repo_full_name) DO NOTHING",
            params![row_id, version_id, sha, repo, now.to_rfc3339()],
        )?;
        self.conn()
            .query_row(
                "SELECT id, project_version_id, commit_sha, repo_full_name, created_at \
                 FROM project_version_commits \
                 WHERE project_version_id = ?1 AND commit_sha = ?2 AND repo_full_name = ?3",
                params![version_id, sha, repo],
                map_version_commit,
            )
            .optional()?
            .ok_or_else(|| TraceError::NotFound(format!("version commit for {version_id}")))
    }

    /// Detaches a commit from a version snapshot; no error if absent.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn remove_version_commit(
        &self,
        version_id: &str,
        sha: &str,
        repo: &str,
    ) -> Result<(), TraceError> {
        self.conn().execute(
            "DELETE FROM project_version_commits \
             WHERE project_version_id = ?1 AND commit_sha = ?2 AND repo_full_name = ?3",
            params![version_id, sha, repo],
        )?;
        Ok(())
    }

    /// All commits attached to a version, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn commits_for_version(
        &self,
        version_id: &str,
    ) -> Result<Vec<VersionCommitRow>, TraceError> {
        let mut stmt = self.conn().prepare(
            "SELECT id, project_version_id, commit_sha, repo_full_name, created_at \
             FROM project_version_commits WHERE project_version_id = ?1 \
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![version_id], map_version_commit)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn map_branch_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<BranchLinkRow> {
    Ok(BranchLinkRow {
        id: row.get(0)?,
        task_id: row.get(1)?,
        repo_full_name: row.get(2)?,
        branch_name: row.get(3)?,
        source: LinkSource::parse(4, &row.get::<_, String>(4)?)?,
        created_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
    })
}

fn map_commit_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommitLinkRow> {
    Ok(CommitLinkRow {
        id: row.get(0)?,
        task_id: row.get(1)?,
        commit_sha: row.get(2)?,
        repo_full_name: row.get(3)?,
        source: LinkSource::parse(4, &row.get::<_, String>(4)?)?,
        created_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
    })
}

fn map_version_commit(row: &rusqlite::Row<'_>) -> rusqlite::Result<VersionCommitRow> {
    Ok(VersionCommitRow {
        id: row.get(0)?,
        project_version_id: row.get(1)?,
        commit_sha: row.get(2)?,
        repo_full_name: row.get(3)?,
        created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}
