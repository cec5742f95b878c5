//! SQLite persistence for work items, traceability links, and the commit cache.
//!
//! The store owns one connection and keeps every write to a single row
//! atomic at the statement level. The link tables are keyed by their triple
//! (owner, repo, ref): a second write to an existing triple is an update of
//! the `source` column, never a duplicate row.

mod cache;
mod links;

pub use cache::CacheRow;
pub use links::{BranchLinkRow, CommitLinkRow, UpsertMode, VersionCommitRow};

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::TraceError;

/// Provenance of a traceability link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// Inferred by an automated sync pass (e.g. a commit message reference).
    Auto,
    /// Confirmed by an explicit user action.
    Manual,
}

impl LinkSource {
    /// The column value stored for this provenance.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }

    fn parse(idx: usize, value: &str) -> rusqlite::Result<Self> {
        match value {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            other => Err(rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                format!("unknown link source {other:?}").into(),
            )),
        }
    }
}

/// A project row, including its workflow stored as a JSON array.
#[derive(Clone, Debug)]
pub struct ProjectRow {
    /// Project id (`PROJ-NNN`).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Workflow stages as a JSON array (see [`crate::workflow::Stage`]).
    pub workflow_json: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A task row.
#[derive(Clone, Debug)]
pub struct TaskRow {
    /// Task id (`TASK-NNN`).
    pub id: String,
    /// Owning project id.
    pub project_id: String,
    /// Task title.
    pub title: String,
    /// Stage id within the owning project's workflow.
    pub status: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A project version (release snapshot) row.
#[derive(Clone, Debug)]
pub struct VersionRow {
    /// Version id (`VER-NNN`).
    pub id: String,
    /// Owning project id.
    pub project_id: String,
    /// Version name (e.g. "1.4.0").
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed store for the traceability subsystem.
#[derive(Debug)]
pub struct TraceStore {
    conn: Connection,
}

impl TraceStore {
    /// Opens (creating if needed) the database under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the schema
    /// migration fails.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, TraceError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)
            .map_err(|e| TraceError::Validation(format!("cannot create data dir: {e}")))?;
        let conn = Connection::open(data_dir.join("tracelink.db"))?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Opens an in-memory database (tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema migration fails.
    pub fn open_in_memory() -> Result<Self, TraceError> {
        let store = Self { conn: Connection::open_in_memory()? };
        store.migrate()?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn migrate(&self) -> Result<(), TraceError> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;

            CREATE TABLE IF NOT EXISTS meta (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS counters (
              name TEXT PRIMARY KEY,
              value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS projects (
              id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              workflow TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
              id TEXT PRIMARY KEY,
              project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
              title TEXT NOT NULL,
              status TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS project_versions (
              id TEXT PRIMARY KEY,
              project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
              name TEXT NOT NULL,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS task_branch_links (
              id TEXT PRIMARY KEY,
              task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
              repo_full_name TEXT NOT NULL,
              branch_name TEXT NOT NULL,
              source TEXT NOT NULL DEFAULT 'manual',
              created_at TEXT NOT NULL,
              UNIQUE (task_id, repo_full_name, branch_name)
            );

            CREATE TABLE IF NOT EXISTS task_commit_links (
              id TEXT PRIMARY KEY,
              task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
              commit_sha TEXT NOT NULL,
              repo_full_name TEXT NOT NULL,
              source TEXT NOT NULL DEFAULT 'auto',
              created_at TEXT NOT NULL,
              UNIQUE (task_id, commit_sha, repo_full_name)
            );

            CREATE TABLE IF NOT EXISTS project_version_commits (
              id TEXT PRIMARY KEY,
              project_version_id TEXT NOT NULL REFERENCES project_versions(id) ON DELETE CASCADE,
              commit_sha TEXT NOT NULL,
              repo_full_name TEXT NOT NULL,
              created_at TEXT NOT NULL,
              UNIQUE (project_version_id, commit_sha, repo_full_name)
            );

            CREATE TABLE IF NOT EXISTS github_commit_cache (
              id TEXT PRIMARY KEY,
              repo_full_name TEXT NOT NULL,
              branch TEXT NOT NULL,
              commits TEXT NOT NULL,
              fetched_at TEXT NOT NULL,
              UNIQUE (repo_full_name, branch)
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_branch_links_ref
              ON task_branch_links(repo_full_name, branch_name);
            CREATE INDEX IF NOT EXISTS idx_commit_links_ref
              ON task_commit_links(repo_full_name, commit_sha);
            "#,
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            params!["schema_version", "v1"],
        )?;
        Ok(())
    }

    /// Allocates the next human-readable id for `prefix` (`PROJ`, `TASK`, `VER`).
    fn next_id(&mut self, prefix: &str) -> Result<String, TraceError> {
        let tx = self.conn.transaction()?;
        let current: i64 = tx
            .query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![prefix],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        let next = current + 1;
        tx.execute(
            r#"
            INSERT INTO counters(name, value) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET value = excluded.value
            "#,
            params![prefix, next],
        )?;
        tx.commit()?;
        Ok(format!("{prefix}-{next:03}"))
    }

    /// Creates a project with the given workflow JSON.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn create_project(
        &mut self,
        name: &str,
        workflow_json: &str,
        now: DateTime<Utc>,
    ) -> Result<ProjectRow, TraceError> {
        let id = self.next_id("PROJ")?;
        self.conn.execute(
            "INSERT INTO projects(id, name, workflow, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, workflow_json, now.to_rfc3339()],
        )?;
        Ok(ProjectRow {
            id,
            name: name.to_string(),
            workflow_json: workflow_json.to_string(),
            created_at: now,
        })
    }

    /// Looks up a project by id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn get_project(&self, id: &str) -> Result<Option<ProjectRow>, TraceError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, workflow, created_at FROM projects WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ProjectRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        workflow_json: row.get(2)?,
                        created_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
                    })
                },
            )
            .optional()?)
    }

    /// Lists all projects, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn list_projects(&self) -> Result<Vec<ProjectRow>, TraceError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, workflow, created_at FROM projects ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(ProjectRow {
                id: row.get(0)?,
                name: row.get(1)?,
                workflow_json: row.get(2)?,
                created_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Replaces a project's workflow JSON wholesale.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub fn set_workflow(&self, project_id: &str, workflow_json: &str) -> Result<(), TraceError> {
        let updated = self.conn.execute(
            "UPDATE projects SET workflow = ?2 WHERE id = ?1",
            params![project_id, workflow_json],
        )?;
        if updated == 0 {
            return Err(TraceError::NotFound(format!("project {project_id}")));
        }
        Ok(())
    }

    /// Creates a task in a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub fn create_task(
        &mut self,
        project_id: &str,
        title: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<TaskRow, TraceError> {
        if self.get_project(project_id)?.is_none() {
            return Err(TraceError::NotFound(format!("project {project_id}")));
        }
        let id = self.next_id("TASK")?;
        self.conn.execute(
            "INSERT INTO tasks(id, project_id, title, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, project_id, title, status, now.to_rfc3339()],
        )?;
        Ok(TaskRow {
            id,
            project_id: project_id.to_string(),
            title: title.to_string(),
            status: status.to_string(),
            created_at: now,
        })
    }

    /// Looks up a task by id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn get_task(&self, id: &str) -> Result<Option<TaskRow>, TraceError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, project_id, title, status, created_at FROM tasks WHERE id = ?1",
                params![id],
                map_task_row,
            )
            .optional()?)
    }

    /// Lists all tasks in a project, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn list_tasks(&self, project_id: &str) -> Result<Vec<TaskRow>, TraceError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, status, created_at FROM tasks \
             WHERE project_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![project_id], map_task_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Moves a task to a new status.
    ///
    /// The status must already be validated against the project's workflow
    /// by the caller.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the task does not exist.
    pub fn set_task_status(&self, task_id: &str, status: &str) -> Result<(), TraceError> {
        let updated = self
            .conn
            .execute("UPDATE tasks SET status = ?2 WHERE id = ?1", params![task_id, status])?;
        if updated == 0 {
            return Err(TraceError::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }

    /// Deletes a task; its links go with it via cascade.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the task does not exist.
    pub fn delete_task(&self, task_id: &str) -> Result<(), TraceError> {
        let deleted =
            self.conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
        if deleted == 0 {
            return Err(TraceError::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }

    /// Creates a version snapshot in a project.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub fn create_version(
        &mut self,
        project_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<VersionRow, TraceError> {
        if self.get_project(project_id)?.is_none() {
            return Err(TraceError::NotFound(format!("project {project_id}")));
        }
        let id = self.next_id("VER")?;
        self.conn.execute(
            "INSERT INTO project_versions(id, project_id, name, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![id, project_id, name, now.to_rfc3339()],
        )?;
        Ok(VersionRow {
            id,
            project_id: project_id.to_string(),
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Looks up a version by id.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn get_version(&self, id: &str) -> Result<Option<VersionRow>, TraceError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, project_id, name, created_at FROM project_versions WHERE id = ?1",
                params![id],
                |row| {
                    Ok(VersionRow {
                        id: row.get(0)?,
                        project_id: row.get(1)?,
                        name: row.get(2)?,
                        created_at: parse_timestamp(3, &row.get::<_, String>(3)?)?,
                    })
                },
            )
            .optional()?)
    }
}

fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        status: row.get(3)?,
        created_at: parse_timestamp(4, &row.get::<_, String>(4)?)?,
    })
}

pub(crate) fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc)).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
