//! Per-project workflow registry.
//!
//! A project's workflow is an ordered list of stages, each carrying a
//! semantic class. Stage ids are scoped to their project: two projects may
//! name their stages however they like, and generic progress logic keys off
//! the class alone.

use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::store::TraceStore;

/// Semantic class of a workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageClass {
    /// Work has not begun.
    NotStarted,
    /// Work is underway.
    InProgress,
    /// Work is finished; counts toward progress.
    Completed,
}

/// One stage of a project's workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Stage id, unique within the project's workflow.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display color (hex string, passed through untouched).
    pub color: String,
    /// Semantic class driving progress and aggregation.
    pub class: StageClass,
}

/// The workflow seeded into every new project.
#[must_use]
pub fn default_workflow() -> Vec<Stage> {
    vec![
        Stage {
            id: "todo".to_string(),
            name: "To Do".to_string(),
            color: "#6b7280".to_string(),
            class: StageClass::NotStarted,
        },
        Stage {
            id: "in_progress".to_string(),
            name: "In Progress".to_string(),
            color: "#3b82f6".to_string(),
            class: StageClass::InProgress,
        },
        Stage {
            id: "done".to_string(),
            name: "Done".to_string(),
            color: "#22c55e".to_string(),
            class: StageClass::Completed,
        },
    ]
}

/// Read/write access to per-project workflows and progress.
pub struct WorkflowRegistry<'a> {
    store: &'a TraceStore,
}

impl<'a> WorkflowRegistry<'a> {
    /// Creates a registry over the given store.
    #[must_use]
    pub fn new(store: &'a TraceStore) -> Self {
        Self { store }
    }

    /// Returns a project's current workflow.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist, `Validation` if the
    /// stored workflow JSON cannot be parsed.
    pub fn workflow_of(&self, project_id: &str) -> Result<Vec<Stage>, TraceError> {
        let project = self
            .store
            .get_project(project_id)?
            .ok_or_else(|| TraceError::NotFound(format!("project {project_id}")))?;
        serde_json::from_str(&project.workflow_json)
            .map_err(|e| TraceError::Validation(format!("stored workflow is malformed: {e}")))
    }

    /// Replaces a project's workflow wholesale.
    ///
    /// Policy for tasks whose status stage disappears: **reject**. The call
    /// fails with `Conflict` and leaves the stored workflow unchanged; the
    /// caller moves the affected tasks first. Nothing is reassigned silently.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty workflow or duplicate stage ids,
    /// `Conflict` when a removed stage still has tasks, `NotFound` for a
    /// missing project.
    pub fn define(&self, project_id: &str, stages: &[Stage]) -> Result<(), TraceError> {
        if stages.is_empty() {
            return Err(TraceError::Validation("workflow must have at least one stage".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for stage in stages {
            if !seen.insert(stage.id.as_str()) {
                return Err(TraceError::Validation(format!(
                    "duplicate stage id {:?}",
                    stage.id
                )));
            }
        }

        for task in self.store.list_tasks(project_id)? {
            if !stages.iter().any(|s| s.id == task.status) {
                return Err(TraceError::Conflict(format!(
                    "stage {:?} still has task {}; move it before removing the stage",
                    task.status, task.id
                )));
            }
        }

        let json = serde_json::to_string(stages)
            .map_err(|e| TraceError::Validation(format!("cannot serialize workflow: {e}")))?;
        self.store.set_workflow(project_id, &json)
    }

    /// Returns the class of a stage within a project's workflow.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the stage id is absent from the current
    /// workflow (or the project does not exist).
    pub fn class_of(&self, project_id: &str, stage_id: &str) -> Result<StageClass, TraceError> {
        self.workflow_of(project_id)?
            .iter()
            .find(|s| s.id == stage_id)
            .map(|s| s.class)
            .ok_or_else(|| {
                TraceError::NotFound(format!("stage {stage_id:?} in project {project_id}"))
            })
    }

    /// Percentage of tasks in a `Completed`-class stage, 0 with no tasks.
    ///
    /// Recomputed from the task table on every call; task status changes
    /// independently of the workflow, so this is never cached.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the project does not exist.
    pub fn progress_of(&self, project_id: &str) -> Result<u32, TraceError> {
        let stages = self.workflow_of(project_id)?;
        let completed: Vec<&str> = stages
            .iter()
            .filter(|s| s.class == StageClass::Completed)
            .map(|s| s.id.as_str())
            .collect();

        let tasks = self.store.list_tasks(project_id)?;
        if tasks.is_empty() {
            return Ok(0);
        }
        let done = tasks.iter().filter(|t| completed.contains(&t.status.as_str())).count();
        #[allow(clippy::cast_possible_truncation)]
        Ok((done * 100 / tasks.len()) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    fn stage(id: &str, class: StageClass) -> Stage {
        Stage { id: id.to_string(), name: id.to_string(), color: "#000000".to_string(), class }
    }

    fn store_with_project() -> (TraceStore, String) {
        let mut store = TraceStore::open_in_memory().unwrap();
        let workflow = serde_json::to_string(&default_workflow()).unwrap();
        let project = store.create_project("Alpha", &workflow, t0()).unwrap();
        (store, project.id)
    }

    #[test]
    fn define_rejects_duplicate_stage_ids() {
        let (store, project) = store_with_project();
        let registry = WorkflowRegistry::new(&store);

        let err = registry
            .define(
                &project,
                &[stage("todo", StageClass::NotStarted), stage("todo", StageClass::Completed)],
            )
            .unwrap_err();
        assert!(matches!(err, TraceError::Validation(_)));
    }

    #[test]
    fn define_rejects_empty_workflow() {
        let (store, project) = store_with_project();
        let registry = WorkflowRegistry::new(&store);
        assert!(matches!(registry.define(&project, &[]), Err(TraceError::Validation(_))));
    }

    #[test]
    fn define_replaces_workflow_wholesale() {
        let (store, project) = store_with_project();
        let registry = WorkflowRegistry::new(&store);

        let stages = vec![
            stage("queued", StageClass::NotStarted),
            stage("shipped", StageClass::Completed),
        ];
        registry.define(&project, &stages).unwrap();
        assert_eq!(registry.workflow_of(&project).unwrap(), stages);
    }

    #[test]
    fn define_rejects_orphaning_a_task_and_keeps_old_workflow() {
        let (mut store, project) = store_with_project();
        store.create_task(&project, "Stuck", "in_progress", t0()).unwrap();
        let registry = WorkflowRegistry::new(&store);

        let err = registry
            .define(
                &project,
                &[stage("todo", StageClass::NotStarted), stage("done", StageClass::Completed)],
            )
            .unwrap_err();
        assert!(matches!(err, TraceError::Conflict(_)));

        // The stored workflow is unchanged after the rejected replace.
        let ids: Vec<String> =
            registry.workflow_of(&project).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["todo", "in_progress", "done"]);
    }

    #[test]
    fn class_of_missing_stage_is_not_found() {
        let (store, project) = store_with_project();
        let registry = WorkflowRegistry::new(&store);

        assert_eq!(registry.class_of(&project, "done").unwrap(), StageClass::Completed);
        assert!(matches!(
            registry.class_of(&project, "review"),
            Err(TraceError::NotFound(_))
        ));
    }

    #[test]
    fn progress_is_zero_with_no_tasks() {
        let (store, project) = store_with_project();
        assert_eq!(WorkflowRegistry::new(&store).progress_of(&project).unwrap(), 0);
    }

    #[test]
    fn progress_counts_completed_class_tasks() {
        let (mut store, project) = store_with_project();
        for status in ["todo", "in_progress", "done", "done"] {
            store.create_task(&project, status, status, t0()).unwrap();
        }
        assert_eq!(WorkflowRegistry::new(&store).progress_of(&project).unwrap(), 50);
    }

    #[test]
    fn progress_is_full_when_everything_is_done() {
        let (mut store, project) = store_with_project();
        store.create_task(&project, "A", "done", t0()).unwrap();
        store.create_task(&project, "B", "done", t0()).unwrap();
        assert_eq!(WorkflowRegistry::new(&store).progress_of(&project).unwrap(), 100);
    }

    #[test]
    fn stage_class_serializes_snake_case() {
        let json = serde_json::to_string(&StageClass::NotStarted).unwrap();
        assert_eq!(json, "\"not_started\"");
    }
}
