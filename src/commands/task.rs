//! `task` subcommand handlers.

use crate::cli::TaskCommand;
use crate::context::ServiceContext;
use crate::error::TraceError;
use crate::store::TraceStore;
use crate::workflow::WorkflowRegistry;

/// Runs a `task` subcommand.
///
/// A task's status must always name a stage of its project's current
/// workflow, so both `add` and `move` validate against the registry first.
///
/// # Errors
///
/// Returns an error string if validation fails or the store rejects the
/// operation.
pub fn run(
    ctx: &ServiceContext,
    store: &mut TraceStore,
    command: &TaskCommand,
) -> Result<(), String> {
    match command {
        TaskCommand::Add { project_id, title, status } => {
            let status = resolve_status(store, project_id, status.as_deref())
                .map_err(|e| e.to_string())?;
            let task = store
                .create_task(project_id, title, &status, ctx.clock.now())
                .map_err(|e| e.to_string())?;
            println!("Created task {} [{}] {}", task.id, task.status, task.title);
            Ok(())
        }
        TaskCommand::Move { task_id, stage_id } => {
            let task = store
                .get_task(task_id)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("not found: task {task_id}"))?;
            WorkflowRegistry::new(store)
                .class_of(&task.project_id, stage_id)
                .map_err(|e| e.to_string())?;
            store.set_task_status(task_id, stage_id).map_err(|e| e.to_string())?;
            println!("Moved {task_id} to {stage_id}");
            Ok(())
        }
        TaskCommand::List { project_id } => {
            let tasks = store.list_tasks(project_id).map_err(|e| e.to_string())?;
            if tasks.is_empty() {
                println!("No tasks in {project_id}");
                return Ok(());
            }
            for task in tasks {
                println!("{}  [{}]  {}", task.id, task.status, task.title);
            }
            Ok(())
        }
    }
}

/// Picks the task's initial status: the given stage (validated), or the
/// first stage of the project's workflow.
fn resolve_status(
    store: &TraceStore,
    project_id: &str,
    status: Option<&str>,
) -> Result<String, TraceError> {
    let registry = WorkflowRegistry::new(store);
    match status {
        Some(stage_id) => {
            registry.class_of(project_id, stage_id)?;
            Ok(stage_id.to_string())
        }
        None => registry
            .workflow_of(project_id)?
            .first()
            .map(|s| s.id.clone())
            .ok_or_else(|| TraceError::Validation(format!("project {project_id} has no stages"))),
    }
}
