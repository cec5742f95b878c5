//! `workflow` and `progress` handlers.

use crate::cli::WorkflowCommand;
use crate::store::TraceStore;
use crate::workflow::{Stage, WorkflowRegistry};

/// Runs a `workflow` subcommand.
///
/// # Errors
///
/// Returns an error string if the stage file is unreadable or the registry
/// rejects the replacement.
pub fn run(store: &TraceStore, command: &WorkflowCommand) -> Result<(), String> {
    let registry = WorkflowRegistry::new(store);
    match command {
        WorkflowCommand::Define { project_id, file } => {
            let contents = std::fs::read_to_string(file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            let stages: Vec<Stage> = serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse {}: {e}", file.display()))?;
            registry.define(project_id, &stages).map_err(|e| e.to_string())?;
            println!("Workflow for {project_id} now has {} stages", stages.len());
            Ok(())
        }
        WorkflowCommand::Show { project_id } => {
            for stage in registry.workflow_of(project_id).map_err(|e| e.to_string())? {
                println!("{}  {}  {:?}  {}", stage.id, stage.name, stage.class, stage.color);
            }
            Ok(())
        }
    }
}

/// Prints a project's completed-task percentage.
///
/// # Errors
///
/// Returns an error string if the project does not exist.
pub fn run_progress(store: &TraceStore, project_id: &str) -> Result<(), String> {
    let progress = WorkflowRegistry::new(store).progress_of(project_id).map_err(|e| e.to_string())?;
    println!("{project_id}: {progress}% complete");
    Ok(())
}
