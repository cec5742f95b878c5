//! `project` subcommand handlers.

use crate::cli::ProjectCommand;
use crate::context::ServiceContext;
use crate::store::TraceStore;
use crate::workflow::default_workflow;

/// Runs a `project` subcommand.
///
/// # Errors
///
/// Returns an error string if the store rejects the operation.
pub fn run(
    ctx: &ServiceContext,
    store: &mut TraceStore,
    command: &ProjectCommand,
) -> Result<(), String> {
    match command {
        ProjectCommand::Add { name } => {
            let workflow = serde_json::to_string(&default_workflow())
                .map_err(|e| format!("Failed to serialize default workflow: {e}"))?;
            let project = store
                .create_project(name, &workflow, ctx.clock.now())
                .map_err(|e| e.to_string())?;
            println!("Created project {} ({})", project.id, project.name);
            Ok(())
        }
        ProjectCommand::List => {
            let projects = store.list_projects().map_err(|e| e.to_string())?;
            if projects.is_empty() {
                println!("No projects yet");
                return Ok(());
            }
            for project in projects {
                println!("{}  {}", project.id, project.name);
            }
            Ok(())
        }
    }
}
