//! Command dispatch and handlers.

pub mod commits;
pub mod link;
pub mod project;
pub mod sync;
pub mod task;
pub mod version;
pub mod workflow;

use std::env;
use std::path::PathBuf;

use crate::cli::Command;
use crate::context::ServiceContext;
use crate::store::TraceStore;

/// Dispatch a parsed command to its handler.
///
/// The data directory (database + settings) defaults to `.tracelink` and is
/// overridden by the `TRACELINK_DIR` environment variable.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    let data_dir =
        env::var("TRACELINK_DIR").map_or_else(|_| PathBuf::from(".tracelink"), PathBuf::from);
    let ctx = ServiceContext::live(&data_dir);
    let mut store = TraceStore::open(&data_dir).map_err(|e| e.to_string())?;
    dispatch_with(command, &ctx, &mut store)
}

/// Dispatch a command against the given context and store.
fn dispatch_with(
    command: &Command,
    ctx: &ServiceContext,
    store: &mut TraceStore,
) -> Result<(), String> {
    match command {
        Command::Project { command } => project::run(ctx, store, command),
        Command::Task { command } => task::run(ctx, store, command),
        Command::Link { command } => link::run_link(ctx, store, command),
        Command::Unlink { command } => link::run_unlink(ctx, store, command),
        Command::Links { task_id } => link::run_links(store, task_id),
        Command::TasksFor { project, repo, branch, commit } => {
            link::run_tasks_for(store, project, repo, branch.as_deref(), commit.as_deref())
        }
        Command::Commits { repo, branch, max_age_mins } => {
            commits::run_commits(ctx, store, repo, branch, *max_age_mins)
        }
        Command::Workflow { command } => workflow::run(store, command),
        Command::Progress { project_id } => workflow::run_progress(store, project_id),
        Command::Version { command } => version::run(ctx, store, command),
        Command::Sync { project_id, repo, branch, max_age_mins, notify } => {
            sync::run(ctx, store, project_id, repo, branch, *max_age_mins, notify.as_deref())
        }
        Command::Issues { repo } => commits::run_issues(ctx, repo),
    }
}
