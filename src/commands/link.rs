//! `link`, `unlink`, `links`, and `tasks-for` handlers.

use crate::cli::RefCommand;
use crate::context::ServiceContext;
use crate::linking::LinkingService;
use crate::store::TraceStore;

/// Records a manual link for a task.
///
/// # Errors
///
/// Returns an error string if the task is missing or the reference is
/// malformed.
pub fn run_link(
    ctx: &ServiceContext,
    store: &mut TraceStore,
    command: &RefCommand,
) -> Result<(), String> {
    let service = LinkingService::new(store, ctx);
    match command {
        RefCommand::Branch { task_id, repo, branch } => {
            let link = service
                .record_manual_branch_link(task_id, repo, branch)
                .map_err(|e| e.to_string())?;
            println!("Linked {} to {}@{} ({})", task_id, repo, branch, link.source.as_str());
        }
        RefCommand::Commit { task_id, repo, sha } => {
            let link = service
                .record_manual_commit_link(task_id, repo, sha)
                .map_err(|e| e.to_string())?;
            println!("Linked {} to {}@{} ({})", task_id, repo, sha, link.source.as_str());
        }
    }
    Ok(())
}

/// Removes a link from a task; succeeds even if the link does not exist.
///
/// # Errors
///
/// Returns an error string on a persistence failure.
pub fn run_unlink(
    ctx: &ServiceContext,
    store: &mut TraceStore,
    command: &RefCommand,
) -> Result<(), String> {
    let service = LinkingService::new(store, ctx);
    match command {
        RefCommand::Branch { task_id, repo, branch } => {
            service.unlink_branch(task_id, repo, branch).map_err(|e| e.to_string())?;
            println!("Unlinked {task_id} from {repo}@{branch}");
        }
        RefCommand::Commit { task_id, repo, sha } => {
            service.unlink_commit(task_id, repo, sha).map_err(|e| e.to_string())?;
            println!("Unlinked {task_id} from {repo}@{sha}");
        }
    }
    Ok(())
}

/// Prints all links for a task, newest first.
///
/// # Errors
///
/// Returns an error string if the task does not exist.
pub fn run_links(store: &TraceStore, task_id: &str) -> Result<(), String> {
    store
        .get_task(task_id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("not found: task {task_id}"))?;

    let branches = store.branch_links_for_task(task_id).map_err(|e| e.to_string())?;
    let commits = store.commit_links_for_task(task_id).map_err(|e| e.to_string())?;

    if branches.is_empty() && commits.is_empty() {
        println!("No links for {task_id}");
        return Ok(());
    }
    for link in branches {
        println!(
            "branch  {}@{}  source={}  {}",
            link.repo_full_name,
            link.branch_name,
            link.source.as_str(),
            link.created_at.to_rfc3339()
        );
    }
    for link in commits {
        println!(
            "commit  {}@{}  source={}  {}",
            link.repo_full_name,
            link.commit_sha,
            link.source.as_str(),
            link.created_at.to_rfc3339()
        );
    }
    Ok(())
}

/// Prints tasks linked to a branch or commit, scoped to one project.
///
/// # Errors
///
/// Returns an error string if neither `--branch` nor `--commit` is given.
pub fn run_tasks_for(
    store: &TraceStore,
    project_id: &str,
    repo: &str,
    branch: Option<&str>,
    commit: Option<&str>,
) -> Result<(), String> {
    let tasks = match (branch, commit) {
        (Some(branch), None) => {
            store.tasks_for_branch(project_id, repo, branch).map_err(|e| e.to_string())?
        }
        (None, Some(sha)) => {
            store.tasks_for_commit(project_id, repo, sha).map_err(|e| e.to_string())?
        }
        _ => return Err("pass exactly one of --branch or --commit".to_string()),
    };

    if tasks.is_empty() {
        println!("No linked tasks");
        return Ok(());
    }
    for task in tasks {
        println!("{}  [{}]  {}", task.id, task.status, task.title);
    }
    Ok(())
}
