//! `commits` and `issues` handlers.

use crate::cache::{resolve_max_age, CommitCache};
use crate::context::ServiceContext;
use crate::store::TraceStore;

/// Prints branch history, served from the cache when fresh.
///
/// # Errors
///
/// Returns an error string if the fetch fails and no fresh entry exists.
pub fn run_commits(
    ctx: &ServiceContext,
    store: &TraceStore,
    repo: &str,
    branch: &str,
    max_age_mins: Option<i64>,
) -> Result<(), String> {
    let max_age = resolve_max_age(ctx, max_age_mins).map_err(|e| e.to_string())?;
    let commits =
        CommitCache::new(store, ctx).commits(repo, branch, max_age).map_err(|e| e.to_string())?;

    if commits.is_empty() {
        println!("No commits on {repo}@{branch}");
        return Ok(());
    }
    for commit in commits {
        let short = &commit.sha[..commit.sha.len().min(10)];
        let subject = commit.message.lines().next().unwrap_or_default();
        println!("{short}  {}  {}  {subject}", commit.timestamp.format("%Y-%m-%d"), commit.author);
    }
    Ok(())
}

/// Prints open issues for a repository.
///
/// # Errors
///
/// Returns an error string if the source host request fails.
pub fn run_issues(ctx: &ServiceContext, repo: &str) -> Result<(), String> {
    let issues =
        ctx.host.list_issues(repo).map_err(|e| format!("Failed to list issues: {e}"))?;

    if issues.is_empty() {
        println!("No open issues in {repo}");
        return Ok(());
    }
    for issue in issues {
        println!("#{}  {}  ({})", issue.number, issue.title, issue.state);
    }
    Ok(())
}
