//! `sync` handler: one auto-link pass over a branch.

use crate::cache::resolve_max_age;
use crate::context::ServiceContext;
use crate::linking::LinkingService;
use crate::store::TraceStore;

/// Settings key naming the default notification target.
pub const NOTIFY_TARGET_SETTING: &str = "notify.target";

/// Scans a branch's commits and auto-links referenced tasks.
///
/// When new links were recorded and a notification target is configured
/// (flag or the `notify.target` setting), the summary is sent through the
/// notifier. A notification failure is reported but does not undo or fail
/// the pass; the links are already recorded.
///
/// # Errors
///
/// Returns an error string if the project is missing or the history fetch
/// fails.
pub fn run(
    ctx: &ServiceContext,
    store: &mut TraceStore,
    project_id: &str,
    repo: &str,
    branch: &str,
    max_age_mins: Option<i64>,
    notify: Option<&str>,
) -> Result<(), String> {
    let max_age = resolve_max_age(ctx, max_age_mins).map_err(|e| e.to_string())?;
    let report = LinkingService::new(store, ctx)
        .sync_branch(project_id, repo, branch, max_age)
        .map_err(|e| e.to_string())?;

    let summary = report.summary(repo, branch);
    println!("{summary}");

    if !report.linked.is_empty() {
        if let Some(target) = notify_target(ctx, notify)? {
            if let Err(e) = ctx.notifier.send(&target, &summary) {
                eprintln!("Warning: failed to notify {target}: {e}");
            }
        }
    }
    Ok(())
}

/// Resolves the notification target: explicit flag, then the settings key.
fn notify_target(ctx: &ServiceContext, flag: Option<&str>) -> Result<Option<String>, String> {
    if let Some(target) = flag {
        return Ok(Some(target.to_string()));
    }
    ctx.settings
        .get(NOTIFY_TARGET_SETTING)
        .map_err(|e| format!("Failed to read settings: {e}"))
}
