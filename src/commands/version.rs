//! `version` subcommand handlers.

use crate::cli::VersionCommand;
use crate::context::ServiceContext;
use crate::linking::LinkingService;
use crate::store::TraceStore;

/// Runs a `version` subcommand.
///
/// # Errors
///
/// Returns an error string if the owner is missing or the reference is
/// malformed.
pub fn run(
    ctx: &ServiceContext,
    store: &mut TraceStore,
    command: &VersionCommand,
) -> Result<(), String> {
    match command {
        VersionCommand::Add { project_id, name } => {
            let version = store
                .create_version(project_id, name, ctx.clock.now())
                .map_err(|e| e.to_string())?;
            println!("Created version {} ({})", version.id, version.name);
            Ok(())
        }
        VersionCommand::Attach { version_id, repo, sha } => {
            LinkingService::new(store, ctx)
                .attach_version_commit(version_id, repo, sha)
                .map_err(|e| e.to_string())?;
            println!("Attached {repo}@{sha} to {version_id}");
            Ok(())
        }
        VersionCommand::Detach { version_id, repo, sha } => {
            LinkingService::new(store, ctx)
                .detach_version_commit(version_id, repo, sha)
                .map_err(|e| e.to_string())?;
            println!("Detached {repo}@{sha} from {version_id}");
            Ok(())
        }
        VersionCommand::Show { version_id } => {
            let version = store
                .get_version(version_id)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("not found: version {version_id}"))?;
            let commits = store.commits_for_version(version_id).map_err(|e| e.to_string())?;
            println!("{} ({}): {} commits", version.id, version.name, commits.len());
            for row in commits {
                let short = &row.commit_sha[..row.commit_sha.len().min(10)];
                println!("{short}  {}", row.repo_full_name);
            }
            Ok(())
        }
    }
}
