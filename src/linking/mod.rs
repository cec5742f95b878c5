//! Linking service: provenance-aware association of work items with
//! source-control references.
//!
//! The one behavioral rule everything here defends: manual provenance is
//! never silently downgraded by an automated pass. Auto writes go through
//! the store's `KeepManual` upsert mode; manual writes use `Force`. Unlink
//! is user-initiated in both paths, so it is always permitted.

pub mod detect;

pub use detect::detect_task_refs;

use chrono::Duration;
use std::fmt::Write as _;

use crate::cache::CommitCache;
use crate::context::ServiceContext;
use crate::error::TraceError;
use crate::store::{
    BranchLinkRow, CommitLinkRow, LinkSource, TaskRow, TraceStore, UpsertMode, VersionCommitRow,
};

/// Orchestrates link writes against the store, the cache, and the source host.
pub struct LinkingService<'a> {
    store: &'a TraceStore,
    ctx: &'a ServiceContext,
}

/// Outcome of one auto-link sync pass over a branch.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Commits scanned in this pass.
    pub scanned: usize,
    /// Newly created auto links as (task id, commit sha) pairs.
    pub linked: Vec<(String, String)>,
    /// Existing links the pass touched without changing identity.
    pub reaffirmed: usize,
    /// Detected references with no matching task in the project.
    pub unknown_refs: Vec<String>,
}

impl SyncReport {
    /// One-line-per-item human summary, used for output and notifications.
    #[must_use]
    pub fn summary(&self, repo: &str, branch: &str) -> String {
        let mut text = format!(
            "Scanned {} commits on {repo}@{branch}: {} new links, {} reaffirmed",
            self.scanned,
            self.linked.len(),
            self.reaffirmed
        );
        for (task, sha) in &self.linked {
            let short = &sha[..sha.len().min(10)];
            let _ = write!(text, "\n  {task} <- {short}");
        }
        if !self.unknown_refs.is_empty() {
            let _ = write!(text, "\n  unmatched: {}", self.unknown_refs.join(", "));
        }
        text
    }
}

impl<'a> LinkingService<'a> {
    /// Creates a service over the given store and context.
    #[must_use]
    pub fn new(store: &'a TraceStore, ctx: &'a ServiceContext) -> Self {
        Self { store, ctx }
    }

    fn require_task(&self, task_id: &str) -> Result<TaskRow, TraceError> {
        self.store
            .get_task(task_id)?
            .ok_or_else(|| TraceError::NotFound(format!("task {task_id}")))
    }

    /// Records a user-confirmed branch link. Manual always wins: an existing
    /// auto link on the same triple is promoted.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing task, `Validation` for a malformed
    /// reference.
    pub fn record_manual_branch_link(
        &self,
        task_id: &str,
        repo: &str,
        branch: &str,
    ) -> Result<BranchLinkRow, TraceError> {
        validate_repo(repo)?;
        validate_branch(branch)?;
        self.require_task(task_id)?;
        self.store.upsert_branch_link(
            task_id,
            repo,
            branch,
            LinkSource::Manual,
            UpsertMode::Force,
            &self.ctx.id_gen.generate_id(),
            self.ctx.clock.now(),
        )
    }

    /// Records an auto-detected branch link. Reaffirms, never overrides, an
    /// existing manual link on the same triple.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing task, `Validation` for a malformed
    /// reference.
    pub fn record_auto_branch_link(
        &self,
        task_id: &str,
        repo: &str,
        branch: &str,
    ) -> Result<BranchLinkRow, TraceError> {
        validate_repo(repo)?;
        validate_branch(branch)?;
        self.require_task(task_id)?;
        self.store.upsert_branch_link(
            task_id,
            repo,
            branch,
            LinkSource::Auto,
            UpsertMode::KeepManual,
            &self.ctx.id_gen.generate_id(),
            self.ctx.clock.now(),
        )
    }

    /// Removes a branch link; silently succeeds if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn unlink_branch(&self, task_id: &str, repo: &str, branch: &str) -> Result<(), TraceError> {
        self.store.remove_branch_link(task_id, repo, branch)
    }

    /// Records a user-confirmed commit link. Manual always wins.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing task, `Validation` for a malformed
    /// reference.
    pub fn record_manual_commit_link(
        &self,
        task_id: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitLinkRow, TraceError> {
        validate_repo(repo)?;
        validate_sha(sha)?;
        self.require_task(task_id)?;
        self.store.upsert_commit_link(
            task_id,
            sha,
            repo,
            LinkSource::Manual,
            UpsertMode::Force,
            &self.ctx.id_gen.generate_id(),
            self.ctx.clock.now(),
        )
    }

    /// Records an auto-detected commit link, keeping any manual provenance.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing task, `Validation` for a malformed
    /// reference.
    pub fn record_auto_commit_link(
        &self,
        task_id: &str,
        repo: &str,
        sha: &str,
    ) -> Result<CommitLinkRow, TraceError> {
        validate_repo(repo)?;
        validate_sha(sha)?;
        self.require_task(task_id)?;
        self.store.upsert_commit_link(
            task_id,
            sha,
            repo,
            LinkSource::Auto,
            UpsertMode::KeepManual,
            &self.ctx.id_gen.generate_id(),
            self.ctx.clock.now(),
        )
    }

    /// Removes a commit link; silently succeeds if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn unlink_commit(&self, task_id: &str, repo: &str, sha: &str) -> Result<(), TraceError> {
        self.store.remove_commit_link(task_id, sha, repo)
    }

    /// Attaches a commit to a version snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing version, `Validation` for a
    /// malformed reference.
    pub fn attach_version_commit(
        &self,
        version_id: &str,
        repo: &str,
        sha: &str,
    ) -> Result<VersionCommitRow, TraceError> {
        validate_repo(repo)?;
        validate_sha(sha)?;
        self.store
            .get_version(version_id)?
            .ok_or_else(|| TraceError::NotFound(format!("version {version_id}")))?;
        self.store.upsert_version_commit(
            version_id,
            sha,
            repo,
            &self.ctx.id_gen.generate_id(),
            self.ctx.clock.now(),
        )
    }

    /// Detaches a commit from a version snapshot; idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence failure.
    pub fn detach_version_commit(
        &self,
        version_id: &str,
        repo: &str,
        sha: &str,
    ) -> Result<(), TraceError> {
        self.store.remove_version_commit(version_id, sha, repo)
    }

    /// Runs one auto-link pass over a branch.
    ///
    /// Fetches history through the cache, scans messages for task
    /// references, and records an auto commit link for every reference that
    /// resolves to a task of `project_id`. References to unknown tasks and
    /// tasks of other projects are reported, not linked.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing project, `Upstream` if the history
    /// fetch fails.
    pub fn sync_branch(
        &self,
        project_id: &str,
        repo: &str,
        branch: &str,
        max_age: Duration,
    ) -> Result<SyncReport, TraceError> {
        validate_repo(repo)?;
        validate_branch(branch)?;
        self.store
            .get_project(project_id)?
            .ok_or_else(|| TraceError::NotFound(format!("project {project_id}")))?;

        let commits = CommitCache::new(self.store, self.ctx).commits(repo, branch, max_age)?;

        let mut report = SyncReport { scanned: commits.len(), ..SyncReport::default() };
        for commit in &commits {
            for task_ref in detect_task_refs(&commit.message) {
                let in_project = self
                    .store
                    .get_task(&task_ref)?
                    .is_some_and(|t| t.project_id == project_id);
                if !in_project {
                    if !report.unknown_refs.contains(&task_ref) {
                        report.unknown_refs.push(task_ref);
                    }
                    continue;
                }

                let existed =
                    self.store.get_commit_link(&task_ref, &commit.sha, repo)?.is_some();
                self.store.upsert_commit_link(
                    &task_ref,
                    &commit.sha,
                    repo,
                    LinkSource::Auto,
                    UpsertMode::KeepManual,
                    &self.ctx.id_gen.generate_id(),
                    self.ctx.clock.now(),
                )?;
                if existed {
                    report.reaffirmed += 1;
                } else {
                    report.linked.push((task_ref, commit.sha.clone()));
                }
            }
        }
        Ok(report)
    }
}

fn validate_repo(repo: &str) -> Result<(), TraceError> {
    let mut parts = repo.split('/');
    let owner = parts.next().unwrap_or_default();
    let name = parts.next().unwrap_or_default();
    if owner.is_empty() || name.is_empty() || parts.next().is_some() {
        return Err(TraceError::Validation(format!(
            "repository must be owner/name, got {repo:?}"
        )));
    }
    Ok(())
}

fn validate_branch(branch: &str) -> Result<(), TraceError> {
    if branch.is_empty() || branch.contains(char::is_whitespace) {
        return Err(TraceError::Validation(format!("invalid branch name {branch:?}")));
    }
    Ok(())
}

fn validate_sha(sha: &str) -> Result<(), TraceError> {
    let plausible = (7..=64).contains(&sha.len()) && sha.chars().all(|c| c.is_ascii_hexdigit());
    if !plausible {
        return Err(TraceError::Validation(format!("invalid commit sha {sha:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::source_host::{CommitSummary, RepoIssue, SourceHost};
    use crate::ports::{Clock, IdGenerator, Notifier, SettingsStore};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    type BoxError = Box<dyn std::error::Error + Send + Sync>;

    struct FixedClock(DateTime<Utc>);
    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct FixedHost(Vec<CommitSummary>);
    impl SourceHost for FixedHost {
        fn list_commits(&self, _: &str, _: &str) -> Result<Vec<CommitSummary>, BoxError> {
            Ok(self.0.clone())
        }
        fn list_issues(&self, _: &str) -> Result<Vec<RepoIssue>, BoxError> {
            Ok(Vec::new())
        }
    }

    struct NullNotifier;
    impl Notifier for NullNotifier {
        fn send(&self, _: &str, _: &str) -> Result<(), BoxError> {
            Ok(())
        }
    }

    struct EmptySettings;
    impl SettingsStore for EmptySettings {
        fn get(&self, _: &str) -> Result<Option<String>, BoxError> {
            Ok(None)
        }
        fn set(&self, _: &str, _: &str) -> Result<(), BoxError> {
            Ok(())
        }
    }

    struct SeqIds(AtomicU32);
    impl IdGenerator for SeqIds {
        fn generate_id(&self) -> String {
            format!("ID-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    fn ctx_with_commits(commits: Vec<CommitSummary>) -> ServiceContext {
        ServiceContext {
            clock: Box::new(FixedClock(t0())),
            host: Box::new(FixedHost(commits)),
            notifier: Box::new(NullNotifier),
            settings: Box::new(EmptySettings),
            id_gen: Box::new(SeqIds(AtomicU32::new(0))),
        }
    }

    fn commit(sha: &str, message: &str) -> CommitSummary {
        CommitSummary {
            sha: sha.to_string(),
            message: message.to_string(),
            author: "Dev".to_string(),
            timestamp: t0(),
        }
    }

    fn store_with_task() -> (TraceStore, String, String) {
        let mut store = TraceStore::open_in_memory().unwrap();
        let project = store.create_project("Alpha", "[]", t0()).unwrap();
        let task = store.create_task(&project.id, "First", "todo", t0()).unwrap();
        (store, project.id, task.id)
    }

    #[test]
    fn auto_never_downgrades_manual() {
        let (store, _, task) = store_with_task();
        let ctx = ctx_with_commits(Vec::new());
        let service = LinkingService::new(&store, &ctx);

        service.record_manual_branch_link(&task, "org/repo", "feature-x").unwrap();
        service.record_auto_branch_link(&task, "org/repo", "feature-x").unwrap();

        let links = store.branch_links_for_task(&task).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, LinkSource::Manual);
    }

    #[test]
    fn manual_always_wins_over_earlier_auto() {
        let (store, _, task) = store_with_task();
        let ctx = ctx_with_commits(Vec::new());
        let service = LinkingService::new(&store, &ctx);

        service.record_auto_commit_link(&task, "org/repo", "abc1234").unwrap();
        service.record_manual_commit_link(&task, "org/repo", "abc1234").unwrap();

        let links = store.commit_links_for_task(&task).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, LinkSource::Manual);
    }

    #[test]
    fn unlink_twice_is_silent() {
        let (store, _, task) = store_with_task();
        let ctx = ctx_with_commits(Vec::new());
        let service = LinkingService::new(&store, &ctx);

        service.record_manual_branch_link(&task, "org/repo", "feature-x").unwrap();
        service.unlink_branch(&task, "org/repo", "feature-x").unwrap();
        service.unlink_branch(&task, "org/repo", "feature-x").unwrap();
    }

    #[test]
    fn linking_missing_task_is_not_found() {
        let store = TraceStore::open_in_memory().unwrap();
        let ctx = ctx_with_commits(Vec::new());
        let service = LinkingService::new(&store, &ctx);

        let err = service.record_manual_branch_link("TASK-404", "org/repo", "main").unwrap_err();
        assert!(matches!(err, TraceError::NotFound(_)));
    }

    #[test]
    fn malformed_references_are_rejected() {
        let (store, _, task) = store_with_task();
        let ctx = ctx_with_commits(Vec::new());
        let service = LinkingService::new(&store, &ctx);

        for (repo, branch) in [("norepo", "main"), ("org/repo/extra", "main"), ("org/repo", "")] {
            let err = service.record_manual_branch_link(&task, repo, branch).unwrap_err();
            assert!(matches!(err, TraceError::Validation(_)), "{repo} {branch}");
        }
        let err = service.record_manual_commit_link(&task, "org/repo", "zzz").unwrap_err();
        assert!(matches!(err, TraceError::Validation(_)));
    }

    #[test]
    fn sync_links_referenced_tasks_and_reports_unknown() {
        let (store, project, task) = store_with_task();
        let ctx = ctx_with_commits(vec![
            commit("aaa1111", &format!("{task}: implement")),
            commit("bbb2222", "TASK-999: not ours"),
            commit("ccc3333", "chore: no refs"),
        ]);
        let service = LinkingService::new(&store, &ctx);

        let report =
            service.sync_branch(&project, "org/repo", "main", Duration::minutes(15)).unwrap();

        assert_eq!(report.scanned, 3);
        assert_eq!(report.linked, vec![(task.clone(), "aaa1111".to_string())]);
        assert_eq!(report.unknown_refs, vec!["TASK-999"]);

        let links = store.commit_links_for_task(&task).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, LinkSource::Auto);
    }

    #[test]
    fn sync_does_not_link_tasks_from_other_projects() {
        let mut store = TraceStore::open_in_memory().unwrap();
        let p1 = store.create_project("Alpha", "[]", t0()).unwrap();
        let p2 = store.create_project("Beta", "[]", t0()).unwrap();
        let foreign = store.create_task(&p2.id, "Other", "todo", t0()).unwrap();

        let ctx = ctx_with_commits(vec![commit("aaa1111", &format!("{}: sneak in", foreign.id))]);
        let service = LinkingService::new(&store, &ctx);

        let report =
            service.sync_branch(&p1.id, "org/repo", "main", Duration::minutes(15)).unwrap();
        assert!(report.linked.is_empty());
        assert_eq!(report.unknown_refs, vec![foreign.id.clone()]);
        assert!(store.commit_links_for_task(&foreign.id).unwrap().is_empty());
    }

    #[test]
    fn sync_reaffirms_existing_links_without_duplicating() {
        let (store, project, task) = store_with_task();
        let ctx = ctx_with_commits(vec![commit("aaa1111", &format!("{task}: implement"))]);
        let service = LinkingService::new(&store, &ctx);

        let first =
            service.sync_branch(&project, "org/repo", "main", Duration::minutes(15)).unwrap();
        assert_eq!(first.linked.len(), 1);

        let second =
            service.sync_branch(&project, "org/repo", "main", Duration::minutes(15)).unwrap();
        assert!(second.linked.is_empty());
        assert_eq!(second.reaffirmed, 1);
        assert_eq!(store.commit_links_for_task(&task).unwrap().len(), 1);
    }

    #[test]
    fn sync_never_flips_a_manual_commit_link() {
        let (store, project, task) = store_with_task();
        let ctx = ctx_with_commits(vec![commit("aaa1111", &format!("{task}: implement"))]);
        let service = LinkingService::new(&store, &ctx);

        service.record_manual_commit_link(&task, "org/repo", "aaa1111").unwrap();
        service.sync_branch(&project, "org/repo", "main", Duration::minutes(15)).unwrap();

        let links = store.commit_links_for_task(&task).unwrap();
        assert_eq!(links[0].source, LinkSource::Manual);
    }

    #[test]
    fn version_attach_and_detach_round_trip() {
        let mut store = TraceStore::open_in_memory().unwrap();
        let project = store.create_project("Alpha", "[]", t0()).unwrap();
        let version = store.create_version(&project.id, "1.0.0", t0()).unwrap();
        let ctx = ctx_with_commits(Vec::new());
        let service = LinkingService::new(&store, &ctx);

        service.attach_version_commit(&version.id, "org/repo", "abc1234").unwrap();
        assert_eq!(store.commits_for_version(&version.id).unwrap().len(), 1);

        service.detach_version_commit(&version.id, "org/repo", "abc1234").unwrap();
        service.detach_version_commit(&version.id, "org/repo", "abc1234").unwrap();
        assert!(store.commits_for_version(&version.id).unwrap().is_empty());
    }

    #[test]
    fn report_summary_lists_new_links() {
        let report = SyncReport {
            scanned: 3,
            linked: vec![("TASK-001".to_string(), "aaa1111222233334444".to_string())],
            reaffirmed: 1,
            unknown_refs: vec!["TASK-999".to_string()],
        };
        let text = report.summary("org/repo", "main");
        assert!(text.contains("Scanned 3 commits"));
        assert!(text.contains("TASK-001 <- aaa1111222"));
        assert!(text.contains("unmatched: TASK-999"));
    }
}
