//! Staleness-aware commit-history cache.
//!
//! Bounds source-host API calls to one fetch per (repo, branch) per
//! freshness window, no matter how many tasks or projects reference the
//! branch. On a miss the stored row is replaced wholesale; a concurrent
//! refresh of the same key is a last-write-wins upsert over the same
//! upstream history.

use chrono::Duration;

use crate::context::ServiceContext;
use crate::error::TraceError;
use crate::ports::CommitSummary;
use crate::store::TraceStore;

/// Default freshness window when neither the CLI nor settings override it.
pub const DEFAULT_MAX_AGE_MINUTES: i64 = 15;

/// Settings key overriding the default freshness window.
pub const MAX_AGE_SETTING: &str = "cache.max_age_minutes";

/// Fetch-or-serve access to cached branch history.
pub struct CommitCache<'a> {
    store: &'a TraceStore,
    ctx: &'a ServiceContext,
}

impl<'a> CommitCache<'a> {
    /// Creates a cache over the given store and context.
    #[must_use]
    pub fn new(store: &'a TraceStore, ctx: &'a ServiceContext) -> Self {
        Self { store, ctx }
    }

    /// Returns commit history for a branch, newest first.
    ///
    /// Serves the stored snapshot when it is younger than `max_age`;
    /// otherwise fetches from the source host and replaces the snapshot.
    /// An upstream failure propagates even when a stale snapshot exists;
    /// stale data is never served silently.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` if a needed fetch fails, `Storage` on persistence
    /// failure.
    pub fn commits(
        &self,
        repo: &str,
        branch: &str,
        max_age: Duration,
    ) -> Result<Vec<CommitSummary>, TraceError> {
        let now = self.ctx.clock.now();

        if let Some(entry) = self.store.cache_entry(repo, branch)? {
            if now - entry.fetched_at <= max_age {
                // An unreadable snapshot is treated as a miss, not an error.
                if let Ok(commits) = serde_json::from_str(&entry.commits_json) {
                    return Ok(commits);
                }
            }
        }

        let fresh = self
            .ctx
            .host
            .list_commits(repo, branch)
            .map_err(|e| TraceError::Upstream(format!("fetching {repo}@{branch}: {e}")))?;

        let json = serde_json::to_string(&fresh)
            .map_err(|e| TraceError::Validation(format!("cannot serialize commits: {e}")))?;
        self.store.replace_cache_entry(
            repo,
            branch,
            &json,
            &self.ctx.id_gen.generate_id(),
            now,
        )?;

        Ok(fresh)
    }
}

/// Resolves the freshness window: explicit argument, then the settings key,
/// then the default.
///
/// # Errors
///
/// Returns `Validation` if the settings value is not a positive integer.
pub fn resolve_max_age(
    ctx: &ServiceContext,
    minutes_flag: Option<i64>,
) -> Result<Duration, TraceError> {
    if let Some(minutes) = minutes_flag {
        return Ok(Duration::minutes(minutes));
    }
    if let Some(value) = ctx
        .settings
        .get(MAX_AGE_SETTING)
        .map_err(|e| TraceError::Validation(format!("cannot read settings: {e}")))?
    {
        let minutes: i64 = value.parse().map_err(|_| {
            TraceError::Validation(format!("{MAX_AGE_SETTING} must be an integer, got {value:?}"))
        })?;
        return Ok(Duration::minutes(minutes));
    }
    Ok(Duration::minutes(DEFAULT_MAX_AGE_MINUTES))
}
