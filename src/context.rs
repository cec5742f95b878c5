//! Service context bundling all port trait objects.

use std::path::Path;

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::github::LiveGitHubHost;
use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::adapters::live::settings::FileSettings;
use crate::adapters::live::webhook::LiveWebhookNotifier;
use crate::ports::clock::Clock;
use crate::ports::id_gen::IdGenerator;
use crate::ports::notifier::Notifier;
use crate::ports::settings::SettingsStore;
use crate::ports::source_host::SourceHost;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Fields are public so
/// tests can substitute in-memory fakes for any subset of ports.
pub struct ServiceContext {
    /// Clock for obtaining the current time.
    pub clock: Box<dyn Clock>,
    /// Hosted git provider for commit and issue queries.
    pub host: Box<dyn SourceHost>,
    /// Notifier for short outbound messages.
    pub notifier: Box<dyn Notifier>,
    /// Persisted key/value settings.
    pub settings: Box<dyn SettingsStore>,
    /// ID generator for link and cache row identifiers.
    pub id_gen: Box<dyn IdGenerator>,
}

impl ServiceContext {
    /// Creates a live context with real adapters.
    ///
    /// `data_dir` is where the file-backed settings live; the GitHub and
    /// webhook adapters read their credentials from the environment.
    #[must_use]
    pub fn live(data_dir: &Path) -> Self {
        Self {
            clock: Box::new(LiveClock),
            host: Box::new(LiveGitHubHost::new()),
            notifier: Box::new(LiveWebhookNotifier::new()),
            settings: Box::new(FileSettings::new(data_dir)),
            id_gen: Box::new(LiveIdGenerator::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_context_serves_time_and_ids() {
        let dir = std::env::temp_dir().join("tracelink_ctx_test");
        let ctx = ServiceContext::live(&dir);

        let before = chrono::Utc::now();
        assert!(ctx.clock.now() >= before);
        assert_eq!(ctx.id_gen.generate_id().len(), 36);
    }
}
