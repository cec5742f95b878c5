//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the application core and an
//! external system (time, source host, notifications, settings, IDs).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod id_gen;
pub mod notifier;
pub mod settings;
pub mod source_host;

pub use clock::Clock;
pub use id_gen::IdGenerator;
pub use notifier::Notifier;
pub use settings::SettingsStore;
pub use source_host::{CommitSummary, RepoIssue, SourceHost};
