//! Settings port for persisted key/value configuration.

/// Persisted key/value settings (cache TTL override, notify target, ...).
pub trait SettingsStore: Send + Sync {
    /// Returns the value for `key`, or `None` if unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Sets `key` to `value`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
