//! Notification port for delivering short messages.

/// Delivers a short text notification to a named target.
///
/// The target's meaning is adapter-specific (a channel name, a chat id).
pub trait Notifier: Send + Sync {
    /// Sends `text` to `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be delivered.
    fn send(
        &self,
        target: &str,
        text: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
