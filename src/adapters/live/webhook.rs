//! Live adapter for the `Notifier` port posting to a webhook.

use std::env;

use reqwest::Client;
use serde::Serialize;

use crate::ports::notifier::Notifier;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Live notifier that posts JSON to the webhook named by `TRACELINK_WEBHOOK`.
pub struct LiveWebhookNotifier {
    client: Client,
}

impl LiveWebhookNotifier {
    /// Creates a new live webhook notifier.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for LiveWebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Request body posted to the webhook.
#[derive(Serialize)]
struct WebhookMessage<'a> {
    target: &'a str,
    text: &'a str,
}

impl Notifier for LiveWebhookNotifier {
    fn send(&self, target: &str, text: &str) -> Result<(), BoxError> {
        let url = env::var("TRACELINK_WEBHOOK")
            .map_err(|_| -> BoxError { "TRACELINK_WEBHOOK environment variable not set".into() })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| -> BoxError { format!("Failed to start runtime: {e}").into() })?;

        runtime.block_on(async {
            let response = self
                .client
                .post(&url)
                .json(&WebhookMessage { target, text })
                .send()
                .await
                .map_err(|e| -> BoxError { format!("Webhook request failed: {e}").into() })?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("Webhook error ({})", status.as_u16()).into());
            }
            Ok(())
        })
    }
}
