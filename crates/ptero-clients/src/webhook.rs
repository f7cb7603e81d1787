//! Best-effort webhook delivery to subscribers declared on a submitted
//! workflow. Delivery is fire-and-forget at-most-once: retries and
//! exactly-once delivery are not attempted, matching the at-least-once
//! contract the Petri engine itself gets.

use serde_json::Value;

#[derive(Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
}

impl Default for WebhookClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// POSTs `payload` to `url`, logging failures rather than propagating
    /// them — a slow or unreachable subscriber must never block workflow
    /// progress.
    pub async fn notify(&self, url: &str, payload: &Value) {
        match self.http.post(url).json(payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(%url, status = %response.status(), "webhook subscriber returned an error status");
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "webhook delivery failed");
            }
        }
    }
}
