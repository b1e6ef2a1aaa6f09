//! Best-effort notification delivery
//!
//! Major lifecycle transitions (base fill, add fill, stop-out, completion,
//! protective stop armed) emit a notification through an injected `Notifier`.
//! Delivery is best-effort: failures are logged and never affect the
//! strategy's control flow.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Notification sink for major lifecycle transitions
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str);
}

/// Notifier that drops everything; the default when none is configured
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _title: &str, _body: &str) {}
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    title: &'a str,
    body: &'a str,
}

/// Posts `{title, body}` JSON to a configured webhook URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, title: &str, body: &str) {
        let payload = WebhookPayload { title, body };
        match self.client.post(&self.url).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => warn!("notification webhook returned status {}", resp.status()),
            Err(e) => warn!("notification delivery failed: {}", e),
        }
    }
}

/// Boxed notifier for dynamic dispatch
pub type BoxedNotifier = Box<dyn Notifier>;
