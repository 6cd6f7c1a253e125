//! Best-effort delivery of digest messages to a Slack-style webhook.

use crate::core::config::NotificationsConfig;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// Notifications are disabled or no webhook is configured.
    Skipped,
    Delivered,
    Failed(String),
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    enabled: bool,
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(enabled: bool, webhook_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default webhook client");
                reqwest::Client::new()
            });
        Self {
            enabled,
            webhook_url: webhook_url.filter(|u| !u.trim().is_empty()),
            client,
        }
    }

    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self::new(config.enabled, config.webhook_url.clone())
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.webhook_url.is_some()
    }

    /// Logs `message` and, when active, posts it once. Never fails.
    pub async fn notify(&self, message: &str) -> NotifyOutcome {
        info!("{}", message);

        let url = match (&self.webhook_url, self.enabled) {
            (Some(url), true) => url,
            _ => {
                debug!("Notifications inactive, skipping webhook");
                return NotifyOutcome::Skipped;
            }
        };

        let result = self
            .client
            .post(url)
            .json(&WebhookPayload { text: message })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Webhook accepted message");
                NotifyOutcome::Delivered
            }
            Ok(response) => {
                let status = response.status();
                warn!(%status, "Webhook rejected message");
                NotifyOutcome::Failed(format!("Webhook responded with HTTP {status}"))
            }
            Err(e) => {
                warn!(error = %e, "Webhook request failed");
                NotifyOutcome::Failed(format!("Webhook request failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_disabled_notifier_makes_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let notifier = Notifier::new(false, Some(format!("{}/hook", server.uri())));
        assert_eq!(notifier.notify("anything at all").await, NotifyOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_missing_webhook_is_skipped() {
        let notifier = Notifier::new(true, Some("  ".to_string()));
        assert!(!notifier.is_active());
        assert_eq!(notifier.notify("hello").await, NotifyOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_posts_text_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(serde_json::json!({"text": "digest body"})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(true, Some(format!("{}/hook", server.uri())));
        assert_eq!(notifier.notify("digest body").await, NotifyOutcome::Delivered);
    }

    #[tokio::test]
    async fn test_webhook_error_is_reported_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = Notifier::new(true, Some(server.uri()));
        let outcome = notifier.notify("digest body").await;
        assert_eq!(
            outcome,
            NotifyOutcome::Failed("Webhook responded with HTTP 500 Internal Server Error".to_string())
        );
    }
}
