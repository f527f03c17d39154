//! Discord webhook alerts for newly discovered subdomains.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use subwatch_core::error::{CoreError, CoreResult};
use subwatch_core::traits::ScanNotifier;
use subwatch_core::types::{Subdomain, Target};

#[derive(Debug, Serialize)]
struct WebhookPayload {
    content: String,
}

/// Posts one message per completed scan that found new subdomains.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    #[must_use]
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.into(),
        }
    }

    /// Message body: a count line followed by one URL per line.
    #[must_use]
    pub fn format_message(found: &[Subdomain]) -> String {
        let mut message = format!("Found {} new subdomains", found.len());
        for sub in found {
            message.push('\n');
            message.push_str(&sub.url);
        }
        message
    }
}

#[async_trait]
impl ScanNotifier for DiscordNotifier {
    async fn notify_new_subdomains(&self, target: &Target, found: &[Subdomain]) -> CoreResult<()> {
        if found.is_empty() {
            return Ok(());
        }

        let payload = WebhookPayload {
            content: Self::format_message(found),
        };
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| CoreError::NotificationError(format!("Discord request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CoreError::NotificationError(format!(
                "Discord error {status}: {body}"
            )));
        }

        log::info!(
            "Sent alert for {} new subdomain(s) of {}",
            found.len(),
            target.name
        );
        Ok(())
    }
}
