//! Chat webhook [`Notifier`] (Discord-compatible `{"content": ...}` payload).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{http, CollabResult, Notification, Notifier};
use crate::error::{ForemanError, Result};

const SERVICE: &str = "chat";

/// Discord rejects messages longer than this.
const MAX_MESSAGE_CHARS: usize = 2000;

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ForemanError::configuration(format!(
                "Chat webhook URL must be http(s): {url}"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForemanError::configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

/// Formats the notification as one chat message, truncated to the platform
/// limit.
fn render(notification: &Notification) -> String {
    let text = format!("**{}**\n{}", notification.subject, notification.body);
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text;
    }
    let mut truncated: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    truncated.push('…');
    truncated
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn send(&self, notification: &Notification) -> CollabResult<()> {
        let payload = json!({ "content": render(notification) });
        http::send(SERVICE, self.client.post(&self.url).json(&payload)).await?;
        Ok(())
    }
}
