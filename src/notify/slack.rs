//! Slack release notice over an incoming webhook (Block Kit payload).

use crate::github::ReleaseInfo;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Announces the releases a run created
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseNotifier: Send + Sync {
    async fn notify(&self, repository: &str, releases: &[ReleaseInfo]) -> Result<(), WebhookError>;
}

pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl SlackNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

/// Block Kit message listing each release, linked when a URL is known.
pub fn build_payload(repository: &str, releases: &[ReleaseInfo]) -> Value {
    let lines: Vec<String> = releases
        .iter()
        .map(|release| match &release.html_url {
            Some(url) => format!("• <{url}|{}>", release.tag_name),
            None => format!("• {}", release.tag_name),
        })
        .collect();

    json!({
        "text": format!("New release in {repository}"),
        "blocks": [
            {
                "type": "header",
                "text": { "type": "plain_text", "text": format!("🚀 New release in {repository}") }
            },
            {
                "type": "section",
                "text": { "type": "mrkdwn", "text": lines.join("\n") }
            },
            {
                "type": "context",
                "elements": [
                    { "type": "mrkdwn", "text": format!("Published {}", Utc::now().format("%Y-%m-%d %H:%M UTC")) }
                ]
            }
        ]
    })
}

#[async_trait]
impl ReleaseNotifier for SlackNotifier {
    async fn notify(&self, repository: &str, releases: &[ReleaseInfo]) -> Result<(), WebhookError> {
        let Some(url) = &self.webhook_url else {
            debug!("No Slack webhook configured");
            return Ok(());
        };
        if releases.is_empty() {
            debug!("No releases to announce");
            return Ok(());
        }

        let response = self
            .client
            .post(url)
            .json(&build_payload(repository, releases))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(count = releases.len(), "Sent Slack release notice");
        Ok(())
    }
}
