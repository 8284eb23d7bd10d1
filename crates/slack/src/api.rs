use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::blocks::SlackMessage;

const DEFAULT_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack api request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("slack api rejected the call: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    ok: bool,
    error: Option<String>,
}

/// Minimal Slack Web API client for outbound bot messages.
pub struct SlackWebClient {
    bot_token: SecretString,
    http: reqwest::Client,
    api_base: String,
}

impl SlackWebClient {
    pub fn new(bot_token: SecretString, http: reqwest::Client) -> Self {
        Self { bot_token, http, api_base: DEFAULT_API_BASE.to_string() }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub async fn post_message(
        &self,
        channel: &str,
        message: &SlackMessage,
    ) -> Result<(), SlackApiError> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&json!({
                "channel": channel,
                "text": message.text,
                "blocks": message.blocks,
            }))
            .send()
            .await?
            .error_for_status()?;

        let envelope: ApiEnvelope = response.json().await?;
        if !envelope.ok {
            return Err(SlackApiError::Api(
                envelope.error.unwrap_or_else(|| "unspecified slack api error".to_string()),
            ));
        }

        debug!(event_name = "slack.api.post_message", channel, "message posted");
        Ok(())
    }
}
