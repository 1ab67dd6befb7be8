//! Multicast push-notification client.
//!
//! Posts `{notification: {title, body}, tokens: [...]}` to the configured
//! delivery endpoint. Per-token failures come back as counts, not errors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{PushError, PushSender};

const STATUS_BODY_LIMIT: usize = 300;

/// Delivery counts for one multicast send.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub success_count: u32,
    pub failure_count: u32,
}

pub struct PushClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl PushClient {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

pub fn build_payload(title: &str, body: &str, tokens: &[String]) -> serde_json::Value {
    json!({
        "notification": {
            "title": title,
            "body": body,
        },
        "tokens": tokens,
    })
}

#[async_trait]
impl PushSender for PushClient {
    async fn send_multicast(
        &self,
        title: &str,
        body: &str,
        tokens: &[String],
    ) -> Result<PushReport, PushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&build_payload(title, body, tokens))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(PushError::Status {
                status: status.as_u16(),
                body: text.chars().take(STATUS_BODY_LIMIT).collect(),
            });
        }

        serde_json::from_str(text.trim()).map_err(|e| PushError::InvalidResponse(e.to_string()))
    }
}
