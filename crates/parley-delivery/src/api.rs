// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the chat platform messages API.

use parley_resilience::is_transient_status;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Failure of a single send attempt.
///
/// `transient` decides whether the dispatcher may retry the attempt.
#[derive(Debug)]
pub struct SendError {
    pub transient: bool,
    pub message: String,
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SendError {}

/// Outbound text message request body.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    type_: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

/// Client for the platform's per-sender messages endpoint.
#[derive(Debug, Clone)]
pub struct ChatApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    phone_number_id: String,
}

impl ChatApiClient {
    pub fn new(base_url: String, access_token: String, phone_number_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            access_token,
            phone_number_id,
        }
    }

    /// Send one text message. Returns the provider-assigned message id.
    pub async fn send_text(&self, recipient: &str, body: &str) -> Result<String, SendError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_number_id);
        let request = SendRequest {
            messaging_product: "whatsapp",
            to: recipient,
            type_: "text",
            text: TextBody { body },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| SendError {
                transient: true,
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        debug!(status = %status, recipient, "send response received");

        if status.is_success() {
            let parsed: SendResponse = response.json().await.map_err(|e| SendError {
                transient: false,
                message: format!("failed to parse send response: {e}"),
            })?;
            return parsed
                .messages
                .into_iter()
                .next()
                .map(|m| m.id)
                .ok_or_else(|| SendError {
                    transient: false,
                    message: "send response contained no message id".to_string(),
                });
        }

        let body_text = response.text().await.unwrap_or_default();
        Err(SendError {
            transient: is_transient_status(status.as_u16()),
            message: format!("API returned {status}: {body_text}"),
        })
    }
}
