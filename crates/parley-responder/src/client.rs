// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-backed [`ReplyGenerator`] implementation.
//!
//! Every call carries a hard deadline. A transient failure (timeout, 429,
//! 5xx, connection error) earns exactly one jittered retry; a second failure
//! surfaces so the pipeline can absorb it without replying.

use std::time::Duration;

use parley_core::{Direction, Message, ParleyError};
use parley_resilience::{is_transient_status, jitter};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, GenerateRequest, GenerateResponse, WireMessage};
use crate::{ReplyGenerator, ReplyRequest};

/// API version header required by the reply backend.
const API_VERSION: &str = "2023-06-01";

/// Delay before the single retry, before jitter.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Reply generator backed by an Anthropic-style messages endpoint.
#[derive(Debug, Clone)]
pub struct HttpReplyGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    system_prompt: Option<String>,
    timeout: Duration,
    retry_delay: Duration,
}

impl HttpReplyGenerator {
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            max_tokens,
            system_prompt: None,
            timeout,
            retry_delay: RETRY_BASE_DELAY,
        }
    }

    /// Set the system prompt prepended to every generation request.
    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn build_request(&self, request: &ReplyRequest) -> GenerateRequest {
        let messages = request
            .history
            .iter()
            .map(|m| WireMessage {
                role: role_for(m),
                content: m.content.clone(),
            })
            .collect();
        GenerateRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: self.system_prompt.clone(),
            messages,
        }
    }

    /// One attempt against the backend, bounded by the configured timeout.
    async fn attempt(&self, body: &GenerateRequest) -> Result<String, ParleyError> {
        let url = format!("{}/v1/messages", self.base_url);
        let send = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| ParleyError::GenerationTimeout {
                duration: self.timeout,
            })?
            .map_err(|e| ParleyError::GenerationUnavailable {
                message: format!("HTTP request failed: {e}"),
                status: None,
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "generation response received");

        if status.is_success() {
            let parsed: GenerateResponse = tokio::time::timeout(self.timeout, response.json())
                .await
                .map_err(|_| ParleyError::GenerationTimeout {
                    duration: self.timeout,
                })?
                .map_err(|e| ParleyError::GenerationUnavailable {
                    message: format!("failed to parse response body: {e}"),
                    status: None,
                    source: Some(Box::new(e)),
                })?;
            return Ok(parsed.reply_text());
        }

        let body_text = response.text().await.unwrap_or_default();
        let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body_text) {
            format!("API error ({}): {}", api_err.error.type_, api_err.error.message)
        } else {
            format!("API returned {status}: {body_text}")
        };
        Err(ParleyError::GenerationUnavailable {
            message,
            status: Some(status.as_u16()),
            source: None,
        })
    }
}

fn role_for(message: &Message) -> String {
    match message.direction {
        Direction::In => "user".to_string(),
        Direction::Out => "assistant".to_string(),
    }
}

/// Whether an attempt's failure is worth one more try.
fn is_retryable(err: &ParleyError) -> bool {
    match err {
        ParleyError::GenerationTimeout { .. } => true,
        // Connection-level failures carry a source and no status.
        ParleyError::GenerationUnavailable { status: None, source: Some(_), .. } => true,
        ParleyError::GenerationUnavailable { status: Some(status), .. } => {
            is_transient_status(*status)
        }
        _ => false,
    }
}

#[async_trait::async_trait]
impl ReplyGenerator for HttpReplyGenerator {
    async fn generate(&self, request: ReplyRequest) -> Result<String, ParleyError> {
        let body = self.build_request(&request);

        let first = self.attempt(&body).await;
        match first {
            Ok(reply) => Ok(reply),
            Err(err) if is_retryable(&err) => {
                let delay = jitter(self.retry_delay);
                warn!(error = %err, delay_ms = delay.as_millis() as u64, "retrying generation after transient error");
                tokio::time::sleep(delay).await;
                self.attempt(&body).await
            }
            Err(err) => Err(err),
        }
    }
}
