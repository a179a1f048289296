// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the reply generation API.

use serde::{Deserialize, Serialize};

/// Request body for the messages endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<WireMessage>,
}

/// A single turn in the request history.
#[derive(Debug, Clone, Serialize)]
pub struct WireMessage {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
}

/// Response body from the messages endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Concatenate all text blocks into the reply body.
    pub fn reply_text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.type_ == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Error body returned by the reply backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_joins_text_blocks_only() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "text", "text": "Hello, "},
                    {"type": "tool_use"},
                    {"type": "text", "text": "world."}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(response.reply_text(), "Hello, world.");
    }
}
