// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply generation for the Parley webhook bot service.
//!
//! [`ReplyGenerator`] is the seam between the conversation pipeline and
//! whatever produces reply text. The production implementation is
//! [`HttpReplyGenerator`]; tests use the scripted generator from
//! `parley-test-utils`.

pub mod client;
pub mod types;

use async_trait::async_trait;
use parley_core::{Message, ParleyError};

pub use client::HttpReplyGenerator;

/// Input to a generation call: the conversation's recent history, oldest
/// first, with the triggering inbound message last.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    pub conversation_id: String,
    pub history: Vec<Message>,
}

/// Produces reply text for an inbound message.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply. Implementations must bound their own latency;
    /// failures are absorbed by the caller, never retried beyond the
    /// implementation's own budget.
    async fn generate(&self, request: ReplyRequest) -> Result<String, ParleyError>;
}
