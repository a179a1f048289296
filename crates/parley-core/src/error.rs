// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley webhook bot service.

use thiserror::Error;

use crate::types::ConversationStatus;

/// The primary error type used across the Parley pipeline.
///
/// Variants map one-to-one onto the failure taxonomy of the ingestion
/// pipeline: everything below the gateway is absorbed per event, so a
/// variant also encodes how its failure is acknowledged to the provider.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Webhook signature missing or not matching the shared secret.
    /// The event is dropped without persistence.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Payload could not be parsed into the provider envelope shape.
    /// Acknowledged to the provider but never processed.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The event id was already reserved by an earlier delivery.
    #[error("duplicate event: {event_id}")]
    DuplicateEvent { event_id: String },

    /// A compare-and-swap status update lost a race; the caller must
    /// re-read the conversation and retry.
    #[error("concurrent modification of conversation {conversation_id}")]
    ConcurrentModification { conversation_id: String },

    /// The requested status edge is not in the legal transition table.
    /// Conversation state is left unchanged.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: ConversationStatus,
        to: ConversationStatus,
    },

    /// A transition kept losing compare-and-swap races until the retry
    /// budget ran out.
    #[error("state machine gave up on conversation {conversation_id} after {attempts} attempts")]
    StateMachine {
        conversation_id: String,
        attempts: u32,
    },

    /// Reply generation exceeded its bounded timeout.
    #[error("reply generation timed out after {duration:?}")]
    GenerationTimeout { duration: std::time::Duration },

    /// Reply generation failed (transport error, provider 5xx, rate limit).
    #[error("reply generator unavailable: {message}")]
    GenerationUnavailable {
        message: String,
        /// HTTP status of the failed attempt, when a response arrived.
        status: Option<u16>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound delivery exhausted its retry budget. The message is still
    /// recorded with a failed-delivery marker so operators can see it.
    #[error("delivery failed after {attempts} attempts: {message}")]
    DeliveryFailed { attempts: u32, message: String },

    /// Storage backend errors (connection, query failure, corrupt row).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ParleyError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(source),
        }
    }
}
