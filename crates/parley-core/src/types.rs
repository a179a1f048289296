// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Parley workspace.
//!
//! Timestamps are RFC 3339 strings throughout; internal identifiers are
//! UUID v4 strings assigned by the storage layer.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who currently drives a conversation.
///
/// `Active` means the automated responder replies; `Human` suppresses the
/// responder while an operator handles the thread; `Closed` is terminal
/// (reopening creates a new conversation).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Human,
    Closed,
}

/// Message direction relative to the service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[strum(serialize = "in")]
    #[serde(rename = "in")]
    In,
    #[strum(serialize = "out")]
    #[serde(rename = "out")]
    Out,
}

/// Delivery outcome recorded on outbound messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Sent,
    Failed,
}

/// A chat-platform account. Identity is immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Platform account id (e.g. the sender's phone-number id).
    pub external_id: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

/// A conversation owned by exactly one user.
///
/// Invariant: at most one non-closed conversation per user, enforced by a
/// partial unique index in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub status: ConversationStatus,
    pub last_message_at: String,
    pub created_at: String,
}

/// An append-only conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub content: String,
    pub message_type: String,
    /// Provider-assigned id; `None` for internally generated messages.
    /// Unique across all messages when present.
    pub external_id: Option<String>,
    /// Only set on outbound messages.
    pub delivery_state: Option<DeliveryState>,
    pub created_at: String,
}

/// Fields supplied when appending a message; id and created_at are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: String,
    pub direction: Direction,
    pub content: String,
    pub message_type: String,
    pub external_id: Option<String>,
    pub delivery_state: Option<DeliveryState>,
}

/// Idempotency ledger row: one per provider event id, created before any
/// other side effect of processing that event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub event_id: String,
    pub outcome: String,
    pub created_at: String,
}

/// A provider webhook event normalized out of the envelope shape.
///
/// One webhook delivery may carry zero or more of these; each is processed
/// independently by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Provider event id, used for idempotency reservation.
    pub event_id: String,
    pub sender_external_id: String,
    pub sender_display_name: Option<String>,
    /// Provider message id, stored on the inbound message row.
    pub message_external_id: String,
    /// Provider timestamp (RFC 3339).
    pub timestamp: String,
    /// Provider message type (`text`, `image`, ...).
    pub message_type: String,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ConversationStatus::Active,
            ConversationStatus::Human,
            ConversationStatus::Closed,
        ] {
            let s = status.to_string();
            assert_eq!(ConversationStatus::from_str(&s).unwrap(), status);
        }
        assert_eq!(ConversationStatus::Active.to_string(), "active");
    }

    #[test]
    fn direction_uses_short_tokens() {
        assert_eq!(Direction::In.to_string(), "in");
        assert_eq!(Direction::Out.to_string(), "out");
        assert_eq!(Direction::from_str("out").unwrap(), Direction::Out);
    }

    #[test]
    fn unknown_status_fails_to_parse() {
        assert!(ConversationStatus::from_str("paused").is_err());
    }

    #[test]
    fn normalized_event_serializes() {
        let event = NormalizedEvent {
            event_id: "evt-1".into(),
            sender_external_id: "15551234567".into(),
            sender_display_name: Some("Ada".into()),
            message_external_id: "wamid.1".into(),
            timestamp: "2026-01-01T00:00:00Z".into(),
            message_type: "text".into(),
            body: "hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: NormalizedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
