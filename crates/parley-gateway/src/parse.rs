// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider envelope parsing.
//!
//! The platform delivers webhook payloads as
//! `entry[].changes[].value.{contacts, messages}`. One delivery may carry
//! zero or more messages; each becomes a [`NormalizedEvent`] processed
//! independently. Status-only deliveries (read receipts etc.) normalize to
//! an empty event list and are acknowledged without processing.

use parley_core::{NormalizedEvent, ParleyError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub field: Option<String>,
    pub value: ChangeValue,
}

#[derive(Debug, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

#[derive(Debug, Deserialize)]
pub struct Contact {
    pub wa_id: String,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub from: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub text: Option<TextContent>,
}

#[derive(Debug, Deserialize)]
pub struct TextContent {
    pub body: String,
}

/// Parse a raw webhook body into normalized events.
///
/// A body that is not the envelope shape fails with `MalformedPayload`;
/// the caller acknowledges it without processing so the provider does not
/// retry a permanently invalid delivery forever.
pub fn parse_events(body: &[u8]) -> Result<Vec<NormalizedEvent>, ParleyError> {
    let envelope: WebhookEnvelope = serde_json::from_slice(body)
        .map_err(|e| ParleyError::MalformedPayload(format!("invalid envelope: {e}")))?;

    let mut events = Vec::new();
    for entry in &envelope.entry {
        for change in &entry.changes {
            for message in &change.value.messages {
                let display_name = change
                    .value
                    .contacts
                    .iter()
                    .find(|c| c.wa_id == message.from)
                    .and_then(|c| c.profile.as_ref())
                    .and_then(|p| p.name.clone());
                let body_text = message
                    .text
                    .as_ref()
                    .map(|t| t.body.clone())
                    .unwrap_or_default();
                events.push(NormalizedEvent {
                    event_id: message.id.clone(),
                    sender_external_id: message.from.clone(),
                    sender_display_name: display_name,
                    message_external_id: message.id.clone(),
                    timestamp: normalize_timestamp(&message.timestamp),
                    message_type: message.type_.clone(),
                    body: body_text,
                });
            }
        }
    }
    Ok(events)
}

/// Provider timestamps are unix seconds as a string; normalize to RFC 3339.
/// An unparseable timestamp is kept verbatim rather than dropping the event.
fn normalize_timestamp(raw: &str) -> String {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| raw.to_string())
}
