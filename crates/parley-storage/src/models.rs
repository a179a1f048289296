// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types and row-mapping helpers.
//!
//! Domain types live in `parley-core`; this module re-exports them and adds
//! the storage-only types plus `rusqlite` row mappers shared by the query
//! modules.

use std::str::FromStr;

pub use parley_core::{
    Conversation, ConversationStatus, DeliveryState, Direction, IdempotencyRecord, Message,
    NewMessage, User,
};

/// Outcome of an idempotency reservation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// The event id was unseen; the caller now owns processing it.
    Fresh,
    /// The event id was already reserved by an earlier delivery.
    Duplicate,
}

/// A row from the `transitions` audit table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub id: i64,
    pub conversation_id: String,
    pub from_status: ConversationStatus,
    pub to_status: ConversationStatus,
    /// Who performed the transition (`pipeline`, or `operator:<name>`).
    pub actor: String,
    pub created_at: String,
}

/// Parse a TEXT column into a strum-backed enum, converting parse failures
/// into `rusqlite` conversion errors so they surface through the driver.
pub(crate) fn parse_column<T>(idx: usize, raw: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn user_from_row(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        external_id: row.get(1)?,
        display_name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn conversation_from_row(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    let status: String = row.get(2)?;
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        status: parse_column(2, status)?,
        last_message_at: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) fn message_from_row(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    let direction: String = row.get(2)?;
    let delivery_state: Option<String> = row.get(6)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        direction: parse_column(2, direction)?,
        content: row.get(3)?,
        message_type: row.get(4)?,
        external_id: row.get(5)?,
        delivery_state: delivery_state
            .map(|s| parse_column(6, s))
            .transpose()?,
        created_at: row.get(7)?,
    })
}

pub(crate) fn transition_from_row(
    row: &rusqlite::Row<'_>,
) -> Result<TransitionRecord, rusqlite::Error> {
    let from: String = row.get(2)?;
    let to: String = row.get(3)?;
    Ok(TransitionRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        from_status: parse_column(2, from)?,
        to_status: parse_column(3, to)?,
        actor: row.get(4)?,
        created_at: row.get(5)?,
    })
}
