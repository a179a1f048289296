// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lookup, creation, and the compare-and-swap status update.

use parley_core::{ConversationStatus, ParleyError};
use rusqlite::params;

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::{conversation_from_row, Conversation};

/// Get a conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, status, last_message_at, created_at
                 FROM conversations WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], conversation_from_row);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get the user's non-closed conversation, if any.
///
/// The partial unique index guarantees at most one row matches.
pub async fn get_open_conversation(
    db: &Database,
    user_id: &str,
) -> Result<Option<Conversation>, ParleyError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, status, last_message_at, created_at
                 FROM conversations WHERE user_id = ?1 AND status != 'closed'",
            )?;
            let result = stmt.query_row(params![user_id], conversation_from_row);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Create a new conversation for the user in `active` status.
pub async fn create_conversation(
    db: &Database,
    user_id: &str,
) -> Result<Conversation, ParleyError> {
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        status: ConversationStatus::Active,
        last_message_at: now_rfc3339(),
        created_at: now_rfc3339(),
    };
    let row = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, user_id, status, last_message_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id,
                    row.user_id,
                    row.status.to_string(),
                    row.last_message_at,
                    row.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(conversation)
}

/// Compare-and-swap status update with an audit row.
///
/// The UPDATE only matches when the stored status equals `expected`, so a
/// concurrent writer that got there first makes this a zero-row update and
/// the caller gets `ConcurrentModification` to re-read and retry. The status
/// change and its `transitions` audit row commit in one transaction.
pub async fn update_conversation_status(
    db: &Database,
    id: &str,
    expected: ConversationStatus,
    next: ConversationStatus,
    actor: &str,
) -> Result<(), ParleyError> {
    let id_owned = id.to_string();
    let actor = actor.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let rows = tx.execute(
                "UPDATE conversations SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![next.to_string(), id_owned, expected.to_string()],
            )?;
            if rows == 1 {
                tx.execute(
                    "INSERT INTO transitions (conversation_id, from_status, to_status, actor, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        id_owned,
                        expected.to_string(),
                        next.to_string(),
                        actor,
                        now_rfc3339(),
                    ],
                )?;
            }
            tx.commit()?;
            Ok(rows == 1)
        })
        .await
        .map_err(map_tr_err)?;

    if updated {
        Ok(())
    } else {
        Err(ParleyError::ConcurrentModification {
            conversation_id: id.to_string(),
        })
    }
}
