// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append and history queries.

use parley_core::{DeliveryState, ParleyError};
use rusqlite::params;

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::{message_from_row, Message, NewMessage};

/// Append a message and bump the conversation's `last_message_at` in one
/// transaction, so history order and recency never disagree.
///
/// A `UNIQUE` violation on `external_id` means this provider message was
/// already appended; it surfaces as `DuplicateEvent` and leaves the
/// conversation untouched.
pub async fn append_message(db: &Database, new: NewMessage) -> Result<Message, ParleyError> {
    let message = Message {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: new.conversation_id,
        direction: new.direction,
        content: new.content,
        message_type: new.message_type,
        external_id: new.external_id,
        delivery_state: new.delivery_state,
        created_at: now_rfc3339(),
    };
    let row = message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages
                 (id, conversation_id, direction, content, message_type, external_id, delivery_state, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.conversation_id,
                    row.direction.to_string(),
                    row.content,
                    row.message_type,
                    row.external_id,
                    row.delivery_state.map(|s| s.to_string()),
                    row.created_at,
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET last_message_at = ?1 WHERE id = ?2",
                params![row.created_at, row.conversation_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| map_append_err(e, message.external_id.as_deref()))?;
    Ok(message)
}

fn map_append_err(err: tokio_rusqlite::Error, external_id: Option<&str>) -> ParleyError {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, _)) = &err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            if let Some(external_id) = external_id {
                return ParleyError::DuplicateEvent {
                    event_id: external_id.to_string(),
                };
            }
        }
    }
    map_tr_err(err)
}

/// Fetch the `limit` most recent messages for a conversation, oldest first.
///
/// Ordered by `rowid`: the table is append-only, so insertion rowids are
/// monotonic while `created_at` only has millisecond precision and can
/// collide for back-to-back appends.
pub async fn list_recent_messages(
    db: &Database,
    conversation_id: &str,
    limit: usize,
) -> Result<Vec<Message>, ParleyError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, direction, content, message_type, external_id, delivery_state, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![conversation_id, limit as i64], message_from_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Record the final delivery outcome of an outbound message.
pub async fn update_delivery_state(
    db: &Database,
    message_id: &str,
    state: DeliveryState,
) -> Result<(), ParleyError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET delivery_state = ?1 WHERE id = ?2",
                params![state.to_string(), message_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Direction;

    use crate::queries::conversations::{create_conversation, get_conversation};
    use crate::queries::users::get_or_create_user;

    async fn setup() -> (Database, String) {
        let db = Database::open_in_memory().await.unwrap();
        let user = get_or_create_user(&db, "15551234567", None).await.unwrap();
        let conversation = create_conversation(&db, &user.id).await.unwrap();
        (db, conversation.id)
    }

    fn inbound(conversation_id: &str, body: &str, external_id: &str) -> NewMessage {
        NewMessage {
            conversation_id: conversation_id.to_string(),
            direction: Direction::In,
            content: body.to_string(),
            message_type: "text".to_string(),
            external_id: Some(external_id.to_string()),
            delivery_state: None,
        }
    }

    #[tokio::test]
    async fn append_updates_last_message_at() {
        let (db, conversation_id) = setup().await;

        let message = append_message(&db, inbound(&conversation_id, "hello", "wamid.1"))
            .await
            .unwrap();

        let conversation = get_conversation(&db, &conversation_id).await.unwrap().unwrap();
        assert_eq!(conversation.last_message_at, message.created_at);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_external_id_is_rejected() {
        let (db, conversation_id) = setup().await;

        append_message(&db, inbound(&conversation_id, "hello", "wamid.1"))
            .await
            .unwrap();
        let result = append_message(&db, inbound(&conversation_id, "hello again", "wamid.1")).await;
        assert!(matches!(
            result,
            Err(ParleyError::DuplicateEvent { event_id }) if event_id == "wamid.1"
        ));

        // The failed append left exactly one message behind.
        let messages = list_recent_messages(&db, &conversation_id, 10).await.unwrap();
        assert_eq!(messages.len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recent_messages_come_back_oldest_first() {
        let (db, conversation_id) = setup().await;

        for i in 0..5 {
            append_message(&db, inbound(&conversation_id, &format!("m{i}"), &format!("wamid.{i}")))
                .await
                .unwrap();
        }

        let window = list_recent_messages(&db, &conversation_id, 3).await.unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "m2");
        assert_eq!(window[2].content, "m4");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn history_preserves_append_order_within_one_millisecond() {
        let (db, conversation_id) = setup().await;

        // Back-to-back appends share created_at timestamps; order must
        // still come back exactly as written.
        for i in 0..40 {
            append_message(
                &db,
                inbound(&conversation_id, &format!("m{i:02}"), &format!("wamid.{i}")),
            )
            .await
            .unwrap();
        }

        let history = list_recent_messages(&db, &conversation_id, 40).await.unwrap();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        let expected: Vec<String> = (0..40).map(|i| format!("m{i:02}")).collect();
        assert_eq!(contents, expected);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delivery_state_is_recorded() {
        let (db, conversation_id) = setup().await;

        let outbound = append_message(
            &db,
            NewMessage {
                conversation_id: conversation_id.clone(),
                direction: Direction::Out,
                content: "reply".to_string(),
                message_type: "text".to_string(),
                external_id: None,
                delivery_state: None,
            },
        )
        .await
        .unwrap();

        update_delivery_state(&db, &outbound.id, DeliveryState::Sent)
            .await
            .unwrap();

        let messages = list_recent_messages(&db, &conversation_id, 10).await.unwrap();
        assert_eq!(messages[0].delivery_state, Some(DeliveryState::Sent));

        db.close().await.unwrap();
    }
}
