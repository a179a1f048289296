// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine.
//!
//! Legal edges:
//! - `active -> human`: escalation trigger or operator claim
//! - `human -> active`: explicit operator resume only
//! - `active -> closed`, `human -> closed`: operator close
//! - `closed -> closed`: idempotent close, a no-op
//!
//! Everything else is rejected with `InvalidTransition` and leaves the
//! conversation untouched. Transitions go through the store's
//! compare-and-swap with a bounded fresh-read retry loop, so a lost race
//! against a concurrent writer re-reads instead of overwriting.

use parley_core::{Conversation, ConversationStatus, ParleyError};
use parley_storage::queries::conversations;
use parley_storage::Database;
use tracing::{debug, info};

/// Whether `from -> to` is a legal status edge.
pub fn is_legal(from: ConversationStatus, to: ConversationStatus) -> bool {
    use ConversationStatus::*;
    matches!(
        (from, to),
        (Active, Human) | (Human, Active) | (Active, Closed) | (Human, Closed) | (Closed, Closed)
    )
}

/// Drive a conversation to `to`, retrying lost compare-and-swap races with
/// a fresh read up to `max_attempts` times.
///
/// Returns the conversation as re-read before the winning CAS. An illegal
/// edge fails immediately; a `closed -> closed` request succeeds without
/// writing anything.
pub async fn transition(
    db: &Database,
    conversation_id: &str,
    to: ConversationStatus,
    actor: &str,
    max_attempts: u32,
) -> Result<Conversation, ParleyError> {
    let max_attempts = max_attempts.max(1);
    for attempt in 0..max_attempts {
        let conversation = conversations::get_conversation(db, conversation_id)
            .await?
            .ok_or_else(|| {
                ParleyError::Internal(format!("conversation {conversation_id} not found"))
            })?;
        let from = conversation.status;

        if from == ConversationStatus::Closed && to == ConversationStatus::Closed {
            debug!(conversation_id, "close of already closed conversation is a no-op");
            return Ok(conversation);
        }
        if !is_legal(from, to) {
            return Err(ParleyError::InvalidTransition { from, to });
        }

        match conversations::update_conversation_status(db, conversation_id, from, to, actor).await
        {
            Ok(()) => {
                info!(conversation_id, %from, %to, actor, "conversation transitioned");
                return Ok(Conversation {
                    status: to,
                    ..conversation
                });
            }
            Err(ParleyError::ConcurrentModification { .. }) if attempt + 1 < max_attempts => {
                debug!(conversation_id, attempt, "transition lost a race, re-reading");
                continue;
            }
            Err(ParleyError::ConcurrentModification { .. }) => {
                return Err(ParleyError::StateMachine {
                    conversation_id: conversation_id.to_string(),
                    attempts: max_attempts,
                });
            }
            Err(e) => return Err(e),
        }
    }
    Err(ParleyError::StateMachine {
        conversation_id: conversation_id.to_string(),
        attempts: max_attempts,
    })
}

/// Operator claims the conversation for human handling.
pub async fn operator_claim(
    db: &Database,
    conversation_id: &str,
    operator: &str,
    max_attempts: u32,
) -> Result<Conversation, ParleyError> {
    transition(
        db,
        conversation_id,
        ConversationStatus::Human,
        &format!("operator:{operator}"),
        max_attempts,
    )
    .await
}

/// Operator hands the conversation back to the automated responder.
pub async fn operator_resume(
    db: &Database,
    conversation_id: &str,
    operator: &str,
    max_attempts: u32,
) -> Result<Conversation, ParleyError> {
    transition(
        db,
        conversation_id,
        ConversationStatus::Active,
        &format!("operator:{operator}"),
        max_attempts,
    )
    .await
}

/// Operator closes the conversation. Closing an already closed conversation
/// succeeds without effect.
pub async fn operator_close(
    db: &Database,
    conversation_id: &str,
    operator: &str,
    max_attempts: u32,
) -> Result<Conversation, ParleyError> {
    transition(
        db,
        conversation_id,
        ConversationStatus::Closed,
        &format!("operator:{operator}"),
        max_attempts,
    )
    .await
}
