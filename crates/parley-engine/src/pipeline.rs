// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-event processing pipeline.
//!
//! Flow: reserve the event id, load or create the user and conversation,
//! append the inbound message, run the escalation policy, then reply only
//! if the conversation is still `active` after a fresh status read. All
//! stages are I/O; nothing holds an in-process lock across them.

use std::sync::Arc;

use parley_core::{
    ConversationStatus, DeliveryState, Direction, NewMessage, NormalizedEvent, ParleyError,
};
use parley_delivery::DeliveryTransport;
use parley_responder::{ReplyGenerator, ReplyRequest};
use parley_storage::models::Reservation;
use parley_storage::queries::{conversations, idempotency, messages, users};
use parley_storage::Database;
use tracing::{info, warn};

use crate::escalation::EscalationPolicy;
use crate::handoff;

/// Terminal outcome of processing one normalized event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// A reply was generated and delivered.
    Replied { message_id: String },
    /// The event escalated the conversation to a human; no reply sent.
    EscalatedToHuman,
    /// A human drives this conversation; the message was recorded silently.
    HumanHandling,
    /// The conversation closed while the event was in flight; no reply sent.
    ConversationClosed,
    /// Reply generation failed within its budget; silence over a broken reply.
    ReplyUnavailable,
    /// A reply was generated but could not be delivered; recorded as failed.
    DeliveryFailed,
    /// The event id was already processed; nothing happened.
    Duplicate,
}

impl EventOutcome {
    /// Label recorded in the idempotency ledger.
    fn ledger_label(&self) -> &'static str {
        match self {
            EventOutcome::Replied { .. } => "replied",
            EventOutcome::EscalatedToHuman => "escalated",
            EventOutcome::HumanHandling => "human",
            EventOutcome::ConversationClosed => "closed",
            EventOutcome::ReplyUnavailable => "reply_unavailable",
            EventOutcome::DeliveryFailed => "delivery_failed",
            EventOutcome::Duplicate => "duplicate",
        }
    }
}

/// Orchestrates the webhook ingestion -> state machine -> reply dispatch flow.
pub struct Pipeline {
    db: Database,
    generator: Arc<dyn ReplyGenerator>,
    transport: Arc<dyn DeliveryTransport>,
    escalation: Arc<dyn EscalationPolicy>,
    history_window: usize,
    cas_max_attempts: u32,
}

impl Pipeline {
    pub fn new(
        db: Database,
        generator: Arc<dyn ReplyGenerator>,
        transport: Arc<dyn DeliveryTransport>,
        escalation: Arc<dyn EscalationPolicy>,
        history_window: usize,
        cas_max_attempts: u32,
    ) -> Self {
        Self {
            db,
            generator,
            transport,
            escalation,
            history_window,
            cas_max_attempts,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Process one normalized event to completion.
    ///
    /// Failures of sibling events never reach here; the caller runs each
    /// event independently. A returned error means the event was reserved
    /// but not fully processed; the ledger row keeps it from re-running.
    pub async fn process_event(&self, event: &NormalizedEvent) -> Result<EventOutcome, ParleyError> {
        if idempotency::check_and_reserve(&self.db, &event.event_id).await?
            == Reservation::Duplicate
        {
            info!(event_id = %event.event_id, "duplicate event, skipping");
            return Ok(EventOutcome::Duplicate);
        }

        let user = users::get_or_create_user(
            &self.db,
            &event.sender_external_id,
            event.sender_display_name.as_deref(),
        )
        .await?;

        let conversation = match conversations::get_open_conversation(&self.db, &user.id).await? {
            Some(conversation) => conversation,
            None => conversations::create_conversation(&self.db, &user.id).await?,
        };

        let appended = messages::append_message(
            &self.db,
            NewMessage {
                conversation_id: conversation.id.clone(),
                direction: Direction::In,
                content: event.body.clone(),
                message_type: event.message_type.clone(),
                external_id: Some(event.message_external_id.clone()),
                delivery_state: None,
            },
        )
        .await;
        if let Err(ParleyError::DuplicateEvent { event_id }) = appended {
            warn!(event_id = %event_id, "provider message already recorded, skipping");
            return self.finish(event, EventOutcome::Duplicate).await;
        }
        appended?;

        let history =
            messages::list_recent_messages(&self.db, &conversation.id, self.history_window).await?;

        if conversation.status == ConversationStatus::Active
            && self.escalation.should_escalate(event, &history)
        {
            match handoff::transition(
                &self.db,
                &conversation.id,
                ConversationStatus::Human,
                "pipeline",
                self.cas_max_attempts,
            )
            .await
            {
                Ok(_) => {
                    info!(conversation_id = %conversation.id, "conversation escalated to human");
                    return self.finish(event, EventOutcome::EscalatedToHuman).await;
                }
                // A concurrent operator action got there first; the fresh
                // read below decides what happens.
                Err(ParleyError::InvalidTransition { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        // Decision rule: act only if the conversation is active right now.
        let current = conversations::get_conversation(&self.db, &conversation.id)
            .await?
            .ok_or_else(|| {
                ParleyError::Internal(format!("conversation {} disappeared", conversation.id))
            })?;
        match current.status {
            ConversationStatus::Human => {
                return self.finish(event, EventOutcome::HumanHandling).await;
            }
            ConversationStatus::Closed => {
                return self.finish(event, EventOutcome::ConversationClosed).await;
            }
            ConversationStatus::Active => {}
        }

        let reply = match self
            .generator
            .generate(ReplyRequest {
                conversation_id: conversation.id.clone(),
                history,
            })
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "reply generation failed, staying silent");
                return self.finish(event, EventOutcome::ReplyUnavailable).await;
            }
        };

        match self
            .transport
            .deliver(&event.sender_external_id, &reply)
            .await
        {
            Ok(receipt) => {
                let outbound = messages::append_message(
                    &self.db,
                    NewMessage {
                        conversation_id: conversation.id.clone(),
                        direction: Direction::Out,
                        content: reply,
                        message_type: "text".to_string(),
                        external_id: Some(receipt.provider_message_id),
                        delivery_state: Some(DeliveryState::Sent),
                    },
                )
                .await?;
                info!(
                    conversation_id = %conversation.id,
                    attempts = receipt.attempts,
                    "reply delivered"
                );
                self.finish(
                    event,
                    EventOutcome::Replied {
                        message_id: outbound.id,
                    },
                )
                .await
            }
            Err(ParleyError::DeliveryFailed { attempts, message }) => {
                warn!(
                    conversation_id = %conversation.id,
                    attempts,
                    error = %message,
                    "delivery exhausted its budget, recording failure"
                );
                messages::append_message(
                    &self.db,
                    NewMessage {
                        conversation_id: conversation.id.clone(),
                        direction: Direction::Out,
                        content: reply,
                        message_type: "text".to_string(),
                        external_id: None,
                        delivery_state: Some(DeliveryState::Failed),
                    },
                )
                .await?;
                self.finish(event, EventOutcome::DeliveryFailed).await
            }
            Err(e) => Err(e),
        }
    }

    async fn finish(
        &self,
        event: &NormalizedEvent,
        outcome: EventOutcome,
    ) -> Result<EventOutcome, ParleyError> {
        idempotency::mark_outcome(&self.db, &event.event_id, outcome.ledger_label()).await?;
        Ok(outcome)
    }
}
