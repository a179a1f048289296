// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatcher: retry, rate limiting, and per-recipient ordering.
//!
//! Each recipient has a tokio `Mutex` guarding its send slot. tokio mutexes
//! are FIFO-fair, so callers that enqueue in order also send in order, and
//! the post-send spacing delay happens while the lock is held, which is what
//! enforces the per-recipient rate limit. A global semaphore bounds how many
//! HTTP requests are in flight at once across all recipients.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parley_core::ParleyError;
use parley_resilience::RetryPolicy;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::ChatApiClient;
use crate::DeliveryReceipt;

/// Per-recipient send slot: the earliest instant the next send may start.
struct SendSlot {
    next_allowed: Instant,
}

/// Sends outbound messages through the platform API.
pub struct Dispatcher {
    client: ChatApiClient,
    policy: RetryPolicy,
    min_interval: Duration,
    slots: DashMap<String, Arc<Mutex<SendSlot>>>,
    in_flight: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(
        client: ChatApiClient,
        policy: RetryPolicy,
        min_interval: Duration,
        max_concurrent_sends: usize,
    ) -> Self {
        Self {
            client,
            policy,
            min_interval,
            slots: DashMap::new(),
            in_flight: Arc::new(Semaphore::new(max_concurrent_sends.max(1))),
        }
    }

    fn slot(&self, recipient: &str) -> Arc<Mutex<SendSlot>> {
        self.slots
            .entry(recipient.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(SendSlot {
                    next_allowed: Instant::now(),
                }))
            })
            .clone()
    }

    /// Deliver one text message to `recipient`.
    ///
    /// Retries transient failures with jittered exponential backoff up to the
    /// policy's attempt budget. Returns `DeliveryFailed` once the budget is
    /// spent; the caller records the failure and moves on.
    pub async fn send_text(
        &self,
        recipient: &str,
        body: &str,
    ) -> Result<DeliveryReceipt, ParleyError> {
        let slot = self.slot(recipient);
        let mut slot = slot.lock().await;

        tokio::time::sleep_until(slot.next_allowed).await;

        let mut last_error = String::new();
        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                let delay = self.policy.jittered_delay_for(attempt);
                warn!(
                    recipient,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying delivery after transient error"
                );
                tokio::time::sleep(delay).await;
            }

            let _permit = self
                .in_flight
                .acquire()
                .await
                .map_err(|e| ParleyError::Internal(format!("dispatcher semaphore closed: {e}")))?;

            match self.client.send_text(recipient, body).await {
                Ok(provider_message_id) => {
                    slot.next_allowed = Instant::now() + self.min_interval;
                    debug!(recipient, attempts = attempt + 1, "message delivered");
                    return Ok(DeliveryReceipt {
                        provider_message_id,
                        attempts: attempt + 1,
                    });
                }
                Err(err) if err.transient => {
                    last_error = err.message;
                }
                Err(err) => {
                    slot.next_allowed = Instant::now() + self.min_interval;
                    return Err(ParleyError::DeliveryFailed {
                        attempts: attempt + 1,
                        message: err.message,
                    });
                }
            }
        }

        slot.next_allowed = Instant::now() + self.min_interval;
        Err(ParleyError::DeliveryFailed {
            attempts: self.policy.max_attempts,
            message: last_error,
        })
    }
}
