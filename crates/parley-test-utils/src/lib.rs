// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles and a pipeline harness for Parley tests.
//!
//! `ScriptedReplyGenerator` and `RecordingTransport` stand in for the reply
//! backend and the platform API so pipeline behavior is deterministic and
//! CI-runnable without external calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use parley_core::{NormalizedEvent, ParleyError};
use parley_delivery::{DeliveryReceipt, DeliveryTransport};
use parley_engine::{EscalationPolicy, KeywordEscalation, NeverEscalate, Pipeline};
use parley_responder::{ReplyGenerator, ReplyRequest};
use parley_storage::Database;

/// A reply generator that returns pre-scripted results.
///
/// Results are popped from a FIFO queue. When the queue is empty, a default
/// "scripted reply" text is returned.
pub struct ScriptedReplyGenerator {
    replies: Mutex<VecDeque<Result<String, ParleyError>>>,
    calls: AtomicU32,
}

impl ScriptedReplyGenerator {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_replies(replies: Vec<Result<String, ParleyError>>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(replies)),
            calls: AtomicU32::new(0),
        }
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, err: ParleyError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    /// How many times `generate` was invoked.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedReplyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyGenerator for ScriptedReplyGenerator {
    async fn generate(&self, _request: ReplyRequest) -> Result<String, ParleyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("scripted reply".to_string()))
    }
}

/// A delivery transport that records sends instead of making HTTP calls.
///
/// Can be told to fail the next N deliveries.
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    fail_next: AtomicU32,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_next: AtomicU32::new(0),
        }
    }

    /// Fail the next `n` deliveries with `DeliveryFailed`.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Everything delivered so far, as `(recipient, body)` pairs in order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryTransport for RecordingTransport {
    async fn deliver(&self, recipient: &str, body: &str) -> Result<DeliveryReceipt, ParleyError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(ParleyError::DeliveryFailed {
                attempts: 1,
                message: "transport configured to fail".to_string(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((recipient.to_string(), body.to_string()));
        Ok(DeliveryReceipt {
            provider_message_id: format!("wamid.out.{}", sent.len()),
            attempts: 1,
        })
    }
}

/// Compute the `X-Hub-Signature-256` header value for a payload.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Build a provider-shaped webhook envelope carrying one text message.
pub fn text_message_envelope(
    message_id: &str,
    sender: &str,
    sender_name: &str,
    body: &str,
) -> serde_json::Value {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "entry-1",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "contacts": [{
                        "wa_id": sender,
                        "profile": {"name": sender_name}
                    }],
                    "messages": [{
                        "id": message_id,
                        "from": sender,
                        "timestamp": "1767225600",
                        "type": "text",
                        "text": {"body": body}
                    }]
                }
            }]
        }]
    })
}

/// A normalized event with plausible defaults, for pipeline-level tests.
pub fn normalized_event(event_id: &str, sender: &str, body: &str) -> NormalizedEvent {
    NormalizedEvent {
        event_id: event_id.to_string(),
        sender_external_id: sender.to_string(),
        sender_display_name: Some("Test User".to_string()),
        message_external_id: format!("wamid.{event_id}"),
        timestamp: "2026-01-01T00:00:00Z".to_string(),
        message_type: "text".to_string(),
        body: body.to_string(),
    }
}

/// In-memory pipeline with scripted collaborators.
pub struct TestHarness {
    pub db: Database,
    pub generator: Arc<ScriptedReplyGenerator>,
    pub transport: Arc<RecordingTransport>,
    pub pipeline: Arc<Pipeline>,
}

impl TestHarness {
    /// Harness with no escalation keywords.
    pub async fn new() -> Self {
        Self::build(Arc::new(NeverEscalate)).await
    }

    /// Harness escalating on the given keywords.
    pub async fn with_escalation_keywords(keywords: &[&str]) -> Self {
        let keywords: Vec<String> = keywords.iter().map(|s| s.to_string()).collect();
        let policy = KeywordEscalation::new(&keywords).expect("valid keywords");
        Self::build(Arc::new(policy)).await
    }

    async fn build(escalation: Arc<dyn EscalationPolicy>) -> Self {
        let db = Database::open_in_memory().await.expect("in-memory database");
        let generator = Arc::new(ScriptedReplyGenerator::new());
        let transport = Arc::new(RecordingTransport::new());
        let pipeline = Arc::new(Pipeline::new(
            db.clone(),
            generator.clone(),
            transport.clone(),
            escalation,
            20,
            3,
        ));
        Self {
            db,
            generator,
            transport,
            pipeline,
        }
    }
}
