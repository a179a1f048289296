// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery for the Parley webhook bot service.
//!
//! [`api::ChatApiClient`] talks to the platform messages endpoint;
//! [`dispatcher::Dispatcher`] layers retry, per-recipient ordering, and rate
//! limiting on top. [`DeliveryTransport`] is the seam the pipeline depends
//! on, so tests can substitute a recording transport.

pub mod api;
pub mod dispatcher;

use async_trait::async_trait;
use parley_core::ParleyError;

pub use api::ChatApiClient;
pub use dispatcher::Dispatcher;

/// Proof of a completed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Provider-assigned id of the delivered message.
    pub provider_message_id: String,
    /// How many attempts the delivery took.
    pub attempts: u32,
}

/// Delivers reply text to a recipient.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    async fn deliver(&self, recipient: &str, body: &str) -> Result<DeliveryReceipt, ParleyError>;
}

#[async_trait]
impl DeliveryTransport for Dispatcher {
    async fn deliver(&self, recipient: &str, body: &str) -> Result<DeliveryReceipt, ParleyError> {
        self.send_text(recipient, body).await
    }
}
