// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation engine for the Parley webhook bot service.
//!
//! Ties the storage, responder, and delivery layers together: the handoff
//! state machine, the escalation policy seam, and the per-event pipeline.

pub mod escalation;
pub mod handoff;
pub mod pipeline;

pub use escalation::{EscalationPolicy, KeywordEscalation, NeverEscalate};
pub use pipeline::{EventOutcome, Pipeline};
