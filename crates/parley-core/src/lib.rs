// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley webhook bot service.
//!
//! Provides the error taxonomy and domain types used throughout the
//! workspace. All other crates depend on this one and nothing here depends
//! on I/O.

pub mod error;
pub mod types;

pub use error::ParleyError;
pub use types::{
    Conversation, ConversationStatus, DeliveryState, Direction, IdempotencyRecord, Message,
    NewMessage, NormalizedEvent, User,
};
