// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway: webhook ingestion and the operator API.
//!
//! Exposes `POST /webhook` (signed deliveries), `GET /webhook` (subscription
//! handshake), `GET /health`, and bearer-authenticated operator routes for
//! claiming, resuming, and closing conversations.

pub mod auth;
pub mod handlers;
pub mod parse;
pub mod server;
pub mod signature;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState, ServerConfig};
