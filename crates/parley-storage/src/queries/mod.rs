// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and runs through the single
//! background writer thread.

pub mod conversations;
pub mod idempotency;
pub mod messages;
pub mod transitions;
pub mod users;
