// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status transition audit trail queries.
//!
//! Rows are written inside the compare-and-swap transaction in
//! `queries::conversations`; this module only reads them.

use parley_core::ParleyError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::{transition_from_row, TransitionRecord};

/// List all recorded transitions for a conversation, oldest first.
pub async fn list_transitions(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<TransitionRecord>, ParleyError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, from_status, to_status, actor, created_at
                 FROM transitions
                 WHERE conversation_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], transition_from_row)?;
            let mut transitions = Vec::new();
            for row in rows {
                transitions.push(row?);
            }
            Ok(transitions)
        })
        .await
        .map_err(map_tr_err)
}
