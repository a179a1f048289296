// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User lookup and creation.

use parley_core::ParleyError;
use rusqlite::params;

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::{user_from_row, User};

/// Fetch the user with the given platform account id, creating it if it does
/// not exist yet.
///
/// `INSERT OR IGNORE` makes the create race-safe: two events for the same
/// new sender both end up reading the one row that won.
pub async fn get_or_create_user(
    db: &Database,
    external_id: &str,
    display_name: Option<&str>,
) -> Result<User, ParleyError> {
    let external_id = external_id.to_string();
    let display_name = display_name.map(|s| s.to_string());
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = now_rfc3339();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (id, external_id, display_name, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, external_id, display_name, created_at],
            )?;
            let mut stmt = conn.prepare(
                "SELECT id, external_id, display_name, created_at
                 FROM users WHERE external_id = ?1",
            )?;
            let user = stmt.query_row(params![external_id], user_from_row)?;
            Ok(user)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a user by internal id.
pub async fn get_user(db: &Database, id: &str) -> Result<Option<User>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, external_id, display_name, created_at
                 FROM users WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], user_from_row);
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}
