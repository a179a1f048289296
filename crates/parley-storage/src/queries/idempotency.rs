// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotency ledger operations.
//!
//! Reservation happens before any other side effect of processing an event,
//! so a redelivered webhook observes the reservation and stops.

use parley_core::{IdempotencyRecord, ParleyError};
use rusqlite::params;

use crate::database::{map_tr_err, now_rfc3339, Database};
use crate::models::Reservation;

/// Atomically reserve an event id for processing.
///
/// `INSERT OR IGNORE` is the entire race: exactly one caller sees a changed
/// row and owns the event; everyone else gets `Duplicate`.
pub async fn check_and_reserve(db: &Database, event_id: &str) -> Result<Reservation, ParleyError> {
    let event_id = event_id.to_string();
    let created_at = now_rfc3339();
    db.connection()
        .call(move |conn| {
            let rows = conn.execute(
                "INSERT OR IGNORE INTO idempotency (event_id, outcome, created_at)
                 VALUES (?1, 'reserved', ?2)",
                params![event_id, created_at],
            )?;
            Ok(if rows == 1 {
                Reservation::Fresh
            } else {
                Reservation::Duplicate
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Record the terminal outcome of a reserved event.
///
/// A crash before this call leaves the row as `reserved`; the event is never
/// reprocessed (at-most-once).
pub async fn mark_outcome(db: &Database, event_id: &str, outcome: &str) -> Result<(), ParleyError> {
    let event_id = event_id.to_string();
    let outcome = outcome.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE idempotency SET outcome = ?1 WHERE event_id = ?2",
                params![outcome, event_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the ledger row for an event id.
pub async fn get_record(
    db: &Database,
    event_id: &str,
) -> Result<Option<IdempotencyRecord>, ParleyError> {
    let event_id = event_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT event_id, outcome, created_at FROM idempotency WHERE event_id = ?1",
            )?;
            let result = stmt.query_row(params![event_id], |row| {
                Ok(IdempotencyRecord {
                    event_id: row.get(0)?,
                    outcome: row.get(1)?,
                    created_at: row.get(2)?,
                })
            });
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_reservation_is_fresh_second_is_duplicate() {
        let db = Database::open_in_memory().await.unwrap();

        assert_eq!(
            check_and_reserve(&db, "evt-1").await.unwrap(),
            Reservation::Fresh
        );
        assert_eq!(
            check_and_reserve(&db, "evt-1").await.unwrap(),
            Reservation::Duplicate
        );
        // A different event id is unaffected.
        assert_eq!(
            check_and_reserve(&db, "evt-2").await.unwrap(),
            Reservation::Fresh
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn outcome_is_recorded_on_the_reservation() {
        let db = Database::open_in_memory().await.unwrap();

        check_and_reserve(&db, "evt-1").await.unwrap();
        let record = get_record(&db, "evt-1").await.unwrap().unwrap();
        assert_eq!(record.outcome, "reserved");

        mark_outcome(&db, "evt-1", "replied").await.unwrap();
        let record = get_record(&db, "evt-1").await.unwrap().unwrap();
        assert_eq!(record.outcome, "replied");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_reservations_yield_one_fresh() {
        let db = Database::open_in_memory().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                check_and_reserve(&db, "evt-race").await.unwrap()
            }));
        }

        let mut fresh = 0;
        for handle in handles {
            if handle.await.unwrap() == Reservation::Fresh {
                fresh += 1;
            }
        }
        assert_eq!(fresh, 1);

        db.close().await.unwrap();
    }
}
