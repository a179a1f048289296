// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use parley_core::ParleyError;
use tokio_rusqlite::Connection;

/// Handle to the SQLite database.
///
/// Wraps a single `tokio_rusqlite::Connection`; every query module accepts
/// `&Database` and goes through [`Database::connection`], so all access is
/// serialized on one background thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str, wal: bool) -> Result<Self, ParleyError> {
        let conn = Connection::open(path).await.map_err(ParleyError::storage)?;
        Self::initialize(conn, wal).await
    }

    /// Open an in-memory database. Used by tests and the e2e harness.
    pub async fn open_in_memory() -> Result<Self, ParleyError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(ParleyError::storage)?;
        Self::initialize(conn, false).await
    }

    async fn initialize(conn: Connection, wal: bool) -> Result<Self, ParleyError> {
        conn.call(move |conn| {
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<refinery::Error>| ParleyError::Storage {
                source: Box::new(e),
            })?;

        tracing::debug!("database opened and migrated");
        Ok(Self { conn })
    }

    /// Access the underlying connection for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the database, flushing the WAL.
    pub async fn close(self) -> Result<(), ParleyError> {
        self.conn
            .close()
            .await
            .map_err(|e| ParleyError::Storage {
                source: Box::new(e),
            })
    }
}

/// Map a `tokio_rusqlite::Error` into the domain storage error.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> ParleyError {
    ParleyError::Storage {
        source: Box::new(err),
    }
}

/// Current UTC time as an RFC 3339 string with millisecond precision.
///
/// Matches the `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` format used in SQL.
pub fn now_rfc3339() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
