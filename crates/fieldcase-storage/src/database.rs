// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use fieldcase_core::FieldcaseError;
use rusqlite::TransactionBehavior;
use tracing::debug;

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into [`FieldcaseError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> FieldcaseError {
    FieldcaseError::Storage {
        source: Box::new(e),
    }
}

/// Convert a plain rusqlite error into [`FieldcaseError::Storage`].
pub fn storage_err(e: rusqlite::Error) -> FieldcaseError {
    FieldcaseError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the single-writer SQLite connection.
///
/// Cloning is cheap; every clone talks to the same background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, FieldcaseError> {
        Self::open_with_wal(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with_wal(
        path: impl AsRef<Path>,
        wal_mode: bool,
    ) -> Result<Self, FieldcaseError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| FieldcaseError::Storage {
                source: Box::new(e),
            })?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(storage_err)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path = %path.display(), wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, FieldcaseError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(storage_err)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), FieldcaseError> {
        self.conn
            .call(move |conn| -> Result<Result<(), FieldcaseError>, rusqlite::Error> {
                if wal_mode {
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
                }
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;",
                )?;
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Run `f` inside one IMMEDIATE transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err`, so a domain error never leaves partial writes behind.
    pub async fn transact<T, F>(&self, f: F) -> Result<T, FieldcaseError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, FieldcaseError> + Send + 'static,
    {
        self.conn
            .call(move |conn| -> Result<Result<T, FieldcaseError>, rusqlite::Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                match f(&tx) {
                    Ok(value) => {
                        tx.commit()?;
                        Ok(Ok(value))
                    }
                    Err(e) => Ok(Err(e)),
                }
            })
            .await
            .map_err(map_tr_err)?
    }

    /// Run a read-only closure outside any explicit transaction.
    pub async fn read<T, F>(&self, f: F) -> Result<T, FieldcaseError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, FieldcaseError> + Send + 'static,
    {
        self.conn
            .call(move |conn| -> Result<Result<T, FieldcaseError>, rusqlite::Error> {
                Ok(f(conn))
            })
            .await
            .map_err(map_tr_err)?
    }

    /// Checkpoint the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), FieldcaseError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), FieldcaseError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}
