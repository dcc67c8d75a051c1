// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules.
//!
//! Every function takes a plain `&rusqlite::Connection` so it can run inside
//! a [`crate::Database::transact`] closure alongside other queries.

pub mod attempts;
pub mod auth_text;
pub mod cases;
pub mod chat_config;
pub mod media;
pub mod pending;

use fieldcase_core::FieldcaseError;

/// Map a rusqlite error, turning constraint violations into state conflicts.
pub(crate) fn constraint_err(e: rusqlite::Error, conflict: &str) -> FieldcaseError {
    match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => {
            FieldcaseError::StateConflict(conflict.to_string())
        }
        _ => crate::database::storage_err(e),
    }
}

#[cfg(test)]
pub(crate) fn test_conn() -> rusqlite::Connection {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    crate::migrations::run_migrations(&mut conn).unwrap();
    conn
}

/// An open case for technician 2 in chat 1.
#[cfg(test)]
pub(crate) fn test_case(conn: &rusqlite::Connection) -> fieldcase_core::types::Case {
    use fieldcase_core::types::{ActorId, ChatId, Phase, now_utc};

    let phase = Phase::WaitTechnician;
    cases::insert_case(conn, ChatId(1), ActorId(2), None, phase, &now_utc()).unwrap()
}
