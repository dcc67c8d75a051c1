// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authorization text rows.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{AttemptKey, AuthorizationText, MessageRef};
use rusqlite::{Connection, params};

use crate::database::storage_err;

/// Store `text` under an authorization attempt and return its id.
pub fn insert_auth_text(
    conn: &Connection,
    key: AttemptKey,
    text: &str,
    message_ref: MessageRef,
    now: &str,
) -> Result<i64, FieldcaseError> {
    if !key.step.is_authorization() {
        return Err(FieldcaseError::Internal(format!(
            "authorization text stored under evidence key {key}"
        )));
    }
    conn.execute(
        "INSERT INTO auth_text (case_id, step_no, attempt, text, message_ref, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            key.case_id.0,
            key.step.raw(),
            key.attempt,
            text,
            message_ref.0,
            now,
        ],
    )
    .map_err(storage_err)?;
    Ok(conn.last_insert_rowid())
}

pub fn list_auth_text(
    conn: &Connection,
    key: AttemptKey,
) -> Result<Vec<AuthorizationText>, FieldcaseError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, text, message_ref, created_at FROM auth_text
             WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3
             ORDER BY id ASC",
        )
        .map_err(storage_err)?;
    let rows = stmt
        .query_map(params![key.case_id.0, key.step.raw(), key.attempt], |row| {
            Ok(AuthorizationText {
                id: row.get(0)?,
                key,
                text: row.get(1)?,
                message_ref: MessageRef(row.get(2)?),
                created_at: row.get(3)?,
            })
        })
        .map_err(storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
}

pub fn delete_auth_text(conn: &Connection, key: AttemptKey) -> Result<usize, FieldcaseError> {
    conn.execute(
        "DELETE FROM auth_text WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3",
        params![key.case_id.0, key.step.raw(), key.attempt],
    )
    .map_err(storage_err)
}
