// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat approval setting.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::ChatId;
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::storage_err;

/// Whether attempts in `chat_id` need a reviewer. Defaults to `true`.
pub fn approval_required(conn: &Connection, chat_id: ChatId) -> Result<bool, FieldcaseError> {
    let stored: Option<bool> = conn
        .query_row(
            "SELECT approval_required FROM chat_config WHERE chat_id = ?1",
            params![chat_id.0],
            |row| row.get(0),
        )
        .optional()
        .map_err(storage_err)?;
    Ok(stored.unwrap_or(true))
}

pub fn set_approval_required(
    conn: &Connection,
    chat_id: ChatId,
    required: bool,
    now: &str,
) -> Result<(), FieldcaseError> {
    conn.execute(
        "INSERT INTO chat_config (chat_id, approval_required, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (chat_id) DO UPDATE SET
             approval_required = excluded.approval_required,
             updated_at = excluded.updated_at",
        params![chat_id.0, required, now],
    )
    .map_err(storage_err)?;
    Ok(())
}
