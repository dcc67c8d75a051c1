// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evidence item rows. Items are inserted and bulk-deleted, never updated.

use std::str::FromStr;

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{AttemptKey, MediaItem, MediaKind, MessageRef, NewMediaItem};
use rusqlite::{Connection, params};

use crate::database::storage_err;

/// Number of items stored under `key`.
pub fn count_media(conn: &Connection, key: AttemptKey) -> Result<usize, FieldcaseError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM media WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3",
            params![key.case_id.0, key.step.raw(), key.attempt],
            |row| row.get(0),
        )
        .map_err(storage_err)?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// Append an item and return its id.
pub fn insert_media(
    conn: &Connection,
    key: AttemptKey,
    item: &NewMediaItem,
    now: &str,
) -> Result<i64, FieldcaseError> {
    let meta = serde_json::to_string(&item.meta)
        .map_err(|e| FieldcaseError::Internal(format!("unserializable media metadata: {e}")))?;
    conn.execute(
        "INSERT INTO media (case_id, step_no, attempt, kind, file_id, file_unique_id,
                            message_ref, meta, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            key.case_id.0,
            key.step.raw(),
            key.attempt,
            item.kind.to_string(),
            item.file_id,
            item.file_unique_id,
            item.message_ref.0,
            meta,
            now
        ],
    )
    .map_err(storage_err)?;
    Ok(conn.last_insert_rowid())
}

/// Every item stored under `key`, in append order.
pub fn list_media(conn: &Connection, key: AttemptKey) -> Result<Vec<MediaItem>, FieldcaseError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, kind, file_id, file_unique_id, message_ref, meta, created_at
             FROM media
             WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3
             ORDER BY id ASC",
        )
        .map_err(storage_err)?;
    let rows = stmt
        .query_map(params![key.case_id.0, key.step.raw(), key.attempt], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .map_err(storage_err)?;

    let mut items = Vec::new();
    for row in rows {
        let (id, kind, file_id, file_unique_id, message_ref, meta, created_at) =
            row.map_err(storage_err)?;
        let kind = MediaKind::from_str(&kind).map_err(|_| {
            FieldcaseError::Internal(format!("media {id} has unknown kind `{kind}`"))
        })?;
        let meta = serde_json::from_str(&meta).unwrap_or(serde_json::Value::Null);
        items.push(MediaItem {
            id,
            key,
            kind,
            file_id,
            file_unique_id,
            message_ref: MessageRef(message_ref),
            meta,
            created_at,
        });
    }
    Ok(items)
}

/// Delete every item stored under `key`. Returns the number removed.
pub fn delete_media(conn: &Connection, key: AttemptKey) -> Result<usize, FieldcaseError> {
    conn.execute(
        "DELETE FROM media WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3",
        params![key.case_id.0, key.step.raw(), key.attempt],
    )
    .map_err(storage_err)
}
