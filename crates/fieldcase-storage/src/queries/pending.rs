// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending input rows: at most one per (chat, actor, kind).

use std::str::FromStr;

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{
    ActorId, AttemptKey, CaseId, ChatId, MessageRef, PendingInput, PendingInputKind,
};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::storage_err;
use crate::models::step_from_raw;

/// Insert or overwrite the request for (chat, actor, kind).
pub fn upsert_pending(conn: &Connection, input: &PendingInput) -> Result<(), FieldcaseError> {
    conn.execute(
        "INSERT INTO pending_inputs (chat_id, actor_id, kind, case_id, step_no, attempt,
                                     reply_to, subject_technician, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT (chat_id, actor_id, kind) DO UPDATE SET
             case_id = excluded.case_id,
             step_no = excluded.step_no,
             attempt = excluded.attempt,
             reply_to = excluded.reply_to,
             subject_technician = excluded.subject_technician,
             created_at = excluded.created_at",
        params![
            input.chat_id.0,
            input.actor_id.0,
            input.kind.to_string(),
            input.target.case_id.0,
            input.target.step.raw(),
            input.target.attempt,
            input.reply_to.map(|m| m.0),
            input.subject_technician.map(|a| a.0),
            input.created_at,
        ],
    )
    .map_err(storage_err)?;
    Ok(())
}

/// Read the request for (chat, actor, kind) without removing it.
pub fn get_pending(
    conn: &Connection,
    chat_id: ChatId,
    actor_id: ActorId,
    kind: PendingInputKind,
) -> Result<Option<PendingInput>, FieldcaseError> {
    let row = conn
        .query_row(
            "SELECT kind, case_id, step_no, attempt, reply_to, subject_technician, created_at
             FROM pending_inputs
             WHERE chat_id = ?1 AND actor_id = ?2 AND kind = ?3",
            params![chat_id.0, actor_id.0, kind.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()
        .map_err(storage_err)?;

    let Some((kind, case_id, step_no, attempt, reply_to, subject, created_at)) = row else {
        return Ok(None);
    };
    let kind = PendingInputKind::from_str(&kind)
        .map_err(|_| FieldcaseError::Internal(format!("unknown pending input kind `{kind}`")))?;
    Ok(Some(PendingInput {
        chat_id,
        actor_id,
        kind,
        target: AttemptKey::new(CaseId(case_id), step_from_raw(step_no)?, attempt),
        reply_to: reply_to.map(MessageRef),
        subject_technician: subject.map(ActorId),
        created_at,
    }))
}

/// Remove the request for (chat, actor, kind). Returns whether one existed.
pub fn delete_pending(
    conn: &Connection,
    chat_id: ChatId,
    actor_id: ActorId,
    kind: PendingInputKind,
) -> Result<bool, FieldcaseError> {
    let removed = conn
        .execute(
            "DELETE FROM pending_inputs WHERE chat_id = ?1 AND actor_id = ?2 AND kind = ?3",
            params![chat_id.0, actor_id.0, kind.to_string()],
        )
        .map_err(storage_err)?;
    Ok(removed > 0)
}

/// Drop every request that targets `case_id`.
pub fn delete_pending_for_case(
    conn: &Connection,
    case_id: CaseId,
) -> Result<usize, FieldcaseError> {
    conn.execute(
        "DELETE FROM pending_inputs WHERE case_id = ?1",
        params![case_id.0],
    )
    .map_err(storage_err)
}

/// Drop every request, from any actor, that targets the attempt `key`.
pub fn delete_pending_for_attempt(
    conn: &Connection,
    key: AttemptKey,
) -> Result<usize, FieldcaseError> {
    conn.execute(
        "DELETE FROM pending_inputs WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3",
        params![key.case_id.0, key.step.raw(), key.attempt],
    )
    .map_err(storage_err)
}
