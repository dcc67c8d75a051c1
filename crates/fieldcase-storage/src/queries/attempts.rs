// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attempt rows, including the compare-and-set used by review decisions.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{ActorId, Attempt, AttemptKey, CaseId, MessageRef, StepNo};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::storage_err;
use crate::models::{ATTEMPT_COLUMNS, AttemptRow};

/// Point-get by key.
pub fn get_attempt(conn: &Connection, key: AttemptKey) -> Result<Option<Attempt>, FieldcaseError> {
    let sql = format!(
        "SELECT {ATTEMPT_COLUMNS} FROM attempts
         WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3"
    );
    conn.query_row(
        &sql,
        params![key.case_id.0, key.step.raw(), key.attempt],
        AttemptRow::from_row,
    )
    .optional()
    .map_err(storage_err)?
    .map(AttemptRow::into_attempt)
    .transpose()
}

/// The unsubmitted attempt for (case, step), if one exists.
pub fn find_unsubmitted(
    conn: &Connection,
    case_id: CaseId,
    step: StepNo,
) -> Result<Option<Attempt>, FieldcaseError> {
    let sql = format!(
        "SELECT {ATTEMPT_COLUMNS} FROM attempts
         WHERE case_id = ?1 AND step_no = ?2 AND submitted = 0"
    );
    conn.query_row(&sql, params![case_id.0, step.raw()], AttemptRow::from_row)
        .optional()
        .map_err(storage_err)?
        .map(AttemptRow::into_attempt)
        .transpose()
}

/// The highest-numbered attempt for (case, step), if any.
pub fn latest_attempt(
    conn: &Connection,
    case_id: CaseId,
    step: StepNo,
) -> Result<Option<Attempt>, FieldcaseError> {
    let sql = format!(
        "SELECT {ATTEMPT_COLUMNS} FROM attempts
         WHERE case_id = ?1 AND step_no = ?2
         ORDER BY attempt DESC LIMIT 1"
    );
    conn.query_row(&sql, params![case_id.0, step.raw()], AttemptRow::from_row)
        .optional()
        .map_err(storage_err)?
        .map(AttemptRow::into_attempt)
        .transpose()
}

/// Highest attempt number used for (case, step), zero when none exists.
pub fn max_attempt_number(
    conn: &Connection,
    case_id: CaseId,
    step: StepNo,
) -> Result<u32, FieldcaseError> {
    conn.query_row(
        "SELECT COALESCE(MAX(attempt), 0) FROM attempts WHERE case_id = ?1 AND step_no = ?2",
        params![case_id.0, step.raw()],
        |row| row.get(0),
    )
    .map_err(storage_err)
}

/// Insert a fresh, unsubmitted, unreviewed attempt.
///
/// Fails with a state conflict if another unsubmitted attempt exists for
/// the same (case, step).
pub fn insert_attempt(
    conn: &Connection,
    key: AttemptKey,
    now: &str,
) -> Result<Attempt, FieldcaseError> {
    conn.execute(
        "INSERT INTO attempts (case_id, step_no, attempt, submitted, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![key.case_id.0, key.step.raw(), key.attempt, now],
    )
    .map_err(|e| super::constraint_err(e, "an active attempt already exists for this step"))?;
    get_attempt(conn, key)?
        .ok_or_else(|| FieldcaseError::Internal(format!("{key} vanished after insert")))
}

/// Mark an unsubmitted attempt as submitted. Returns the number of rows changed.
pub fn mark_submitted(
    conn: &Connection,
    key: AttemptKey,
    now: &str,
) -> Result<usize, FieldcaseError> {
    conn.execute(
        "UPDATE attempts SET submitted = 1, submitted_at = ?4
         WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3 AND submitted = 0",
        params![key.case_id.0, key.step.raw(), key.attempt, now],
    )
    .map_err(storage_err)
}

/// Record a review decision if and only if the attempt is submitted and
/// still unreviewed.
///
/// Returns the number of rows changed: 1 for the winning decision, 0 when
/// the precondition no longer holds.
pub fn set_decision(
    conn: &Connection,
    key: AttemptKey,
    approved: bool,
    reviewer: Option<ActorId>,
    now: &str,
) -> Result<usize, FieldcaseError> {
    conn.execute(
        "UPDATE attempts SET approved = ?4, reviewed_by = ?5, reviewed_at = ?6
         WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3
           AND submitted = 1 AND approved IS NULL",
        params![
            key.case_id.0,
            key.step.raw(),
            key.attempt,
            approved,
            reviewer.map(|r| r.0),
            now
        ],
    )
    .map_err(storage_err)
}

/// Store the rejection reason on an attempt.
pub fn set_reject_reason(
    conn: &Connection,
    key: AttemptKey,
    reason: &str,
    by: ActorId,
    now: &str,
) -> Result<(), FieldcaseError> {
    conn.execute(
        "UPDATE attempts SET reject_reason = ?4, reject_reason_by = ?5, reject_reason_at = ?6
         WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3",
        params![
            key.case_id.0,
            key.step.raw(),
            key.attempt,
            reason,
            by.0,
            now,
        ],
    )
    .map_err(storage_err)?;
    Ok(())
}

/// Remember which message carries the review request for an attempt.
pub fn set_review_message(
    conn: &Connection,
    key: AttemptKey,
    message: MessageRef,
) -> Result<(), FieldcaseError> {
    conn.execute(
        "UPDATE attempts SET review_message = ?4
         WHERE case_id = ?1 AND step_no = ?2 AND attempt = ?3",
        params![key.case_id.0, key.step.raw(), key.attempt, message.0],
    )
    .map_err(storage_err)?;
    Ok(())
}

/// Every attempt of a case, ordered by step magnitude, authorization first,
/// then attempt number.
pub fn list_attempts(conn: &Connection, case_id: CaseId) -> Result<Vec<Attempt>, FieldcaseError> {
    let sql = format!(
        "SELECT {ATTEMPT_COLUMNS} FROM attempts
         WHERE case_id = ?1
         ORDER BY ABS(step_no), step_no, attempt"
    );
    let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
    let rows = stmt
        .query_map(params![case_id.0], AttemptRow::from_row)
        .map_err(storage_err)?;
    rows.map(|row| row.map_err(storage_err).and_then(AttemptRow::into_attempt))
        .collect()
}

/// Unsubmitted attempts of a case, across all steps.
pub fn list_unsubmitted(
    conn: &Connection,
    case_id: CaseId,
) -> Result<Vec<Attempt>, FieldcaseError> {
    Ok(list_attempts(conn, case_id)?
        .into_iter()
        .filter(|a| !a.submitted)
        .collect())
}
