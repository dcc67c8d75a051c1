// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case rows.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{ActorId, Case, CaseId, CaseStatus, ChatId, Phase};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::storage_err;
use crate::models::{CASE_COLUMNS, CaseRow};

/// Insert a new OPEN case in `phase` and return it.
pub fn insert_case(
    conn: &Connection,
    chat_id: ChatId,
    technician_id: ActorId,
    username: Option<&str>,
    phase: Phase,
    now: &str,
) -> Result<Case, FieldcaseError> {
    conn.execute(
        "INSERT INTO cases (chat_id, technician_id, username, status, phase, phase_step, created_at)
         VALUES (?1, ?2, ?3, 'OPEN', ?4, ?5, ?6)",
        params![
            chat_id.0,
            technician_id.0,
            username,
            phase.name(),
            phase.step(),
            now,
        ],
    )
    .map_err(|e| super::constraint_err(e, "an open case already exists for this technician"))?;
    let id = CaseId(conn.last_insert_rowid());
    get_case(conn, id)?
        .ok_or_else(|| FieldcaseError::Internal(format!("case {id} vanished after insert")))
}

/// Point-get by id.
pub fn get_case(conn: &Connection, id: CaseId) -> Result<Option<Case>, FieldcaseError> {
    let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = ?1");
    conn.query_row(&sql, params![id.0], CaseRow::from_row)
        .optional()
        .map_err(storage_err)?
        .map(CaseRow::into_case)
        .transpose()
}

/// The OPEN case of `technician_id` in `chat_id`, if any.
pub fn find_open_case(
    conn: &Connection,
    chat_id: ChatId,
    technician_id: ActorId,
) -> Result<Option<Case>, FieldcaseError> {
    let sql = format!(
        "SELECT {CASE_COLUMNS} FROM cases
         WHERE chat_id = ?1 AND technician_id = ?2 AND status = 'OPEN'"
    );
    conn.query_row(&sql, params![chat_id.0, technician_id.0], CaseRow::from_row)
        .optional()
        .map_err(storage_err)?
        .map(CaseRow::into_case)
        .transpose()
}

/// Write every mutable column of `case` back to its row.
pub fn update_case(conn: &Connection, case: &Case) -> Result<(), FieldcaseError> {
    let (latitude, longitude) = match case.location {
        Some(point) => (Some(point.latitude), Some(point.longitude)),
        None => (None, None),
    };
    let changed = conn
        .execute(
            "UPDATE cases SET
                username = ?2, status = ?3, phase = ?4, phase_step = ?5,
                technician_name = ?6, service_type = ?7, subscriber_code = ?8,
                latitude = ?9, longitude = ?10, location_at = ?11,
                created_at = ?12, finished_at = ?13
             WHERE id = ?1",
            params![
                case.id.0,
                case.username,
                case.status.to_string(),
                case.phase.name(),
                case.phase.step(),
                case.technician_name,
                case.service_type,
                case.subscriber_code,
                latitude,
                longitude,
                case.location_at,
                case.created_at,
                case.finished_at,
            ],
        )
        .map_err(|e| super::constraint_err(e, "an open case already exists for this technician"))?;
    if changed == 0 {
        return Err(FieldcaseError::NotFound(format!("case {}", case.id)));
    }
    Ok(())
}

/// Cases ordered newest first, optionally filtered by status.
pub fn list_cases(
    conn: &Connection,
    status: Option<CaseStatus>,
    limit: usize,
) -> Result<Vec<Case>, FieldcaseError> {
    let sql = format!(
        "SELECT {CASE_COLUMNS} FROM cases
         WHERE (?1 IS NULL OR status = ?1)
         ORDER BY id DESC LIMIT ?2"
    );
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
    let rows = stmt
        .query_map(
            params![status.map(|s| s.to_string()), limit],
            CaseRow::from_row,
        )
        .map_err(storage_err)?;
    rows.map(|row| row.map_err(storage_err).and_then(CaseRow::into_case))
        .collect()
}

/// Number of cases per status, for reporting.
pub fn count_by_status(conn: &Connection) -> Result<Vec<(String, i64)>, FieldcaseError> {
    let mut stmt = conn
        .prepare("SELECT status, COUNT(*) FROM cases GROUP BY status ORDER BY status")
        .map_err(storage_err)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_conn;
    use fieldcase_core::types::{GeoPoint, now_utc};

    /// Open a case for technician 2 in `chat`.
    fn open_in(conn: &Connection, chat: i64) -> Result<Case, FieldcaseError> {
        let phase = Phase::WaitTechnician;
        insert_case(conn, ChatId(chat), ActorId(2), None, phase, &now_utc())
    }

    #[test]
    fn insert_and_find_open_case() {
        let conn = test_conn();
        let chat = ChatId(-100);
        let case = insert_case(
            &conn,
            chat,
            ActorId(42),
            Some("ana"),
            Phase::WaitTechnician,
            &now_utc(),
        )
        .unwrap();
        assert_eq!(case.status, CaseStatus::Open);
        assert_eq!(case.phase, Phase::WaitTechnician);

        let found = find_open_case(&conn, chat, ActorId(42)).unwrap().unwrap();
        assert_eq!(found.id, case.id);
        assert!(find_open_case(&conn, chat, ActorId(43)).unwrap().is_none());
    }

    #[test]
    fn second_open_case_for_same_technician_conflicts() {
        let conn = test_conn();
        open_in(&conn, 1).unwrap();
        let err = open_in(&conn, 1).unwrap_err();
        assert!(matches!(err, FieldcaseError::StateConflict(_)));
        // Another chat is a different identity.
        open_in(&conn, 9).unwrap();
    }

    #[test]
    fn update_round_trips_phase_and_location() {
        let conn = test_conn();
        let mut case = open_in(&conn, 1).unwrap();
        case.phase = Phase::AuthAsk { step: 7 };
        case.technician_name = Some("ANA ROJAS".into());
        case.location = Some(GeoPoint {
            latitude: -12.05,
            longitude: -77.04,
        });
        update_case(&conn, &case).unwrap();

        let stored = get_case(&conn, case.id).unwrap().unwrap();
        assert_eq!(stored, case);
    }

    #[test]
    fn closed_case_frees_the_open_slot() {
        let conn = test_conn();
        let mut case = open_in(&conn, 1).unwrap();
        case.status = CaseStatus::Closed;
        case.phase = Phase::Closed;
        update_case(&conn, &case).unwrap();

        open_in(&conn, 1).unwrap();
        let counts = count_by_status(&conn).unwrap();
        assert_eq!(
            counts,
            vec![("CLOSED".to_string(), 1), ("OPEN".to_string(), 1)]
        );
        let open = list_cases(&conn, Some(CaseStatus::Open), 10).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(list_cases(&conn, None, 10).unwrap().len(), 2);
    }

    #[test]
    fn updating_missing_case_is_not_found() {
        let conn = test_conn();
        let mut case = open_in(&conn, 1).unwrap();
        case.id = CaseId(999);
        assert!(matches!(
            update_case(&conn, &case),
            Err(FieldcaseError::NotFound(_))
        ));
    }
}
