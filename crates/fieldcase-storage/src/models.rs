// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row shapes and their conversion into domain types.
//!
//! The canonical types live in `fieldcase-core::types`. Rows are decoded
//! into plain structs first so that rusqlite mapping stays infallible in
//! shape, then converted; an unrepresentable row is an internal error.

use std::str::FromStr;

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{
    ActorId, Attempt, AttemptKey, Case, CaseId, CaseStatus, ChatId, GeoPoint, MessageRef, Phase,
    StepNo,
};
use rusqlite::Row;

pub use fieldcase_core::types::{AuthorizationText, MediaItem, PendingInput};

pub(crate) const CASE_COLUMNS: &str = "id, chat_id, technician_id, username, status, phase, \
     phase_step, technician_name, service_type, subscriber_code, latitude, longitude, \
     location_at, created_at, finished_at";

pub(crate) const ATTEMPT_COLUMNS: &str = "case_id, step_no, attempt, submitted, submitted_at, \
     approved, reviewed_by, reviewed_at, reject_reason, reject_reason_by, reject_reason_at, \
     review_message, created_at";

/// Raw `cases` row.
#[derive(Debug)]
pub(crate) struct CaseRow {
    id: i64,
    chat_id: i64,
    technician_id: i64,
    username: Option<String>,
    status: String,
    phase: String,
    phase_step: Option<u32>,
    technician_name: Option<String>,
    service_type: Option<String>,
    subscriber_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    location_at: Option<String>,
    created_at: String,
    finished_at: Option<String>,
}

impl CaseRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            chat_id: row.get(1)?,
            technician_id: row.get(2)?,
            username: row.get(3)?,
            status: row.get(4)?,
            phase: row.get(5)?,
            phase_step: row.get(6)?,
            technician_name: row.get(7)?,
            service_type: row.get(8)?,
            subscriber_code: row.get(9)?,
            latitude: row.get(10)?,
            longitude: row.get(11)?,
            location_at: row.get(12)?,
            created_at: row.get(13)?,
            finished_at: row.get(14)?,
        })
    }

    pub(crate) fn into_case(self) -> Result<Case, FieldcaseError> {
        let status = CaseStatus::from_str(&self.status).map_err(|_| {
            FieldcaseError::Internal(format!(
                "case {} has unknown status `{}`",
                self.id, self.status
            ))
        })?;
        let phase = Phase::from_parts(&self.phase, self.phase_step).ok_or_else(|| {
            FieldcaseError::Internal(format!(
                "case {} has invalid phase `{}` / {:?}",
                self.id, self.phase, self.phase_step
            ))
        })?;
        let location = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Ok(Case {
            id: CaseId(self.id),
            chat_id: ChatId(self.chat_id),
            technician_id: ActorId(self.technician_id),
            username: self.username,
            status,
            phase,
            technician_name: self.technician_name,
            service_type: self.service_type,
            subscriber_code: self.subscriber_code,
            location,
            location_at: self.location_at,
            created_at: self.created_at,
            finished_at: self.finished_at,
        })
    }
}

/// Raw `attempts` row.
#[derive(Debug)]
pub(crate) struct AttemptRow {
    case_id: i64,
    step_no: i64,
    attempt: u32,
    submitted: bool,
    submitted_at: Option<String>,
    approved: Option<bool>,
    reviewed_by: Option<i64>,
    reviewed_at: Option<String>,
    reject_reason: Option<String>,
    reject_reason_by: Option<i64>,
    reject_reason_at: Option<String>,
    review_message: Option<i64>,
    created_at: String,
}

impl AttemptRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            case_id: row.get(0)?,
            step_no: row.get(1)?,
            attempt: row.get(2)?,
            submitted: row.get(3)?,
            submitted_at: row.get(4)?,
            approved: row.get(5)?,
            reviewed_by: row.get(6)?,
            reviewed_at: row.get(7)?,
            reject_reason: row.get(8)?,
            reject_reason_by: row.get(9)?,
            reject_reason_at: row.get(10)?,
            review_message: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    pub(crate) fn into_attempt(self) -> Result<Attempt, FieldcaseError> {
        let step = step_from_raw(self.step_no)?;
        Ok(Attempt {
            key: AttemptKey::new(CaseId(self.case_id), step, self.attempt),
            submitted: self.submitted,
            submitted_at: self.submitted_at,
            approved: self.approved,
            reviewed_by: self.reviewed_by.map(ActorId),
            reviewed_at: self.reviewed_at,
            reject_reason: self.reject_reason,
            reject_reason_by: self.reject_reason_by.map(ActorId),
            reject_reason_at: self.reject_reason_at,
            review_message: self.review_message.map(MessageRef),
            created_at: self.created_at,
        })
    }
}

pub(crate) fn step_from_raw(raw: i64) -> Result<StepNo, FieldcaseError> {
    StepNo::from_raw(raw)
        .ok_or_else(|| FieldcaseError::Internal(format!("invalid stored step number {raw}")))
}
