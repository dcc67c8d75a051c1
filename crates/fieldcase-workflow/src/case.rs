// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case lifecycle: opening, form capture, evidence collection, advancement
//! and cancellation.

use std::sync::Arc;

use fieldcase_config::model::WorkflowConfig;
use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{
    ActorId, Attempt, Case, CaseId, CaseStatus, ChatId, FormAnswer, NewMediaItem, Phase, StepNo,
};
use fieldcase_storage::queries::{attempts, cases, pending};
use rusqlite::Connection;
use tracing::info;

use crate::attempts::{AppendedItem, StepAttemptTracker};

/// Where an approval moved the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Authorization granted; evidence for `step` is collected next.
    Authorized { step: u32 },
    /// Evidence approved; the authorization question for `step` is next.
    NextStep { step: u32 },
    /// The last step was approved and the case is closed.
    Closed,
}

/// Result of opening a case.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedCase {
    pub case: Case,
    /// An open case already existed and was reset in place.
    pub reset: bool,
}

/// Fails with a state conflict unless `case` is open and in `expected`.
pub(crate) fn expect_phase(case: &Case, expected: Phase) -> Result<(), FieldcaseError> {
    if !case.is_open() {
        return Err(FieldcaseError::StateConflict(format!(
            "case {} is {}",
            case.id, case.status
        )));
    }
    if case.phase != expected {
        return Err(FieldcaseError::StateConflict(format!(
            "case {} is in {}, not {}",
            case.id, case.phase, expected
        )));
    }
    Ok(())
}

/// The top-level case state machine.
#[derive(Debug, Clone)]
pub struct CaseManager {
    config: Arc<WorkflowConfig>,
    tracker: StepAttemptTracker,
}

impl CaseManager {
    pub fn new(config: Arc<WorkflowConfig>) -> Self {
        let tracker = StepAttemptTracker::new(config.max_media_per_attempt);
        Self { config, tracker }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    pub fn tracker(&self) -> StepAttemptTracker {
        self.tracker
    }

    /// Create a case for (chat, technician), or reset the open one in place.
    ///
    /// A reset keeps the case id and its attempt history, so attempt numbers
    /// keep increasing. Items still collecting in unsubmitted attempts are
    /// purged and pending reason captures for the case are dropped.
    pub fn open_or_reset(
        &self,
        conn: &Connection,
        chat_id: ChatId,
        technician_id: ActorId,
        username: Option<&str>,
        now: &str,
    ) -> Result<OpenedCase, FieldcaseError> {
        let Some(mut case) = cases::find_open_case(conn, chat_id, technician_id)? else {
            let case = cases::insert_case(
                conn,
                chat_id,
                technician_id,
                username,
                Phase::WaitTechnician,
                now,
            )?;
            info!(
                case_id = %case.id,
                chat_id = %chat_id,
                technician_id = %technician_id,
                "case opened"
            );
            return Ok(OpenedCase { case, reset: false });
        };

        let ledger = self.tracker.ledger();
        for attempt in attempts::list_unsubmitted(conn, case.id)? {
            ledger.delete_all(conn, attempt.key)?;
        }
        pending::delete_pending_for_case(conn, case.id)?;

        case.username = username.map(str::to_string);
        case.phase = Phase::WaitTechnician;
        case.technician_name = None;
        case.service_type = None;
        case.subscriber_code = None;
        case.location = None;
        case.location_at = None;
        case.created_at = now.to_string();
        case.finished_at = None;
        cases::update_case(conn, &case)?;
        info!(case_id = %case.id, "case reset in place");
        Ok(OpenedCase { case, reset: true })
    }

    /// Record one form field and advance to the next one.
    pub fn record_form_answer(
        &self,
        conn: &Connection,
        case: &mut Case,
        answer: FormAnswer,
        now: &str,
    ) -> Result<Phase, FieldcaseError> {
        expect_phase(case, answer.field().expected_phase())?;
        let next = match answer {
            FormAnswer::Technician(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(FieldcaseError::Validation(
                        "technician name is empty".to_string(),
                    ));
                }
                let roster = &self.config.technicians;
                if !roster.is_empty() && !roster.iter().any(|t| t == name) {
                    return Err(FieldcaseError::Validation(format!(
                        "`{name}` is not on the technician roster"
                    )));
                }
                case.technician_name = Some(name.to_string());
                Phase::WaitService
            }
            FormAnswer::Service(service) => {
                let service = service.trim();
                if !self.config.service_types.iter().any(|s| s == service) {
                    return Err(FieldcaseError::Validation(format!(
                        "`{service}` is not a known service type"
                    )));
                }
                case.service_type = Some(service.to_string());
                Phase::WaitSubscriberCode
            }
            FormAnswer::SubscriberCode(code) => {
                let code = code.trim();
                if code.is_empty() {
                    return Err(FieldcaseError::Validation(
                        "subscriber code is empty".to_string(),
                    ));
                }
                case.subscriber_code = Some(code.to_string());
                Phase::WaitLocation
            }
            FormAnswer::Location(point) => {
                let valid = (-90.0..=90.0).contains(&point.latitude)
                    && (-180.0..=180.0).contains(&point.longitude);
                if !valid {
                    return Err(FieldcaseError::Validation(format!(
                        "location {}, {} is out of range",
                        point.latitude, point.longitude
                    )));
                }
                case.location = Some(point);
                case.location_at = Some(now.to_string());
                Phase::AuthAsk {
                    step: self.config.first_evidence_step,
                }
            }
        };
        case.phase = next;
        cases::update_case(conn, case)?;
        info!(case_id = %case.id, phase = %next, "form answer recorded");
        Ok(next)
    }

    /// Append an evidence item to the active attempt of the current step.
    pub fn collect_evidence(
        &self,
        conn: &Connection,
        case: &Case,
        item: &NewMediaItem,
        now: &str,
    ) -> Result<AppendedItem, FieldcaseError> {
        let Phase::StepMedia { step } = case.phase else {
            return Err(FieldcaseError::StateConflict(format!(
                "case {} is not collecting evidence",
                case.id
            )));
        };
        let key = self
            .tracker
            .ensure_active(conn, case, StepNo::evidence(step), now)?
            .key;
        self.tracker.append_media(conn, key, item, now)
    }

    /// Submit the evidence attempt of `step` for review.
    pub fn submit_evidence(
        &self,
        conn: &Connection,
        case: &mut Case,
        step: u32,
        now: &str,
    ) -> Result<Attempt, FieldcaseError> {
        expect_phase(case, Phase::StepMedia { step })?;
        let key = self
            .tracker
            .ensure_active(conn, case, StepNo::evidence(step), now)?
            .key;
        let attempt = self.tracker.submit(conn, key, now)?;
        case.phase = Phase::StepReview { step };
        cases::update_case(conn, case)?;
        Ok(attempt)
    }

    /// Move the case past an approved attempt of `step`.
    pub fn advance_after_approval(
        &self,
        conn: &Connection,
        case: &mut Case,
        step: StepNo,
        now: &str,
    ) -> Result<Advance, FieldcaseError> {
        let number = step.step();
        let advance = if step.is_authorization() {
            case.phase = Phase::StepMedia { step: number };
            Advance::Authorized { step: number }
        } else if number >= self.config.last_evidence_step {
            case.status = CaseStatus::Closed;
            case.phase = Phase::Closed;
            case.finished_at = Some(now.to_string());
            pending::delete_pending_for_case(conn, case.id)?;
            Advance::Closed
        } else {
            case.phase = Phase::AuthAsk { step: number + 1 };
            Advance::NextStep { step: number + 1 }
        };
        cases::update_case(conn, case)?;
        info!(case_id = %case.id, step = step.raw(), phase = %case.phase, "case advanced");
        Ok(advance)
    }

    pub fn cancel(
        &self,
        conn: &Connection,
        case: &mut Case,
        now: &str,
    ) -> Result<(), FieldcaseError> {
        if !case.is_open() {
            return Err(FieldcaseError::StateConflict(format!(
                "case {} is already {}",
                case.id, case.status
            )));
        }
        case.status = CaseStatus::Cancelled;
        case.phase = Phase::Cancelled;
        case.finished_at = Some(now.to_string());
        cases::update_case(conn, case)?;
        pending::delete_pending_for_case(conn, case.id)?;
        info!(case_id = %case.id, "case cancelled");
        Ok(())
    }

    pub fn load(&self, conn: &Connection, id: CaseId) -> Result<Case, FieldcaseError> {
        cases::get_case(conn, id)?.ok_or_else(|| FieldcaseError::NotFound(format!("case {id}")))
    }

    /// The open case of `technician_id` in `chat_id`.
    pub fn load_open(
        &self,
        conn: &Connection,
        chat_id: ChatId,
        technician_id: ActorId,
    ) -> Result<Case, FieldcaseError> {
        cases::find_open_case(conn, chat_id, technician_id)?
            .ok_or_else(|| FieldcaseError::NotFound("no open case, send /open first".to_string()))
    }
}
