// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exactly-once review decisions on submitted attempts.
//!
//! The decision itself is a single conditional update that only succeeds
//! while the attempt is submitted and undecided. Whoever changes the row
//! wins; every other caller gets a state conflict.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{
    ActorId, Attempt, AttemptKey, Case, ChatId, PendingInput, PendingInputKind, Phase,
};
use fieldcase_storage::queries::{attempts, cases};
use rusqlite::Connection;
use tracing::info;

use crate::case::{Advance, CaseManager};
use crate::ledger::RemovedEvidence;
use crate::pending::PendingInputRegistry;

#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub attempt: Attempt,
    pub case: Case,
    pub advance: Advance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub attempt: Attempt,
    pub case: Case,
    pub removed: RemovedEvidence,
    /// Fresh attempt the technician retries under.
    pub retry: Attempt,
}

/// What happened to a captured rejection reason.
#[derive(Debug)]
pub enum ReasonCapture {
    /// The reason was recorded and the rejection finalized.
    Rejected {
        rejection: Rejection,
        request: PendingInput,
    },
    /// The text was empty; the same request was armed again.
    Rearmed(PendingInput),
    /// The request was consumed but its attempt can no longer be rejected.
    Stale(FieldcaseError),
}

#[derive(Debug, Clone)]
pub struct ReviewGate {
    cases: CaseManager,
    pending: PendingInputRegistry,
}

impl ReviewGate {
    pub fn new(cases: CaseManager) -> Self {
        Self {
            cases,
            pending: PendingInputRegistry,
        }
    }

    /// Load the attempt and its case, failing unless the attempt awaits a
    /// decision and is the one the case is currently waiting on.
    pub fn check_reviewable(
        &self,
        conn: &Connection,
        key: AttemptKey,
    ) -> Result<(Attempt, Case), FieldcaseError> {
        let attempt = attempts::get_attempt(conn, key)?
            .ok_or_else(|| FieldcaseError::NotFound(key.to_string()))?;
        if !attempt.submitted {
            return Err(FieldcaseError::StateConflict(format!(
                "{key} is not yet submitted"
            )));
        }
        if attempt.approved.is_some() {
            return Err(FieldcaseError::StateConflict(format!(
                "{key} was already reviewed"
            )));
        }
        let case = self.cases.load(conn, key.case_id)?;
        if !case.is_open() {
            return Err(FieldcaseError::StateConflict(format!(
                "case {} is {}",
                case.id, case.status
            )));
        }
        let step = key.step.step();
        let awaiting = if key.step.is_authorization() {
            Phase::AuthReview { step }
        } else {
            Phase::StepReview { step }
        };
        let latest = attempts::latest_attempt(conn, key.case_id, key.step)?;
        if case.phase != awaiting || latest.map(|a| a.key) != Some(key) {
            return Err(FieldcaseError::NotFound(format!(
                "{key} is no longer current"
            )));
        }
        Ok((attempt, case))
    }

    /// Approve `key`. `reviewer` is unset for automatic approvals.
    pub fn approve(
        &self,
        conn: &Connection,
        key: AttemptKey,
        reviewer: Option<ActorId>,
        now: &str,
    ) -> Result<Approval, FieldcaseError> {
        let (_, mut case) = self.check_reviewable(conn, key)?;
        decide(conn, key, true, reviewer, now)?;
        self.pending.clear_attempt(conn, key)?;
        let advance = self
            .cases
            .advance_after_approval(conn, &mut case, key.step, now)?;
        info!(
            case_id = %key.case_id,
            step = key.step.raw(),
            attempt = key.attempt,
            reviewer = ?reviewer,
            "attempt approved"
        );
        Ok(Approval {
            attempt: reload(conn, key)?,
            case,
            advance,
        })
    }

    /// Reject `key`, remove its items and open a fresh attempt.
    ///
    /// Authorization attempts need a non-empty `reason`.
    pub fn reject(
        &self,
        conn: &Connection,
        key: AttemptKey,
        reviewer: ActorId,
        reason: Option<&str>,
        now: &str,
    ) -> Result<Rejection, FieldcaseError> {
        let (_, mut case) = self.check_reviewable(conn, key)?;
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        if key.step.is_authorization() && reason.is_none() {
            return Err(FieldcaseError::Validation(
                "rejecting an authorization needs a reason".to_string(),
            ));
        }

        decide(conn, key, false, Some(reviewer), now)?;
        self.pending.clear_attempt(conn, key)?;
        if let Some(reason) = reason {
            attempts::set_reject_reason(conn, key, reason, reviewer, now)?;
        }
        let tracker = self.cases.tracker();
        let removed = tracker.ledger().delete_all(conn, key)?;
        let retry = tracker.ensure_active(conn, &case, key.step, now)?;

        let step = key.step.step();
        case.phase = if key.step.is_authorization() {
            Phase::AuthAsk { step }
        } else {
            Phase::StepMedia { step }
        };
        cases::update_case(conn, &case)?;
        info!(
            case_id = %key.case_id,
            step = key.step.raw(),
            attempt = key.attempt,
            removed = removed.len(),
            retry = retry.key.attempt,
            "attempt rejected"
        );
        Ok(Rejection {
            attempt: reload(conn, key)?,
            case,
            removed,
            retry,
        })
    }

    /// First half of an authorization rejection: arm a reason capture for
    /// the reviewer. Nothing is decided yet.
    pub fn begin_authorization_rejection(
        &self,
        conn: &Connection,
        chat_id: ChatId,
        key: AttemptKey,
        reviewer: ActorId,
        now: &str,
    ) -> Result<PendingInput, FieldcaseError> {
        if !key.step.is_authorization() {
            return Err(FieldcaseError::Validation(format!(
                "{key} is not an authorization"
            )));
        }
        let (attempt, case) = self.check_reviewable(conn, key)?;
        let request = PendingInput {
            chat_id,
            actor_id: reviewer,
            kind: PendingInputKind::AuthRejectReason,
            target: key,
            reply_to: attempt.review_message,
            subject_technician: Some(case.technician_id),
            created_at: now.to_string(),
        };
        self.pending.set(conn, &request)?;
        Ok(request)
    }

    /// Second half: consume the reviewer's free text as the reason.
    ///
    /// Returns `None` when the actor has no capture armed. Empty text re-arms
    /// the request unchanged. A domain failure of the rejection is returned
    /// as [`ReasonCapture::Stale`] so the consumed request still commits.
    pub fn capture_reason(
        &self,
        conn: &Connection,
        chat_id: ChatId,
        actor_id: ActorId,
        text: &str,
        now: &str,
    ) -> Result<Option<ReasonCapture>, FieldcaseError> {
        let Some(request) =
            self.pending
                .pop(conn, chat_id, actor_id, PendingInputKind::AuthRejectReason)?
        else {
            return Ok(None);
        };
        if text.trim().is_empty() {
            self.pending.set(conn, &request)?;
            return Ok(Some(ReasonCapture::Rearmed(request)));
        }
        match self.reject(conn, request.target, actor_id, Some(text), now) {
            Ok(rejection) => Ok(Some(ReasonCapture::Rejected { rejection, request })),
            Err(e) if e.is_domain() => Ok(Some(ReasonCapture::Stale(e))),
            Err(e) => Err(e),
        }
    }
}

fn decide(
    conn: &Connection,
    key: AttemptKey,
    approved: bool,
    reviewer: Option<ActorId>,
    now: &str,
) -> Result<(), FieldcaseError> {
    if attempts::set_decision(conn, key, approved, reviewer, now)? == 0 {
        return Err(FieldcaseError::StateConflict(format!(
            "{key} was already reviewed"
        )));
    }
    Ok(())
}

fn reload(conn: &Connection, key: AttemptKey) -> Result<Attempt, FieldcaseError> {
    attempts::get_attempt(conn, key)?.ok_or_else(|| FieldcaseError::NotFound(key.to_string()))
}
