// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Optional authorization detour taken before an evidence step.
//!
//! Authorization attempts live under the negated step number and follow the
//! same cap and submission rules as evidence attempts.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{
    Attempt, AuthorizationMode, AuthorizationText, Case, MessageRef, NewMediaItem, Phase, StepNo,
};
use fieldcase_storage::queries::cases;
use rusqlite::Connection;
use tracing::info;

use crate::attempts::{AppendedItem, StepAttemptTracker};
use crate::case::expect_phase;

/// A submitted text authorization.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedText {
    pub attempt: Attempt,
    pub text: AuthorizationText,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthorizationSubflow {
    tracker: StepAttemptTracker,
}

impl AuthorizationSubflow {
    pub fn new(tracker: StepAttemptTracker) -> Self {
        Self { tracker }
    }

    /// Answer the yes/no question asked before `step`.
    pub fn answer(
        &self,
        conn: &Connection,
        case: &mut Case,
        step: u32,
        wants_authorization: bool,
    ) -> Result<Phase, FieldcaseError> {
        expect_phase(case, Phase::AuthAsk { step })?;
        let next = if wants_authorization {
            Phase::AuthMode { step }
        } else {
            Phase::StepMedia { step }
        };
        set_phase(conn, case, next)
    }

    pub fn choose_mode(
        &self,
        conn: &Connection,
        case: &mut Case,
        step: u32,
        mode: AuthorizationMode,
        now: &str,
    ) -> Result<Phase, FieldcaseError> {
        expect_phase(case, Phase::AuthMode { step })?;
        let next = match mode {
            AuthorizationMode::Text => Phase::AuthTextWait { step },
            AuthorizationMode::Media => {
                self.tracker
                    .ensure_active(conn, case, StepNo::authorization(step), now)?;
                Phase::AuthMedia { step }
            }
        };
        set_phase(conn, case, next)
    }

    /// Store `text` as the authorization and submit it at once.
    pub fn submit_text(
        &self,
        conn: &Connection,
        case: &mut Case,
        text: &str,
        message_ref: MessageRef,
        now: &str,
    ) -> Result<SubmittedText, FieldcaseError> {
        let Phase::AuthTextWait { step } = case.phase else {
            return Err(FieldcaseError::StateConflict(format!(
                "case {} is not waiting for an authorization text",
                case.id
            )));
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(FieldcaseError::Validation(
                "the authorization text is empty".to_string(),
            ));
        }
        let key = self
            .tracker
            .ensure_active(conn, case, StepNo::authorization(step), now)?
            .key;
        let stored = self
            .tracker
            .ledger()
            .append_text(conn, key, text, message_ref, now)?;
        let attempt = self.tracker.submit(conn, key, now)?;
        set_phase(conn, case, Phase::AuthReview { step })?;
        Ok(SubmittedText {
            attempt,
            text: stored,
        })
    }

    pub fn append_media(
        &self,
        conn: &Connection,
        case: &Case,
        item: &NewMediaItem,
        now: &str,
    ) -> Result<AppendedItem, FieldcaseError> {
        let Phase::AuthMedia { step } = case.phase else {
            return Err(FieldcaseError::StateConflict(format!(
                "case {} is not collecting authorization media",
                case.id
            )));
        };
        let key = self
            .tracker
            .ensure_active(conn, case, StepNo::authorization(step), now)?
            .key;
        self.tracker.append_media(conn, key, item, now)
    }

    pub fn submit_media(
        &self,
        conn: &Connection,
        case: &mut Case,
        step: u32,
        now: &str,
    ) -> Result<Attempt, FieldcaseError> {
        expect_phase(case, Phase::AuthMedia { step })?;
        let key = self
            .tracker
            .ensure_active(conn, case, StepNo::authorization(step), now)?
            .key;
        let attempt = self.tracker.submit(conn, key, now)?;
        set_phase(conn, case, Phase::AuthReview { step })?;
        Ok(attempt)
    }
}

fn set_phase(conn: &Connection, case: &mut Case, phase: Phase) -> Result<Phase, FieldcaseError> {
    case.phase = phase;
    cases::update_case(conn, case)?;
    info!(case_id = %case.id, phase = %phase, "authorization phase changed");
    Ok(phase)
}
