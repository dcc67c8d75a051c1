// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attempt numbering, per-attempt caps and submission.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{Attempt, AttemptKey, Case, MediaItem, NewMediaItem, StepNo};
use fieldcase_storage::queries::attempts;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::ledger::MediaLedger;

/// Result of appending one item.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendedItem {
    pub attempt: Attempt,
    pub item: MediaItem,
    /// Items in the attempt after the append.
    pub count: usize,
    pub cap: usize,
}

impl AppendedItem {
    pub fn is_full(&self) -> bool {
        self.count >= self.cap
    }
}

/// Manages attempts for (case, step) pairs on top of the [`MediaLedger`].
#[derive(Debug, Clone, Copy)]
pub struct StepAttemptTracker {
    ledger: MediaLedger,
    max_items: usize,
}

impl StepAttemptTracker {
    pub fn new(max_items: usize) -> Self {
        Self {
            ledger: MediaLedger,
            max_items,
        }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn ledger(&self) -> MediaLedger {
        self.ledger
    }

    /// The unsubmitted attempt for (case, step), created one past the
    /// current maximum when none exists.
    pub fn ensure_active(
        &self,
        conn: &Connection,
        case: &Case,
        step: StepNo,
        now: &str,
    ) -> Result<Attempt, FieldcaseError> {
        if !case.is_open() {
            return Err(FieldcaseError::StateConflict(format!(
                "case {} is {}",
                case.id, case.status
            )));
        }
        if let Some(active) = attempts::find_unsubmitted(conn, case.id, step)? {
            return Ok(active);
        }
        let next = attempts::max_attempt_number(conn, case.id, step)? + 1;
        let attempt = attempts::insert_attempt(conn, AttemptKey::new(case.id, step, next), now)?;
        debug!(case_id = %case.id, step = step.raw(), attempt = next, "attempt created");
        Ok(attempt)
    }

    /// Append an item to an unsubmitted attempt below the cap.
    pub fn append_media(
        &self,
        conn: &Connection,
        key: AttemptKey,
        item: &NewMediaItem,
        now: &str,
    ) -> Result<AppendedItem, FieldcaseError> {
        let attempt = self.load(conn, key)?;
        if attempt.submitted {
            return Err(FieldcaseError::Validation(format!(
                "{key} was already submitted"
            )));
        }
        let current = self.ledger.count(conn, key)?;
        if current >= self.max_items {
            return Err(FieldcaseError::Validation(format!(
                "{key} already holds the maximum of {} items",
                self.max_items
            )));
        }
        let item = self.ledger.append(conn, key, item, now)?;
        Ok(AppendedItem {
            attempt,
            item,
            count: current + 1,
            cap: self.max_items,
        })
    }

    /// Mark an attempt as submitted.
    ///
    /// Fails with a state conflict if it already is, and with a validation
    /// error if it holds no items.
    pub fn submit(
        &self,
        conn: &Connection,
        key: AttemptKey,
        now: &str,
    ) -> Result<Attempt, FieldcaseError> {
        let attempt = self.load(conn, key)?;
        if attempt.submitted {
            return Err(FieldcaseError::StateConflict(format!(
                "{key} was already submitted"
            )));
        }
        if self.ledger.count(conn, key)? == 0 {
            return Err(FieldcaseError::Validation(format!(
                "{key} has no items to submit"
            )));
        }
        if attempts::mark_submitted(conn, key, now)? == 0 {
            return Err(FieldcaseError::StateConflict(format!(
                "{key} was already submitted"
            )));
        }
        info!(
            case_id = %key.case_id,
            step = key.step.raw(),
            attempt = key.attempt,
            "attempt submitted"
        );
        self.load(conn, key)
    }

    fn load(&self, conn: &Connection, key: AttemptKey) -> Result<Attempt, FieldcaseError> {
        attempts::get_attempt(conn, key)?
            .ok_or_else(|| FieldcaseError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{conn_with_case, photo};
    use fieldcase_core::types::{CaseStatus, ReviewState, now_utc};
    use fieldcase_storage::queries::cases;

    #[test]
    fn ensure_active_reuses_then_numbers_upwards() {
        let (conn, case) = conn_with_case();
        let tracker = StepAttemptTracker::new(8);
        let now = now_utc();
        let step = StepNo::evidence(5);

        let first = tracker.ensure_active(&conn, &case, step, &now).unwrap();
        assert_eq!(first.key.attempt, 1);
        let again = tracker.ensure_active(&conn, &case, step, &now).unwrap();
        assert_eq!(again.key, first.key);

        tracker
            .append_media(&conn, first.key, &photo(1), &now)
            .unwrap();
        tracker.submit(&conn, first.key, &now).unwrap();

        let second = tracker.ensure_active(&conn, &case, step, &now).unwrap();
        assert_eq!(second.key.attempt, 2);
        assert_eq!(second.review_state(), ReviewState::Collecting);
    }

    #[test]
    fn cap_is_enforced_and_count_unchanged() {
        let (conn, case) = conn_with_case();
        let tracker = StepAttemptTracker::new(8);
        let now = now_utc();
        let key = tracker
            .ensure_active(&conn, &case, StepNo::evidence(5), &now)
            .unwrap()
            .key;
        for n in 0..8 {
            let appended = tracker.append_media(&conn, key, &photo(n), &now).unwrap();
            assert_eq!(appended.count, n as usize + 1);
        }
        let err = tracker
            .append_media(&conn, key, &photo(99), &now)
            .unwrap_err();
        assert!(matches!(err, FieldcaseError::Validation(_)));
        assert_eq!(tracker.ledger().count(&conn, key).unwrap(), 8);
    }

    #[test]
    fn smaller_cap_marks_full_earlier() {
        let (conn, case) = conn_with_case();
        let tracker = StepAttemptTracker::new(4);
        let now = now_utc();
        let key = tracker
            .ensure_active(&conn, &case, StepNo::authorization(7), &now)
            .unwrap()
            .key;
        let mut last = None;
        for n in 0..4 {
            last = Some(tracker.append_media(&conn, key, &photo(n), &now).unwrap());
        }
        assert!(last.unwrap().is_full());
    }

    #[test]
    fn submit_requires_items_and_happens_once() {
        let (conn, case) = conn_with_case();
        let tracker = StepAttemptTracker::new(8);
        let now = now_utc();
        let key = tracker
            .ensure_active(&conn, &case, StepNo::evidence(5), &now)
            .unwrap()
            .key;

        let err = tracker.submit(&conn, key, &now).unwrap_err();
        assert!(matches!(err, FieldcaseError::Validation(_)));

        tracker.append_media(&conn, key, &photo(1), &now).unwrap();
        let submitted = tracker.submit(&conn, key, &now).unwrap();
        assert!(submitted.submitted);
        assert!(submitted.submitted_at.is_some());
        assert_eq!(submitted.approved, None);

        let err = tracker.submit(&conn, key, &now).unwrap_err();
        assert!(matches!(err, FieldcaseError::StateConflict(_)));

        let err = tracker
            .append_media(&conn, key, &photo(2), &now)
            .unwrap_err();
        assert!(matches!(err, FieldcaseError::Validation(_)));
    }

    #[test]
    fn closed_case_gets_no_new_attempts() {
        let (conn, mut case) = conn_with_case();
        case.status = CaseStatus::Closed;
        cases::update_case(&conn, &case).unwrap();
        let err = StepAttemptTracker::new(8)
            .ensure_active(&conn, &case, StepNo::evidence(5), &now_utc())
            .unwrap_err();
        assert!(matches!(err, FieldcaseError::StateConflict(_)));
    }
}
