// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text renderings shared by the service and console transports.

use std::fmt;

use fieldcase_core::types::{ActorId, AttemptKey, Case, ReviewDecision};

/// Transports cap media captions at this many characters.
pub const CAPTION_LIMIT: usize = 1024;

/// Parse an on/off switch value.
pub fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "1" | "true" | "yes" => Some(true),
        "off" | "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn label(key: AttemptKey) -> &'static str {
    if key.step.is_authorization() {
        "AUTHORIZATION"
    } else {
        "EVIDENCE"
    }
}

/// Caption attached to the copy of an evidence item.
pub fn evidence_caption(case: &Case, key: AttemptKey, step_title: &str) -> String {
    let caption = format!(
        "{} ({step_title}) attempt {}\nTechnician: {}\nService: {}\nSubscriber: {}",
        label(key),
        key.attempt,
        or_dash(case.technician_name.as_deref()),
        or_dash(case.service_type.as_deref()),
        or_dash(case.subscriber_code.as_deref()),
    );
    caption.chars().take(CAPTION_LIMIT).collect()
}

/// Title shown to reviewers for an attempt.
pub fn review_title(key: AttemptKey, step_title: &str) -> String {
    if key.step.is_authorization() {
        format!("AUTHORIZATION before {step_title}")
    } else {
        step_title.to_string()
    }
}

/// Replacement text for a review request once it is decided.
pub fn decision_text(
    key: AttemptKey,
    decision: ReviewDecision,
    reviewer: Option<ActorId>,
    closed: bool,
) -> String {
    let by = match reviewer {
        Some(reviewer) => format!("by {reviewer}"),
        None => "automatically".to_string(),
    };
    match (decision, closed) {
        (ReviewDecision::Approve, true) => {
            format!("Approved {by}: {key}. Case completed and closed.")
        }
        (ReviewDecision::Approve, false) => format!("Approved {by}: {key}. Continuing."),
        (ReviewDecision::Reject, _) => format!("Rejected {by}: {key}."),
    }
}

/// Mention of the case technician.
pub fn mention(case: &Case) -> String {
    match &case.username {
        Some(username) => format!("@{username}"),
        None => format!("technician {}", case.technician_id),
    }
}

/// Notice sent to the chat after a rejection.
///
/// `removed` is `None` when nothing had to be removed from the chat, and
/// otherwise whether every removal succeeded.
pub fn rejection_notice(
    case: &Case,
    key: AttemptKey,
    reason: Option<&str>,
    removed: Option<bool>,
) -> String {
    let (step, who) = (key.step.step(), mention(case));
    let mut notice = if key.step.is_authorization() {
        format!("Authorization for step {step} rejected ({who}).")
    } else {
        format!("Step {step} rejected ({who}).")
    };
    match removed {
        Some(true) => notice.push_str("\nEvidence removed from the chat."),
        Some(false) => {
            notice.push_str("\nCould not remove the evidence, check the bot permissions.")
        }
        None => {}
    }
    if let Some(reason) = reason {
        notice.push_str(&format!("\nReason: {reason}"));
    }
    if key.step.is_authorization() {
        notice.push_str("\nRequest the authorization again or continue without it.");
    } else {
        notice.push_str("\nSend this step again.");
    }
    notice
}

fn time_of(timestamp: &str) -> &str {
    timestamp.get(11..19).unwrap_or(timestamp)
}

/// Summary posted when a case closes.
pub fn close_summary(case: &Case) -> String {
    let finished = case.finished_at.as_deref().unwrap_or("-");
    format!(
        "CASE SUMMARY (CLOSED)\nDate: {}\nStarted: {}\nFinished: {}\nTechnician: {}\nService: {}\nSubscriber: {}\nOrigin chat: {}",
        case.created_at.get(..10).unwrap_or(&case.created_at),
        time_of(&case.created_at),
        time_of(finished),
        or_dash(case.technician_name.as_deref()),
        or_dash(case.service_type.as_deref()),
        or_dash(case.subscriber_code.as_deref()),
        case.chat_id,
    )
}

/// Answer to `/status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub approval_required: bool,
    pub case: Option<Case>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let approval = if self.approval_required { "ON" } else { "OFF" };
        let Some(case) = &self.case else {
            return write!(f, "No open case. Send /open.\nApproval: {approval}");
        };
        let pending = "(pending)";
        writeln!(f, "Case {} ({})", case.id, case.status)?;
        writeln!(f, "Approval: {approval}")?;
        match case.current_step() {
            Some(step) => writeln!(f, "Step: {step}")?,
            None => writeln!(f, "Step: -")?,
        }
        writeln!(f, "Phase: {}", case.phase)?;
        writeln!(
            f,
            "Technician: {}",
            case.technician_name.as_deref().unwrap_or(pending)
        )?;
        writeln!(
            f,
            "Service: {}",
            case.service_type.as_deref().unwrap_or(pending)
        )?;
        write!(
            f,
            "Subscriber: {}",
            case.subscriber_code.as_deref().unwrap_or(pending)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcase_core::types::{CaseId, CaseStatus, ChatId, Phase, StepNo};

    fn case() -> Case {
        Case {
            id: CaseId(3),
            chat_id: ChatId(-100),
            technician_id: ActorId(42),
            username: Some("ana".into()),
            status: CaseStatus::Open,
            phase: Phase::StepMedia { step: 7 },
            technician_name: Some("ANA".into()),
            service_type: Some("POST-SALE".into()),
            subscriber_code: None,
            location: None,
            location_at: None,
            created_at: "2026-03-01T08:15:30.000Z".into(),
            finished_at: Some("2026-03-01T11:02:09.000Z".into()),
        }
    }

    #[test]
    fn switch_values() {
        for on in ["on", "1", "TRUE", " yes "] {
            assert_eq!(parse_switch(on), Some(true), "{on}");
        }
        for off in ["off", "0", "false", "No"] {
            assert_eq!(parse_switch(off), Some(false), "{off}");
        }
        assert_eq!(parse_switch("maybe"), None);
    }

    #[test]
    fn caption_names_fields_and_dashes_missing_ones() {
        let key = AttemptKey::new(CaseId(3), StepNo::evidence(7), 2);
        let caption = evidence_caption(&case(), key, "STEP 7 - POWER AT CTO");
        assert!(caption.starts_with("EVIDENCE (STEP 7 - POWER AT CTO) attempt 2"));
        assert!(caption.contains("Technician: ANA"));
        assert!(caption.ends_with("Subscriber: -"));
    }

    #[test]
    fn rejection_notice_reports_removal() {
        let key = AttemptKey::new(CaseId(3), StepNo::authorization(7), 1);
        let notice = rejection_notice(&case(), key, Some("no signature"), Some(false));
        assert!(notice.contains("@ana"));
        assert!(notice.contains("check the bot permissions"));
        assert!(notice.contains("Reason: no signature"));

        let key = AttemptKey::new(CaseId(3), StepNo::evidence(7), 1);
        let notice = rejection_notice(&case(), key, None, Some(true));
        assert!(notice.contains("Evidence removed"));
        assert!(notice.ends_with("Send this step again."));
    }

    #[test]
    fn close_summary_splits_timestamps() {
        let summary = close_summary(&case());
        assert!(summary.contains("Date: 2026-03-01"));
        assert!(summary.contains("Started: 08:15:30"));
        assert!(summary.contains("Finished: 11:02:09"));
        assert!(summary.contains("Origin chat: -100"));
    }

    #[test]
    fn status_report_lists_pending_fields() {
        let report = StatusReport {
            approval_required: false,
            case: Some(case()),
        };
        let text = report.to_string();
        assert!(text.contains("Approval: OFF"));
        assert!(text.contains("Phase: STEP_MEDIA(7)"));
        assert!(text.contains("Subscriber: (pending)"));
    }
}
