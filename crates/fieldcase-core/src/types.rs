// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Fieldcase workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a chat (group) on the transport.
    ChatId
);
id_type!(
    /// Identifier of a person acting in a chat (technician or reviewer).
    ActorId
);
id_type!(
    /// Identifier of a persisted case.
    CaseId
);
id_type!(
    /// Reference to a message on the transport, used for replies, edits and deletes.
    MessageRef
);

/// Current time as an ISO 8601 UTC timestamp with millisecond precision.
pub fn now_utc() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter plugged into the workflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Notifier,
    Storage,
}

/// Signed step identifier under which attempts are keyed.
///
/// Positive values are evidence steps; the negated value of a step keys the
/// authorization sub-flow attached to that step. Zero is never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepNo(i64);

impl StepNo {
    /// Key for the evidence attempts of `step`.
    pub fn evidence(step: u32) -> Self {
        Self(i64::from(step))
    }

    /// Key for the authorization attempts attached to `step`.
    pub fn authorization(step: u32) -> Self {
        Self(-i64::from(step))
    }

    /// Rebuild from the persisted signed value.
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw != 0 && raw.unsigned_abs() <= u64::from(u32::MAX)).then_some(Self(raw))
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    /// The evidence step this key belongs to, regardless of sign.
    pub fn step(self) -> u32 {
        // from_raw bounds the magnitude to u32.
        self.0.unsigned_abs() as u32
    }

    pub fn is_authorization(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for StepNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_authorization() {
            write!(f, "authorization {}", self.step())
        } else {
            write!(f, "step {}", self.step())
        }
    }
}

/// Identity of one attempt: (case, signed step, attempt number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptKey {
    pub case_id: CaseId,
    pub step: StepNo,
    pub attempt: u32,
}

impl AttemptKey {
    pub fn new(case_id: CaseId, step: StepNo, attempt: u32) -> Self {
        Self {
            case_id,
            step,
            attempt,
        }
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "case {} {} attempt {}",
            self.case_id, self.step, self.attempt
        )
    }
}

/// Lifecycle status of a case.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Open,
    Closed,
    Cancelled,
}

/// Sub-state of a case. Step-bearing phases carry the evidence step they
/// refer to, so a phase without a step pointer cannot claim one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    WaitTechnician,
    WaitService,
    WaitSubscriberCode,
    WaitLocation,
    /// Technician is asked whether an authorization is needed before `step`.
    AuthAsk { step: u32 },
    /// Technician picks text or media for the authorization.
    AuthMode { step: u32 },
    /// The next free text from the technician is the authorization.
    AuthTextWait { step: u32 },
    /// Authorization media is being collected.
    AuthMedia { step: u32 },
    /// Authorization attempt awaits a reviewer.
    AuthReview { step: u32 },
    /// Evidence media is being collected.
    StepMedia { step: u32 },
    /// Evidence attempt awaits a reviewer.
    StepReview { step: u32 },
    Closed,
    Cancelled,
}

impl Phase {
    /// Persisted name of the phase.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::WaitTechnician => "WAIT_TECHNICIAN",
            Phase::WaitService => "WAIT_SERVICE",
            Phase::WaitSubscriberCode => "WAIT_SUBSCRIBER_CODE",
            Phase::WaitLocation => "WAIT_LOCATION",
            Phase::AuthAsk { .. } => "AUTH_ASK",
            Phase::AuthMode { .. } => "AUTH_MODE",
            Phase::AuthTextWait { .. } => "AUTH_TEXT_WAIT",
            Phase::AuthMedia { .. } => "AUTH_MEDIA",
            Phase::AuthReview { .. } => "AUTH_REVIEW",
            Phase::StepMedia { .. } => "STEP_MEDIA",
            Phase::StepReview { .. } => "STEP_REVIEW",
            Phase::Closed => "CLOSED",
            Phase::Cancelled => "CANCELLED",
        }
    }

    /// The evidence step this phase refers to, if any.
    pub fn step(&self) -> Option<u32> {
        match *self {
            Phase::AuthAsk { step }
            | Phase::AuthMode { step }
            | Phase::AuthTextWait { step }
            | Phase::AuthMedia { step }
            | Phase::AuthReview { step }
            | Phase::StepMedia { step }
            | Phase::StepReview { step } => Some(step),
            _ => None,
        }
    }

    /// Position in the overall step sequence (form steps are 1 through 4).
    pub fn step_pointer(&self) -> Option<u32> {
        match self {
            Phase::WaitTechnician => Some(1),
            Phase::WaitService => Some(2),
            Phase::WaitSubscriberCode => Some(3),
            Phase::WaitLocation => Some(4),
            Phase::Closed | Phase::Cancelled => None,
            other => other.step(),
        }
    }

    /// Rebuild a phase from its persisted name and step column.
    ///
    /// Returns `None` when the combination is not representable, e.g. a
    /// step-bearing phase without a step.
    pub fn from_parts(name: &str, step: Option<u32>) -> Option<Phase> {
        let phase = match (name, step) {
            ("WAIT_TECHNICIAN", _) => Phase::WaitTechnician,
            ("WAIT_SERVICE", _) => Phase::WaitService,
            ("WAIT_SUBSCRIBER_CODE", _) => Phase::WaitSubscriberCode,
            ("WAIT_LOCATION", _) => Phase::WaitLocation,
            ("AUTH_ASK", Some(step)) => Phase::AuthAsk { step },
            ("AUTH_MODE", Some(step)) => Phase::AuthMode { step },
            ("AUTH_TEXT_WAIT", Some(step)) => Phase::AuthTextWait { step },
            ("AUTH_MEDIA", Some(step)) => Phase::AuthMedia { step },
            ("AUTH_REVIEW", Some(step)) => Phase::AuthReview { step },
            ("STEP_MEDIA", Some(step)) => Phase::StepMedia { step },
            ("STEP_REVIEW", Some(step)) => Phase::StepReview { step },
            ("CLOSED", _) => Phase::Closed,
            ("CANCELLED", _) => Phase::Cancelled,
            _ => return None,
        };
        Some(phase)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Closed | Phase::Cancelled)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step() {
            Some(step) => write!(f, "{}({step})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// A reported GPS position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// One technician's run through the step sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub id: CaseId,
    pub chat_id: ChatId,
    pub technician_id: ActorId,
    pub username: Option<String>,
    pub status: CaseStatus,
    pub phase: Phase,
    pub technician_name: Option<String>,
    pub service_type: Option<String>,
    pub subscriber_code: Option<String>,
    pub location: Option<GeoPoint>,
    pub location_at: Option<String>,
    pub created_at: String,
    pub finished_at: Option<String>,
}

impl Case {
    pub fn is_open(&self) -> bool {
        self.status == CaseStatus::Open
    }

    /// Position in the overall step sequence, `None` once terminal.
    pub fn current_step(&self) -> Option<u32> {
        self.phase.step_pointer()
    }
}

/// Review state of an attempt, derived from its `submitted`/`approved` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReviewState {
    /// Still collecting items.
    Collecting,
    /// Submitted, no decision yet.
    Pending,
    Approved,
    Rejected,
}

/// One numbered submission cycle for a (case, step).
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub key: AttemptKey,
    pub submitted: bool,
    pub submitted_at: Option<String>,
    pub approved: Option<bool>,
    pub reviewed_by: Option<ActorId>,
    pub reviewed_at: Option<String>,
    pub reject_reason: Option<String>,
    pub reject_reason_by: Option<ActorId>,
    pub reject_reason_at: Option<String>,
    pub review_message: Option<MessageRef>,
    pub created_at: String,
}

impl Attempt {
    pub fn review_state(&self) -> ReviewState {
        match (self.submitted, self.approved) {
            (false, _) => ReviewState::Collecting,
            (true, None) => ReviewState::Pending,
            (true, Some(true)) => ReviewState::Approved,
            (true, Some(false)) => ReviewState::Rejected,
        }
    }
}

/// Kind of evidence item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

/// An evidence item as received from the transport, before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMediaItem {
    pub kind: MediaKind,
    /// External content reference on the transport.
    pub file_id: String,
    pub file_unique_id: Option<String>,
    /// The message that carried the item.
    pub message_ref: MessageRef,
    pub meta: serde_json::Value,
}

/// A stored evidence item. Never mutated after append.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    pub id: i64,
    pub key: AttemptKey,
    pub kind: MediaKind,
    pub file_id: String,
    pub file_unique_id: Option<String>,
    pub message_ref: MessageRef,
    pub meta: serde_json::Value,
    pub created_at: String,
}

/// Free text submitted in lieu of media for an authorization attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationText {
    pub id: i64,
    pub key: AttemptKey,
    pub text: String,
    pub message_ref: MessageRef,
    pub created_at: String,
}

/// What a pending input request captures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingInputKind {
    /// Reason for rejecting an authorization attempt.
    AuthRejectReason,
}

/// Marker that the next free text from `actor_id` in `chat_id` is a captured value.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInput {
    pub chat_id: ChatId,
    pub actor_id: ActorId,
    pub kind: PendingInputKind,
    pub target: AttemptKey,
    /// Message the eventual notice should reply to.
    pub reply_to: Option<MessageRef>,
    /// Technician to mention in the eventual notice.
    pub subject_technician: Option<ActorId>,
    pub created_at: String,
}

/// Destination chats for copies and summaries of an origin chat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Routes {
    pub evidence_chat: Option<ChatId>,
    pub summary_chat: Option<ChatId>,
}

/// A reviewer's decision on a submitted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// How the technician supplies an authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationMode {
    Text,
    Media,
}

/// Form fields captured before the evidence steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FormField {
    Technician,
    Service,
    SubscriberCode,
    Location,
}

impl FormField {
    /// The phase a case must be in to accept this field.
    pub fn expected_phase(self) -> Phase {
        match self {
            FormField::Technician => Phase::WaitTechnician,
            FormField::Service => Phase::WaitService,
            FormField::SubscriberCode => Phase::WaitSubscriberCode,
            FormField::Location => Phase::WaitLocation,
        }
    }
}

/// A form answer with its typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum FormAnswer {
    Technician(String),
    Service(String),
    SubscriberCode(String),
    Location(GeoPoint),
}

impl FormAnswer {
    pub fn field(&self) -> FormField {
        match self {
            FormAnswer::Technician(_) => FormField::Technician,
            FormAnswer::Service(_) => FormField::Service,
            FormAnswer::SubscriberCode(_) => FormField::SubscriberCode,
            FormAnswer::Location(_) => FormField::Location,
        }
    }
}

/// Display data for one evidence step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInfo {
    pub number: u32,
    pub title: String,
    pub instructions: String,
}

/// What reviewers see when an attempt is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSummary {
    pub key: AttemptKey,
    pub step_title: String,
    pub technician_name: Option<String>,
    pub service_type: Option<String>,
    pub subscriber_code: Option<String>,
    pub item_count: usize,
    /// Present for text-only authorizations.
    pub authorization_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn step_no_sign_encodes_authorization() {
        let evidence = StepNo::evidence(7);
        let auth = StepNo::authorization(7);
        assert_eq!(evidence.raw(), 7);
        assert_eq!(auth.raw(), -7);
        assert!(!evidence.is_authorization());
        assert!(auth.is_authorization());
        assert_eq!(auth.step(), 7);
        assert_eq!(StepNo::from_raw(0), None);
        assert_eq!(StepNo::from_raw(-5), Some(StepNo::authorization(5)));
    }

    #[test]
    fn phase_parts_reject_missing_step() {
        assert_eq!(Phase::from_parts("STEP_MEDIA", None), None);
        assert_eq!(
            Phase::from_parts("STEP_MEDIA", Some(5)),
            Some(Phase::StepMedia { step: 5 })
        );
        assert_eq!(
            Phase::from_parts("WAIT_SERVICE", None),
            Some(Phase::WaitService)
        );
        assert_eq!(Phase::from_parts("BOGUS", Some(3)), None);
    }

    #[test]
    fn phase_name_matches_from_parts() {
        let phases = [
            Phase::WaitTechnician,
            Phase::WaitLocation,
            Phase::AuthAsk { step: 5 },
            Phase::AuthTextWait { step: 6 },
            Phase::AuthReview { step: 9 },
            Phase::StepReview { step: 15 },
            Phase::Cancelled,
        ];
        for phase in phases {
            assert_eq!(Phase::from_parts(phase.name(), phase.step()), Some(phase));
        }
    }

    #[test]
    fn step_pointer_covers_form_and_evidence() {
        assert_eq!(Phase::WaitTechnician.step_pointer(), Some(1));
        assert_eq!(Phase::WaitLocation.step_pointer(), Some(4));
        assert_eq!(Phase::AuthMode { step: 8 }.step_pointer(), Some(8));
        assert_eq!(Phase::Closed.step_pointer(), None);
    }

    #[test]
    fn case_status_uses_uppercase_names() {
        assert_eq!(CaseStatus::Open.to_string(), "OPEN");
        assert_eq!(
            CaseStatus::from_str("CANCELLED").unwrap(),
            CaseStatus::Cancelled
        );
        assert_eq!(
            PendingInputKind::AuthRejectReason.to_string(),
            "AUTH_REJECT_REASON"
        );
        assert_eq!(MediaKind::from_str("video").unwrap(), MediaKind::Video);
    }

    #[test]
    fn review_state_follows_columns() {
        let mut attempt = Attempt {
            key: AttemptKey::new(CaseId(1), StepNo::evidence(5), 1),
            submitted: false,
            submitted_at: None,
            approved: None,
            reviewed_by: None,
            reviewed_at: None,
            reject_reason: None,
            reject_reason_by: None,
            reject_reason_at: None,
            review_message: None,
            created_at: now_utc(),
        };
        assert_eq!(attempt.review_state(), ReviewState::Collecting);
        attempt.submitted = true;
        assert_eq!(attempt.review_state(), ReviewState::Pending);
        attempt.approved = Some(false);
        assert_eq!(attempt.review_state(), ReviewState::Rejected);
    }
}
