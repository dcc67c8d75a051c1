// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed button payloads exchanged with the transport.
//!
//! Payloads are pipe-separated strings such as `REV_OK|12|5|1`. They are
//! decoded exactly once, at the boundary, into [`Action`]; malformed payloads
//! are rejected with [`FieldcaseError::Validation`] before reaching the
//! workflow.

use std::fmt;
use std::str::FromStr;

use crate::error::FieldcaseError;
use crate::types::{AuthorizationMode, CaseId, ReviewDecision};

/// One button press, with every field it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `TECH|<name>`
    SelectTechnician { name: String },
    /// `SERV|<service>`
    SelectService { service: String },
    /// `AUTH_ASK|<case>|<step>|YES|NO`
    AuthorizationAnswer {
        case_id: CaseId,
        step: u32,
        wants_authorization: bool,
    },
    /// `AUTH_MODE|<case>|<step>|TEXT|MEDIA`
    AuthorizationMode {
        case_id: CaseId,
        step: u32,
        mode: AuthorizationMode,
    },
    /// `AUTH_MORE|<case>|<step>`
    AuthorizationMore { case_id: CaseId, step: u32 },
    /// `AUTH_DONE|<case>|<step>`
    AuthorizationDone { case_id: CaseId, step: u32 },
    /// `AUT_OK|...` or `AUT_BAD|<case>|<step>|<attempt>`
    AuthorizationReview {
        case_id: CaseId,
        step: u32,
        attempt: u32,
        decision: ReviewDecision,
    },
    /// `MEDIA_MORE|<case>|<step>`
    EvidenceMore { case_id: CaseId, step: u32 },
    /// `MEDIA_DONE|<case>|<step>`
    EvidenceDone { case_id: CaseId, step: u32 },
    /// `REV_OK|...` or `REV_BAD|<case>|<step>|<attempt>`
    EvidenceReview {
        case_id: CaseId,
        step: u32,
        attempt: u32,
        decision: ReviewDecision,
    },
}

impl Action {
    /// Decode a raw payload.
    pub fn decode(payload: &str) -> Result<Self, FieldcaseError> {
        let payload = payload.trim();
        let (tag, rest) = payload
            .split_once('|')
            .ok_or_else(|| invalid(payload, "missing field separator"))?;

        match tag {
            "TECH" => Ok(Action::SelectTechnician {
                name: non_empty(payload, rest)?,
            }),
            "SERV" => Ok(Action::SelectService {
                service: non_empty(payload, rest)?,
            }),
            "AUTH_ASK" => {
                let [case_id, step, answer] = fields::<3>(payload, rest)?;
                let wants_authorization = match answer {
                    "YES" => true,
                    "NO" => false,
                    _ => return Err(invalid(payload, "answer must be YES or NO")),
                };
                Ok(Action::AuthorizationAnswer {
                    case_id: parse_case(payload, case_id)?,
                    step: parse_positive(payload, step)?,
                    wants_authorization,
                })
            }
            "AUTH_MODE" => {
                let [case_id, step, mode] = fields::<3>(payload, rest)?;
                let mode = AuthorizationMode::from_str(mode)
                    .map_err(|_| invalid(payload, "mode must be TEXT or MEDIA"))?;
                Ok(Action::AuthorizationMode {
                    case_id: parse_case(payload, case_id)?,
                    step: parse_positive(payload, step)?,
                    mode,
                })
            }
            "AUTH_MORE" | "AUTH_DONE" | "MEDIA_MORE" | "MEDIA_DONE" => {
                let [case_id, step] = fields::<2>(payload, rest)?;
                let case_id = parse_case(payload, case_id)?;
                let step = parse_positive(payload, step)?;
                Ok(match tag {
                    "AUTH_MORE" => Action::AuthorizationMore { case_id, step },
                    "AUTH_DONE" => Action::AuthorizationDone { case_id, step },
                    "MEDIA_MORE" => Action::EvidenceMore { case_id, step },
                    _ => Action::EvidenceDone { case_id, step },
                })
            }
            "AUT_OK" | "AUT_BAD" | "REV_OK" | "REV_BAD" => {
                let [case_id, step, attempt] = fields::<3>(payload, rest)?;
                let case_id = parse_case(payload, case_id)?;
                let step = parse_positive(payload, step)?;
                let attempt = parse_positive(payload, attempt)?;
                let decision = if tag.ends_with("_OK") {
                    ReviewDecision::Approve
                } else {
                    ReviewDecision::Reject
                };
                Ok(if tag.starts_with("AUT_") {
                    Action::AuthorizationReview {
                        case_id,
                        step,
                        attempt,
                        decision,
                    }
                } else {
                    Action::EvidenceReview {
                        case_id,
                        step,
                        attempt,
                        decision,
                    }
                })
            }
            _ => Err(invalid(payload, "unknown action")),
        }
    }

    /// Encode back into the payload grammar.
    pub fn encode(&self) -> String {
        match self {
            Action::SelectTechnician { name } => format!("TECH|{name}"),
            Action::SelectService { service } => format!("SERV|{service}"),
            Action::AuthorizationAnswer {
                case_id,
                step,
                wants_authorization,
            } => {
                let answer = if *wants_authorization { "YES" } else { "NO" };
                format!("AUTH_ASK|{case_id}|{step}|{answer}")
            }
            Action::AuthorizationMode {
                case_id,
                step,
                mode,
            } => format!("AUTH_MODE|{case_id}|{step}|{mode}"),
            Action::AuthorizationMore { case_id, step } => format!("AUTH_MORE|{case_id}|{step}"),
            Action::AuthorizationDone { case_id, step } => format!("AUTH_DONE|{case_id}|{step}"),
            Action::AuthorizationReview {
                case_id,
                step,
                attempt,
                decision,
            } => {
                let tag = match decision {
                    ReviewDecision::Approve => "AUT_OK",
                    ReviewDecision::Reject => "AUT_BAD",
                };
                format!("{tag}|{case_id}|{step}|{attempt}")
            }
            Action::EvidenceMore { case_id, step } => format!("MEDIA_MORE|{case_id}|{step}"),
            Action::EvidenceDone { case_id, step } => format!("MEDIA_DONE|{case_id}|{step}"),
            Action::EvidenceReview {
                case_id,
                step,
                attempt,
                decision,
            } => {
                let tag = match decision {
                    ReviewDecision::Approve => "REV_OK",
                    ReviewDecision::Reject => "REV_BAD",
                };
                format!("{tag}|{case_id}|{step}|{attempt}")
            }
        }
    }
}

impl FromStr for Action {
    type Err = FieldcaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::decode(s)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn invalid(payload: &str, reason: &str) -> FieldcaseError {
    FieldcaseError::Validation(format!("invalid action payload `{payload}`: {reason}"))
}

fn non_empty(payload: &str, value: &str) -> Result<String, FieldcaseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(payload, "empty value"));
    }
    Ok(value.to_string())
}

fn fields<'a, const N: usize>(
    payload: &str,
    rest: &'a str,
) -> Result<[&'a str; N], FieldcaseError> {
    let parts: Vec<&str> = rest.split('|').collect();
    parts
        .try_into()
        .map_err(|_| invalid(payload, &format!("expected {} fields after the tag", N)))
}

fn parse_case(payload: &str, value: &str) -> Result<CaseId, FieldcaseError> {
    value
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(CaseId)
        .ok_or_else(|| invalid(payload, "case id must be a positive integer"))
}

fn parse_positive(payload: &str, value: &str) -> Result<u32, FieldcaseError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| invalid(payload, "step and attempt must be positive integers"))
}
