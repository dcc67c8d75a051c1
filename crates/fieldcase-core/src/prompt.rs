// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompts the workflow asks the transport to show.
//!
//! A prompt is semantic: the notifier decides wording and layout, and renders
//! [`Prompt::actions`] as buttons.

use crate::action::Action;
use crate::types::{AuthorizationMode, CaseId, StepInfo};

#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// A case was opened (or reset); pick the technician.
    CaseOpened {
        approval_required: bool,
        technicians: Vec<String>,
    },
    SelectService { service_types: Vec<String> },
    EnterSubscriberCode,
    ShareLocation,
    /// Ask whether an authorization is needed before the step.
    AskAuthorization { case_id: CaseId, step: StepInfo },
    ChooseAuthorizationMode { case_id: CaseId, step: StepInfo },
    EnterAuthorizationText { step: StepInfo },
    UploadAuthorizationMedia { step: StepInfo, cap: usize },
    UploadEvidence { step: StepInfo, cap: usize },
    /// An item was stored; `count` of `cap` so far.
    ItemSaved {
        case_id: CaseId,
        step: u32,
        authorization: bool,
        count: usize,
        cap: usize,
    },
    /// The attempt is full and must be submitted.
    CapReached {
        case_id: CaseId,
        step: u32,
        authorization: bool,
        cap: usize,
    },
}

impl Prompt {
    /// Buttons offered with the prompt, in display order.
    pub fn actions(&self) -> Vec<Action> {
        match self {
            Prompt::CaseOpened { technicians, .. } => technicians
                .iter()
                .map(|name| Action::SelectTechnician { name: name.clone() })
                .collect(),
            Prompt::SelectService { service_types } => service_types
                .iter()
                .map(|service| Action::SelectService {
                    service: service.clone(),
                })
                .collect(),
            Prompt::AskAuthorization { case_id, step } => vec![
                Action::AuthorizationAnswer {
                    case_id: *case_id,
                    step: step.number,
                    wants_authorization: true,
                },
                Action::AuthorizationAnswer {
                    case_id: *case_id,
                    step: step.number,
                    wants_authorization: false,
                },
            ],
            Prompt::ChooseAuthorizationMode { case_id, step } => {
                [AuthorizationMode::Text, AuthorizationMode::Media]
                    .into_iter()
                    .map(|mode| Action::AuthorizationMode {
                        case_id: *case_id,
                        step: step.number,
                        mode,
                    })
                    .collect()
            }
            Prompt::ItemSaved {
                case_id,
                step,
                authorization,
                ..
            }
            | Prompt::CapReached {
                case_id,
                step,
                authorization,
                ..
            } => {
                let (case_id, step) = (*case_id, *step);
                if *authorization {
                    vec![
                        Action::AuthorizationMore { case_id, step },
                        Action::AuthorizationDone { case_id, step },
                    ]
                } else {
                    vec![
                        Action::EvidenceMore { case_id, step },
                        Action::EvidenceDone { case_id, step },
                    ]
                }
            }
            Prompt::EnterSubscriberCode
            | Prompt::ShareLocation
            | Prompt::EnterAuthorizationText { .. }
            | Prompt::UploadAuthorizationMedia { .. }
            | Prompt::UploadEvidence { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(number: u32) -> StepInfo {
        StepInfo {
            number,
            title: format!("STEP {number}"),
            instructions: "send photos".into(),
        }
    }

    #[test]
    fn authorization_question_offers_yes_and_no() {
        let prompt = Prompt::AskAuthorization {
            case_id: CaseId(3),
            step: step(5),
        };
        let payloads: Vec<String> = prompt.actions().iter().map(Action::encode).collect();
        assert_eq!(payloads, vec!["AUTH_ASK|3|5|YES", "AUTH_ASK|3|5|NO"]);
    }

    #[test]
    fn saved_item_controls_depend_on_subflow() {
        let evidence = Prompt::ItemSaved {
            case_id: CaseId(1),
            step: 7,
            authorization: false,
            count: 2,
            cap: 8,
        };
        let auth = Prompt::CapReached {
            case_id: CaseId(1),
            step: 7,
            authorization: true,
            cap: 8,
        };
        assert_eq!(evidence.actions()[1].encode(), "MEDIA_DONE|1|7");
        assert_eq!(auth.actions()[0].encode(), "AUTH_MORE|1|7");
    }

    #[test]
    fn text_prompts_have_no_buttons() {
        assert!(Prompt::EnterSubscriberCode.actions().is_empty());
        let upload = Prompt::UploadEvidence {
            step: step(9),
            cap: 8,
        };
        assert!(upload.actions().is_empty());
    }
}
