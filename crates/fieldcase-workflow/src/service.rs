// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event dispatch over the case state machine.
//!
//! Every operation runs its reads and writes inside one storage transaction
//! and only talks to the transport after that transaction committed. A
//! failing side effect is logged and attached to the [`Outcome`] as a
//! warning; it never undoes the transition.

use std::sync::Arc;

use fieldcase_config::model::WorkflowConfig;
use fieldcase_core::types::{
    ActorId, Attempt, AttemptKey, AuthorizationMode, Case, CaseId, ChatId, FormAnswer, MessageRef,
    NewMediaItem, PendingInput, Phase, ReviewDecision, ReviewSummary, StepNo, now_utc,
};
use fieldcase_core::{Action, FieldcaseError, Notifier, Prompt, RouteResolver};
use fieldcase_storage::Database;
use fieldcase_storage::queries::{attempts, cases, chat_config};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::attempts::AppendedItem;
use crate::authorization::AuthorizationSubflow;
use crate::case::{Advance, CaseManager, OpenedCase, expect_phase};
use crate::event::{Command, Event, Sender};
use crate::outcome::{Outcome, Warnings};
use crate::render::{self, StatusReport};
use crate::review::{Approval, ReasonCapture, Rejection, ReviewGate};

/// A submitted attempt, possibly approved on the spot when the chat does
/// not require a reviewer.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub attempt: Attempt,
    pub case: Case,
    pub summary: ReviewSummary,
    pub approval: Option<Approval>,
}

/// Domain result of one handled event.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Opened(OpenedCase),
    /// A form answer or authorization choice moved the case.
    Advanced(Case),
    Stored(AppendedItem),
    Submitted(Box<Submission>),
    Approved(Box<Approval>),
    Rejected(Box<Rejection>),
    /// The reviewer must now send the rejection reason.
    ReasonRequested(PendingInput),
    /// The reason was empty; the capture is still armed.
    ReasonRearmed(PendingInput),
    Cancelled(Case),
    Status(StatusReport),
    /// Current approval setting of the chat.
    ApprovalRequired(bool),
    /// A prompt was repeated without any state change.
    Prompted,
    /// The event did not concern any case.
    Ignored,
}

enum TextStep {
    Capture(ReasonCapture),
    Form(Case),
    Submitted(Box<Submission>),
    Ignored,
}

/// The workflow as seen by a transport.
pub struct CaseService {
    db: Database,
    notifier: Arc<dyn Notifier + Send + Sync>,
    routes: Arc<dyn RouteResolver>,
    cases: CaseManager,
    authorization: AuthorizationSubflow,
    reviews: ReviewGate,
}

impl CaseService {
    pub fn new(
        db: Database,
        config: Arc<WorkflowConfig>,
        notifier: Arc<dyn Notifier + Send + Sync>,
        routes: Arc<dyn RouteResolver>,
    ) -> Self {
        let cases = CaseManager::new(config);
        Self {
            db,
            notifier,
            routes,
            authorization: AuthorizationSubflow::new(cases.tracker()),
            reviews: ReviewGate::new(cases.clone()),
            cases,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        self.cases.config()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Route one inbound event.
    pub async fn handle_event(
        &self,
        sender: &Sender,
        event: Event,
    ) -> Result<Outcome<Reply>, FieldcaseError> {
        match event {
            Event::Command(Command::Open) => Ok(self.open_case(sender).await?.map(Reply::Opened)),
            Event::Command(Command::Cancel) => {
                Ok(self.cancel_case(sender).await?.map(Reply::Cancelled))
            }
            Event::Command(Command::Status) => {
                Ok(Outcome::new(Reply::Status(self.status(sender).await?)))
            }
            Event::Command(Command::Approval(None)) => Ok(Outcome::new(Reply::ApprovalRequired(
                self.approval_required(sender.chat_id).await?,
            ))),
            Event::Command(Command::Approval(Some(required))) => Ok(self
                .set_approval_required(sender, required)
                .await?
                .map(Reply::ApprovalRequired)),
            Event::Command(Command::Submit) => Ok(self
                .submit_current_attempt(sender)
                .await?
                .map(|s| Reply::Submitted(Box::new(s)))),
            Event::Text { text, message } => self.handle_text(sender, &text, message).await,
            Event::Media(item) => Ok(self.handle_media(sender, item).await?.map(Reply::Stored)),
            Event::Location(point) => Ok(self
                .submit_form_field(sender, FormAnswer::Location(point))
                .await?
                .map(Reply::Advanced)),
            Event::Action(action) => self.dispatch(sender, action).await,
        }
    }

    /// Route one decoded button press.
    pub async fn dispatch(
        &self,
        sender: &Sender,
        action: Action,
    ) -> Result<Outcome<Reply>, FieldcaseError> {
        match action {
            Action::SelectTechnician { name } => Ok(self
                .submit_form_field(sender, FormAnswer::Technician(name))
                .await?
                .map(Reply::Advanced)),
            Action::SelectService { service } => Ok(self
                .submit_form_field(sender, FormAnswer::Service(service))
                .await?
                .map(Reply::Advanced)),
            Action::AuthorizationAnswer {
                case_id,
                step,
                wants_authorization,
            } => Ok(self
                .answer_authorization(sender, case_id, step, wants_authorization)
                .await?
                .map(Reply::Advanced)),
            Action::AuthorizationMode {
                case_id,
                step,
                mode,
            } => Ok(self
                .choose_authorization_mode(sender, case_id, step, mode)
                .await?
                .map(Reply::Advanced)),
            Action::AuthorizationMore { case_id, step } => Ok(self
                .prompt_more(sender, case_id, StepNo::authorization(step))
                .await?
                .map(|_| Reply::Prompted)),
            Action::EvidenceMore { case_id, step } => Ok(self
                .prompt_more(sender, case_id, StepNo::evidence(step))
                .await?
                .map(|_| Reply::Prompted)),
            Action::AuthorizationDone { case_id, step } => Ok(self
                .submit_step(sender, case_id, StepNo::authorization(step))
                .await?
                .map(|s| Reply::Submitted(Box::new(s)))),
            Action::EvidenceDone { case_id, step } => Ok(self
                .submit_step(sender, case_id, StepNo::evidence(step))
                .await?
                .map(|s| Reply::Submitted(Box::new(s)))),
            Action::AuthorizationReview {
                case_id,
                step,
                attempt,
                decision,
            } => {
                let key = AttemptKey::new(case_id, StepNo::authorization(step), attempt);
                self.review(sender, key, decision).await
            }
            Action::EvidenceReview {
                case_id,
                step,
                attempt,
                decision,
            } => {
                let key = AttemptKey::new(case_id, StepNo::evidence(step), attempt);
                self.review(sender, key, decision).await
            }
        }
    }

    /// Open a case for the sender, or reset their open one.
    pub async fn open_case(&self, sender: &Sender) -> Result<Outcome<OpenedCase>, FieldcaseError> {
        let cases = self.cases.clone();
        let (chat_id, actor_id) = (sender.chat_id, sender.actor_id);
        let username = sender.username.clone();
        let now = now_utc();
        let (opened, approval_required) = self
            .db
            .transact(move |conn| {
                let opened =
                    cases.open_or_reset(conn, chat_id, actor_id, username.as_deref(), &now)?;
                Ok((opened, chat_config::approval_required(conn, chat_id)?))
            })
            .await?;

        let mut warnings = Warnings::default();
        let prompt = Prompt::CaseOpened {
            approval_required,
            technicians: self.config().technicians.clone(),
        };
        warnings.note(
            "send_prompt",
            self.notifier.send_prompt(chat_id, &prompt).await,
        );
        Ok(warnings.finish(opened))
    }

    /// Record a form answer on the sender's open case.
    pub async fn submit_form_field(
        &self,
        sender: &Sender,
        answer: FormAnswer,
    ) -> Result<Outcome<Case>, FieldcaseError> {
        let cases = self.cases.clone();
        let (chat_id, actor_id) = (sender.chat_id, sender.actor_id);
        let now = now_utc();
        let case = self
            .db
            .transact(move |conn| {
                let mut case = cases.load_open(conn, chat_id, actor_id)?;
                cases.record_form_answer(conn, &mut case, answer, &now)?;
                Ok(case)
            })
            .await?;

        let mut warnings = Warnings::default();
        self.announce_phase(&case, &mut warnings).await;
        Ok(warnings.finish(case))
    }

    pub async fn answer_authorization(
        &self,
        sender: &Sender,
        case_id: CaseId,
        step: u32,
        wants_authorization: bool,
    ) -> Result<Outcome<Case>, FieldcaseError> {
        let cases = self.cases.clone();
        let flow = self.authorization;
        let sender_ids = (sender.chat_id, sender.actor_id);
        let case = self
            .db
            .transact(move |conn| {
                let mut case = owned_case(&cases, conn, case_id, sender_ids)?;
                flow.answer(conn, &mut case, step, wants_authorization)?;
                Ok(case)
            })
            .await?;

        let mut warnings = Warnings::default();
        self.announce_phase(&case, &mut warnings).await;
        Ok(warnings.finish(case))
    }

    pub async fn choose_authorization_mode(
        &self,
        sender: &Sender,
        case_id: CaseId,
        step: u32,
        mode: AuthorizationMode,
    ) -> Result<Outcome<Case>, FieldcaseError> {
        let cases = self.cases.clone();
        let flow = self.authorization;
        let sender_ids = (sender.chat_id, sender.actor_id);
        let now = now_utc();
        let case = self
            .db
            .transact(move |conn| {
                let mut case = owned_case(&cases, conn, case_id, sender_ids)?;
                flow.choose_mode(conn, &mut case, step, mode, &now)?;
                Ok(case)
            })
            .await?;

        let mut warnings = Warnings::default();
        self.announce_phase(&case, &mut warnings).await;
        Ok(warnings.finish(case))
    }

    /// Free text: a pending rejection reason first, then whatever the
    /// sender's open case is waiting for.
    pub async fn handle_text(
        &self,
        sender: &Sender,
        text: &str,
        message: MessageRef,
    ) -> Result<Outcome<Reply>, FieldcaseError> {
        let cases = self.cases.clone();
        let flow = self.authorization;
        let reviews = self.reviews.clone();
        let (chat_id, actor_id) = (sender.chat_id, sender.actor_id);
        let text = text.to_string();
        let now = now_utc();
        let step = self
            .db
            .transact(move |conn| {
                let capture = reviews.capture_reason(conn, chat_id, actor_id, &text, &now)?;
                if let Some(capture) = capture {
                    return Ok(TextStep::Capture(capture));
                }
                let Some(mut case) = cases::find_open_case(conn, chat_id, actor_id)? else {
                    return Ok(TextStep::Ignored);
                };
                let answer = match case.phase {
                    Phase::WaitTechnician => FormAnswer::Technician(text),
                    Phase::WaitService => FormAnswer::Service(text),
                    Phase::WaitSubscriberCode => FormAnswer::SubscriberCode(text),
                    Phase::AuthTextWait { .. } => {
                        let submitted =
                            flow.submit_text(conn, &mut case, &text, message, &now)?;
                        let submission = finish_submission(
                            &cases,
                            &reviews,
                            conn,
                            case,
                            submitted.attempt,
                            &now,
                        )?;
                        return Ok(TextStep::Submitted(Box::new(submission)));
                    }
                    _ => return Ok(TextStep::Ignored),
                };
                cases.record_form_answer(conn, &mut case, answer, &now)?;
                Ok(TextStep::Form(case))
            })
            .await?;

        let mut warnings = Warnings::default();
        let reply = match step {
            TextStep::Ignored => Reply::Ignored,
            TextStep::Form(case) => {
                self.announce_phase(&case, &mut warnings).await;
                Reply::Advanced(case)
            }
            TextStep::Submitted(submission) => {
                self.announce_submission(&submission, &mut warnings).await;
                Reply::Submitted(submission)
            }
            TextStep::Capture(ReasonCapture::Stale(e)) => return Err(e),
            TextStep::Capture(ReasonCapture::Rearmed(request)) => {
                warnings.note(
                    "send_notice",
                    self.notifier
                        .send_notice(
                            chat_id,
                            "Send the rejection reason as a non-empty message.",
                            request.reply_to,
                        )
                        .await,
                );
                Reply::ReasonRearmed(request)
            }
            TextStep::Capture(ReasonCapture::Rejected { rejection, request }) => {
                self.announce_rejection(&rejection, request.reply_to, &mut warnings)
                    .await;
                Reply::Rejected(Box::new(rejection))
            }
        };
        Ok(warnings.finish(reply))
    }

    /// Store a photo or video on the sender's active attempt.
    pub async fn handle_media(
        &self,
        sender: &Sender,
        mut item: NewMediaItem,
    ) -> Result<Outcome<AppendedItem>, FieldcaseError> {
        let cases = self.cases.clone();
        let flow = self.authorization;
        let (chat_id, actor_id) = (sender.chat_id, sender.actor_id);
        let now = now_utc();
        let (case, appended) = self
            .db
            .transact(move |conn| {
                let case = cases.load_open(conn, chat_id, actor_id)?;
                if let Some(meta) = item.meta.as_object_mut() {
                    meta.insert("phase".into(), case.phase.name().into());
                    meta.insert("step".into(), case.phase.step().into());
                }
                let appended = match case.phase {
                    Phase::StepMedia { .. } => cases.collect_evidence(conn, &case, &item, &now)?,
                    Phase::AuthMedia { .. } => flow.append_media(conn, &case, &item, &now)?,
                    other => {
                        return Err(FieldcaseError::StateConflict(format!(
                            "case {} is in {other} and is not expecting media",
                            case.id
                        )));
                    }
                };
                Ok((case, appended))
            })
            .await?;

        let mut warnings = Warnings::default();
        let key = appended.item.key;
        if let Some(destination) = self.routes.resolve(chat_id).evidence_chat {
            let title = self.config().step_info(key.step.step()).title;
            let caption = render::evidence_caption(&case, key, &title);
            warnings.note(
                "copy_media",
                self.notifier
                    .copy_media(destination, &appended.item, &caption)
                    .await,
            );
        }
        let (step, authorization) = (key.step.step(), key.step.is_authorization());
        let prompt = if appended.is_full() {
            Prompt::CapReached {
                case_id: case.id,
                step,
                authorization,
                cap: appended.cap,
            }
        } else {
            Prompt::ItemSaved {
                case_id: case.id,
                step,
                authorization,
                count: appended.count,
                cap: appended.cap,
            }
        };
        warnings.note(
            "send_prompt",
            self.notifier.send_prompt(chat_id, &prompt).await,
        );
        Ok(warnings.finish(appended))
    }

    /// Submit whatever attempt the sender's open case is collecting.
    pub async fn submit_current_attempt(
        &self,
        sender: &Sender,
    ) -> Result<Outcome<Submission>, FieldcaseError> {
        let cases = self.cases.clone();
        let (chat_id, actor_id) = (sender.chat_id, sender.actor_id);
        let step = self
            .db
            .read(move |conn| {
                let case = cases.load_open(conn, chat_id, actor_id)?;
                match case.phase {
                    Phase::StepMedia { step } => Ok((case.id, StepNo::evidence(step))),
                    Phase::AuthMedia { step } => Ok((case.id, StepNo::authorization(step))),
                    other => Err(FieldcaseError::StateConflict(format!(
                        "case {} is in {other}, there is nothing to submit",
                        case.id
                    ))),
                }
            })
            .await?;
        self.submit_step(sender, step.0, step.1).await
    }

    /// Submit the active attempt of `step` on a case owned by the sender.
    pub async fn submit_step(
        &self,
        sender: &Sender,
        case_id: CaseId,
        step: StepNo,
    ) -> Result<Outcome<Submission>, FieldcaseError> {
        let cases = self.cases.clone();
        let flow = self.authorization;
        let reviews = self.reviews.clone();
        let sender_ids = (sender.chat_id, sender.actor_id);
        let now = now_utc();
        let submission = self
            .db
            .transact(move |conn| {
                let mut case = owned_case(&cases, conn, case_id, sender_ids)?;
                let attempt = if step.is_authorization() {
                    flow.submit_media(conn, &mut case, step.step(), &now)?
                } else {
                    cases.submit_evidence(conn, &mut case, step.step(), &now)?
                };
                finish_submission(&cases, &reviews, conn, case, attempt, &now)
            })
            .await?;

        let mut warnings = Warnings::default();
        self.announce_submission(&submission, &mut warnings).await;
        Ok(warnings.finish(submission))
    }

    /// Repeat the upload prompt for the attempt being collected.
    async fn prompt_more(
        &self,
        sender: &Sender,
        case_id: CaseId,
        step: StepNo,
    ) -> Result<Outcome<()>, FieldcaseError> {
        let cases = self.cases.clone();
        let sender_ids = (sender.chat_id, sender.actor_id);
        let case = self
            .db
            .read(move |conn| {
                let case = owned_case(&cases, conn, case_id, sender_ids)?;
                let expected = if step.is_authorization() {
                    Phase::AuthMedia { step: step.step() }
                } else {
                    Phase::StepMedia { step: step.step() }
                };
                expect_phase(&case, expected)?;
                Ok(case)
            })
            .await?;

        let mut warnings = Warnings::default();
        self.announce_phase(&case, &mut warnings).await;
        Ok(warnings.finish(()))
    }

    /// Apply a reviewer decision. Only chat administrators may review.
    pub async fn review(
        &self,
        sender: &Sender,
        key: AttemptKey,
        decision: ReviewDecision,
    ) -> Result<Outcome<Reply>, FieldcaseError> {
        self.ensure_administrator(sender).await?;
        let reviews = self.reviews.clone();
        let (chat_id, reviewer) = (sender.chat_id, sender.actor_id);
        let now = now_utc();
        let mut warnings = Warnings::default();

        let reply = match decision {
            ReviewDecision::Approve => {
                let approval = self
                    .db
                    .transact(move |conn| {
                        ensure_same_chat(conn, key.case_id, chat_id)?;
                        reviews.approve(conn, key, Some(reviewer), &now)
                    })
                    .await?;
                self.announce_approval(&approval, &mut warnings).await;
                Reply::Approved(Box::new(approval))
            }
            ReviewDecision::Reject if key.step.is_authorization() => {
                let request = self
                    .db
                    .transact(move |conn| {
                        ensure_same_chat(conn, key.case_id, chat_id)?;
                        reviews.begin_authorization_rejection(conn, chat_id, key, reviewer, &now)
                    })
                    .await?;
                warnings.note(
                    "send_notice",
                    self.notifier
                        .send_notice(
                            chat_id,
                            "Reviewer: send the rejection reason in a single message.",
                            request.reply_to,
                        )
                        .await,
                );
                Reply::ReasonRequested(request)
            }
            ReviewDecision::Reject => {
                let rejection = self
                    .db
                    .transact(move |conn| {
                        ensure_same_chat(conn, key.case_id, chat_id)?;
                        reviews.reject(conn, key, reviewer, None, &now)
                    })
                    .await?;
                self.announce_rejection(&rejection, None, &mut warnings)
                    .await;
                Reply::Rejected(Box::new(rejection))
            }
        };
        Ok(warnings.finish(reply))
    }

    pub async fn cancel_case(&self, sender: &Sender) -> Result<Outcome<Case>, FieldcaseError> {
        let cases = self.cases.clone();
        let (chat_id, actor_id) = (sender.chat_id, sender.actor_id);
        let now = now_utc();
        let case = self
            .db
            .transact(move |conn| {
                let mut case = cases.load_open(conn, chat_id, actor_id)?;
                cases.cancel(conn, &mut case, &now)?;
                Ok(case)
            })
            .await?;

        let mut warnings = Warnings::default();
        warnings.note(
            "send_notice",
            self.notifier
                .send_notice(chat_id, &format!("Case {} cancelled.", case.id), None)
                .await,
        );
        Ok(warnings.finish(case))
    }

    pub async fn status(&self, sender: &Sender) -> Result<StatusReport, FieldcaseError> {
        let (chat_id, actor_id) = (sender.chat_id, sender.actor_id);
        self.db
            .read(move |conn| {
                Ok(StatusReport {
                    approval_required: chat_config::approval_required(conn, chat_id)?,
                    case: cases::find_open_case(conn, chat_id, actor_id)?,
                })
            })
            .await
    }

    pub async fn approval_required(&self, chat_id: ChatId) -> Result<bool, FieldcaseError> {
        self.db
            .read(move |conn| chat_config::approval_required(conn, chat_id))
            .await
    }

    /// Toggle reviewer approval for the sender's chat. Administrators only.
    pub async fn set_approval_required(
        &self,
        sender: &Sender,
        required: bool,
    ) -> Result<Outcome<bool>, FieldcaseError> {
        self.ensure_administrator(sender).await?;
        let chat_id = sender.chat_id;
        let now = now_utc();
        self.db
            .transact(move |conn| chat_config::set_approval_required(conn, chat_id, required, &now))
            .await?;
        info!(chat_id = %chat_id, required, "approval setting changed");

        let mut warnings = Warnings::default();
        let text = if required {
            "Approval is ON: submissions wait for a reviewer."
        } else {
            "Approval is OFF: submissions are approved automatically."
        };
        warnings.note(
            "send_notice",
            self.notifier.send_notice(chat_id, text, None).await,
        );
        Ok(warnings.finish(required))
    }

    async fn ensure_administrator(&self, sender: &Sender) -> Result<(), FieldcaseError> {
        match self
            .notifier
            .is_administrator(sender.chat_id, sender.actor_id)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(FieldcaseError::Permission(format!(
                "{} is not an administrator of chat {}",
                sender.actor_id, sender.chat_id
            ))),
            Err(e) => {
                warn!(
                    chat_id = %sender.chat_id,
                    actor_id = %sender.actor_id,
                    error = %e,
                    "administrator check failed"
                );
                Err(FieldcaseError::Permission(format!(
                    "could not verify that {} administers chat {}",
                    sender.actor_id, sender.chat_id
                )))
            }
        }
    }

    /// Tell the chat what the case is waiting for now.
    async fn announce_phase(&self, case: &Case, warnings: &mut Warnings) {
        let chat = case.chat_id;
        let config = self.config();
        let cap = config.max_media_per_attempt;
        let prompt = match case.phase {
            Phase::WaitService => Prompt::SelectService {
                service_types: config.service_types.clone(),
            },
            Phase::WaitSubscriberCode => Prompt::EnterSubscriberCode,
            Phase::WaitLocation => Prompt::ShareLocation,
            Phase::AuthAsk { step } => Prompt::AskAuthorization {
                case_id: case.id,
                step: config.step_info(step),
            },
            Phase::AuthMode { step } => Prompt::ChooseAuthorizationMode {
                case_id: case.id,
                step: config.step_info(step),
            },
            Phase::AuthTextWait { step } => Prompt::EnterAuthorizationText {
                step: config.step_info(step),
            },
            Phase::AuthMedia { step } => Prompt::UploadAuthorizationMedia {
                step: config.step_info(step),
                cap,
            },
            Phase::StepMedia { step } => {
                let info = config.step_info(step);
                warnings.note(
                    "send_evidence_prompt",
                    self.notifier.send_evidence_prompt(chat, &info, cap).await,
                );
                return;
            }
            Phase::Closed => {
                let closed = format!("Case {} completed and closed.", case.id);
                warnings.note(
                    "send_notice",
                    self.notifier.send_notice(chat, &closed, None).await,
                );
                if let Some(destination) = self.routes.resolve(chat).summary_chat {
                    warnings.note(
                        "send_close_summary",
                        self.notifier.send_close_summary(destination, case).await,
                    );
                }
                return;
            }
            Phase::WaitTechnician
            | Phase::AuthReview { .. }
            | Phase::StepReview { .. }
            | Phase::Cancelled => return,
        };
        warnings.note(
            "send_prompt",
            self.notifier.send_prompt(chat, &prompt).await,
        );
    }

    async fn announce_submission(&self, submission: &Submission, warnings: &mut Warnings) {
        let chat = submission.case.chat_id;
        if let Some(approval) = &submission.approval {
            self.announce_approval(approval, warnings).await;
            return;
        }
        let Some(message) = warnings.note(
            "send_review_request",
            self.notifier
                .send_review_request(chat, &submission.attempt, &submission.summary)
                .await,
        ) else {
            return;
        };
        let key = submission.attempt.key;
        let stored = self
            .db
            .transact(move |conn| attempts::set_review_message(conn, key, message))
            .await;
        warnings.note("store_review_message", stored);
    }

    async fn announce_approval(&self, approval: &Approval, warnings: &mut Warnings) {
        let chat = approval.case.chat_id;
        let attempt = &approval.attempt;
        if let Some(message) = attempt.review_message {
            let text = render::decision_text(
                attempt.key,
                ReviewDecision::Approve,
                attempt.reviewed_by,
                approval.advance == Advance::Closed,
            );
            warnings.note(
                "edit_message",
                self.notifier.edit_message(chat, message, &text).await,
            );
        } else if attempt.reviewed_by.is_none() {
            let text = render::decision_text(attempt.key, ReviewDecision::Approve, None, false);
            warnings.note(
                "send_notice",
                self.notifier.send_notice(chat, &text, None).await,
            );
        }
        self.announce_phase(&approval.case, warnings).await;
    }

    async fn announce_rejection(
        &self,
        rejection: &Rejection,
        reply_to: Option<MessageRef>,
        warnings: &mut Warnings,
    ) {
        let chat = rejection.case.chat_id;
        let attempt = &rejection.attempt;
        if let Some(message) = attempt.review_message {
            let text = render::decision_text(
                attempt.key,
                ReviewDecision::Reject,
                attempt.reviewed_by,
                false,
            );
            warnings.note(
                "edit_message",
                self.notifier.edit_message(chat, message, &text).await,
            );
        }

        let refs = rejection.removed.message_refs();
        let removed = if refs.is_empty() {
            None
        } else {
            let mut all_removed = true;
            for message in refs {
                let deleted = warnings.note(
                    "delete_message",
                    self.notifier.delete_message(chat, message).await,
                );
                all_removed &= deleted.is_some();
            }
            Some(all_removed)
        };
        let notice = render::rejection_notice(
            &rejection.case,
            attempt.key,
            attempt.reject_reason.as_deref(),
            removed,
        );
        warnings.note(
            "send_notice",
            self.notifier.send_notice(chat, &notice, reply_to).await,
        );
        self.announce_phase(&rejection.case, warnings).await;
    }
}

/// Load a case the sender may drive: same chat, and the sender is its technician.
fn owned_case(
    cases: &CaseManager,
    conn: &Connection,
    case_id: CaseId,
    (chat_id, actor_id): (ChatId, ActorId),
) -> Result<Case, FieldcaseError> {
    let case = cases.load(conn, case_id)?;
    if case.chat_id != chat_id {
        return Err(FieldcaseError::NotFound(format!("case {case_id}")));
    }
    if case.technician_id != actor_id {
        return Err(FieldcaseError::Permission(format!(
            "only the technician of case {case_id} can do that"
        )));
    }
    Ok(case)
}

fn ensure_same_chat(
    conn: &Connection,
    case_id: CaseId,
    chat_id: ChatId,
) -> Result<(), FieldcaseError> {
    match cases::get_case(conn, case_id)? {
        Some(case) if case.chat_id == chat_id => Ok(()),
        _ => Err(FieldcaseError::NotFound(format!("case {case_id}"))),
    }
}

/// Build the reviewer summary and auto-approve when the chat has approval off.
fn finish_submission(
    cases: &CaseManager,
    reviews: &ReviewGate,
    conn: &Connection,
    case: Case,
    attempt: Attempt,
    now: &str,
) -> Result<Submission, FieldcaseError> {
    let key = attempt.key;
    let ledger = cases.tracker().ledger();
    let texts = ledger.list_texts(conn, key)?;
    let authorization_text = (!texts.is_empty()).then(|| {
        texts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    });
    let step_title = cases.config().step_info(key.step.step()).title;
    let summary = ReviewSummary {
        key,
        step_title: render::review_title(key, &step_title),
        technician_name: case.technician_name.clone(),
        service_type: case.service_type.clone(),
        subscriber_code: case.subscriber_code.clone(),
        item_count: ledger.count(conn, key)?,
        authorization_text,
    };
    let approval = if chat_config::approval_required(conn, case.chat_id)? {
        None
    } else {
        Some(reviews.approve(conn, key, None, now)?)
    };
    let case = match &approval {
        Some(approval) => approval.case.clone(),
        None => case,
    };
    let attempt = match &approval {
        Some(approval) => approval.attempt.clone(),
        None => attempt,
    };
    Ok(Submission {
        attempt,
        case,
        summary,
        approval,
    })
}
