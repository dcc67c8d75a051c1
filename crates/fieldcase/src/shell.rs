// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fieldcase shell` command implementation.
//!
//! An interactive REPL standing in for the chat transport. Every line is
//! sent by an actor (`@42 /open`, `@42 photo`, `@7 approve 5 1`), decoded
//! once into a typed event and dispatched to the workflow service. What the
//! bot would post to the chat is printed by [`ConsoleNotifier`].

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use colored::Colorize;
use fieldcase_config::FieldcaseConfig;
use fieldcase_core::types::{
    ActorId, AdapterType, Attempt, AttemptKey, Case, ChatId, GeoPoint, HealthStatus, MediaItem,
    MediaKind, MessageRef, NewMediaItem, ReviewDecision, ReviewSummary,
};
use fieldcase_core::{Action, FieldcaseError, Notifier, PluginAdapter, Prompt, StorageAdapter};
use fieldcase_storage::SqliteStorage;
use fieldcase_workflow::render::close_summary;
use fieldcase_workflow::{CaseService, Event, Outcome, Reply, Sender, StaticRouteResolver};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::Mutex;
use tracing::info;

const HELP: &str = "\
Lines are sent as `@<actor> <message>`; without a prefix the previous actor speaks.
  @42 /open | /cancel | /status | /submit | /approval [on|off]
  @42 <free text>                 form answer, authorization text or rejection reason
  @42 photo | video               upload one evidence item
  @42 loc <lat> <lon>             share a location
  @42 press <payload>             press a button, e.g. AUTH_ASK|1|5|NO
  @7 approve [<step> <attempt>]   decide the latest matching review request
  @7 reject [<step> <attempt>]
  /help, /quit";

/// Chat transport that prints to the console.
pub struct ConsoleNotifier {
    admins: HashSet<(ChatId, ActorId)>,
    next_message: AtomicI64,
    reviews: Mutex<Vec<AttemptKey>>,
}

impl ConsoleNotifier {
    pub fn new(admins: impl IntoIterator<Item = (ChatId, ActorId)>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            next_message: AtomicI64::new(1),
            reviews: Mutex::new(Vec::new()),
        }
    }

    /// Message refs shared between bot posts and console input.
    pub fn next_ref(&self) -> MessageRef {
        MessageRef(self.next_message.fetch_add(1, Ordering::SeqCst))
    }

    /// The most recent review request matching `step` and `attempt`, or the
    /// most recent one of all.
    pub async fn find_review(&self, target: Option<(u32, u32)>) -> Option<AttemptKey> {
        let reviews = self.reviews.lock().await;
        reviews
            .iter()
            .rev()
            .find(|key| match target {
                Some((step, attempt)) => key.step.step() == step && key.attempt == attempt,
                None => true,
            })
            .copied()
    }

    fn post(&self, chat: ChatId, text: &str) -> MessageRef {
        let message = self.next_ref();
        let header = format!("[{chat} #{message}]").dimmed();
        for (i, line) in text.lines().enumerate() {
            if i == 0 {
                println!("{header} {}", line.cyan());
            } else {
                println!("{} {}", " ".repeat(header.chars().count()), line.cyan());
            }
        }
        message
    }
}

#[async_trait]
impl PluginAdapter for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notifier
    }

    async fn health_check(&self) -> Result<HealthStatus, FieldcaseError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FieldcaseError> {
        Ok(())
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_prompt(
        &self,
        chat: ChatId,
        prompt: &Prompt,
    ) -> Result<MessageRef, FieldcaseError> {
        Ok(self.post(chat, &prompt_text(prompt)))
    }

    async fn send_notice(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef, FieldcaseError> {
        let text = match reply_to {
            Some(original) => format!("(reply to #{original}) {text}"),
            None => text.to_string(),
        };
        Ok(self.post(chat, &text))
    }

    async fn send_review_request(
        &self,
        chat: ChatId,
        attempt: &Attempt,
        summary: &ReviewSummary,
    ) -> Result<MessageRef, FieldcaseError> {
        self.reviews.lock().await.push(attempt.key);
        let key = attempt.key;
        let mut text = format!(
            "REVIEW {} (attempt {})\nTechnician: {}\nService: {}\nSubscriber: {}",
            summary.step_title,
            key.attempt,
            summary.technician_name.as_deref().unwrap_or("-"),
            summary.service_type.as_deref().unwrap_or("-"),
            summary.subscriber_code.as_deref().unwrap_or("-"),
        );
        match &summary.authorization_text {
            Some(authorization) => text.push_str(&format!("\nText: {authorization}")),
            None => text.push_str(&format!("\nFiles: {}", summary.item_count)),
        }
        let actions = [
            review_action(key, ReviewDecision::Approve),
            review_action(key, ReviewDecision::Reject),
        ];
        text.push_str(&format!("\n{}", buttons(&actions)));
        Ok(self.post(chat, &text))
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), FieldcaseError> {
        let header = format!("[{chat} #{message} edited]");
        println!("{} {}", header.dimmed(), text.cyan());
        Ok(())
    }

    async fn delete_message(
        &self,
        chat: ChatId,
        message: MessageRef,
    ) -> Result<(), FieldcaseError> {
        println!("{}", format!("[{chat} #{message} deleted]").dimmed());
        Ok(())
    }

    async fn is_administrator(&self, chat: ChatId, actor: ActorId) -> Result<bool, FieldcaseError> {
        Ok(self.admins.contains(&(chat, actor)))
    }

    async fn send_close_summary(
        &self,
        destination: ChatId,
        case: &Case,
    ) -> Result<(), FieldcaseError> {
        self.post(destination, &close_summary(case));
        Ok(())
    }

    async fn copy_media(
        &self,
        destination: ChatId,
        item: &MediaItem,
        caption: &str,
    ) -> Result<(), FieldcaseError> {
        let label = format!("<{} {}>\n{caption}", item.kind, item.file_id);
        self.post(destination, &label);
        Ok(())
    }
}

fn buttons(actions: &[Action]) -> String {
    actions
        .iter()
        .map(|a| format!("[{}]", a.encode()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Console wording for a prompt, with its buttons as payloads.
pub fn prompt_text(prompt: &Prompt) -> String {
    let text = match prompt {
        Prompt::CaseOpened {
            approval_required,
            technicians,
        } => {
            let approval = if *approval_required { "ON" } else { "OFF" };
            if technicians.is_empty() {
                format!("Case started (approval {approval}). Type the technician name.")
            } else {
                format!("Case started (approval {approval}). Pick the technician.")
            }
        }
        Prompt::SelectService { .. } => "Pick the service type.".to_string(),
        Prompt::EnterSubscriberCode => "Type the subscriber code.".to_string(),
        Prompt::ShareLocation => "Share the location.".to_string(),
        Prompt::AskAuthorization { step, .. } => {
            format!("Do you need an authorization before {}?", step.title)
        }
        Prompt::ChooseAuthorizationMode { step, .. } => {
            format!("Authorization for {}: text or media?", step.title)
        }
        Prompt::EnterAuthorizationText { step } => {
            format!("Type the authorization for {} in one message.", step.title)
        }
        Prompt::UploadAuthorizationMedia { step, cap } => {
            let title = &step.title;
            format!("Send the authorization media for {title} (up to {cap}).")
        }
        Prompt::UploadEvidence { step, cap } => {
            format!("{}\n{} (up to {cap}).", step.title, step.instructions)
        }
        Prompt::ItemSaved { count, cap, .. } => format!("Saved ({count}/{cap})."),
        Prompt::CapReached { cap, .. } => format!("Limit of {cap} reached, submit now."),
    };
    let actions = prompt.actions();
    if actions.is_empty() {
        text
    } else {
        format!("{text}\n{}", buttons(&actions))
    }
}

/// One decoded console line.
#[derive(Debug, PartialEq)]
pub enum ShellInput {
    Help,
    Quit,
    Event { actor: ActorId, event: Event },
    Review {
        actor: ActorId,
        decision: ReviewDecision,
        target: Option<(u32, u32)>,
    },
}

/// Decode a console line. `message` is the ref given to free text and media.
pub fn parse_line(
    line: &str,
    last_actor: ActorId,
    message: MessageRef,
) -> Result<ShellInput, FieldcaseError> {
    let line = line.trim();
    match line {
        "/help" => return Ok(ShellInput::Help),
        "/quit" | "/exit" => return Ok(ShellInput::Quit),
        _ => {}
    }

    let (actor, rest) = match line.strip_prefix('@') {
        Some(prefixed) => {
            let (id, rest) = prefixed.split_once(' ').unwrap_or((prefixed, ""));
            let id = id
                .parse()
                .map_err(|_| FieldcaseError::Validation(format!("'{id}' is not an actor id")))?;
            (ActorId(id), rest.trim())
        }
        None => (last_actor, line),
    };
    if rest.is_empty() {
        return Err(FieldcaseError::Validation("nothing to send".to_string()));
    }

    let (word, tail) = rest.split_once(' ').unwrap_or((rest, ""));
    let args: Vec<&str> = tail.split_whitespace().collect();
    let event = match word {
        "photo" | "video" if args.is_empty() => {
            let kind = if word == "photo" {
                MediaKind::Photo
            } else {
                MediaKind::Video
            };
            Event::Media(NewMediaItem {
                kind,
                file_id: format!("console-{kind}-{message}"),
                file_unique_id: None,
                message_ref: message,
                meta: serde_json::json!({ "source": "console" }),
            })
        }
        "loc" => {
            let [latitude, longitude] = args.as_slice() else {
                return Err(FieldcaseError::Validation(
                    "usage: loc <latitude> <longitude>".to_string(),
                ));
            };
            let parse = |v: &str| {
                v.parse::<f64>()
                    .map_err(|_| FieldcaseError::Validation(format!("'{v}' is not a coordinate")))
            };
            Event::Location(GeoPoint {
                latitude: parse(*latitude)?,
                longitude: parse(*longitude)?,
            })
        }
        "press" => {
            // Roster names may contain spaces, so the payload is the whole tail.
            let payload = tail.trim();
            if payload.is_empty() {
                return Err(FieldcaseError::Validation(
                    "usage: press <payload>".to_string(),
                ));
            }
            Event::from_payload(payload)?
        }
        "approve" | "reject" => {
            let decision = if word == "approve" {
                ReviewDecision::Approve
            } else {
                ReviewDecision::Reject
            };
            let target = match args.as_slice() {
                [] => None,
                [step, attempt] => {
                    let number = |v: &str| {
                        let err = || FieldcaseError::Validation(format!("'{v}' is not a number"));
                        v.parse::<u32>().map_err(|_| err())
                    };
                    Some((number(*step)?, number(*attempt)?))
                }
                _ => {
                    return Err(FieldcaseError::Validation(format!(
                        "usage: {word} [<step> <attempt>]"
                    )));
                }
            };
            return Ok(ShellInput::Review {
                actor,
                decision,
                target,
            });
        }
        _ => Event::from_text(rest, message)?,
    };
    Ok(ShellInput::Event { actor, event })
}

fn review_action(key: AttemptKey, decision: ReviewDecision) -> Action {
    let (case_id, step, attempt) = (key.case_id, key.step.step(), key.attempt);
    if key.step.is_authorization() {
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
    }
}

fn describe(reply: &Reply) -> String {
    match reply {
        Reply::Opened(opened) if opened.reset => format!("case {} reset", opened.case.id),
        Reply::Opened(opened) => format!("case {} opened", opened.case.id),
        Reply::Advanced(case) => format!("case {} now {}", case.id, case.phase),
        Reply::Stored(appended) => format!(
            "stored item {} on {} ({}/{})",
            appended.item.id, appended.item.key, appended.count, appended.cap
        ),
        Reply::Submitted(submission) => format!("submitted {}", submission.attempt.key),
        Reply::Approved(approval) => format!("approved {}", approval.attempt.key),
        Reply::Rejected(rejection) => format!(
            "rejected {}, retry as attempt {}",
            rejection.attempt.key, rejection.retry.key.attempt
        ),
        Reply::ReasonRequested(request) => {
            format!("waiting for the rejection reason of {}", request.target)
        }
        Reply::ReasonRearmed(request) => {
            let target = &request.target;
            format!("still waiting for the rejection reason of {target}")
        }
        Reply::Cancelled(case) => format!("case {} cancelled", case.id),
        Reply::Status(report) => report.to_string(),
        Reply::ApprovalRequired(required) => {
            format!("approval {}", if *required { "ON" } else { "OFF" })
        }
        Reply::Prompted => "prompt repeated".to_string(),
        Reply::Ignored => "ignored".to_string(),
    }
}

fn print_outcome(result: Result<Outcome<Reply>, FieldcaseError>) {
    match result {
        Ok(outcome) => {
            println!("{} {}", "=>".green(), describe(&outcome.value));
            for warning in &outcome.warnings {
                println!("{} {warning}", "warning:".yellow());
            }
        }
        Err(e) => println!("{} {e}", format!("{}:", e.kind()).red()),
    }
}

/// Runs the `fieldcase shell` interactive REPL against `chat`.
pub async fn run_shell(
    config: FieldcaseConfig,
    chat: ChatId,
    admins: Vec<i64>,
) -> Result<(), FieldcaseError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;

    let notifier = Arc::new(ConsoleNotifier::new(
        admins.into_iter().map(|id| (chat, ActorId(id))),
    ));
    let routes = Arc::new(StaticRouteResolver::from_config(&config.routing)?);
    let service = CaseService::new(
        storage.database()?,
        Arc::new(config.workflow.clone()),
        notifier.clone(),
        routes,
    );
    for (adapter, health) in [
        (storage.name(), storage.health_check().await?),
        (notifier.name(), notifier.health_check().await?),
    ] {
        info!(adapter, health = ?health, "adapter ready");
    }
    info!(chat_id = %chat, "console shell started");

    let mut rl = DefaultEditor::new()
        .map_err(|e| FieldcaseError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", config.bot.name).bold().green());
    println!(
        "Chat {chat}. Type {} for the syntax, {} to exit.\n",
        "/help".yellow(),
        "/quit".yellow()
    );

    let mut actor = ActorId(42);
    loop {
        let prompt = format!("{}> ", format!("@{actor}").green());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(&line);

        let input = match parse_line(&line, actor, notifier.next_ref()) {
            Ok(input) => input,
            Err(e) => {
                println!("{} {e}", "error:".red());
                continue;
            }
        };
        match input {
            ShellInput::Help => println!("{HELP}"),
            ShellInput::Quit => break,
            ShellInput::Event { actor: who, event } => {
                actor = who;
                print_outcome(service.handle_event(&Sender::new(chat, who), event).await);
            }
            ShellInput::Review {
                actor: who,
                decision,
                target,
            } => {
                actor = who;
                let Some(key) = notifier.find_review(target).await else {
                    println!("{} no matching review request", "error:".red());
                    continue;
                };
                let event = Event::Action(review_action(key, decision));
                print_outcome(service.handle_event(&Sender::new(chat, who), event).await);
            }
        }
    }

    storage.close().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcase_core::types::{CaseId, StepInfo, StepNo};
    use fieldcase_workflow::Command;

    fn parse(line: &str) -> ShellInput {
        parse_line(line, ActorId(42), MessageRef(9)).unwrap()
    }

    #[test]
    fn prefixed_lines_switch_actor() {
        assert_eq!(
            parse("@7 /status"),
            ShellInput::Event {
                actor: ActorId(7),
                event: Event::Command(Command::Status),
            }
        );
        assert_eq!(
            parse("hello there"),
            ShellInput::Event {
                actor: ActorId(42),
                event: Event::Text {
                    text: "hello there".to_string(),
                    message: MessageRef(9),
                },
            }
        );
    }

    #[test]
    fn media_location_and_buttons() {
        let ShellInput::Event {
            event: Event::Media(item),
            ..
        } = parse("@42 video")
        else {
            panic!("expected media");
        };
        assert_eq!(item.kind, MediaKind::Video);
        assert_eq!(item.message_ref, MessageRef(9));

        assert!(matches!(
            parse("loc -12.05 -77.04"),
            ShellInput::Event {
                event: Event::Location(GeoPoint { latitude, .. }),
                ..
            } if latitude == -12.05
        ));
        assert_eq!(
            parse("press MEDIA_DONE|3|5"),
            ShellInput::Event {
                actor: ActorId(42),
                event: Event::Action(Action::EvidenceDone {
                    case_id: CaseId(3),
                    step: 5,
                }),
            }
        );
    }

    #[test]
    fn press_keeps_spaces_in_payload() {
        assert_eq!(
            parse("press TECH|ANA LUZ"),
            ShellInput::Event {
                actor: ActorId(42),
                event: Event::Action(Action::SelectTechnician {
                    name: "ANA LUZ".into(),
                }),
            }
        );
    }

    #[test]
    fn review_shortcuts() {
        assert_eq!(
            parse("@7 approve 5 1"),
            ShellInput::Review {
                actor: ActorId(7),
                decision: ReviewDecision::Approve,
                target: Some((5, 1)),
            }
        );
        assert_eq!(
            parse("@7 reject"),
            ShellInput::Review {
                actor: ActorId(7),
                decision: ReviewDecision::Reject,
                target: None,
            }
        );
        assert!(parse_line("@7 approve 5", ActorId(42), MessageRef(1)).is_err());
    }

    #[test]
    fn malformed_lines_are_validation_errors() {
        for line in ["@x /open", "@42", "loc 1", "press NOPE", "press   "] {
            let err = parse_line(line, ActorId(42), MessageRef(1)).unwrap_err();
            assert!(
                matches!(err, FieldcaseError::Validation(_)),
                "{line}: {err}"
            );
        }
    }

    #[test]
    fn prompts_show_their_buttons() {
        let text = prompt_text(&Prompt::AskAuthorization {
            case_id: CaseId(4),
            step: StepInfo {
                number: 6,
                title: "STEP 6 - CTO".to_string(),
                instructions: "photo".to_string(),
            },
        });
        assert!(text.starts_with("Do you need an authorization before STEP 6 - CTO?"));
        assert!(text.contains("[AUTH_ASK|4|6|YES] [AUTH_ASK|4|6|NO]"));
    }

    #[tokio::test]
    async fn review_lookup_prefers_latest_match() {
        let notifier = ConsoleNotifier::new([(ChatId(-1), ActorId(7))]);
        let keys = [
            AttemptKey::new(CaseId(1), StepNo::evidence(5), 1),
            AttemptKey::new(CaseId(1), StepNo::evidence(5), 2),
            AttemptKey::new(CaseId(1), StepNo::authorization(6), 1),
        ];
        notifier.reviews.lock().await.extend(keys);
        assert_eq!(notifier.find_review(Some((5, 1))).await, Some(keys[0]));
        assert_eq!(notifier.find_review(None).await, Some(keys[2]));
        assert_eq!(notifier.find_review(Some((9, 1))).await, None);
        let admin = notifier.is_administrator(ChatId(-1), ActorId(7)).await;
        assert!(admin.unwrap());
    }
}
