// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier for deterministic testing.
//!
//! `MockNotifier` implements `Notifier` by recording every call as an
//! [`Effect`]. Sends, deletes and administrator checks can be switched to
//! fail so tests can observe how the workflow downgrades those failures.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use fieldcase_core::traits::adapter::PluginAdapter;
use fieldcase_core::traits::notifier::Notifier;
use fieldcase_core::types::{
    ActorId, AdapterType, Attempt, AttemptKey, Case, CaseId, ChatId, HealthStatus, MediaItem,
    MessageRef, ReviewSummary,
};
use fieldcase_core::{FieldcaseError, Prompt};

/// One recorded side effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Prompt {
        chat: ChatId,
        prompt: Prompt,
        message: MessageRef,
    },
    Notice {
        chat: ChatId,
        text: String,
        reply_to: Option<MessageRef>,
    },
    ReviewRequest {
        chat: ChatId,
        key: AttemptKey,
        summary: ReviewSummary,
        message: MessageRef,
    },
    Edit {
        chat: ChatId,
        message: MessageRef,
        text: String,
    },
    Delete {
        chat: ChatId,
        message: MessageRef,
    },
    CloseSummary {
        destination: ChatId,
        case_id: CaseId,
    },
    CopyMedia {
        destination: ChatId,
        item_id: i64,
        caption: String,
    },
}

/// A mock chat transport for testing.
pub struct MockNotifier {
    effects: Arc<Mutex<Vec<Effect>>>,
    admins: HashSet<(ChatId, ActorId)>,
    next_message: AtomicI64,
    fail_sends: AtomicBool,
    fail_deletes: AtomicBool,
    fail_admin_checks: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            effects: Arc::new(Mutex::new(Vec::new())),
            admins: HashSet::new(),
            next_message: AtomicI64::new(1000),
            fail_sends: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_admin_checks: AtomicBool::new(false),
        }
    }

    /// Make `actor` an administrator of `chat`.
    pub fn with_admin(mut self, chat: ChatId, actor: ActorId) -> Self {
        self.admins.insert((chat, actor));
        self
    }

    /// Make every send (prompts, notices, review requests, copies, summaries) fail.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make `is_administrator` return an error instead of an answer.
    pub fn fail_admin_checks(&self, fail: bool) {
        self.fail_admin_checks.store(fail, Ordering::SeqCst);
    }

    /// All effects recorded so far, in call order.
    pub async fn effects(&self) -> Vec<Effect> {
        self.effects.lock().await.clone()
    }

    pub async fn prompts(&self) -> Vec<Prompt> {
        self.effects
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                Effect::Prompt { prompt, .. } => Some(prompt.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn last_prompt(&self) -> Option<Prompt> {
        self.prompts().await.pop()
    }

    pub async fn notices(&self) -> Vec<String> {
        self.effects
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                Effect::Notice { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Review requests as (attempt, message carrying the buttons).
    pub async fn review_requests(&self) -> Vec<(AttemptKey, MessageRef)> {
        self.effects
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                Effect::ReviewRequest { key, message, .. } => Some((*key, *message)),
                _ => None,
            })
            .collect()
    }

    pub async fn deleted(&self) -> Vec<MessageRef> {
        self.effects
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                Effect::Delete { message, .. } => Some(*message),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.effects.lock().await.clear();
    }

    fn next_ref(&self) -> MessageRef {
        MessageRef(self.next_message.fetch_add(1, Ordering::SeqCst))
    }

    fn check_send(&self, what: &str) -> Result<(), FieldcaseError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(FieldcaseError::notifier(format!("mock {what} failure")));
        }
        Ok(())
    }

    async fn record(&self, effect: Effect) {
        self.effects.lock().await.push(effect);
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
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
impl Notifier for MockNotifier {
    async fn send_prompt(
        &self,
        chat: ChatId,
        prompt: &Prompt,
    ) -> Result<MessageRef, FieldcaseError> {
        self.check_send("send")?;
        let message = self.next_ref();
        self.record(Effect::Prompt {
            chat,
            prompt: prompt.clone(),
            message,
        })
        .await;
        Ok(message)
    }

    async fn send_notice(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef, FieldcaseError> {
        self.check_send("send")?;
        self.record(Effect::Notice {
            chat,
            text: text.to_string(),
            reply_to,
        })
        .await;
        Ok(self.next_ref())
    }

    async fn send_review_request(
        &self,
        chat: ChatId,
        attempt: &Attempt,
        summary: &ReviewSummary,
    ) -> Result<MessageRef, FieldcaseError> {
        self.check_send("review request")?;
        let message = self.next_ref();
        self.record(Effect::ReviewRequest {
            chat,
            key: attempt.key,
            summary: summary.clone(),
            message,
        })
        .await;
        Ok(message)
    }

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), FieldcaseError> {
        self.check_send("edit")?;
        self.record(Effect::Edit {
            chat,
            message,
            text: text.to_string(),
        })
        .await;
        Ok(())
    }

    async fn delete_message(
        &self,
        chat: ChatId,
        message: MessageRef,
    ) -> Result<(), FieldcaseError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(FieldcaseError::notifier("message can't be deleted"));
        }
        self.record(Effect::Delete { chat, message }).await;
        Ok(())
    }

    async fn is_administrator(&self, chat: ChatId, actor: ActorId) -> Result<bool, FieldcaseError> {
        if self.fail_admin_checks.load(Ordering::SeqCst) {
            return Err(FieldcaseError::notifier("administrator list unavailable"));
        }
        Ok(self.admins.contains(&(chat, actor)))
    }

    async fn send_close_summary(
        &self,
        destination: ChatId,
        case: &Case,
    ) -> Result<(), FieldcaseError> {
        self.check_send("summary")?;
        self.record(Effect::CloseSummary {
            destination,
            case_id: case.id,
        })
        .await;
        Ok(())
    }

    async fn copy_media(
        &self,
        destination: ChatId,
        item: &MediaItem,
        caption: &str,
    ) -> Result<(), FieldcaseError> {
        self.check_send("copy")?;
        self.record(Effect::CopyMedia {
            destination,
            item_id: item.id,
            caption: caption.to_string(),
        })
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_prompts_with_fresh_refs() {
        let notifier = MockNotifier::new();
        let first = notifier
            .send_prompt(ChatId(1), &Prompt::EnterSubscriberCode)
            .await
            .unwrap();
        let second = notifier
            .send_prompt(ChatId(1), &Prompt::ShareLocation)
            .await
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(notifier.last_prompt().await, Some(Prompt::ShareLocation));
    }

    #[tokio::test]
    async fn failures_are_notifier_errors() {
        let notifier = MockNotifier::new();
        notifier.fail_deletes(true);
        let err = notifier
            .delete_message(ChatId(1), MessageRef(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FieldcaseError::Notifier { .. }));
        assert!(notifier.deleted().await.is_empty());
    }

    #[tokio::test]
    async fn administrators_are_per_chat() {
        let (one, two) = (ChatId(1), ChatId(2));
        let notifier = MockNotifier::new().with_admin(one, ActorId(7));
        assert!(notifier.is_administrator(one, ActorId(7)).await.unwrap());
        assert!(!notifier.is_administrator(two, ActorId(7)).await.unwrap());
        notifier.fail_admin_checks(true);
        assert!(notifier.is_administrator(one, ActorId(7)).await.is_err());
    }
}
