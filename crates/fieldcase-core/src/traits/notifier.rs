// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier trait: the chat transport as seen by the workflow.

use async_trait::async_trait;

use crate::error::FieldcaseError;
use crate::prompt::Prompt;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ActorId, Attempt, Case, ChatId, MediaItem, MessageRef, ReviewSummary, StepInfo};

/// Adapter for the messaging transport (sending, editing and deleting
/// messages, and answering capability questions).
///
/// Every failure is non-fatal to the workflow: the caller downgrades errors
/// to warnings once the state transition that triggered them has committed.
#[async_trait]
pub trait Notifier: PluginAdapter {
    /// Shows a prompt, with its buttons, in `chat`.
    async fn send_prompt(
        &self,
        chat: ChatId,
        prompt: &Prompt,
    ) -> Result<MessageRef, FieldcaseError>;

    /// Asks the technician for evidence of `step`.
    async fn send_evidence_prompt(
        &self,
        chat: ChatId,
        step: &StepInfo,
        cap: usize,
    ) -> Result<MessageRef, FieldcaseError> {
        self.send_prompt(
            chat,
            &Prompt::UploadEvidence {
                step: step.clone(),
                cap,
            },
        )
        .await
    }

    /// Sends a plain informational message, optionally as a reply.
    async fn send_notice(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageRef>,
    ) -> Result<MessageRef, FieldcaseError>;

    /// Asks reviewers to approve or reject a submitted attempt.
    ///
    /// Returns the message carrying the review buttons, so later decisions
    /// can edit it.
    async fn send_review_request(
        &self,
        chat: ChatId,
        attempt: &Attempt,
        summary: &ReviewSummary,
    ) -> Result<MessageRef, FieldcaseError>;

    async fn edit_message(
        &self,
        chat: ChatId,
        message: MessageRef,
        text: &str,
    ) -> Result<(), FieldcaseError>;

    async fn delete_message(&self, chat: ChatId, message: MessageRef) -> Result<(), FieldcaseError>;

    /// Whether `actor` administers `chat`.
    async fn is_administrator(&self, chat: ChatId, actor: ActorId) -> Result<bool, FieldcaseError>;

    /// Posts the summary of a closed case to `destination`.
    async fn send_close_summary(
        &self,
        destination: ChatId,
        case: &Case,
    ) -> Result<(), FieldcaseError>;

    /// Copies a stored evidence item to `destination` with a caption.
    async fn copy_media(
        &self,
        destination: ChatId,
        item: &MediaItem,
        caption: &str,
    ) -> Result<(), FieldcaseError>;
}
