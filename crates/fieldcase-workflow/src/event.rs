// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound events from the chat transport.

use std::str::FromStr;

use fieldcase_core::types::{ActorId, ChatId, GeoPoint, MessageRef, NewMediaItem};
use fieldcase_core::{Action, FieldcaseError};

use crate::render::parse_switch;

/// Who sent an event, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub chat_id: ChatId,
    pub actor_id: ActorId,
    pub username: Option<String>,
}

impl Sender {
    pub fn new(chat_id: ChatId, actor_id: ActorId) -> Self {
        Self {
            chat_id,
            actor_id,
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// Slash commands understood by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Open,
    Cancel,
    Status,
    /// `/approval` alone reports the current setting.
    Approval(Option<bool>),
    Submit,
}

impl FromStr for Command {
    type Err = FieldcaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let head = words.next().unwrap_or_default();
        // Group chats append the bot name: /open@fieldcase_bot
        let name = head
            .strip_prefix('/')
            .ok_or_else(|| FieldcaseError::Validation(format!("`{head}` is not a command")))?
            .split('@')
            .next()
            .unwrap_or_default();
        let command = match name {
            "open" | "start" => Command::Open,
            "cancel" => Command::Cancel,
            "status" => Command::Status,
            "submit" => Command::Submit,
            "approval" => match words.next() {
                None => Command::Approval(None),
                Some(value) => Command::Approval(Some(parse_switch(value).ok_or_else(|| {
                    FieldcaseError::Validation(format!(
                        "`{value}` is not on/off, 1/0, true/false or yes/no"
                    ))
                })?)),
            },
            other => {
                return Err(FieldcaseError::Validation(format!(
                    "unknown command `/{other}`"
                )));
            }
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Command(Command),
    Text { text: String, message: MessageRef },
    Media(NewMediaItem),
    Location(GeoPoint),
    Action(Action),
}

impl Event {
    /// Classify a text message: slash commands become [`Event::Command`].
    pub fn from_text(text: &str, message: MessageRef) -> Result<Self, FieldcaseError> {
        if text.trim_start().starts_with('/') {
            return text.trim().parse().map(Event::Command);
        }
        Ok(Event::Text {
            text: text.to_string(),
            message,
        })
    }

    /// Decode a button payload.
    pub fn from_payload(payload: &str) -> Result<Self, FieldcaseError> {
        Action::decode(payload).map(Event::Action)
    }
}
