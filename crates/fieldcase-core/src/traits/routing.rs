// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing collaborator: where copies and summaries of a chat are sent.

use crate::types::{ChatId, Routes};

/// Resolves destination chats for an origin chat.
///
/// Implementations are built from static configuration at startup and
/// handed to the workflow explicitly.
pub trait RouteResolver: Send + Sync {
    fn resolve(&self, origin: ChatId) -> Routes;
}
