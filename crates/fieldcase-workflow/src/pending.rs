// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-slot "next free text from this actor" requests.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{ActorId, AttemptKey, ChatId, PendingInput, PendingInputKind};
use fieldcase_storage::queries::pending;
use rusqlite::Connection;
use tracing::debug;

/// Correlates the next free text of an actor with a pending capture.
///
/// At most one request exists per (chat, actor, kind); setting a new one
/// overwrites the old.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingInputRegistry;

impl PendingInputRegistry {
    pub fn set(&self, conn: &Connection, input: &PendingInput) -> Result<(), FieldcaseError> {
        pending::upsert_pending(conn, input)?;
        debug!(
            chat_id = %input.chat_id,
            actor_id = %input.actor_id,
            kind = %input.kind,
            target = %input.target,
            "pending input armed"
        );
        Ok(())
    }

    /// Retrieve and remove the request. Callers run this inside the same
    /// transaction that consumes the captured value.
    pub fn pop(
        &self,
        conn: &Connection,
        chat_id: ChatId,
        actor_id: ActorId,
        kind: PendingInputKind,
    ) -> Result<Option<PendingInput>, FieldcaseError> {
        let Some(input) = pending::get_pending(conn, chat_id, actor_id, kind)? else {
            return Ok(None);
        };
        pending::delete_pending(conn, chat_id, actor_id, kind)?;
        Ok(Some(input))
    }

    /// Forget every request aimed at `key`, whoever armed it. Run once the
    /// attempt is decided.
    pub fn clear_attempt(&self, conn: &Connection, key: AttemptKey) -> Result<(), FieldcaseError> {
        let cleared = pending::delete_pending_for_attempt(conn, key)?;
        if cleared > 0 {
            debug!(target = %key, cleared, "pending inputs cleared");
        }
        Ok(())
    }
}
