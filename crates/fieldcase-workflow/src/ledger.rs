// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only record of evidence items per attempt.

use fieldcase_core::FieldcaseError;
use fieldcase_core::types::{AttemptKey, AuthorizationText, MediaItem, MessageRef, NewMediaItem};
use fieldcase_storage::queries::{auth_text, media};
use rusqlite::Connection;

/// Items removed from an attempt by a rejection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovedEvidence {
    pub media: Vec<MediaItem>,
    pub texts: Vec<AuthorizationText>,
}

impl RemovedEvidence {
    pub fn is_empty(&self) -> bool {
        self.media.is_empty() && self.texts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.media.len() + self.texts.len()
    }

    /// Transport messages that carried the removed items.
    pub fn message_refs(&self) -> Vec<MessageRef> {
        self.media
            .iter()
            .map(|m| m.message_ref)
            .chain(self.texts.iter().map(|t| t.message_ref))
            .collect()
    }
}

/// Ledger of media items and authorization texts, keyed by attempt.
///
/// Items are never mutated after append; the only removal is the bulk
/// [`MediaLedger::delete_all`] used by rejections.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaLedger;

impl MediaLedger {
    /// Number of items (media plus text) stored under `key`.
    pub fn count(&self, conn: &Connection, key: AttemptKey) -> Result<usize, FieldcaseError> {
        let media = media::count_media(conn, key)?;
        let texts = if key.step.is_authorization() {
            auth_text::list_auth_text(conn, key)?.len()
        } else {
            0
        };
        Ok(media + texts)
    }

    pub fn append(
        &self,
        conn: &Connection,
        key: AttemptKey,
        item: &NewMediaItem,
        now: &str,
    ) -> Result<MediaItem, FieldcaseError> {
        let id = media::insert_media(conn, key, item, now)?;
        Ok(MediaItem {
            id,
            key,
            kind: item.kind,
            file_id: item.file_id.clone(),
            file_unique_id: item.file_unique_id.clone(),
            message_ref: item.message_ref,
            meta: item.meta.clone(),
            created_at: now.to_string(),
        })
    }

    pub fn append_text(
        &self,
        conn: &Connection,
        key: AttemptKey,
        text: &str,
        message_ref: MessageRef,
        now: &str,
    ) -> Result<AuthorizationText, FieldcaseError> {
        let id = auth_text::insert_auth_text(conn, key, text, message_ref, now)?;
        Ok(AuthorizationText {
            id,
            key,
            text: text.to_string(),
            message_ref,
            created_at: now.to_string(),
        })
    }

    pub fn list_all(
        &self,
        conn: &Connection,
        key: AttemptKey,
    ) -> Result<Vec<MediaItem>, FieldcaseError> {
        media::list_media(conn, key)
    }

    pub fn list_texts(
        &self,
        conn: &Connection,
        key: AttemptKey,
    ) -> Result<Vec<AuthorizationText>, FieldcaseError> {
        if key.step.is_authorization() {
            auth_text::list_auth_text(conn, key)
        } else {
            Ok(Vec::new())
        }
    }

    /// Remove every item of `key`, returning what was removed.
    pub fn delete_all(
        &self,
        conn: &Connection,
        key: AttemptKey,
    ) -> Result<RemovedEvidence, FieldcaseError> {
        let removed = RemovedEvidence {
            media: self.list_all(conn, key)?,
            texts: self.list_texts(conn, key)?,
        };
        media::delete_media(conn, key)?;
        if key.step.is_authorization() {
            auth_text::delete_auth_text(conn, key)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{conn_with_case, photo};
    use fieldcase_core::types::{StepNo, now_utc};
    use fieldcase_storage::queries::attempts;

    #[test]
    fn counts_media_and_text_together() {
        let (conn, case) = conn_with_case();
        let now = now_utc();
        let key = AttemptKey::new(case.id, StepNo::authorization(6), 1);
        attempts::insert_attempt(&conn, key, &now).unwrap();

        let ledger = MediaLedger;
        ledger.append(&conn, key, &photo(10), &now).unwrap();
        ledger
            .append_text(&conn, key, "permit from landlord", MessageRef(11), &now)
            .unwrap();
        assert_eq!(ledger.count(&conn, key).unwrap(), 2);

        let removed = ledger.delete_all(&conn, key).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(removed.message_refs(), vec![MessageRef(10), MessageRef(11)]);
        assert_eq!(ledger.count(&conn, key).unwrap(), 0);
    }

    #[test]
    fn delete_on_empty_attempt_removes_nothing() {
        let (conn, case) = conn_with_case();
        let now = now_utc();
        let key = AttemptKey::new(case.id, StepNo::evidence(5), 1);
        attempts::insert_attempt(&conn, key, &now).unwrap();
        let removed = MediaLedger.delete_all(&conn, key).unwrap();
        assert!(removed.is_empty());
    }
}
