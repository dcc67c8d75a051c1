// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle of the case store.

use async_trait::async_trait;

use crate::error::FieldcaseError;
use crate::traits::adapter::PluginAdapter;

/// Owner of the database holding cases, attempts, media and pending inputs.
///
/// Workflow operations do not go through this trait; they run inside the
/// store's transactional handle. The trait only brings the schema up to
/// date before the first event and checkpoints it on the way out.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Open the database and apply outstanding migrations. A second call
    /// on the same adapter is an error.
    async fn initialize(&self) -> Result<(), FieldcaseError>;

    /// Checkpoint the write-ahead log before the process exits.
    async fn close(&self) -> Result<(), FieldcaseError>;
}
