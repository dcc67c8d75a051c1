// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by the notifier and the case store.

use async_trait::async_trait;

use crate::error::FieldcaseError;
use crate::types::{AdapterType, HealthStatus};

/// Common surface of the pieces a `CaseService` is wired from.
///
/// The console shell logs the name and health of every adapter before it
/// accepts the first case event.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    /// Whether this is the chat transport or the case store.
    fn adapter_type(&self) -> AdapterType;

    /// `Degraded` or `Unhealthy` means case events will fail or lose
    /// side effects until the adapter recovers.
    async fn health_check(&self) -> Result<HealthStatus, FieldcaseError>;

    async fn shutdown(&self) -> Result<(), FieldcaseError>;
}
