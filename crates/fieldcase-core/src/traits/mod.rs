// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod notifier;
pub mod routing;
pub mod storage;

pub use adapter::PluginAdapter;
pub use notifier::Notifier;
pub use routing::RouteResolver;
pub use storage::StorageAdapter;
