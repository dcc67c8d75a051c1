// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Fieldcase evidence workflow.
//!
//! This crate provides the domain types, the error taxonomy, the typed
//! action codec, and the adapter traits (notifier, storage, routing) that
//! the rest of the workspace builds on.

pub mod action;
pub mod error;
pub mod prompt;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use action::Action;
pub use error::{ErrorKind, FieldcaseError};
pub use prompt::Prompt;
pub use types::{AdapterType, HealthStatus};

pub use traits::{Notifier, PluginAdapter, RouteResolver, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_through_strings() {
        use std::str::FromStr;

        for variant in [AdapterType::Notifier, AdapterType::Storage] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_notifier<T: Notifier>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_route_resolver<T: RouteResolver>() {}
    }

    #[test]
    fn health_status_variants() {
        assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), HealthStatus::Healthy);
    }
}
