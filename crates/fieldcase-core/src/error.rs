// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Fieldcase evidence workflow.

use strum::Display;
use thiserror::Error;

/// The primary error type used across all Fieldcase traits and core operations.
///
/// The first four variants are domain results reported back to the actor
/// that triggered the operation. None of them leaves persisted state changed.
#[derive(Debug, Error)]
pub enum FieldcaseError {
    /// Malformed input, zero-item submission, or a full attempt.
    #[error("validation error: {0}")]
    Validation(String),

    /// Action attempted in the wrong phase, on a non-open case, or twice.
    #[error("state conflict: {0}")]
    StateConflict(String),

    /// Stale reference to a case, attempt or item that is no longer current.
    #[error("not found: {0}")]
    NotFound(String),

    /// The actor lacks the capability required for the action.
    #[error("permission denied: {0}")]
    Permission(String),

    /// A side effect against the chat transport failed.
    ///
    /// The workflow service never propagates this variant out of a committed
    /// transition; it is downgraded to a warning on the outcome.
    #[error("notifier error: {message}")]
    Notifier {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`FieldcaseError`], used when reporting results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    StateConflict,
    NotFound,
    Permission,
    SideEffect,
    Config,
    Storage,
    Internal,
}

impl FieldcaseError {
    /// Shorthand for building a [`FieldcaseError::Notifier`] without a source.
    pub fn notifier(message: impl Into<String>) -> Self {
        Self::Notifier {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::StateConflict(_) => ErrorKind::StateConflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Permission(_) => ErrorKind::Permission,
            Self::Notifier { .. } => ErrorKind::SideEffect,
            Self::Config(_) => ErrorKind::Config,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error is a domain result that should be shown to the
    /// originating actor rather than logged as a fault.
    pub fn is_domain(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation
                | ErrorKind::StateConflict
                | ErrorKind::NotFound
                | ErrorKind::Permission
        )
    }
}
