// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Committed results with the side-effect warnings raised after commit.

use std::fmt;

use fieldcase_core::FieldcaseError;
use tracing::warn;

/// A transport side effect that failed after the transition committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectWarning {
    /// Short name of the side effect, e.g. `delete_message`.
    pub effect: &'static str,
    pub message: String,
}

impl fmt::Display for SideEffectWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.effect, self.message)
    }
}

/// A committed domain result plus the warnings raised while notifying.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<SideEffectWarning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }
}

/// Collects warnings while the post-commit side effects run.
#[derive(Debug, Default)]
pub struct Warnings(Vec<SideEffectWarning>);

impl Warnings {
    /// Keep the value of a successful side effect, or record the failure.
    pub fn note<T>(
        &mut self,
        effect: &'static str,
        result: Result<T, FieldcaseError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(effect, error = %e, "side effect failed after commit");
                self.0.push(SideEffectWarning {
                    effect,
                    message: e.to_string(),
                });
                None
            }
        }
    }

    pub fn finish<T>(self, value: T) -> Outcome<T> {
        Outcome {
            value,
            warnings: self.0,
        }
    }
}
