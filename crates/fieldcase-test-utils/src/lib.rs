// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Fieldcase integration tests.
//!
//! # Components
//!
//! - [`MockNotifier`] - Records every transport side effect and can be told to fail
//! - [`TestHarness`] - Temp database, configuration and a wired [`fieldcase_workflow::CaseService`]

pub mod harness;
pub mod mock_notifier;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_notifier::{Effect, MockNotifier};
