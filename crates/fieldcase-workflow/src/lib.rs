// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Case and attempt state machine for field-technician evidence.
//!
//! Components, leaves first:
//! - [`MediaLedger`]: append-only evidence items per attempt
//! - [`StepAttemptTracker`]: attempt numbering, caps and submission
//! - [`AuthorizationSubflow`]: the optional authorization detour before a step
//! - [`PendingInputRegistry`]: captures of a reviewer's next free text
//! - [`ReviewGate`]: exactly-once approve/reject
//! - [`CaseManager`]: the case lifecycle composing all of the above
//!
//! [`CaseService`] wraps them with transactions and transport side effects.

pub mod attempts;
pub mod authorization;
pub mod case;
pub mod event;
pub mod ledger;
pub mod outcome;
pub mod pending;
pub mod render;
pub mod review;
pub mod routing;
pub mod service;

pub use attempts::{AppendedItem, StepAttemptTracker};
pub use authorization::AuthorizationSubflow;
pub use case::{Advance, CaseManager, OpenedCase};
pub use event::{Command, Event, Sender};
pub use ledger::{MediaLedger, RemovedEvidence};
pub use outcome::{Outcome, SideEffectWarning};
pub use pending::PendingInputRegistry;
pub use render::StatusReport;
pub use review::{Approval, ReasonCapture, Rejection, ReviewGate};
pub use routing::StaticRouteResolver;
pub use service::{CaseService, Reply, Submission};
