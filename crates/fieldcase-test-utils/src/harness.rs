// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end workflow tests.
//!
//! `TestHarness` assembles a [`CaseService`] over a temp SQLite database
//! and a [`MockNotifier`], and offers shortcuts to drive a case through the
//! form into its evidence steps.

use std::sync::Arc;

use fieldcase_config::model::{ChatRouteConfig, RoutingConfig, StorageConfig, WorkflowConfig};
use fieldcase_core::types::{
    ActorId, Case, ChatId, GeoPoint, MediaKind, MessageRef, NewMediaItem, Phase,
};
use fieldcase_core::{Action, FieldcaseError, StorageAdapter};
use fieldcase_storage::SqliteStorage;
use fieldcase_workflow::{CaseService, Event, Outcome, Reply, Sender, StaticRouteResolver};

use crate::mock_notifier::MockNotifier;

/// Chat every harness case lives in.
pub const CHAT: ChatId = ChatId(-1001);
/// Technician driving harness cases.
pub const TECHNICIAN: ActorId = ActorId(42);
/// Administrator of [`CHAT`].
pub const REVIEWER: ActorId = ActorId(7);
/// Second administrator of [`CHAT`].
pub const SECOND_REVIEWER: ActorId = ActorId(8);
/// Chat receiving evidence copies when routes are enabled.
pub const EVIDENCE_CHAT: ChatId = ChatId(-2002);
/// Chat receiving close summaries when routes are enabled.
pub const SUMMARY_CHAT: ChatId = ChatId(-3003);

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    workflow: WorkflowConfig,
    routing: RoutingConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            workflow: WorkflowConfig::default(),
            routing: RoutingConfig::default(),
        }
    }

    pub fn with_workflow(mut self, workflow: WorkflowConfig) -> Self {
        self.workflow = workflow;
        self
    }

    pub fn with_max_media(mut self, cap: usize) -> Self {
        self.workflow.max_media_per_attempt = cap;
        self
    }

    /// Route [`CHAT`] to [`EVIDENCE_CHAT`] and [`SUMMARY_CHAT`].
    pub fn with_routes(mut self) -> Self {
        self.routing.chats.insert(
            CHAT.to_string(),
            ChatRouteConfig {
                evidence: Some(EVIDENCE_CHAT.0),
                summary: Some(SUMMARY_CHAT.0),
            },
        );
        self
    }

    /// Build the harness, creating a fresh on-disk database.
    pub async fn build(self) -> Result<TestHarness, FieldcaseError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| FieldcaseError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;

        let notifier = Arc::new(
            MockNotifier::new()
                .with_admin(CHAT, REVIEWER)
                .with_admin(CHAT, SECOND_REVIEWER),
        );
        let routes = Arc::new(StaticRouteResolver::from_config(&self.routing)?);
        let service = CaseService::new(
            storage.database()?,
            Arc::new(self.workflow),
            notifier.clone(),
            routes,
        );

        Ok(TestHarness {
            service: Arc::new(service),
            notifier,
            storage,
            _temp_dir: temp_dir,
        })
    }
}

/// A wired workflow over a temp database and a mock notifier.
pub struct TestHarness {
    pub service: Arc<CaseService>,
    pub notifier: Arc<MockNotifier>,
    pub storage: SqliteStorage,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn technician(&self) -> Sender {
        Sender::new(CHAT, TECHNICIAN).with_username("ana")
    }

    pub fn reviewer(&self) -> Sender {
        Sender::new(CHAT, REVIEWER)
    }

    pub fn second_reviewer(&self) -> Sender {
        Sender::new(CHAT, SECOND_REVIEWER)
    }

    pub async fn send(
        &self,
        sender: &Sender,
        event: Event,
    ) -> Result<Outcome<Reply>, FieldcaseError> {
        self.service.handle_event(sender, event).await
    }

    /// Send a slash command or free text as `sender`.
    pub async fn say(&self, sender: &Sender, text: &str) -> Result<Outcome<Reply>, FieldcaseError> {
        let event = Event::from_text(text, self.fresh_message())?;
        self.send(sender, event).await
    }

    pub async fn press(
        &self,
        sender: &Sender,
        action: Action,
    ) -> Result<Outcome<Reply>, FieldcaseError> {
        self.send(sender, Event::Action(action)).await
    }

    /// Upload one photo as the technician; `n` doubles as its message ref.
    pub async fn photo(&self, n: i64) -> Result<Outcome<Reply>, FieldcaseError> {
        let item = NewMediaItem {
            kind: MediaKind::Photo,
            file_id: format!("photo-{n}"),
            file_unique_id: Some(format!("unique-{n}")),
            message_ref: MessageRef(n),
            meta: serde_json::json!({ "caption": null }),
        };
        self.send(&self.technician(), Event::Media(item)).await
    }

    /// Open a case and fill the form, leaving it at the authorization
    /// question of the first evidence step.
    pub async fn open_through_form(&self) -> Result<Case, FieldcaseError> {
        let tech = self.technician();
        self.say(&tech, "/open").await?;
        self.say(&tech, "ANA").await?;
        let service = self
            .service
            .config()
            .service_types
            .first()
            .cloned()
            .unwrap_or_default();
        self.press(&tech, Action::SelectService { service }).await?;
        self.say(&tech, "SUB-0042").await?;
        let outcome = self
            .send(
                &tech,
                Event::Location(GeoPoint {
                    latitude: -12.0464,
                    longitude: -77.0428,
                }),
            )
            .await?;
        match outcome.value {
            Reply::Advanced(case) => Ok(case),
            other => Err(FieldcaseError::Internal(format!(
                "form did not complete: {other:?}"
            ))),
        }
    }

    /// Open a case, fill the form and decline the first authorization.
    pub async fn open_at_evidence(&self) -> Result<Case, FieldcaseError> {
        let case = self.open_through_form().await?;
        let Phase::AuthAsk { step } = case.phase else {
            return Err(FieldcaseError::Internal(format!(
                "unexpected phase {}",
                case.phase
            )));
        };
        self.decline_authorization(&case, step).await
    }

    pub async fn decline_authorization(
        &self,
        case: &Case,
        step: u32,
    ) -> Result<Case, FieldcaseError> {
        let outcome = self
            .press(
                &self.technician(),
                Action::AuthorizationAnswer {
                    case_id: case.id,
                    step,
                    wants_authorization: false,
                },
            )
            .await?;
        match outcome.value {
            Reply::Advanced(case) => Ok(case),
            other => Err(FieldcaseError::Internal(format!(
                "authorization answer gave {other:?}"
            ))),
        }
    }

    /// Current open case of the technician.
    pub async fn open_case(&self) -> Result<Option<Case>, FieldcaseError> {
        Ok(self.service.status(&self.technician()).await?.case)
    }

    fn fresh_message(&self) -> MessageRef {
        use std::sync::atomic::{AtomicI64, Ordering};
        static NEXT: AtomicI64 = AtomicI64::new(50_000);
        MessageRef(NEXT.fetch_add(1, Ordering::SeqCst))
    }
}
