// SPDX-FileCopyrightText: 2026 Fieldcase Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios for the case workflow.
//!
//! Each test creates an isolated TestHarness with a temp SQLite database and
//! a mock notifier. Tests are independent and order-insensitive.

use fieldcase_config::model::WorkflowConfig;
use fieldcase_core::types::{
    Attempt, AttemptKey, AuthorizationMode, Case, CaseStatus, MessageRef, Phase, ReviewDecision,
    ReviewState, StepNo,
};
use fieldcase_core::{Action, FieldcaseError, Prompt};
use fieldcase_storage::queries::{attempts, media};
use fieldcase_test_utils::harness::{EVIDENCE_CHAT, SUMMARY_CHAT};
use fieldcase_test_utils::{Effect, TestHarness};
use fieldcase_workflow::{Advance, Reply, Submission};

async fn attempt(harness: &TestHarness, key: AttemptKey) -> Option<Attempt> {
    harness
        .service
        .database()
        .read(move |conn| attempts::get_attempt(conn, key))
        .await
        .unwrap()
}

async fn media_count(harness: &TestHarness, key: AttemptKey) -> usize {
    harness
        .service
        .database()
        .read(move |conn| media::count_media(conn, key))
        .await
        .unwrap()
}

async fn submit(harness: &TestHarness) -> Submission {
    match harness
        .say(&harness.technician(), "/submit")
        .await
        .unwrap()
        .value
    {
        Reply::Submitted(submission) => *submission,
        other => panic!("expected a submission, got {other:?}"),
    }
}

fn evidence_review(key: AttemptKey, decision: ReviewDecision) -> Action {
    Action::EvidenceReview {
        case_id: key.case_id,
        step: key.step.step(),
        attempt: key.attempt,
        decision,
    }
}

/// Send `items` photos for the current step and submit them.
async fn collect_and_submit(harness: &TestHarness, first_ref: i64, items: i64) -> Submission {
    for n in first_ref..first_ref + items {
        harness.photo(n).await.unwrap();
    }
    submit(harness).await
}

/// Approve the current step and decline the next authorization.
async fn approve_and_continue(harness: &TestHarness, key: AttemptKey) -> Case {
    let reviewer = harness.reviewer();
    let outcome = harness
        .press(&reviewer, evidence_review(key, ReviewDecision::Approve))
        .await
        .unwrap();
    let Reply::Approved(approval) = outcome.value else {
        panic!("expected an approval");
    };
    let Advance::NextStep { step } = approval.advance else {
        panic!("unexpected advance {:?}", approval.advance);
    };
    harness
        .decline_authorization(&approval.case, step)
        .await
        .unwrap()
}

// ---- Test 1: Submit and approve ----

#[tokio::test]
async fn test_three_items_submitted_then_approved_moves_to_next_authorization() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_at_evidence().await.unwrap();
    assert_eq!(case.phase, Phase::StepMedia { step: 5 });

    let submission = collect_and_submit(&harness, 1, 3).await;
    let key = AttemptKey::new(case.id, StepNo::evidence(5), 1);
    assert_eq!(submission.attempt.key, key);
    assert_eq!(submission.attempt.review_state(), ReviewState::Pending);
    assert_eq!(submission.summary.item_count, 3);
    assert_eq!(submission.case.phase, Phase::StepReview { step: 5 });

    let requests = harness.notifier.review_requests().await;
    assert_eq!(requests.len(), 1);
    let (requested, review_message) = requests[0];
    assert_eq!(requested, key);
    let stored = attempt(&harness, key).await.unwrap();
    assert_eq!(stored.review_message, Some(review_message));

    let reviewer = harness.reviewer();
    let outcome = harness
        .press(&reviewer, evidence_review(key, ReviewDecision::Approve))
        .await
        .unwrap();
    assert!(!outcome.has_warnings());
    let Reply::Approved(approval) = outcome.value else {
        panic!("expected an approval");
    };
    assert_eq!(approval.case.phase, Phase::AuthAsk { step: 6 });
    assert_eq!(approval.attempt.reviewed_by, Some(reviewer.actor_id));

    let effects = harness.notifier.effects().await;
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Edit { message, text, .. } if *message == review_message && text.starts_with("Approved")
    )));
    assert!(matches!(
        harness.notifier.last_prompt().await,
        Some(Prompt::AskAuthorization { step, .. }) if step.number == 6
    ));
}

// ---- Test 2: Rejection and retry ----

#[tokio::test]
async fn test_rejection_removes_items_and_opens_next_attempt() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_at_evidence().await.unwrap();
    let submission = collect_and_submit(&harness, 1, 3).await;
    let key = submission.attempt.key;

    let reviewer = harness.reviewer();
    let outcome = harness
        .press(&reviewer, evidence_review(key, ReviewDecision::Reject))
        .await
        .unwrap();
    let Reply::Rejected(rejection) = outcome.value else {
        panic!("expected a rejection");
    };
    assert_eq!(rejection.removed.len(), 3);
    assert_eq!(rejection.case.phase, Phase::StepMedia { step: 5 });
    assert_eq!(media_count(&harness, key).await, 0);

    let retry = attempt(&harness, AttemptKey::new(case.id, StepNo::evidence(5), 2))
        .await
        .unwrap();
    assert!(!retry.submitted);
    assert_eq!(retry.approved, None);

    let mut deleted = harness.notifier.deleted().await;
    deleted.sort_by_key(|m| m.0);
    assert_eq!(deleted, vec![MessageRef(1), MessageRef(2), MessageRef(3)]);
    assert!(harness
        .notifier
        .notices()
        .await
        .iter()
        .any(|n| n.contains("Evidence removed")));

    // The retry collects under attempt 2.
    let outcome = harness.photo(4).await.unwrap();
    let Reply::Stored(stored) = outcome.value else {
        panic!("expected a stored item");
    };
    assert_eq!(stored.item.key.attempt, 2);
}

// ---- Test 3: Concurrent decisions ----

#[tokio::test]
async fn test_concurrent_approve_and_reject_have_exactly_one_winner() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.open_at_evidence().await.unwrap();

    let mut next_ref = 1;
    for _ in 5..7 {
        let submission = collect_and_submit(&harness, next_ref, 1).await;
        next_ref += 1;
        approve_and_continue(&harness, submission.attempt.key).await;
    }
    let submission = collect_and_submit(&harness, next_ref, 2).await;
    let key = submission.attempt.key;
    assert_eq!(key.step, StepNo::evidence(7));
    assert_eq!(key.attempt, 1);

    let approve = {
        let service = harness.service.clone();
        let sender = harness.reviewer();
        tokio::spawn(async move {
            service.review(&sender, key, ReviewDecision::Approve).await
        })
    };
    let reject = {
        let service = harness.service.clone();
        let sender = harness.second_reviewer();
        tokio::spawn(async move {
            service.review(&sender, key, ReviewDecision::Reject).await
        })
    };
    let results = [approve.await.unwrap(), reject.await.unwrap()];

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(loser, FieldcaseError::StateConflict(_)));
    assert!(loser.to_string().contains("already reviewed"), "{loser}");

    let decided = attempt(&harness, key).await.unwrap();
    let approved_won = results[0].is_ok();
    assert_eq!(decided.approved, Some(approved_won));
}

// ---- Test 4: Per-attempt cap ----

#[tokio::test]
async fn test_ninth_item_is_rejected_and_count_stays_at_cap() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_at_evidence().await.unwrap();
    for n in 1..=8 {
        harness.photo(n).await.unwrap();
    }
    assert!(matches!(
        harness.notifier.last_prompt().await,
        Some(Prompt::CapReached { cap: 8, .. })
    ));

    let err = harness.photo(9).await.unwrap_err();
    assert!(matches!(err, FieldcaseError::Validation(_)));
    let key = AttemptKey::new(case.id, StepNo::evidence(5), 1);
    assert_eq!(media_count(&harness, key).await, 8);
}

#[tokio::test]
async fn test_configured_cap_applies_to_authorization_media() {
    let harness = TestHarness::builder()
        .with_max_media(4)
        .build()
        .await
        .unwrap();
    let case = harness.open_through_form().await.unwrap();
    let tech = harness.technician();
    harness
        .press(
            &tech,
            Action::AuthorizationAnswer {
                case_id: case.id,
                step: 5,
                wants_authorization: true,
            },
        )
        .await
        .unwrap();
    harness
        .press(
            &tech,
            Action::AuthorizationMode {
                case_id: case.id,
                step: 5,
                mode: AuthorizationMode::Media,
            },
        )
        .await
        .unwrap();
    for n in 1..=4 {
        harness.photo(n).await.unwrap();
    }
    let err = harness.photo(5).await.unwrap_err();
    assert!(matches!(err, FieldcaseError::Validation(_)));
    let key = AttemptKey::new(case.id, StepNo::authorization(5), 1);
    assert_eq!(media_count(&harness, key).await, 4);
}

// ---- Test 5: Authorization rejection reason ----

#[tokio::test]
async fn test_empty_reason_rearms_and_reason_finalizes_rejection() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_through_form().await.unwrap();
    let tech = harness.technician();
    let reviewer = harness.reviewer();

    harness
        .press(
            &tech,
            Action::AuthorizationAnswer {
                case_id: case.id,
                step: 5,
                wants_authorization: true,
            },
        )
        .await
        .unwrap();
    harness
        .press(
            &tech,
            Action::AuthorizationMode {
                case_id: case.id,
                step: 5,
                mode: AuthorizationMode::Text,
            },
        )
        .await
        .unwrap();
    let outcome = harness
        .say(&tech, "Landlord allows the drop")
        .await
        .unwrap();
    let Reply::Submitted(submission) = outcome.value else {
        panic!("expected the text to be submitted");
    };
    let key = submission.attempt.key;
    assert_eq!(key, AttemptKey::new(case.id, StepNo::authorization(5), 1));
    assert_eq!(
        submission.summary.authorization_text.as_deref(),
        Some("Landlord allows the drop")
    );
    let (_, review_message) = harness.notifier.review_requests().await[0];

    let reject = Action::AuthorizationReview {
        case_id: case.id,
        step: 5,
        attempt: 1,
        decision: ReviewDecision::Reject,
    };
    let outcome = harness.press(&reviewer, reject).await.unwrap();
    let Reply::ReasonRequested(request) = outcome.value else {
        panic!("expected a reason request");
    };
    assert_eq!(request.reply_to, Some(review_message));
    // Nothing is decided until the reason arrives.
    assert_eq!(attempt(&harness, key).await.unwrap().approved, None);

    let outcome = harness.say(&reviewer, "   ").await.unwrap();
    let Reply::ReasonRearmed(rearmed) = outcome.value else {
        panic!("expected the capture to be re-armed");
    };
    assert_eq!(rearmed, request);
    let unchanged = attempt(&harness, key).await.unwrap();
    assert_eq!(unchanged.reject_reason, None);
    assert_eq!(unchanged.approved, None);

    let outcome = harness
        .say(&reviewer, "No signature on the permit")
        .await
        .unwrap();
    let Reply::Rejected(rejection) = outcome.value else {
        panic!("expected the rejection to be finalized");
    };
    assert_eq!(
        rejection.attempt.reject_reason.as_deref(),
        Some("No signature on the permit")
    );
    assert_eq!(rejection.case.phase, Phase::AuthAsk { step: 5 });
    assert_eq!(rejection.retry.key.attempt, 2);

    let effects = harness.notifier.effects().await;
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Notice { text, reply_to, .. }
            if text.contains("Reason: No signature on the permit") && *reply_to == Some(review_message)
    )));

    // Further text from the reviewer is ordinary chat again.
    let outcome = harness.say(&reviewer, "thanks").await.unwrap();
    assert_eq!(outcome.value, Reply::Ignored);
}

#[tokio::test]
async fn test_competing_approval_disarms_reason_capture() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_through_form().await.unwrap();
    let tech = harness.technician();
    for action in [
        Action::AuthorizationAnswer {
            case_id: case.id,
            step: 5,
            wants_authorization: true,
        },
        Action::AuthorizationMode {
            case_id: case.id,
            step: 5,
            mode: AuthorizationMode::Text,
        },
    ] {
        harness.press(&tech, action).await.unwrap();
    }
    harness.say(&tech, "permit attached").await.unwrap();

    let review = |decision| Action::AuthorizationReview {
        case_id: case.id,
        step: 5,
        attempt: 1,
        decision,
    };
    harness
        .press(&harness.reviewer(), review(ReviewDecision::Reject))
        .await
        .unwrap();
    let outcome = harness
        .press(&harness.second_reviewer(), review(ReviewDecision::Approve))
        .await
        .unwrap();
    let Reply::Approved(approval) = outcome.value else {
        panic!("expected an approval");
    };
    assert_eq!(approval.advance, Advance::Authorized { step: 5 });

    // The first reviewer's next text is ordinary chat, not a late reason.
    let outcome = harness
        .say(&harness.reviewer(), "too blurry")
        .await
        .unwrap();
    assert_eq!(outcome.value, Reply::Ignored);
    let key = AttemptKey::new(case.id, StepNo::authorization(5), 1);
    let decided = attempt(&harness, key).await.unwrap();
    assert_eq!(decided.review_state(), ReviewState::Approved);
    assert_eq!(decided.reject_reason, None);
}

// ---- Test 6: Closing ----

#[tokio::test]
async fn test_approving_last_step_closes_case_and_blocks_new_items() {
    let harness = TestHarness::builder()
        .with_workflow(WorkflowConfig {
            last_evidence_step: 6,
            ..WorkflowConfig::default()
        })
        .with_routes()
        .build()
        .await
        .unwrap();
    let case = harness.open_at_evidence().await.unwrap();

    let submission = collect_and_submit(&harness, 1, 1).await;
    approve_and_continue(&harness, submission.attempt.key).await;
    let submission = collect_and_submit(&harness, 2, 1).await;
    let outcome = harness
        .press(
            &harness.reviewer(),
            evidence_review(submission.attempt.key, ReviewDecision::Approve),
        )
        .await
        .unwrap();
    let Reply::Approved(approval) = outcome.value else {
        panic!("expected an approval");
    };
    assert_eq!(approval.advance, Advance::Closed);
    assert_eq!(approval.case.status, CaseStatus::Closed);
    assert!(approval.case.finished_at.is_some());

    let effects = harness.notifier.effects().await;
    assert!(effects.contains(&Effect::CloseSummary {
        destination: SUMMARY_CHAT,
        case_id: case.id,
    }));

    let err = harness.photo(3).await.unwrap_err();
    assert!(matches!(err, FieldcaseError::NotFound(_)));
    assert!(harness.open_case().await.unwrap().is_none());
}

// ---- Test 7: Approval off ----

#[tokio::test]
async fn test_approval_off_auto_approves_submissions() {
    let harness = TestHarness::builder().build().await.unwrap();
    let outcome = harness
        .say(&harness.reviewer(), "/approval off")
        .await
        .unwrap();
    assert_eq!(outcome.value, Reply::ApprovalRequired(false));

    harness.open_at_evidence().await.unwrap();
    let submission = collect_and_submit(&harness, 1, 2).await;
    let approval = submission.approval.expect("auto approval");
    assert_eq!(approval.attempt.review_state(), ReviewState::Approved);
    assert_eq!(approval.attempt.reviewed_by, None);
    assert_eq!(approval.case.phase, Phase::AuthAsk { step: 6 });
    assert_eq!(submission.case.phase, Phase::AuthAsk { step: 6 });
    assert!(harness.notifier.review_requests().await.is_empty());

    let outcome = harness
        .say(&harness.technician(), "/approval")
        .await
        .unwrap();
    assert_eq!(outcome.value, Reply::ApprovalRequired(false));
}

// ---- Test 8: Permissions ----

#[tokio::test]
async fn test_only_administrators_review_and_only_technician_submits() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_at_evidence().await.unwrap();
    harness.photo(1).await.unwrap();

    let err = harness
        .press(
            &harness.reviewer(),
            Action::EvidenceDone {
                case_id: case.id,
                step: 5,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FieldcaseError::Permission(_)));

    let submission = submit(&harness).await;
    let err = harness
        .press(
            &harness.technician(),
            evidence_review(submission.attempt.key, ReviewDecision::Approve),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FieldcaseError::Permission(_)));

    let err = harness
        .say(&harness.technician(), "/approval off")
        .await
        .unwrap_err();
    assert!(matches!(err, FieldcaseError::Permission(_)));

    harness.notifier.fail_admin_checks(true);
    let err = harness
        .press(
            &harness.reviewer(),
            evidence_review(submission.attempt.key, ReviewDecision::Approve),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FieldcaseError::Permission(_)));
    let stored = attempt(&harness, submission.attempt.key).await.unwrap();
    assert_eq!(stored.approved, None);
}

// ---- Test 9: Side-effect failures ----

#[tokio::test]
async fn test_failed_deletes_are_warnings_and_rejection_commits() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_at_evidence().await.unwrap();
    let submission = collect_and_submit(&harness, 1, 2).await;

    harness.notifier.fail_deletes(true);
    let outcome = harness
        .press(
            &harness.reviewer(),
            evidence_review(submission.attempt.key, ReviewDecision::Reject),
        )
        .await
        .unwrap();
    assert!(outcome.has_warnings());
    assert!(outcome
        .warnings
        .iter()
        .all(|w| w.effect == "delete_message"));
    assert_eq!(outcome.warnings.len(), 2);
    assert!(harness
        .notifier
        .notices()
        .await
        .iter()
        .any(|n| n.contains("check the bot permissions")));

    let retry = attempt(&harness, AttemptKey::new(case.id, StepNo::evidence(5), 2)).await;
    assert!(retry.is_some());
}

#[tokio::test]
async fn test_failed_review_request_leaves_attempt_reviewable() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.open_at_evidence().await.unwrap();
    harness.photo(1).await.unwrap();

    harness.notifier.fail_sends(true);
    let outcome = harness.say(&harness.technician(), "/submit").await.unwrap();
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.effect == "send_review_request"));
    let Reply::Submitted(submission) = outcome.value else {
        panic!("expected a submission");
    };
    assert!(submission.attempt.submitted);

    harness.notifier.fail_sends(false);
    let outcome = harness
        .press(
            &harness.reviewer(),
            evidence_review(submission.attempt.key, ReviewDecision::Approve),
        )
        .await
        .unwrap();
    assert!(matches!(outcome.value, Reply::Approved(_)));
}

// ---- Test 10: Routing ----

#[tokio::test]
async fn test_items_are_copied_to_the_evidence_chat() {
    let harness = TestHarness::builder().with_routes().build().await.unwrap();
    harness.open_at_evidence().await.unwrap();
    harness.photo(1).await.unwrap();

    let copies: Vec<_> = harness
        .notifier
        .effects()
        .await
        .into_iter()
        .filter_map(|e| match e {
            Effect::CopyMedia {
                destination,
                caption,
                ..
            } => Some((destination, caption)),
            _ => None,
        })
        .collect();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].0, EVIDENCE_CHAT);
    assert!(copies[0].1.starts_with("EVIDENCE (STEP 5 - FACADE) attempt 1"));
    assert!(copies[0].1.contains("Subscriber: SUB-0042"));
}

// ---- Test 11: Invalid transitions ----

#[tokio::test]
async fn test_invalid_transitions_leave_state_untouched() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_through_form().await.unwrap();

    let err = harness.photo(1).await.unwrap_err();
    assert!(matches!(err, FieldcaseError::StateConflict(_)));

    harness.decline_authorization(&case, 5).await.unwrap();
    let err = harness
        .say(&harness.technician(), "/submit")
        .await
        .unwrap_err();
    assert!(matches!(err, FieldcaseError::Validation(_)));
    let current = harness.open_case().await.unwrap().unwrap();
    assert_eq!(current.phase, Phase::StepMedia { step: 5 });

    let err = harness
        .press(
            &harness.technician(),
            Action::AuthorizationAnswer {
                case_id: case.id,
                step: 5,
                wants_authorization: true,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FieldcaseError::StateConflict(_)));
}

#[tokio::test]
async fn test_reopen_resets_in_place_and_stales_pending_reviews() {
    let harness = TestHarness::builder().build().await.unwrap();
    let case = harness.open_at_evidence().await.unwrap();
    let submission = collect_and_submit(&harness, 1, 1).await;

    let outcome = harness.say(&harness.technician(), "/open").await.unwrap();
    let Reply::Opened(opened) = outcome.value else {
        panic!("expected the case to reopen");
    };
    assert!(opened.reset);
    assert_eq!(opened.case.id, case.id);
    assert_eq!(opened.case.phase, Phase::WaitTechnician);

    let err = harness
        .press(
            &harness.reviewer(),
            evidence_review(submission.attempt.key, ReviewDecision::Approve),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FieldcaseError::NotFound(_)));
}

#[tokio::test]
async fn test_cancel_then_status_reports_no_case() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.open_at_evidence().await.unwrap();
    let outcome = harness.say(&harness.technician(), "/cancel").await.unwrap();
    let Reply::Cancelled(case) = outcome.value else {
        panic!("expected a cancellation");
    };
    assert_eq!(case.status, CaseStatus::Cancelled);

    let outcome = harness.say(&harness.technician(), "/status").await.unwrap();
    let Reply::Status(report) = outcome.value else {
        panic!("expected a status report");
    };
    assert!(report.case.is_none());
    assert!(report.approval_required);
}
