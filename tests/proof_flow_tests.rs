// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Proof flow tests: photo, location and scan proofs end to end.

use chrono::Utc;
use quest_tracker::db::tables;
use quest_tracker::error::AppError;
use quest_tracker::models::achievement::FIRST_COMPLETION;
use quest_tracker::models::{Coordinate, QuestBundle};
use quest_tracker::services::{CompletionOutcome, ProofOutcome, QuestProgress};
use std::collections::BTreeSet;

mod common;
use common::{ctx, draft, location, photo, scan, seed_quest, test_engine};

const BEAN: (f64, f64) = (41.8827, -87.6233);

fn bean() -> Coordinate {
    Coordinate::new(BEAN.0, BEAN.1)
}

/// About 30 m north of the target.
fn near_bean() -> Coordinate {
    Coordinate::new(BEAN.0 + 0.00027, BEAN.1)
}

async fn photo_then_location(engine: &quest_tracker::QuestEngine) -> QuestBundle {
    seed_quest(
        engine,
        vec![photo("A black bike"), location("The Bean", BEAN.0, BEAN.1)],
    )
    .await
}

#[tokio::test]
async fn test_two_users_complete_photo_and_location_quest() {
    let (engine, _, _) = test_engine();
    let bundle = photo_then_location(&engine).await;
    let (s1, s2) = (&bundle.subquests[0], &bundle.subquests[1]);

    // U: photo judged YES
    let u = ctx("U");
    let mut u_progress = engine.quests.load_progress(&u, &bundle).await.unwrap();
    let outcome = engine
        .proofs
        .submit_photo(&u, &mut u_progress, s1, vec![0xFF, 0xD8, 0xFF])
        .await
        .unwrap();
    assert_eq!(
        outcome.completion(),
        Some(&CompletionOutcome::Incomplete {
            submitted: BTreeSet::from([s1.id])
        })
    );

    // U: proximity pass completes first
    let outcome = engine
        .proofs
        .submit_location(&u, &mut u_progress, s2, near_bean())
        .await
        .unwrap();
    match outcome {
        ProofOutcome::Accepted {
            completion,
            granted,
            ..
        } => {
            assert_eq!(completion, CompletionOutcome::NewlyCompleted { rank: 0 });
            assert_eq!(granted, vec![FIRST_COMPLETION]);
        }
        other => panic!("Expected acceptance, got {:?}", other),
    }

    // V finishes second and gets no first-place achievement
    let v = ctx("V");
    let mut v_progress = engine.quests.load_progress(&v, &bundle).await.unwrap();
    engine
        .proofs
        .submit_photo(&v, &mut v_progress, s1, vec![1, 2, 3])
        .await
        .unwrap();
    let outcome = engine
        .proofs
        .submit_location(&v, &mut v_progress, s2, bean())
        .await
        .unwrap();
    match outcome {
        ProofOutcome::Accepted {
            completion,
            granted,
            ..
        } => {
            assert_eq!(completion, CompletionOutcome::NewlyCompleted { rank: 1 });
            assert!(granted.is_empty());
        }
        other => panic!("Expected acceptance, got {:?}", other),
    }

    let v_achievements = engine.db.get_achievements("V").await.unwrap();
    assert!(v_achievements.is_empty());
}

#[tokio::test]
async fn test_photo_upload_path_and_judge_question() {
    let (engine, memory, oracle) = test_engine();
    let bundle = photo_then_location(&engine).await;
    let s1 = &bundle.subquests[0];
    let u = ctx("U");
    let mut progress = QuestProgress::for_bundle(&bundle);

    let outcome = engine
        .proofs
        .submit_photo(&u, &mut progress, s1, vec![9, 9, 9])
        .await
        .unwrap();

    let path = format!("U/{}/{}.jpg", bundle.quest.id, s1.id);
    assert_eq!(memory.object("quest-upload", &path), Some(vec![9, 9, 9]));
    match outcome {
        ProofOutcome::Accepted { image_url, .. } => assert_eq!(
            image_url.as_deref(),
            Some(format!("memory://quest-upload/{}", path).as_str())
        ),
        other => panic!("Expected acceptance, got {:?}", other),
    }

    let calls = oracle.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["image"], path.as_str());
    assert_eq!(
        calls[0]["question"],
        "Does the image match the following description? Reply YES or NO. A black bike"
    );
}

#[tokio::test]
async fn test_judge_no_is_a_rejection_without_side_effects() {
    let (engine, memory, oracle) = test_engine();
    let bundle = photo_then_location(&engine).await;
    oracle.set_answer("NO");
    let u = ctx("U");
    let mut progress = QuestProgress::for_bundle(&bundle);

    let outcome = engine
        .proofs
        .submit_photo(&u, &mut progress, &bundle.subquests[0], vec![1])
        .await
        .unwrap();

    assert!(matches!(outcome, ProofOutcome::Rejected));
    assert!(progress.submitted.is_empty());
    assert_eq!(memory.row_count(tables::SUBMISSIONS), 0);
}

#[tokio::test]
async fn test_judge_transport_failure_is_retryable_and_records_nothing() {
    let (engine, memory, oracle) = test_engine();
    let bundle = photo_then_location(&engine).await;
    oracle.fail("function timed out");
    let u = ctx("U");
    let mut progress = QuestProgress::for_bundle(&bundle);

    let err = engine
        .proofs
        .submit_photo(&u, &mut progress, &bundle.subquests[0], vec![1])
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(progress.submitted.is_empty());
    assert_eq!(memory.row_count(tables::SUBMISSIONS), 0);

    // Retry once the judge is back
    oracle.set_answer("YES");
    let outcome = engine
        .proofs
        .submit_photo(&u, &mut progress, &bundle.subquests[0], vec![1])
        .await
        .unwrap();
    assert!(outcome.is_accepted());
}

#[tokio::test]
async fn test_empty_image_is_a_validation_error() {
    let (engine, _, oracle) = test_engine();
    let bundle = photo_then_location(&engine).await;
    let mut progress = QuestProgress::for_bundle(&bundle);

    let err = engine
        .proofs
        .submit_photo(&ctx("U"), &mut progress, &bundle.subquests[0], Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(oracle.calls().is_empty());
}

#[tokio::test]
async fn test_location_out_of_range_reports_distance() {
    let (engine, memory, _) = test_engine();
    let bundle = photo_then_location(&engine).await;
    let mut progress = QuestProgress::for_bundle(&bundle);
    let willis = Coordinate::new(41.8789, -87.6359);

    let outcome = engine
        .proofs
        .submit_location(&ctx("U"), &mut progress, &bundle.subquests[1], willis)
        .await
        .unwrap();

    match outcome {
        ProofOutcome::OutOfRange { distance_meters } => {
            assert!(distance_meters.unwrap() > 1_000.0);
        }
        other => panic!("Expected OutOfRange, got {:?}", other),
    }
    assert_eq!(memory.row_count(tables::SUBMISSIONS), 0);
}

#[tokio::test]
async fn test_location_with_nan_position_never_passes() {
    let (engine, _, _) = test_engine();
    let bundle = photo_then_location(&engine).await;
    let mut progress = QuestProgress::for_bundle(&bundle);

    let outcome = engine
        .proofs
        .submit_location(
            &ctx("U"),
            &mut progress,
            &bundle.subquests[1],
            Coordinate::new(f64::NAN, f64::NAN),
        )
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        ProofOutcome::OutOfRange {
            distance_meters: None
        }
    ));
}

#[tokio::test]
async fn test_wrong_proof_kind_is_rejected_before_any_call() {
    let (engine, _, oracle) = test_engine();
    let bundle = photo_then_location(&engine).await;
    let mut progress = QuestProgress::for_bundle(&bundle);

    let err = engine
        .proofs
        .submit_photo(&ctx("U"), &mut progress, &bundle.subquests[1], vec![1])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert!(oracle.calls().is_empty());
}

#[tokio::test]
async fn test_scan_code_comparison_trims_whitespace() {
    let (engine, _, _) = test_engine();
    let bundle = seed_quest(&engine, vec![scan("Find the plaque", "MUSEUM-42")]).await;
    let subquest = &bundle.subquests[0];
    let u = ctx("U");
    let mut progress = QuestProgress::for_bundle(&bundle);

    let wrong = engine
        .proofs
        .submit_scan(&u, &mut progress, subquest, "MUSEUM-41")
        .await
        .unwrap();
    assert!(matches!(wrong, ProofOutcome::Rejected));

    let right = engine
        .proofs
        .submit_scan(&u, &mut progress, subquest, "  MUSEUM-42\n")
        .await
        .unwrap();
    assert_eq!(
        right.completion(),
        Some(&CompletionOutcome::NewlyCompleted { rank: 0 })
    );
}

#[tokio::test]
async fn test_resubmitting_is_idempotent() {
    let (engine, memory, _) = test_engine();
    let bundle = seed_quest(&engine, vec![photo("a"), photo("b")]).await;
    let u = ctx("U");
    let mut progress = QuestProgress::for_bundle(&bundle);

    let first = engine
        .proofs
        .submit_photo(&u, &mut progress, &bundle.subquests[0], vec![1])
        .await
        .unwrap();
    // Second device with stale progress
    let mut stale = QuestProgress::for_bundle(&bundle);
    let second = engine
        .proofs
        .submit_photo(&u, &mut stale, &bundle.subquests[0], vec![1])
        .await
        .unwrap();

    match (first, second) {
        (
            ProofOutcome::Accepted {
                submission: a,
                duplicate: false,
                ..
            },
            ProofOutcome::Accepted {
                submission: b,
                duplicate: true,
                ..
            },
        ) => assert_eq!(a.id, b.id),
        other => panic!("Unexpected outcomes: {:?}", other),
    }
    assert_eq!(memory.row_count(tables::SUBMISSIONS), 1);
}

#[tokio::test]
async fn test_placement_messages_follow_finishing_rank() {
    let (engine, _, _) = test_engine();
    let now = Utc::now();
    let mut quest = draft("Race", vec![scan("Code", "GO")], now);
    quest.winner_messages = vec!["Gold!".to_string(), "Silver!".to_string()];
    quest.default_message = Some("Thanks for playing".to_string());
    let bundle = engine
        .quests
        .create_quest(&ctx("author"), &quest, now)
        .await
        .unwrap();

    let mut messages = Vec::new();
    for user in ["a", "b", "c"] {
        let mut progress = QuestProgress::for_bundle(&bundle);
        let outcome = engine
            .proofs
            .submit_scan(&ctx(user), &mut progress, &bundle.subquests[0], "GO")
            .await
            .unwrap();
        if let ProofOutcome::Accepted {
            placement_message, ..
        } = outcome
        {
            messages.push(placement_message);
        }
    }

    assert_eq!(
        messages,
        vec![
            Some("Gold!".to_string()),
            Some("Silver!".to_string()),
            Some("Thanks for playing".to_string()),
        ]
    );
}
