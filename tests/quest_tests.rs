// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quest authoring, loading, browsing and progress.

use chrono::{Duration, Utc};
use quest_tracker::db::quest_db::QuestFilter;
use quest_tracker::db::tables;
use quest_tracker::error::AppError;
use quest_tracker::models::{QuestType, SubquestType};
use quest_tracker::services::SubmissionRecorder;

mod common;
use common::{ctx, draft, location, photo, scan, seed_quest, test_engine};

#[tokio::test]
async fn test_create_and_load_round_trip() {
    let (engine, _, _) = test_engine();
    let now = Utc::now();
    let quest = draft(
        "Loop trail",
        vec![
            photo("Trailhead sign"),
            location("Summit", 37.38, -122.17),
            scan("Bench plaque", "BENCH-7"),
        ],
        now,
    );

    let created = engine
        .quests
        .create_quest(&ctx("author"), &quest, now)
        .await
        .unwrap();
    let loaded = engine.quests.load_quest(created.quest.id).await.unwrap();

    assert_eq!(loaded.quest.author, "author");
    assert_eq!(loaded.quest.quest_type, QuestType::Path);
    assert_eq!(loaded.subquest_ids(), created.subquest_ids());
    let kinds: Vec<SubquestType> = loaded.subquests.iter().map(|s| s.subquest_type).collect();
    assert_eq!(
        kinds,
        vec![SubquestType::Photo, SubquestType::Location, SubquestType::Scan]
    );
    assert_eq!(loaded.subquests[1].latitude, Some(37.38));
    assert_eq!(loaded.subquests[2].code.as_deref(), Some("BENCH-7"));
}

#[tokio::test]
async fn test_invalid_draft_makes_no_backend_call() {
    let (engine, memory, _) = test_engine();
    memory.set_offline(true);
    let now = Utc::now();

    let mut past = draft("Old", vec![photo("a")], now);
    past.deadline = now - Duration::hours(1);
    let err = engine
        .quests
        .create_quest(&ctx("author"), &past, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let empty = draft("Nothing to do", vec![], now);
    let err = engine
        .quests
        .create_quest(&ctx("author"), &empty, now)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    memory.set_offline(false);
    assert_eq!(memory.row_count(tables::QUESTS), 0);
}

#[tokio::test]
async fn test_load_missing_quest_is_not_found() {
    let (engine, _, _) = test_engine();
    let err = engine.quests.load_quest(9999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_browse_filters_deadline_type_and_title() {
    let (engine, _, _) = test_engine();
    let now = Utc::now();
    let author = ctx("author");

    let mut bikes = draft("Black Bikes of Chicago", vec![photo("bike")], now);
    bikes.quest_type = QuestType::Photo;
    let mut museum = draft("Museum crawl", vec![scan("door", "D")], now);
    museum.quest_type = QuestType::Community;
    let mut private = draft("Secret bike route", vec![photo("x")], now);
    private.is_public = false;
    let mut closing = draft("Closing soon bike", vec![photo("y")], now);
    closing.deadline = now + Duration::minutes(5);

    for quest in [&bikes, &museum, &private, &closing] {
        engine
            .quests
            .create_quest(&author, quest, now)
            .await
            .unwrap();
    }

    let titles = |quests: Vec<quest_tracker::models::Quest>| -> Vec<String> {
        quests.into_iter().filter_map(|q| q.title).collect()
    };

    let all = engine
        .quests
        .browse(&QuestFilter::default(), now)
        .await
        .unwrap();
    assert_eq!(
        titles(all),
        vec!["Closing soon bike", "Museum crawl", "Black Bikes of Chicago"]
    );

    // After "closing soon" passes its deadline
    let later = engine
        .quests
        .browse(&QuestFilter::default(), now + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(titles(later).len(), 2);

    let bikes_only = engine
        .quests
        .browse(
            &QuestFilter {
                title_contains: Some("BIKE".to_string()),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(
        titles(bikes_only),
        vec!["Closing soon bike", "Black Bikes of Chicago"]
    );

    let community = engine
        .quests
        .browse(
            &QuestFilter {
                quest_type: Some(QuestType::Community),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(titles(community), vec!["Museum crawl"]);
}

#[tokio::test]
async fn test_load_progress_requeries_submissions() {
    let (engine, _, _) = test_engine();
    let bundle = seed_quest(&engine, vec![photo("a"), photo("b")]).await;
    let other = seed_quest(&engine, vec![photo("c")]).await;
    let user = ctx("u1");
    let recorder = SubmissionRecorder::new(engine.db.clone());

    recorder.record("u1", bundle.subquest_ids()[1]).await.unwrap();
    recorder.record("u1", other.subquest_ids()[0]).await.unwrap();
    recorder.record("u2", bundle.subquest_ids()[0]).await.unwrap();

    let progress = engine.quests.load_progress(&user, &bundle).await.unwrap();
    assert_eq!(
        progress.submitted.iter().copied().collect::<Vec<_>>(),
        vec![bundle.subquest_ids()[1]]
    );
    assert!(!progress.is_covered());
}
