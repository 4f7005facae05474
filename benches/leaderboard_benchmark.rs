use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use quest_tracker::models::Submission;
use quest_tracker::services::leaderboard::rank;
use quest_tracker::services::streak::compute_streak;
use std::collections::HashSet;
use std::hint::black_box;

const NUM_USERS: i64 = 200;
const NUM_SUBQUESTS: i64 = 25;

fn benchmark_rank(c: &mut Criterion) {
    // Every user submits most subquests, interleaved like live event traffic
    let mut submissions = Vec::new();
    let mut id = 0;
    for subquest_id in 0..NUM_SUBQUESTS {
        for user in 0..NUM_USERS {
            if (user + subquest_id) % 7 == 0 {
                continue;
            }
            id += 1;
            submissions.push(Submission {
                id,
                subquest_id,
                user_id: format!("user-{}", user),
                time: None,
            });
        }
    }
    let quest_ids: HashSet<i64> = (0..NUM_SUBQUESTS).collect();
    let half_ids: HashSet<i64> = (0..NUM_SUBQUESTS / 2).collect();

    let mut group = c.benchmark_group("leaderboard_rank");

    group.bench_function("full_event", |b| {
        b.iter(|| rank(black_box(&submissions), black_box(&quest_ids)))
    });

    group.bench_function("half_of_submissions_relevant", |b| {
        b.iter(|| rank(black_box(&submissions), black_box(&half_ids)))
    });

    group.finish();
}

fn benchmark_streak(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    // A year of logins, several per day
    let logins: Vec<_> = (0..365 * 3)
        .map(|i| now - Duration::hours(8 * i))
        .collect();

    c.bench_function("compute_streak_one_year", |b| {
        b.iter(|| compute_streak(black_box(&logins), black_box(&now)))
    });
}

criterion_group!(benches, benchmark_rank, benchmark_streak);
criterion_main!(benches);
