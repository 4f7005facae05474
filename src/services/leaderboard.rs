// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboards.
//!
//! Per-quest rankings are recomputed from scratch on every request. Group
//! leaderboards are user-created named sets of members ranked by their
//! total submission count.

use futures_util::{stream, StreamExt};
use std::collections::{HashMap, HashSet};

use crate::db::QuestDb;
use crate::error::{AppError, Result};
use crate::models::{
    GroupStanding, GroupStandings, LeaderboardEntry, LeaderboardMeta, Submission, SubquestId,
    UserId,
};

/// Bounded concurrency for per-member count queries.
const MAX_CONCURRENT_COUNTS: usize = 8;

/// Rank users by distinct completed subquests, descending.
///
/// Only submissions for `subquest_ids` count. Ties keep first-seen order.
pub fn rank<'a>(
    submissions: impl IntoIterator<Item = &'a Submission>,
    subquest_ids: &HashSet<SubquestId>,
) -> Vec<LeaderboardEntry> {
    let mut seen: HashSet<(&str, SubquestId)> = HashSet::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<LeaderboardEntry> = Vec::new();

    for submission in submissions {
        if !subquest_ids.contains(&submission.subquest_id) {
            continue;
        }
        let user = submission.user_id.as_str();
        if !seen.insert((user, submission.subquest_id)) {
            continue;
        }
        let slot = *slots.entry(user).or_insert_with(|| {
            entries.push(LeaderboardEntry {
                user_id: user.to_string(),
                completed_count: 0,
            });
            entries.len() - 1
        });
        entries[slot].completed_count += 1;
    }

    // sort_by is stable
    entries.sort_by(|a, b| b.completed_count.cmp(&a.completed_count));
    entries
}

#[derive(Clone)]
pub struct LeaderboardService {
    db: QuestDb,
}

impl LeaderboardService {
    pub fn new(db: QuestDb) -> Self {
        Self { db }
    }

    /// Current ranking for a quest or event, re-queried from storage.
    pub async fn quest_leaderboard(
        &self,
        subquest_ids: &[SubquestId],
    ) -> Result<Vec<LeaderboardEntry>> {
        let submissions = self.db.get_submissions_for_subquests(subquest_ids).await?;
        let ids: HashSet<SubquestId> = subquest_ids.iter().copied().collect();
        Ok(rank(&submissions, &ids))
    }

    // ─── Group Leaderboards ───────────────────────────────────

    /// Create a group leaderboard owned by `owner_id`, who joins it.
    pub async fn create(&self, owner_id: &str, title: &str) -> Result<LeaderboardMeta> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation(
                "Please enter a leaderboard title".to_string(),
            ));
        }

        let leaderboard_id = uuid::Uuid::new_v4().to_string();
        let meta = self
            .db
            .insert_leaderboard_meta(&leaderboard_id, owner_id, title)
            .await?;
        self.db
            .insert_membership_unique(&leaderboard_id, owner_id)
            .await?;

        tracing::info!(leaderboard_id = %leaderboard_id, owner_id, "Leaderboard created");
        Ok(meta)
    }

    /// Join a group leaderboard. Joining twice is a no-op.
    pub async fn join(&self, user_id: &str, leaderboard_id: &str) -> Result<LeaderboardMeta> {
        let leaderboard_id = leaderboard_id.trim();
        let meta = self
            .db
            .get_leaderboard_meta(leaderboard_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leaderboard {}", leaderboard_id)))?;

        let joined = self
            .db
            .insert_membership_unique(leaderboard_id, user_id)
            .await?
            .is_some();
        tracing::info!(leaderboard_id, user_id, joined, "Leaderboard join");

        Ok(meta)
    }

    /// Members ranked by total submissions, stable on join order.
    pub async fn standings(&self, leaderboard_id: &str) -> Result<GroupStandings> {
        let meta = self
            .db
            .get_leaderboard_meta(leaderboard_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Leaderboard {}", leaderboard_id)))?;

        let members: Vec<UserId> = self
            .db
            .get_memberships(leaderboard_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();

        let usernames: HashMap<UserId, Option<String>> = self
            .db
            .get_profiles(&members)
            .await?
            .into_iter()
            .map(|p| (p.id, p.username))
            .collect();

        let db = &self.db;
        let mut counts: Vec<(usize, Result<u64>)> = stream::iter(members.iter().enumerate())
            .map(|(idx, user_id)| async move { (idx, db.count_user_submissions(user_id).await) })
            .buffer_unordered(MAX_CONCURRENT_COUNTS)
            .collect()
            .await;
        counts.sort_by_key(|(idx, _)| *idx);

        let mut standings = Vec::with_capacity(members.len());
        for ((_, count), user_id) in counts.into_iter().zip(members) {
            standings.push(GroupStanding {
                username: usernames.get(&user_id).cloned().flatten(),
                user_id,
                submission_count: count?,
            });
        }
        standings.sort_by(|a, b| b.submission_count.cmp(&a.submission_count));

        Ok(GroupStandings { meta, standings })
    }
}
