// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievement engine.
//!
//! Grants are at-most-once per (user, achievement): every grant is a
//! conditional insert, and losing a race to a concurrent grant counts as
//! "already granted".

use std::collections::{BTreeSet, HashMap};

use crate::db::QuestDb;
use crate::error::Result;
use crate::models::achievement::{streak_achievements, FIRST_COMPLETION};
use crate::models::{Achievement, AchievementId, Announcement, QuestId};

#[derive(Clone)]
pub struct AchievementEngine {
    db: QuestDb,
}

impl AchievementEngine {
    pub fn new(db: QuestDb) -> Self {
        Self { db }
    }

    /// Grant one achievement. Returns false if the user already had it.
    pub async fn grant(&self, user_id: &str, achievement_id: AchievementId) -> Result<bool> {
        let granted = self
            .db
            .insert_achievement_unique(user_id, achievement_id)
            .await?
            .is_some();
        if granted {
            tracing::info!(user_id, achievement = achievement_id.0, "Achievement granted");
        } else {
            tracing::debug!(user_id, achievement = achievement_id.0, "Achievement already held");
        }
        Ok(granted)
    }

    /// Grant the first-completion achievement if the user's completion is
    /// the only one recorded for the quest.
    pub async fn evaluate_first_completion(
        &self,
        quest_id: QuestId,
        user_id: &str,
    ) -> Result<Option<AchievementId>> {
        let completions = self.db.count_completions(quest_id).await?;
        if completions != 1 {
            tracing::debug!(quest_id, user_id, completions, "Not the sole completion");
            return Ok(None);
        }

        let granted = self.grant(user_id, FIRST_COMPLETION).await?;
        Ok(granted.then_some(FIRST_COMPLETION))
    }

    /// Grant every streak milestone reached by `streak_days` that the user
    /// does not hold yet. Returns the newly granted ids.
    pub async fn evaluate_login_streak(
        &self,
        user_id: &str,
        streak_days: u32,
    ) -> Result<Vec<AchievementId>> {
        let held: BTreeSet<AchievementId> = self
            .db
            .get_achievements(user_id)
            .await?
            .into_iter()
            .map(|a| a.achievement_id)
            .collect();

        let mut granted = Vec::new();
        for id in streak_achievements(streak_days).filter(|id| !held.contains(id)) {
            if self.grant(user_id, id).await? {
                granted.push(id);
            }
        }
        Ok(granted)
    }

    /// Mark all of the user's unannounced achievements as announced and
    /// return them, so each is shown exactly once.
    pub async fn drain_unannounced(&self, user_id: &str) -> Result<Vec<Achievement>> {
        let drained = self.db.mark_announced(user_id).await?;
        if !drained.is_empty() {
            tracing::info!(user_id, count = drained.len(), "Drained unannounced achievements");
        }
        Ok(drained)
    }

    /// Drain unannounced achievements joined with their catalog entries.
    pub async fn announcements(&self, user_id: &str) -> Result<Vec<Announcement>> {
        let drained = self.drain_unannounced(user_id).await?;
        if drained.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<AchievementId> = drained
            .iter()
            .map(|a| a.achievement_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let catalog: HashMap<AchievementId, _> = self
            .db
            .get_achievement_catalog(&ids)
            .await?
            .into_iter()
            .map(|info| (info.id, info))
            .collect();

        Ok(drained
            .into_iter()
            .map(|achievement| Announcement {
                info: catalog.get(&achievement.achievement_id).cloned(),
                achievement,
            })
            .collect())
    }
}
