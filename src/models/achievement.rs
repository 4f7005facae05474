// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Achievement grants and the milestone lookup table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// Identifier of an entry in the achievement catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub i64);

/// Granted to the first user to complete a quest.
pub const FIRST_COMPLETION: AchievementId = AchievementId(2);

/// Login-streak thresholds (in days) and the achievement each unlocks.
pub const STREAK_MILESTONES: [(u32, AchievementId); 8] = [
    (3, AchievementId(3)),
    (5, AchievementId(4)),
    (10, AchievementId(5)),
    (20, AchievementId(6)),
    (50, AchievementId(7)),
    (100, AchievementId(8)),
    (200, AchievementId(9)),
    (365, AchievementId(10)),
];

/// Achievements whose streak threshold is reached by `streak_days`.
pub fn streak_achievements(streak_days: u32) -> impl Iterator<Item = AchievementId> {
    STREAK_MILESTONES
        .into_iter()
        .filter(move |(threshold, _)| *threshold <= streak_days)
        .map(|(_, id)| id)
}

/// Granted achievement row. At most one per (user, achievement).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    #[serde(default)]
    pub id: i64,
    pub user_id: UserId,
    #[serde(rename = "achievement_name")]
    pub achievement_id: AchievementId,
    /// Flipped to true once the user has been congratulated
    #[serde(default)]
    pub announced: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Display metadata from the achievement catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AchievementInfo {
    pub id: AchievementId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// An achievement ready to be shown once.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub achievement: Achievement,
    pub info: Option<AchievementInfo>,
}

impl Announcement {
    /// Text of the one-time congratulation.
    pub fn headline(&self) -> String {
        let name = self
            .info
            .as_ref()
            .and_then(|info| info.name.clone())
            .unwrap_or_else(|| format!("#{}", self.achievement.achievement_id.0));
        format!("Congratulations! You won the achievement: {}", name)
    }
}
