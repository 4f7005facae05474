// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Leaderboard models: per-quest rankings and user-created groups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::UserId;

/// One row of a per-quest ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "bindings/")
)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: UserId,
    pub completed_count: u32,
}

/// A named group of users, created by its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardMeta {
    #[serde(default)]
    pub id: i64,
    pub leaderboard_id: String,
    pub owner_id: UserId,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Membership of a user in a group leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardMembership {
    #[serde(default)]
    pub id: i64,
    pub leaderboard_id: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A group member's standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStanding {
    pub user_id: UserId,
    pub username: Option<String>,
    pub submission_count: u64,
}

/// A group leaderboard with its members ranked.
#[derive(Debug, Clone)]
pub struct GroupStandings {
    pub meta: LeaderboardMeta,
    pub standings: Vec<GroupStanding>,
}

impl GroupStandings {
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.meta.owner_id == user_id
    }
}
