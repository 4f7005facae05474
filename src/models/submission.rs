// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Proof records: per-subquest submissions and whole-quest completions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{QuestId, SubquestId, UserId};

/// "User has satisfied subquest". Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub subquest_id: SubquestId,
    pub user_id: UserId,
    /// When the proof was accepted
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

/// "User has satisfied every subquest of a quest". Created once per (quest, user).
///
/// Ordering completions by `(created_at, id)` ascending gives finishing rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub id: i64,
    pub quest_id: QuestId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Result of persisting a submission.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub submission: Submission,
    /// The (user, subquest) pair had already been recorded
    pub duplicate: bool,
}
