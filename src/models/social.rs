// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quest comments and likes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{QuestId, UserId};

pub type CommentId = i64;

/// A comment posted on a quest's page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub quest_id: QuestId,
    pub user_id: UserId,
    #[serde(default)]
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One user's like of a comment. At most one per (comment, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentLike {
    #[serde(default)]
    pub id: i64,
    pub comment_id: CommentId,
    pub user_id: UserId,
}

/// One user's like of a quest. At most one per (quest, user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestLike {
    #[serde(default)]
    pub id: i64,
    pub quest_id: QuestId,
    pub user_id: UserId,
}

/// A comment with its author's username and the users who liked it.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
    pub comment: Comment,
    pub author: Option<String>,
    pub likers: Vec<UserId>,
}

impl CommentView {
    pub fn like_count(&self) -> usize {
        self.likers.len()
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likers.iter().any(|u| u == user_id)
    }
}

/// Like count for a target as seen by one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeSummary {
    pub likes: usize,
    pub liked: bool,
}

impl LikeSummary {
    pub fn from_likers<'a>(likers: impl IntoIterator<Item = &'a str>, user_id: &str) -> Self {
        let mut summary = LikeSummary {
            likes: 0,
            liked: false,
        };
        for liker in likers {
            summary.likes += 1;
            summary.liked |= liker == user_id;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_summary_counts_and_flags_viewer() {
        let summary = LikeSummary::from_likers(["a", "b", "c"], "b");
        assert_eq!(summary, LikeSummary { likes: 3, liked: true });

        let summary = LikeSummary::from_likers(["a"], "z");
        assert_eq!(summary, LikeSummary { likes: 1, liked: false });
    }
}
