// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed operations over a [`Backend`].
//!
//! Provides high-level operations for:
//! - Quests, subquests and placement messages
//! - Submissions and completions (proof records)
//! - Achievements, the achievement catalog, and logins
//! - Group leaderboards and profiles
//! - Quest comments and likes

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::{tables, Backend, Direction, InsertOutcome, Query};
use crate::error::{AppError, Result};
use crate::models::{
    Achievement, AchievementId, AchievementInfo, Comment, CommentId, CommentLike, Completion,
    LeaderboardMembership, LeaderboardMeta, Login, PlacementMessage, Profile, Quest, QuestDraft,
    QuestId, QuestLike, QuestType, Submission, Subquest, SubquestDraft, SubquestId,
};
use crate::time_utils::format_utc_rfc3339;

/// Quest database client.
#[derive(Clone)]
pub struct QuestDb {
    backend: Arc<dyn Backend>,
}

/// Browse filter for public quests.
#[derive(Debug, Clone, Default)]
pub struct QuestFilter {
    pub quest_type: Option<QuestType>,
    /// Case-insensitive substring of the title
    pub title_contains: Option<String>,
    pub limit: Option<usize>,
}

impl QuestDb {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The underlying row store.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    async fn select_as<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        let rows = self.backend.select(table, query).await?;
        decode_rows(rows)
    }

    async fn insert_one<T: DeserializeOwned>(&self, table: &str, row: Value) -> Result<T> {
        let mut rows = self.backend.insert(table, vec![row]).await?;
        let row = rows
            .pop()
            .ok_or_else(|| AppError::Database(format!("Insert into {} returned no row", table)))?;
        Ok(serde_json::from_value(row)?)
    }

    async fn insert_unique_as<T: DeserializeOwned>(
        &self,
        table: &str,
        row: Value,
        conflict_columns: &[&str],
    ) -> Result<Option<T>> {
        match self
            .backend
            .insert_unique(table, row, conflict_columns)
            .await?
        {
            InsertOutcome::Inserted(row) => Ok(Some(serde_json::from_value(row)?)),
            InsertOutcome::Duplicate => Ok(None),
        }
    }

    // ─── Quest Operations ─────────────────────────────────────

    /// Get a quest by ID.
    pub async fn get_quest(&self, quest_id: QuestId) -> Result<Option<Quest>> {
        let query = Query::new().eq("id", quest_id).limit(1);
        let mut quests: Vec<Quest> = self.select_as(tables::QUESTS, &query).await?;
        Ok(quests.pop())
    }

    pub async fn insert_quest(&self, author: &str, draft: &QuestDraft) -> Result<Quest> {
        let row = json!({
            "author": author,
            "title": draft.title.trim(),
            "description": draft.description,
            "location": draft.location,
            "type": draft.quest_type.as_str(),
            "is_public": draft.is_public,
            "deadline": format_utc_rfc3339(draft.deadline),
        });
        self.insert_one(tables::QUESTS, row).await
    }

    /// Insert all subquests of a quest in one call.
    pub async fn insert_subquests(
        &self,
        quest_id: QuestId,
        drafts: &[SubquestDraft],
    ) -> Result<Vec<Subquest>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }
        let rows = drafts
            .iter()
            .map(|d| {
                json!({
                    "quest_id": quest_id,
                    "prompt": d.prompt,
                    "type": d.subquest_type,
                    "latitude": d.latitude,
                    "longitude": d.longitude,
                    "code": d.code.as_deref().map(str::trim),
                })
            })
            .collect();
        let rows = self.backend.insert(tables::SUBQUESTS, rows).await?;
        decode_rows(rows)
    }

    /// Subquests of a quest, in authoring order.
    pub async fn get_subquests(&self, quest_id: QuestId) -> Result<Vec<Subquest>> {
        let query = Query::new()
            .eq("quest_id", quest_id)
            .order_by("id", Direction::Ascending);
        self.select_as(tables::SUBQUESTS, &query).await
    }

    /// Public quests, newest first. Deadlines are checked by the caller.
    pub async fn browse_quests(&self, filter: &QuestFilter) -> Result<Vec<Quest>> {
        let mut query = Query::new().eq("is_public", true);
        if let Some(quest_type) = filter.quest_type {
            query = query.eq("type", quest_type.as_str());
        }
        if let Some(text) = filter.title_contains.as_deref().map(str::trim) {
            if !text.is_empty() {
                query = query.ilike("title", format!("%{}%", text));
            }
        }
        query = query
            .order_by("created_at", Direction::Descending)
            .order_by("id", Direction::Descending);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        self.select_as(tables::QUESTS, &query).await
    }

    /// Store winner messages (places 1..) and the default message (place 0).
    pub async fn insert_placement_messages(
        &self,
        quest_id: QuestId,
        winner_messages: &[String],
        default_message: Option<&str>,
    ) -> Result<Vec<PlacementMessage>> {
        let mut rows: Vec<Value> = winner_messages
            .iter()
            .enumerate()
            .filter(|(_, content)| !content.trim().is_empty())
            .map(|(idx, content)| {
                json!({ "quest_id": quest_id, "place": idx as i64 + 1, "content": content })
            })
            .collect();
        if let Some(content) = default_message.filter(|c| !c.trim().is_empty()) {
            rows.push(json!({ "quest_id": quest_id, "place": 0, "content": content }));
        }
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.backend.insert(tables::PLACEMENT_MESSAGES, rows).await?;
        decode_rows(rows)
    }

    pub async fn get_placement_messages(
        &self,
        quest_id: QuestId,
        places: &[i64],
    ) -> Result<Vec<PlacementMessage>> {
        let query = Query::new()
            .eq("quest_id", quest_id)
            .is_in("place", places.iter().copied());
        self.select_as(tables::PLACEMENT_MESSAGES, &query).await
    }

    // ─── Submission Operations ────────────────────────────────

    /// Insert a submission unless the (user, subquest) pair already exists.
    ///
    /// Returns `None` on a duplicate.
    pub async fn insert_submission_unique(
        &self,
        user_id: &str,
        subquest_id: SubquestId,
        time: DateTime<Utc>,
    ) -> Result<Option<Submission>> {
        let row = json!({
            "user_id": user_id,
            "subquest_id": subquest_id,
            "time": format_utc_rfc3339(time),
        });
        self.insert_unique_as(tables::SUBMISSIONS, row, &["user_id", "subquest_id"])
            .await
    }

    pub async fn find_submission(
        &self,
        user_id: &str,
        subquest_id: SubquestId,
    ) -> Result<Option<Submission>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .eq("subquest_id", subquest_id)
            .order_by("id", Direction::Ascending)
            .limit(1);
        let mut rows: Vec<Submission> = self.select_as(tables::SUBMISSIONS, &query).await?;
        Ok(rows.pop())
    }

    /// A user's submissions restricted to the given subquests.
    pub async fn get_user_submissions(
        &self,
        user_id: &str,
        subquest_ids: &[SubquestId],
    ) -> Result<Vec<Submission>> {
        if subquest_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new()
            .eq("user_id", user_id)
            .is_in("subquest_id", subquest_ids.iter().copied());
        self.select_as(tables::SUBMISSIONS, &query).await
    }

    /// Everyone's submissions for the given subquests, in arrival order.
    pub async fn get_submissions_for_subquests(
        &self,
        subquest_ids: &[SubquestId],
    ) -> Result<Vec<Submission>> {
        if subquest_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new()
            .is_in("subquest_id", subquest_ids.iter().copied())
            .order_by("id", Direction::Ascending);
        self.select_as(tables::SUBMISSIONS, &query).await
    }

    /// Total submissions a user has ever made.
    pub async fn count_user_submissions(&self, user_id: &str) -> Result<u64> {
        let query = Query::new().eq("user_id", user_id);
        self.backend.count(tables::SUBMISSIONS, &query).await
    }

    // ─── Completion Operations ────────────────────────────────

    /// Completions of a quest in finishing order.
    pub async fn get_completions_for_quest(&self, quest_id: QuestId) -> Result<Vec<Completion>> {
        let query = Query::new()
            .eq("quest_id", quest_id)
            .order_by("created_at", Direction::Ascending)
            .order_by("id", Direction::Ascending);
        self.select_as(tables::COMPLETIONS, &query).await
    }

    /// Insert a completion unless the (quest, user) pair already exists.
    pub async fn insert_completion_unique(
        &self,
        quest_id: QuestId,
        user_id: &str,
    ) -> Result<Option<Completion>> {
        let row = json!({ "quest_id": quest_id, "user_id": user_id });
        self.insert_unique_as(tables::COMPLETIONS, row, &["quest_id", "user_id"])
            .await
    }

    pub async fn count_completions(&self, quest_id: QuestId) -> Result<u64> {
        let query = Query::new().eq("quest_id", quest_id);
        self.backend.count(tables::COMPLETIONS, &query).await
    }

    // ─── Achievement Operations ───────────────────────────────

    pub async fn get_achievements(&self, user_id: &str) -> Result<Vec<Achievement>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order_by("id", Direction::Ascending);
        self.select_as(tables::ACHIEVEMENTS, &query).await
    }

    /// Grant an achievement unless already granted. Returns the new row.
    pub async fn insert_achievement_unique(
        &self,
        user_id: &str,
        achievement_id: AchievementId,
    ) -> Result<Option<Achievement>> {
        let row = json!({
            "user_id": user_id,
            "achievement_name": achievement_id,
            "announced": false,
        });
        self.insert_unique_as(tables::ACHIEVEMENTS, row, &["user_id", "achievement_name"])
            .await
    }

    /// Flip every unannounced achievement of the user and return those rows.
    ///
    /// Select and update happen in one backend call, so a grant can never
    /// slip in between them unseen.
    pub async fn mark_announced(&self, user_id: &str) -> Result<Vec<Achievement>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .eq("announced", false);
        let rows = self
            .backend
            .update(tables::ACHIEVEMENTS, json!({ "announced": true }), &query)
            .await?;
        decode_rows(rows)
    }

    pub async fn get_achievement_catalog(
        &self,
        ids: &[AchievementId],
    ) -> Result<Vec<AchievementInfo>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new().is_in("id", ids.iter().map(|id| id.0));
        self.select_as(tables::ACHIEVEMENT_CATALOG, &query).await
    }

    // ─── Login Operations ─────────────────────────────────────

    pub async fn insert_login(&self, user_id: &str, at: DateTime<Utc>) -> Result<Login> {
        let row = json!({ "user_id": user_id, "created_at": format_utc_rfc3339(at) });
        self.insert_one(tables::LOGINS, row).await
    }

    pub async fn get_logins(&self, user_id: &str) -> Result<Vec<Login>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .order_by("created_at", Direction::Descending);
        self.select_as(tables::LOGINS, &query).await
    }

    // ─── Leaderboard Operations ───────────────────────────────

    pub async fn insert_leaderboard_meta(
        &self,
        leaderboard_id: &str,
        owner_id: &str,
        title: &str,
    ) -> Result<LeaderboardMeta> {
        let row = json!({
            "leaderboard_id": leaderboard_id,
            "owner_id": owner_id,
            "title": title,
        });
        self.insert_one(tables::LEADERBOARD_META, row).await
    }

    pub async fn get_leaderboard_meta(
        &self,
        leaderboard_id: &str,
    ) -> Result<Option<LeaderboardMeta>> {
        let query = Query::new().eq("leaderboard_id", leaderboard_id).limit(1);
        let mut rows: Vec<LeaderboardMeta> =
            self.select_as(tables::LEADERBOARD_META, &query).await?;
        Ok(rows.pop())
    }

    /// Add a member unless already present. Returns `None` if they were.
    pub async fn insert_membership_unique(
        &self,
        leaderboard_id: &str,
        user_id: &str,
    ) -> Result<Option<LeaderboardMembership>> {
        let row = json!({ "leaderboard_id": leaderboard_id, "user_id": user_id });
        self.insert_unique_as(
            tables::LEADERBOARD_MEMBERS,
            row,
            &["leaderboard_id", "user_id"],
        )
        .await
    }

    /// Members in join order.
    pub async fn get_memberships(&self, leaderboard_id: &str) -> Result<Vec<LeaderboardMembership>> {
        let query = Query::new()
            .eq("leaderboard_id", leaderboard_id)
            .order_by("created_at", Direction::Ascending)
            .order_by("id", Direction::Ascending);
        self.select_as(tables::LEADERBOARD_MEMBERS, &query).await
    }

    // ─── Comment Operations ───────────────────────────────────

    pub async fn insert_comment(
        &self,
        quest_id: QuestId,
        user_id: &str,
        content: &str,
    ) -> Result<Comment> {
        let row = json!({ "quest_id": quest_id, "user_id": user_id, "content": content });
        self.insert_one(tables::COMMENTS, row).await
    }

    pub async fn get_comment(&self, comment_id: CommentId) -> Result<Option<Comment>> {
        let query = Query::new().eq("id", comment_id).limit(1);
        let mut rows: Vec<Comment> = self.select_as(tables::COMMENTS, &query).await?;
        Ok(rows.pop())
    }

    /// Comments on a quest, oldest first.
    pub async fn get_comments(&self, quest_id: QuestId) -> Result<Vec<Comment>> {
        let query = Query::new()
            .eq("quest_id", quest_id)
            .order_by("created_at", Direction::Ascending)
            .order_by("id", Direction::Ascending);
        self.select_as(tables::COMMENTS, &query).await
    }

    /// Returns `None` if the user already liked the comment.
    pub async fn insert_comment_like_unique(
        &self,
        comment_id: CommentId,
        user_id: &str,
    ) -> Result<Option<CommentLike>> {
        let row = json!({ "comment_id": comment_id, "user_id": user_id });
        self.insert_unique_as(tables::COMMENT_LIKES, row, &["comment_id", "user_id"])
            .await
    }

    pub async fn delete_comment_like(&self, comment_id: CommentId, user_id: &str) -> Result<u64> {
        let query = Query::new()
            .eq("comment_id", comment_id)
            .eq("user_id", user_id);
        self.backend.delete(tables::COMMENT_LIKES, &query).await
    }

    /// Likes for any of `comment_ids` in one query.
    pub async fn get_comment_likes(&self, comment_ids: &[CommentId]) -> Result<Vec<CommentLike>> {
        if comment_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new()
            .is_in("comment_id", comment_ids.iter().copied())
            .order_by("id", Direction::Ascending);
        self.select_as(tables::COMMENT_LIKES, &query).await
    }

    /// Returns `None` if the user already liked the quest.
    pub async fn insert_quest_like_unique(
        &self,
        quest_id: QuestId,
        user_id: &str,
    ) -> Result<Option<QuestLike>> {
        let row = json!({ "quest_id": quest_id, "user_id": user_id });
        self.insert_unique_as(tables::QUEST_LIKES, row, &["quest_id", "user_id"])
            .await
    }

    pub async fn delete_quest_like(&self, quest_id: QuestId, user_id: &str) -> Result<u64> {
        let query = Query::new().eq("quest_id", quest_id).eq("user_id", user_id);
        self.backend.delete(tables::QUEST_LIKES, &query).await
    }

    pub async fn get_quest_likes(&self, quest_id: QuestId) -> Result<Vec<QuestLike>> {
        let query = Query::new()
            .eq("quest_id", quest_id)
            .order_by("id", Direction::Ascending);
        self.select_as(tables::QUEST_LIKES, &query).await
    }

    // ─── Profile Operations ───────────────────────────────────

    pub async fn get_profiles(&self, user_ids: &[String]) -> Result<Vec<Profile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new().is_in("id", user_ids.iter().cloned());
        self.select_as(tables::PROFILES, &query).await
    }
}

/// Decode backend rows into typed models.
fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(AppError::from))
        .collect()
}
