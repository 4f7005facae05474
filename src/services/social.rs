// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quest comments and likes.
//!
//! Likes are idempotent per (target, user): liking twice keeps one row and
//! unliking something not liked is a no-op.

use std::collections::HashMap;

use crate::db::QuestDb;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentId, CommentView, LikeSummary, QuestId, SessionContext, UserId,
};

#[derive(Clone)]
pub struct SocialService {
    db: QuestDb,
}

impl SocialService {
    pub fn new(db: QuestDb) -> Self {
        Self { db }
    }

    /// Post a comment on an existing quest.
    pub async fn post_comment(
        &self,
        ctx: &SessionContext,
        quest_id: QuestId,
        content: &str,
    ) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Please enter a comment".to_string()));
        }
        self.require_quest(quest_id).await?;

        let comment = self
            .db
            .insert_comment(quest_id, &ctx.user_id, content)
            .await?;
        tracing::info!(quest_id, user_id = %ctx.user_id, comment_id = comment.id, "Comment posted");
        Ok(comment)
    }

    /// Comments on a quest, oldest first, with authors and likers.
    pub async fn comments(&self, quest_id: QuestId) -> Result<Vec<CommentView>> {
        let comments = self.db.get_comments(quest_id).await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<CommentId> = comments.iter().map(|c| c.id).collect();
        let mut likers: HashMap<CommentId, Vec<UserId>> = HashMap::new();
        for like in self.db.get_comment_likes(&ids).await? {
            likers.entry(like.comment_id).or_default().push(like.user_id);
        }

        let mut authors: Vec<UserId> = comments.iter().map(|c| c.user_id.clone()).collect();
        authors.sort();
        authors.dedup();
        let usernames: HashMap<UserId, Option<String>> = self
            .db
            .get_profiles(&authors)
            .await?
            .into_iter()
            .map(|p| (p.id, p.username))
            .collect();

        Ok(comments
            .into_iter()
            .map(|comment| CommentView {
                author: usernames.get(&comment.user_id).cloned().flatten(),
                likers: likers.remove(&comment.id).unwrap_or_default(),
                comment,
            })
            .collect())
    }

    pub async fn like_comment(
        &self,
        ctx: &SessionContext,
        comment_id: CommentId,
    ) -> Result<LikeSummary> {
        self.require_comment(comment_id).await?;
        self.db
            .insert_comment_like_unique(comment_id, &ctx.user_id)
            .await?;
        self.comment_likes(ctx, comment_id).await
    }

    pub async fn unlike_comment(
        &self,
        ctx: &SessionContext,
        comment_id: CommentId,
    ) -> Result<LikeSummary> {
        self.db.delete_comment_like(comment_id, &ctx.user_id).await?;
        self.comment_likes(ctx, comment_id).await
    }

    /// Like the comment, or remove the like if it was already there.
    pub async fn toggle_comment_like(
        &self,
        ctx: &SessionContext,
        comment_id: CommentId,
    ) -> Result<LikeSummary> {
        self.require_comment(comment_id).await?;
        let inserted = self
            .db
            .insert_comment_like_unique(comment_id, &ctx.user_id)
            .await?
            .is_some();
        if !inserted {
            self.db.delete_comment_like(comment_id, &ctx.user_id).await?;
        }
        tracing::debug!(comment_id, user_id = %ctx.user_id, liked = inserted, "Comment like toggled");
        self.comment_likes(ctx, comment_id).await
    }

    pub async fn comment_likes(
        &self,
        ctx: &SessionContext,
        comment_id: CommentId,
    ) -> Result<LikeSummary> {
        let likes = self.db.get_comment_likes(&[comment_id]).await?;
        Ok(LikeSummary::from_likers(
            likes.iter().map(|l| l.user_id.as_str()),
            &ctx.user_id,
        ))
    }

    /// Like the quest, or remove the like if it was already there.
    pub async fn toggle_quest_like(
        &self,
        ctx: &SessionContext,
        quest_id: QuestId,
    ) -> Result<LikeSummary> {
        self.require_quest(quest_id).await?;
        let inserted = self
            .db
            .insert_quest_like_unique(quest_id, &ctx.user_id)
            .await?
            .is_some();
        if !inserted {
            self.db.delete_quest_like(quest_id, &ctx.user_id).await?;
        }
        tracing::debug!(quest_id, user_id = %ctx.user_id, liked = inserted, "Quest like toggled");
        self.quest_likes(ctx, quest_id).await
    }

    pub async fn quest_likes(&self, ctx: &SessionContext, quest_id: QuestId) -> Result<LikeSummary> {
        let likes = self.db.get_quest_likes(quest_id).await?;
        Ok(LikeSummary::from_likers(
            likes.iter().map(|l| l.user_id.as_str()),
            &ctx.user_id,
        ))
    }

    async fn require_quest(&self, quest_id: QuestId) -> Result<()> {
        match self.db.get_quest(quest_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("Quest {}", quest_id))),
        }
    }

    async fn require_comment(&self, comment_id: CommentId) -> Result<()> {
        match self.db.get_comment(comment_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("Comment {}", comment_id))),
        }
    }
}
