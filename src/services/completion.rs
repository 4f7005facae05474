// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quest completion tracker.
//!
//! Watches which subquests a user has satisfied for a quest. Once the
//! quest's whole subquest set is covered, it records a completion with a
//! conditional insert and reads the finishing rank back from the ordered
//! completion list. Ranks are 0-based and never change once assigned.

use std::collections::BTreeSet;

use crate::db::QuestDb;
use crate::error::{AppError, Result};
use crate::models::{AchievementId, Completion, QuestBundle, QuestId, SubquestId};
use crate::services::AchievementEngine;

/// A user's progress through one quest.
///
/// `all_subquest_ids` is captured once when the quest is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestProgress {
    pub quest_id: QuestId,
    pub all_subquest_ids: BTreeSet<SubquestId>,
    pub submitted: BTreeSet<SubquestId>,
}

impl QuestProgress {
    pub fn new(
        quest_id: QuestId,
        all_subquest_ids: impl IntoIterator<Item = SubquestId>,
        submitted: impl IntoIterator<Item = SubquestId>,
    ) -> Self {
        let all_subquest_ids: BTreeSet<_> = all_subquest_ids.into_iter().collect();
        let submitted = submitted
            .into_iter()
            .filter(|id| all_subquest_ids.contains(id))
            .collect();
        Self {
            quest_id,
            all_subquest_ids,
            submitted,
        }
    }

    /// Fresh progress for a loaded quest.
    pub fn for_bundle(bundle: &QuestBundle) -> Self {
        Self::new(bundle.quest.id, bundle.subquest_ids(), [])
    }

    /// Add a satisfied subquest. Ids outside the quest are ignored.
    pub fn mark(&mut self, subquest_id: SubquestId) -> bool {
        self.all_subquest_ids.contains(&subquest_id) && self.submitted.insert(subquest_id)
    }

    pub fn has_submitted(&self, subquest_id: SubquestId) -> bool {
        self.submitted.contains(&subquest_id)
    }

    /// True only when a non-empty subquest set is fully covered.
    pub fn is_covered(&self) -> bool {
        !self.all_subquest_ids.is_empty() && self.all_subquest_ids.is_subset(&self.submitted)
    }

    pub fn remaining(&self) -> impl Iterator<Item = SubquestId> + '_ {
        self.all_subquest_ids.difference(&self.submitted).copied()
    }
}

/// Result of re-evaluating a user's completion status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Incomplete { submitted: BTreeSet<SubquestId> },
    NewlyCompleted { rank: usize },
    AlreadyCompleted { rank: usize },
}

impl CompletionOutcome {
    pub fn rank(&self) -> Option<usize> {
        match self {
            CompletionOutcome::Incomplete { .. } => None,
            CompletionOutcome::NewlyCompleted { rank }
            | CompletionOutcome::AlreadyCompleted { rank } => Some(*rank),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.rank().is_some()
    }

    pub fn is_first_place(&self) -> bool {
        self.rank() == Some(0)
    }
}

/// Outcome plus any achievement granted as a consequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub outcome: CompletionOutcome,
    pub granted: Vec<AchievementId>,
}

#[derive(Clone)]
pub struct CompletionTracker {
    db: QuestDb,
    achievements: AchievementEngine,
}

impl CompletionTracker {
    pub fn new(db: QuestDb, achievements: AchievementEngine) -> Self {
        Self { db, achievements }
    }

    /// Re-evaluate completion after `subquest_id` was recorded for the user.
    ///
    /// A first-place finish triggers the first-completion achievement check.
    pub async fn on_subquest_submitted(
        &self,
        user_id: &str,
        progress: &mut QuestProgress,
        subquest_id: SubquestId,
    ) -> Result<CompletionReport> {
        progress.mark(subquest_id);

        if !progress.is_covered() {
            return Ok(CompletionReport {
                outcome: CompletionOutcome::Incomplete {
                    submitted: progress.submitted.clone(),
                },
                granted: Vec::new(),
            });
        }

        let outcome = self.record_completion(progress.quest_id, user_id).await?;

        let mut granted = Vec::new();
        if outcome.is_first_place() {
            // Also on AlreadyCompleted, so a retry after a failed grant still grants
            if let Some(id) = self
                .achievements
                .evaluate_first_completion(progress.quest_id, user_id)
                .await?
            {
                granted.push(id);
            }
        }

        Ok(CompletionReport { outcome, granted })
    }

    /// Record a completion for a user who has covered every subquest.
    pub async fn record_completion(
        &self,
        quest_id: QuestId,
        user_id: &str,
    ) -> Result<CompletionOutcome> {
        // Never trust cached progress for the final decision
        let existing = self.db.get_completions_for_quest(quest_id).await?;
        if let Some(rank) = rank_of(&existing, user_id) {
            tracing::debug!(quest_id, user_id, rank, "Quest already completed");
            return Ok(CompletionOutcome::AlreadyCompleted { rank });
        }

        let inserted = self.db.insert_completion_unique(quest_id, user_id).await?;

        let completions = self.db.get_completions_for_quest(quest_id).await?;
        let rank = rank_of(&completions, user_id).ok_or_else(|| {
            AppError::Database(format!(
                "Completion of quest {} by {} not visible after insert",
                quest_id, user_id
            ))
        })?;

        match inserted {
            Some(completion) => {
                tracing::info!(quest_id, user_id, rank, id = completion.id, "Quest completed");
                Ok(CompletionOutcome::NewlyCompleted { rank })
            }
            None => {
                // Lost a race against our own concurrent submission
                tracing::debug!(quest_id, user_id, rank, "Completion already recorded");
                Ok(CompletionOutcome::AlreadyCompleted { rank })
            }
        }
    }

    /// The user's finishing rank, if they have completed the quest.
    pub async fn rank(&self, quest_id: QuestId, user_id: &str) -> Result<Option<usize>> {
        let completions = self.db.get_completions_for_quest(quest_id).await?;
        Ok(rank_of(&completions, user_id))
    }
}

/// Position of the user's completion in finishing order.
fn rank_of(completions: &[Completion], user_id: &str) -> Option<usize> {
    completions.iter().position(|c| c.user_id == user_id)
}
