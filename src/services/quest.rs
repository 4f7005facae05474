//! Quest authoring, browsing and progress loading.

use chrono::{DateTime, Utc};

use crate::db::quest_db::QuestFilter;
use crate::db::QuestDb;
use crate::error::{AppError, Result};
use crate::models::{Quest, QuestBundle, QuestDraft, QuestId, SessionContext};
use crate::services::QuestProgress;

#[derive(Clone)]
pub struct QuestService {
    db: QuestDb,
}

impl QuestService {
    pub fn new(db: QuestDb) -> Self {
        Self { db }
    }

    /// Validate and publish a new quest with its subquests and messages.
    pub async fn create_quest(
        &self,
        ctx: &SessionContext,
        draft: &QuestDraft,
        now: DateTime<Utc>,
    ) -> Result<QuestBundle> {
        draft.check(now)?;

        let quest = self.db.insert_quest(&ctx.user_id, draft).await?;
        let subquests = self.db.insert_subquests(quest.id, &draft.subquests).await?;
        self.db
            .insert_placement_messages(
                quest.id,
                &draft.winner_messages,
                draft.default_message.as_deref(),
            )
            .await?;

        tracing::info!(
            quest_id = quest.id,
            author = %ctx.user_id,
            subquests = subquests.len(),
            "Quest created"
        );
        Ok(QuestBundle { quest, subquests })
    }

    /// Load a quest and capture its subquest set.
    pub async fn load_quest(&self, quest_id: QuestId) -> Result<QuestBundle> {
        let quest = self
            .db
            .get_quest(quest_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quest {}", quest_id)))?;
        let subquests = self.db.get_subquests(quest_id).await?;
        Ok(QuestBundle { quest, subquests })
    }

    /// Public quests still open at `now`, newest first.
    pub async fn browse(&self, filter: &QuestFilter, now: DateTime<Utc>) -> Result<Vec<Quest>> {
        let quests = self.db.browse_quests(filter).await?;
        Ok(quests.into_iter().filter(|q| q.is_open(now)).collect())
    }

    /// The user's progress through a loaded quest, re-queried from storage.
    pub async fn load_progress(
        &self,
        ctx: &SessionContext,
        bundle: &QuestBundle,
    ) -> Result<QuestProgress> {
        let ids = bundle.subquest_ids();
        let submitted = self
            .db
            .get_user_submissions(&ctx.user_id, &ids)
            .await?
            .into_iter()
            .map(|s| s.subquest_id);
        Ok(QuestProgress::new(bundle.quest.id, ids.iter().copied(), submitted))
    }

    /// Author's message for a finisher at 0-based `rank`.
    ///
    /// Falls back to the quest's default message.
    pub async fn placement_message(&self, quest_id: QuestId, rank: usize) -> Result<Option<String>> {
        let place = rank as i64 + 1;
        let messages = self.db.get_placement_messages(quest_id, &[place, 0]).await?;

        let pick = |p: i64| {
            messages
                .iter()
                .find(|m| m.place == p)
                .and_then(|m| m.content.clone())
        };
        Ok(pick(place).or_else(|| pick(0)))
    }
}
