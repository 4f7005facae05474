//! Session start: login logging, streaks and achievement announcements.

use chrono::{DateTime, TimeZone, Utc};

use crate::db::QuestDb;
use crate::error::Result;
use crate::models::{Announcement, SessionContext};
use crate::services::streak::compute_streak;
use crate::services::AchievementEngine;

/// What the user should see after a session starts.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub streak: u32,
    /// Achievements not shown before, each returned exactly once
    pub announcements: Vec<Announcement>,
}

#[derive(Clone)]
pub struct SessionService {
    db: QuestDb,
    achievements: AchievementEngine,
}

impl SessionService {
    pub fn new(db: QuestDb, achievements: AchievementEngine) -> Self {
        Self { db, achievements }
    }

    /// Run once per app session. Calendar days follow `now`'s timezone.
    pub async fn start_session<Tz: TimeZone>(
        &self,
        ctx: &SessionContext,
        now: DateTime<Tz>,
    ) -> Result<SessionSummary> {
        let user_id = ctx.user_id.as_str();

        self.db.insert_login(user_id, now.with_timezone(&Utc)).await?;

        let logins: Vec<DateTime<Utc>> = self
            .db
            .get_logins(user_id)
            .await?
            .into_iter()
            .map(|l| l.created_at)
            .collect();
        let streak = compute_streak(&logins, &now);
        tracing::info!(user_id, streak, logins = logins.len(), "Session started");

        self.achievements
            .evaluate_login_streak(user_id, streak)
            .await?;
        let announcements = self.achievements.announcements(user_id).await?;

        Ok(SessionSummary {
            streak,
            announcements,
        })
    }
}
