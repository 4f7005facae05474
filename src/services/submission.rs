// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Submission recorder.
//!
//! Persists an accepted single-subquest proof. The (user, subquest) pair is
//! unique in storage, so recording the same proof twice returns the
//! original row instead of a second one.

use chrono::Utc;

use crate::db::QuestDb;
use crate::error::{AppError, Result};
use crate::models::{SubmissionReceipt, SubquestId};

#[derive(Clone)]
pub struct SubmissionRecorder {
    db: QuestDb,
}

impl SubmissionRecorder {
    pub fn new(db: QuestDb) -> Self {
        Self { db }
    }

    /// Record that `user_id` satisfied `subquest_id`.
    ///
    /// Call only after the proof step passed. Storage failures propagate
    /// and the caller must not advance its local progress.
    pub async fn record(&self, user_id: &str, subquest_id: SubquestId) -> Result<SubmissionReceipt> {
        if let Some(submission) = self
            .db
            .insert_submission_unique(user_id, subquest_id, Utc::now())
            .await?
        {
            tracing::info!(user_id, subquest_id, id = submission.id, "Submission recorded");
            return Ok(SubmissionReceipt {
                submission,
                duplicate: false,
            });
        }

        // Already recorded, possibly from another device
        let submission = self
            .db
            .find_submission(user_id, subquest_id)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "Submission for subquest {} rejected but not found",
                    subquest_id
                ))
            })?;
        tracing::debug!(user_id, subquest_id, "Submission already recorded");

        Ok(SubmissionReceipt {
            submission,
            duplicate: true,
        })
    }

    /// Whether the user has already satisfied the subquest.
    pub async fn has_submitted(&self, user_id: &str, subquest_id: SubquestId) -> Result<bool> {
        Ok(self.db.find_submission(user_id, subquest_id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBackend;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_second_record_returns_original_row() {
        let recorder = SubmissionRecorder::new(QuestDb::new(Arc::new(MemoryBackend::new())));

        let first = recorder.record("u1", 5).await.unwrap();
        let second = recorder.record("u1", 5).await.unwrap();

        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(first.submission.id, second.submission.id);
        assert!(recorder.has_submitted("u1", 5).await.unwrap());
        assert!(!recorder.has_submitted("u2", 5).await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_backend_is_retryable() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_offline(true);
        let recorder = SubmissionRecorder::new(QuestDb::new(backend));

        let err = recorder.record("u1", 5).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
