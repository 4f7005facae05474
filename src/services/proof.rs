// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Proof flow.
//!
//! Handles the full path of a single proof:
//! 1. Verify it (photo judge, proximity, or scan code)
//! 2. Record the submission
//! 3. Re-evaluate quest completion and first-place achievements
//! 4. Look up the author's placement message for a finisher
//!
//! Local progress only advances after storage confirms the submission.

use std::sync::Arc;

use crate::db::ObjectStore;
use crate::error::{AppError, Result};
use crate::models::{
    AchievementId, Coordinate, SessionContext, Submission, Subquest, SubquestType,
};
use crate::services::proximity::{distance_meters, verify};
use crate::services::{
    CompletionOutcome, CompletionTracker, PhotoJudgeClient, QuestProgress, QuestService,
    SubmissionRecorder,
};

const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Result of one proof attempt.
#[derive(Debug, Clone)]
pub enum ProofOutcome {
    Accepted {
        submission: Submission,
        /// The subquest had already been recorded for this user
        duplicate: bool,
        completion: CompletionOutcome,
        placement_message: Option<String>,
        granted: Vec<AchievementId>,
        /// Public URL of the stored proof photo
        image_url: Option<String>,
    },
    /// The judge said NO or the scanned code did not match
    Rejected,
    /// Too far from the target; `None` when the position was unusable
    OutOfRange { distance_meters: Option<f64> },
}

impl ProofOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ProofOutcome::Accepted { .. })
    }

    pub fn completion(&self) -> Option<&CompletionOutcome> {
        match self {
            ProofOutcome::Accepted { completion, .. } => Some(completion),
            _ => None,
        }
    }
}

/// Storage path of a proof photo.
pub fn image_path(user_id: &str, subquest: &Subquest) -> String {
    format!("{}/{}/{}.jpg", user_id, subquest.quest_id, subquest.id)
}

#[derive(Clone)]
pub struct ProofService {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    judge: PhotoJudgeClient,
    recorder: SubmissionRecorder,
    tracker: CompletionTracker,
    quests: QuestService,
    tolerance_meters: f64,
}

impl ProofService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        judge: PhotoJudgeClient,
        recorder: SubmissionRecorder,
        tracker: CompletionTracker,
        quests: QuestService,
        tolerance_meters: f64,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            judge,
            recorder,
            tracker,
            quests,
            tolerance_meters,
        }
    }

    /// Upload a photo, have it judged, and record it on a YES.
    pub async fn submit_photo(
        &self,
        ctx: &SessionContext,
        progress: &mut QuestProgress,
        subquest: &Subquest,
        image: Vec<u8>,
    ) -> Result<ProofOutcome> {
        check_subquest(progress, subquest, SubquestType::Photo)?;
        if image.is_empty() {
            return Err(AppError::Validation("Please select an image first".to_string()));
        }

        let path = image_path(&ctx.user_id, subquest);
        self.store
            .upload(&self.bucket, &path, image, IMAGE_CONTENT_TYPE)
            .await?;
        let image_url = self.store.public_url(&self.bucket, &path);
        tracing::debug!(user_id = %ctx.user_id, url = %image_url, "Proof image uploaded");

        let verdict = self.judge.judge(&path, subquest.prompt_text()).await?;
        if !verdict.is_yes() {
            tracing::info!(user_id = %ctx.user_id, subquest_id = subquest.id, "Photo rejected");
            return Ok(ProofOutcome::Rejected);
        }

        self.accept(ctx, progress, subquest, Some(image_url)).await
    }

    /// Check the device position against a location subquest.
    pub async fn submit_location(
        &self,
        ctx: &SessionContext,
        progress: &mut QuestProgress,
        subquest: &Subquest,
        position: Coordinate,
    ) -> Result<ProofOutcome> {
        check_subquest(progress, subquest, SubquestType::Location)?;
        let target = match (subquest.latitude, subquest.longitude) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
            _ => {
                return Err(AppError::Validation(format!(
                    "Subquest {} has no target location",
                    subquest.id
                )))
            }
        };

        if !verify(position, target, self.tolerance_meters) {
            let distance = distance_meters(position, target);
            tracing::info!(
                user_id = %ctx.user_id,
                subquest_id = subquest.id,
                distance_m = ?distance,
                "Location out of range"
            );
            return Ok(ProofOutcome::OutOfRange {
                distance_meters: distance,
            });
        }

        self.accept(ctx, progress, subquest, None).await
    }

    /// Compare a scanned code with the subquest's code.
    pub async fn submit_scan(
        &self,
        ctx: &SessionContext,
        progress: &mut QuestProgress,
        subquest: &Subquest,
        scanned_code: &str,
    ) -> Result<ProofOutcome> {
        check_subquest(progress, subquest, SubquestType::Scan)?;
        let expected = subquest
            .code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::Validation(format!("Subquest {} has no code", subquest.id))
            })?;

        if scanned_code.trim() != expected {
            tracing::info!(user_id = %ctx.user_id, subquest_id = subquest.id, "Scan rejected");
            return Ok(ProofOutcome::Rejected);
        }

        self.accept(ctx, progress, subquest, None).await
    }

    async fn accept(
        &self,
        ctx: &SessionContext,
        progress: &mut QuestProgress,
        subquest: &Subquest,
        image_url: Option<String>,
    ) -> Result<ProofOutcome> {
        let receipt = self.recorder.record(&ctx.user_id, subquest.id).await?;

        let report = self
            .tracker
            .on_subquest_submitted(&ctx.user_id, progress, subquest.id)
            .await?;

        let placement_message = match report.outcome.rank() {
            Some(rank) => self.quests.placement_message(progress.quest_id, rank).await?,
            None => None,
        };

        Ok(ProofOutcome::Accepted {
            submission: receipt.submission,
            duplicate: receipt.duplicate,
            completion: report.outcome,
            placement_message,
            granted: report.granted,
            image_url,
        })
    }
}

fn check_subquest(
    progress: &QuestProgress,
    subquest: &Subquest,
    expected: SubquestType,
) -> Result<()> {
    if subquest.quest_id != progress.quest_id
        || !progress.all_subquest_ids.contains(&subquest.id)
    {
        return Err(AppError::Validation(format!(
            "Subquest {} is not part of quest {}",
            subquest.id, progress.quest_id
        )));
    }
    if subquest.subquest_type != expected {
        return Err(AppError::Validation(format!(
            "Subquest {} is a {:?} subquest",
            subquest.id, subquest.subquest_type
        )));
    }
    Ok(())
}
