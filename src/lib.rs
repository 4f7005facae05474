// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Quest-Tracker: proof verification and progress tracking for photo and
//! location quests.
//!
//! This crate decides whether a submitted proof satisfies a quest
//! requirement, tracks multi-step completion and finishing rank across
//! concurrent players, grants streak and first-place achievements, and
//! keeps live event leaderboards and chat in sync over broadcast frames.
//! Quests also carry comments and likes.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::{Backend, MemoryBackend, ObjectStore, Oracle, QuestDb, RestBackend};
use error::Result;
use models::{QuestBundle, SessionContext};
use services::{
    AchievementEngine, CompletionTracker, LeaderboardService, LiveEventCoordinator,
    PhotoJudgeClient, ProofService, QuestService, RealtimeTransport, SessionService,
    SocialService, SubmissionRecorder,
};

/// Shared engine state: every service wired to one backend.
#[derive(Clone)]
pub struct QuestEngine {
    pub config: Config,
    pub db: QuestDb,
    pub quests: QuestService,
    pub proofs: ProofService,
    pub achievements: AchievementEngine,
    pub leaderboards: LeaderboardService,
    pub sessions: SessionService,
    pub social: SocialService,
}

impl QuestEngine {
    pub fn new(
        config: Config,
        backend: Arc<dyn Backend>,
        store: Arc<dyn ObjectStore>,
        oracle: Arc<dyn Oracle>,
    ) -> Self {
        let db = QuestDb::new(backend);
        let achievements = AchievementEngine::new(db.clone());
        let quests = QuestService::new(db.clone());
        let proofs = ProofService::new(
            store,
            config.storage_bucket.clone(),
            PhotoJudgeClient::new(oracle, config.judge_function.clone()),
            SubmissionRecorder::new(db.clone()),
            CompletionTracker::new(db.clone(), achievements.clone()),
            quests.clone(),
            config.proximity_tolerance_meters,
        );

        Self {
            leaderboards: LeaderboardService::new(db.clone()),
            sessions: SessionService::new(db.clone(), achievements.clone()),
            social: SocialService::new(db.clone()),
            config,
            db,
            quests,
            proofs,
            achievements,
        }
    }

    /// Engine backed by the hosted REST backend.
    pub fn connect(config: Config) -> Result<Self> {
        let rest = Arc::new(RestBackend::new(&config)?);
        Ok(Self::new(config, rest.clone(), rest.clone(), rest))
    }

    /// Engine on an in-process backend; the judge must be supplied.
    pub fn in_memory(config: Config, oracle: Arc<dyn Oracle>) -> (Self, Arc<MemoryBackend>) {
        let memory = Arc::new(MemoryBackend::new());
        let engine = Self::new(config, memory.clone(), memory.clone(), oracle);
        (engine, memory)
    }

    /// Coordinator for a quest's live event.
    pub fn live_event(
        &self,
        ctx: &SessionContext,
        bundle: &QuestBundle,
        transport: Arc<dyn RealtimeTransport>,
    ) -> LiveEventCoordinator {
        LiveEventCoordinator::new(
            ctx.user_id.clone(),
            bundle,
            transport,
            self.leaderboards.clone(),
        )
    }
}
