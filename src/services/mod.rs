// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod achievement;
pub mod completion;
pub mod judge;
pub mod leaderboard;
pub mod live_event;
pub mod proof;
pub mod proximity;
pub mod quest;
pub mod session;
pub mod social;
pub mod streak;
pub mod submission;

pub use achievement::AchievementEngine;
pub use completion::{CompletionOutcome, CompletionReport, CompletionTracker, QuestProgress};
pub use judge::{PhotoJudgeClient, Verdict};
pub use leaderboard::LeaderboardService;
pub use live_event::{
    ChannelConnection, ChatLine, ConnectionState, LiveEventCoordinator, LocalHub,
    RealtimeTransport,
};
pub use proof::{ProofOutcome, ProofService};
pub use quest::QuestService;
pub use session::{SessionService, SessionSummary};
pub use social::SocialService;
pub use submission::SubmissionRecorder;
