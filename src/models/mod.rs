// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod achievement;
pub mod broadcast;
pub mod leaderboard;
pub mod location;
pub mod profile;
pub mod quest;
pub mod social;
pub mod submission;

/// Identity provider's stable user ID.
pub type UserId = String;
pub type QuestId = i64;
pub type SubquestId = i64;

pub use achievement::{Achievement, AchievementId, AchievementInfo, Announcement};
pub use broadcast::{BroadcastEnvelope, LiveMessage};
pub use leaderboard::{
    GroupStanding, GroupStandings, LeaderboardEntry, LeaderboardMembership, LeaderboardMeta,
};
pub use location::Coordinate;
pub use profile::{Login, Profile, SessionContext};
pub use quest::{
    PlacementMessage, Quest, QuestBundle, QuestDraft, QuestType, Subquest, SubquestDraft,
    SubquestType,
};
pub use social::{Comment, CommentId, CommentLike, CommentView, LikeSummary, QuestLike};
pub use submission::{Completion, Submission, SubmissionReceipt};
