// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Backend`] is the row-level contract of the hosted relational store;
//! [`QuestDb`] wraps it with typed domain operations.

pub mod memory;
pub mod quest_db;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use memory::MemoryBackend;
pub use quest_db::QuestDb;
pub use rest::RestBackend;

/// Table names as constants.
pub mod tables {
    pub const QUESTS: &str = "quest";
    pub const SUBQUESTS: &str = "subquest";
    pub const SUBMISSIONS: &str = "submission";
    pub const COMPLETIONS: &str = "completion";
    pub const ACHIEVEMENTS: &str = "achievement";
    /// Catalog of achievement names and descriptions
    pub const ACHIEVEMENT_CATALOG: &str = "achievement id";
    pub const LOGINS: &str = "login";
    pub const PROFILES: &str = "profile";
    /// Per-place winner messages
    pub const PLACEMENT_MESSAGES: &str = "message";
    pub const LEADERBOARD_META: &str = "leaderboard meta";
    pub const LEADERBOARD_MEMBERS: &str = "leaderboard";
    pub const COMMENTS: &str = "comment";
    pub const COMMENT_LIKES: &str = "comment score";
    pub const QUEST_LIKES: &str = "quest score";
}

/// A single filter predicate on a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Case-insensitive pattern; `%` matches any run of characters
    ILike(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Filters plus optional ordering and limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn is_in<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.filters.push(Filter::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn ilike(mut self, column: &str, pattern: impl Into<String>) -> Self {
        self.filters
            .push(Filter::ILike(column.to_string(), pattern.into()));
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Outcome of an insert guarded by a unique constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Value),
    /// A row with the same conflict columns already existed; nothing written
    Duplicate,
}

/// Row-level access to the hosted relational store.
///
/// Every call is independently fallible. Rows are JSON objects keyed by
/// column name; the store fills in `id` and `created_at` when omitted.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>>;

    async fn count(&self, table: &str, query: &Query) -> Result<u64>;

    /// Insert rows and return them as stored.
    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>>;

    /// Atomically insert `row` unless a row with equal `conflict_columns` exists.
    async fn insert_unique(
        &self,
        table: &str,
        row: Value,
        conflict_columns: &[&str],
    ) -> Result<InsertOutcome>;

    /// Apply `patch` to matching rows and return them as updated.
    async fn update(&self, table: &str, patch: Value, query: &Query) -> Result<Vec<Value>>;

    /// Delete matching rows and return how many were removed.
    async fn delete(&self, table: &str, query: &Query) -> Result<u64>;
}

/// Object storage for uploaded images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Remote function invocation.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn invoke(&self, function: &str, body: Value) -> Result<Value>;
}
