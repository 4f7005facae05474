//! Profile and login models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// Public profile, one per user. Read-only to this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// User ID (also the identity provider's ID)
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
}

/// One row per app session start. Source of truth for streaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    #[serde(default)]
    pub id: i64,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Caller identity, passed explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: UserId,
}

impl SessionContext {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}
