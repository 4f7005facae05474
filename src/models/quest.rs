// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quest and subquest models, plus the authoring draft.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::error::{AppError, Result};
use crate::models::{QuestId, SubquestId, UserId};

/// Kind of quest. Fixed once the quest is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestType {
    Photo,
    Location,
    Path,
    Community,
}

impl QuestType {
    /// Value stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestType::Photo => "PHOTO",
            QuestType::Location => "LOCATION",
            QuestType::Path => "PATH",
            QuestType::Community => "COMMUNITY",
        }
    }
}

/// Kind of proof a subquest accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubquestType {
    #[default]
    Photo,
    Scan,
    Location,
}

/// Stored quest row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    /// Author's user ID (owner)
    pub author: UserId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form place name (e.g. "Chicago, IL")
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub quest_type: QuestType,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Only enforced when browsing
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

fn default_public() -> bool {
    true
}

impl Quest {
    /// Whether the quest is still open for browsing at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_none_or(|deadline| deadline > now)
    }
}

/// Stored subquest row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subquest {
    pub id: SubquestId,
    pub quest_id: QuestId,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(rename = "type", default)]
    pub subquest_type: SubquestType,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub code: Option<String>,
}

impl Subquest {
    /// Requirement text handed to the photo judge.
    pub fn prompt_text(&self) -> &str {
        self.prompt.as_deref().unwrap_or("")
    }
}

/// A quest together with its full subquest set, captured once per load.
#[derive(Debug, Clone)]
pub struct QuestBundle {
    pub quest: Quest,
    pub subquests: Vec<Subquest>,
}

impl QuestBundle {
    pub fn subquest_ids(&self) -> Vec<SubquestId> {
        self.subquests.iter().map(|s| s.id).collect()
    }

    pub fn subquest(&self, id: SubquestId) -> Option<&Subquest> {
        self.subquests.iter().find(|s| s.id == id)
    }
}

/// Author-supplied message shown to a finisher at a given place.
///
/// `place` is 1-based; place 0 holds the quest's default message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementMessage {
    #[serde(default)]
    pub id: i64,
    pub quest_id: QuestId,
    pub place: i64,
    #[serde(default)]
    pub content: Option<String>,
}

// ─── Authoring ──────────────────────────────────────────────

/// One requirement inside a [`QuestDraft`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubquestDraft {
    pub prompt: String,
    pub subquest_type: SubquestType,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub code: Option<String>,
}

/// Everything needed to publish a new quest.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct QuestDraft {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(length(min = 1, message = "Please enter a quest description"))]
    pub description: String,
    pub quest_type: QuestType,
    pub location: Option<String>,
    pub is_public: bool,
    pub deadline: DateTime<Utc>,
    #[validate(length(min = 1, message = "A quest needs at least one subquest"))]
    pub subquests: Vec<SubquestDraft>,
    /// Messages for places 1, 2, 3, ... in order
    #[serde(default)]
    pub winner_messages: Vec<String>,
    /// Shown to finishers without a place-specific message
    #[serde(default)]
    pub default_message: Option<String>,
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank")
            .with_message(Cow::Borrowed("Please enter a quest title")));
    }
    Ok(())
}

impl QuestDraft {
    /// Validate the draft before any backend call is made.
    pub fn check(&self, now: DateTime<Utc>) -> Result<()> {
        self.validate()?;

        if self.deadline <= now {
            return Err(AppError::Validation(
                "Deadline must be in the future".to_string(),
            ));
        }

        for (idx, sub) in self.subquests.iter().enumerate() {
            match sub.subquest_type {
                SubquestType::Location => {
                    let valid = matches!(
                        (sub.latitude, sub.longitude),
                        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite()
                    );
                    if !valid {
                        return Err(AppError::Validation(format!(
                            "Subquest {} needs a latitude and longitude",
                            idx + 1
                        )));
                    }
                }
                SubquestType::Scan => {
                    if sub.code.as_deref().is_none_or(|c| c.trim().is_empty()) {
                        return Err(AppError::Validation(format!(
                            "Subquest {} needs a scan code",
                            idx + 1
                        )));
                    }
                }
                SubquestType::Photo => {
                    if sub.prompt.trim().is_empty() {
                        return Err(AppError::Validation(format!(
                            "Subquest {} needs a photo requirement",
                            idx + 1
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
