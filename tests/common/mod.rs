// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use quest_tracker::config::Config;
use quest_tracker::db::{MemoryBackend, Oracle};
use quest_tracker::error::{AppError, Result};
use quest_tracker::models::{
    QuestBundle, QuestDraft, QuestType, SessionContext, SubquestDraft, SubquestType,
};
use quest_tracker::QuestEngine;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Check if a live backend is configured via environment variable.
#[allow(dead_code)]
pub fn backend_available() -> bool {
    std::env::var("QUEST_BACKEND_URL").is_ok()
}

/// Skip test with message if no live backend is configured.
#[macro_export]
macro_rules! require_backend {
    () => {
        if !crate::common::backend_available() {
            eprintln!("⚠️  Skipping: QUEST_BACKEND_URL not set");
            return;
        }
    };
}

/// Photo judge stand-in with a scripted answer.
#[allow(dead_code)]
pub struct ScriptedOracle {
    answer: Mutex<std::result::Result<Value, String>>,
    calls: Mutex<Vec<Value>>,
}

#[allow(dead_code)]
impl ScriptedOracle {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Mutex::new(Ok(Value::String(answer.to_string()))),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set_answer(&self, answer: &str) {
        *self.answer.lock().unwrap() = Ok(Value::String(answer.to_string()));
    }

    /// Make every following call fail as if the function were unreachable.
    pub fn fail(&self, reason: &str) {
        *self.answer.lock().unwrap() = Err(reason.to_string());
    }

    /// Request bodies received so far.
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn invoke(&self, _function: &str, body: Value) -> Result<Value> {
        self.calls.lock().unwrap().push(body);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .map_err(AppError::Transport)
    }
}

/// Engine on an in-memory backend with a judge that answers YES.
#[allow(dead_code)]
pub fn test_engine() -> (QuestEngine, Arc<MemoryBackend>, Arc<ScriptedOracle>) {
    let oracle = ScriptedOracle::answering("YES");
    let (engine, memory) = QuestEngine::in_memory(Config::default(), oracle.clone());
    (engine, memory, oracle)
}

#[allow(dead_code)]
pub fn ctx(user_id: &str) -> SessionContext {
    SessionContext::new(user_id)
}

#[allow(dead_code)]
pub fn photo(prompt: &str) -> SubquestDraft {
    SubquestDraft {
        prompt: prompt.to_string(),
        subquest_type: SubquestType::Photo,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn location(prompt: &str, latitude: f64, longitude: f64) -> SubquestDraft {
    SubquestDraft {
        prompt: prompt.to_string(),
        subquest_type: SubquestType::Location,
        latitude: Some(latitude),
        longitude: Some(longitude),
        code: None,
    }
}

#[allow(dead_code)]
pub fn scan(prompt: &str, code: &str) -> SubquestDraft {
    SubquestDraft {
        prompt: prompt.to_string(),
        subquest_type: SubquestType::Scan,
        code: Some(code.to_string()),
        ..Default::default()
    }
}

/// A valid draft with the given subquests, open for a week from `now`.
#[allow(dead_code)]
pub fn draft(title: &str, subquests: Vec<SubquestDraft>, now: DateTime<Utc>) -> QuestDraft {
    QuestDraft {
        title: title.to_string(),
        description: format!("{} description", title),
        quest_type: QuestType::Path,
        location: Some("Chicago, IL".to_string()),
        is_public: true,
        deadline: now + Duration::days(7),
        subquests,
        winner_messages: Vec::new(),
        default_message: None,
    }
}

/// Create a quest authored by "author" and return it loaded.
#[allow(dead_code)]
pub async fn seed_quest(engine: &QuestEngine, subquests: Vec<SubquestDraft>) -> QuestBundle {
    let now = Utc::now();
    engine
        .quests
        .create_quest(&ctx("author"), &draft("Seeded quest", subquests, now), now)
        .await
        .expect("Failed to seed quest")
}
