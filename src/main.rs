// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Quest-Tracker session runner
//!
//! Starts a session for one user against the hosted backend: logs the
//! login, computes the streak, grants streak achievements and prints any
//! achievements not yet announced.

use chrono::Local;
use quest_tracker::{config::Config, models::SessionContext, QuestEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    let user_id = std::env::args()
        .nth(1)
        .ok_or("usage: quest-tracker <user-id>")?;

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(backend = %config.backend_url, "Starting Quest-Tracker");

    let engine = QuestEngine::connect(config).expect("Failed to initialize backend client");

    let ctx = SessionContext::new(user_id);
    let summary = engine.sessions.start_session(&ctx, Local::now()).await?;

    tracing::info!(user_id = %ctx.user_id, streak = summary.streak, "Login streak");
    for announcement in &summary.announcements {
        tracing::info!(
            user_id = %ctx.user_id,
            achievement = announcement.achievement.achievement_id.0,
            "{}",
            announcement.headline()
        );
    }
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quest_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
