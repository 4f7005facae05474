// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared by every service.
//!
//! Callers branch on the variant to decide between "try again"
//! (`Transport`, `Database`), "fix your input" (`Validation`) and benign
//! races (`Conflict`). A NO verdict from the photo judge is not an error.

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Malformed data: {0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the operation may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::Database(_))
    }

    /// Whether this is a unique-constraint violation.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errs: validator::ValidationErrors) -> Self {
        AppError::Validation(errs.to_string())
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
