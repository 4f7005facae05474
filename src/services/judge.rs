// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Photo judge client.
//!
//! Asks the remote vision function whether an uploaded image satisfies a
//! subquest's requirement. The function answers with a bare JSON string;
//! only an exact `"YES"` counts as a match.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::Oracle;
use crate::error::Result;

const QUESTION_PREFIX: &str = "Does the image match the following description? Reply YES or NO.";

/// Judge's answer. A NO is a normal rejection, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Yes,
    No,
}

impl Verdict {
    /// Normalize the raw function output.
    pub fn from_response(response: &Value) -> Self {
        match response.as_str() {
            Some("YES") => Verdict::Yes,
            _ => Verdict::No,
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Verdict::Yes)
    }
}

/// Build the yes/no question for a requirement.
pub fn question_for(requirement: &str) -> String {
    format!("{} {}", QUESTION_PREFIX, requirement)
}

/// Client for the photo-judge function.
#[derive(Clone)]
pub struct PhotoJudgeClient {
    oracle: Arc<dyn Oracle>,
    function: String,
}

impl PhotoJudgeClient {
    pub fn new(oracle: Arc<dyn Oracle>, function: impl Into<String>) -> Self {
        Self {
            oracle,
            function: function.into(),
        }
    }

    /// Judge an already-uploaded image (`image_ref` is its storage path).
    ///
    /// Transport failures propagate as retryable errors; the caller must
    /// not record a submission in that case.
    pub async fn judge(&self, image_ref: &str, requirement: &str) -> Result<Verdict> {
        let body = json!({
            "image": image_ref,
            "question": question_for(requirement),
        });

        let response = self.oracle.invoke(&self.function, body).await.map_err(|e| {
            tracing::warn!(image = image_ref, error = %e, "Photo judge call failed");
            e
        })?;

        let verdict = Verdict::from_response(&response);
        tracing::info!(image = image_ref, ?verdict, "Photo judged");
        Ok(verdict)
    }
}
