// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live event broadcast frames.
//!
//! Every participant's client exchanges JSON frames of the shape
//! `{"type":"broadcast","event":"<kind>","payload":{"userId":..,"message":..}}`.
//! Field names are part of the interop contract and must not change.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::models::UserId;

/// Frame type marker. Only broadcast frames are exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    Broadcast,
}

/// Event name carried in the `event` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Join,
    Message,
    Complete,
}

/// Frame payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct BroadcastPayload {
    // Older clients send `user_id`
    #[serde(
        rename = "userId",
        alias = "user_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A complete frame as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "bindings/"))]
pub struct BroadcastEnvelope {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub event: EventKind,
    pub payload: BroadcastPayload,
}

/// A decoded live event message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveMessage {
    /// A participant subscribed to the channel
    Join { user_id: UserId },
    /// Free-text chat line
    Chat { user_id: UserId, message: String },
    /// A participant recorded progress; peers refresh their leaderboard
    Complete { user_id: UserId },
}

impl LiveMessage {
    pub fn kind(&self) -> EventKind {
        match self {
            LiveMessage::Join { .. } => EventKind::Join,
            LiveMessage::Chat { .. } => EventKind::Message,
            LiveMessage::Complete { .. } => EventKind::Complete,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            LiveMessage::Join { user_id }
            | LiveMessage::Chat { user_id, .. }
            | LiveMessage::Complete { user_id } => user_id,
        }
    }

    pub fn to_envelope(&self) -> BroadcastEnvelope {
        let (user_id, message) = match self {
            LiveMessage::Join { user_id } | LiveMessage::Complete { user_id } => {
                (user_id.clone(), None)
            }
            LiveMessage::Chat { user_id, message } => (user_id.clone(), Some(message.clone())),
        };
        BroadcastEnvelope {
            frame_type: FrameType::Broadcast,
            event: self.kind(),
            payload: BroadcastPayload {
                user_id: Some(user_id),
                message,
            },
        }
    }

    /// Serialize to a wire frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_envelope())?)
    }

    /// Parse a wire frame. Unknown event names are errors.
    pub fn decode(frame: &str) -> Result<Self> {
        let envelope: BroadcastEnvelope = serde_json::from_str(frame)?;
        Self::try_from(envelope)
    }
}

impl TryFrom<BroadcastEnvelope> for LiveMessage {
    type Error = AppError;

    fn try_from(envelope: BroadcastEnvelope) -> Result<Self> {
        let BroadcastPayload { user_id, message } = envelope.payload;
        match envelope.event {
            EventKind::Join => Ok(LiveMessage::Join {
                user_id: user_id.ok_or_else(|| missing("join", "userId"))?,
            }),
            EventKind::Message => Ok(LiveMessage::Chat {
                user_id: user_id.ok_or_else(|| missing("message", "userId"))?,
                message: message.ok_or_else(|| missing("message", "message"))?,
            }),
            // Older clients put the sender in `message`
            EventKind::Complete => Ok(LiveMessage::Complete {
                user_id: user_id
                    .or(message)
                    .ok_or_else(|| missing("complete", "userId"))?,
            }),
        }
    }
}

fn missing(event: &str, field: &str) -> AppError {
    AppError::Decode(format!("{} frame without payload.{}", event, field))
}
