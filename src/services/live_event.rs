// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live event coordination.
//!
//! Participants of a live event share one broadcast channel
//! (`event:{quest_id}`) carrying join, chat and completion frames. Each
//! client keeps its own chat transcript and refreshes the event
//! leaderboard from storage whenever a peer announces progress.
//!
//! Delivery is at-most-once with no history: frames sent while a client is
//! not subscribed are never replayed.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{LeaderboardEntry, LiveMessage, QuestBundle, QuestId, SubquestId, UserId};
use crate::services::LeaderboardService;

/// System line appended when a peer joins.
pub const JOIN_NOTICE: &str = "Someone joined the event!";
/// System line appended when a peer records progress.
pub const COMPLETE_NOTICE: &str = "Somebody just completed a subquest!";

const HUB_CAPACITY: usize = 256;

/// Channel name for a quest's live event.
pub fn channel_name(quest_id: QuestId) -> String {
    format!("event:{}", quest_id)
}

// ─── Transport ──────────────────────────────────────────────

/// Publish/subscribe transport keyed by channel name.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn ChannelConnection>>;
}

/// One subscription to a channel.
#[async_trait]
pub trait ChannelConnection: Send + Sync {
    /// Broadcast a text frame to every other subscriber.
    async fn send(&self, frame: String) -> Result<()>;

    /// Next frame from a peer, or `None` once unsubscribed or closed.
    async fn recv(&mut self) -> Option<String>;

    /// Stop delivery. Safe to call more than once.
    async fn unsubscribe(&mut self);
}

#[derive(Debug, Clone)]
struct HubFrame {
    origin: Uuid,
    text: Arc<str>,
}

/// In-process transport on tokio broadcast channels.
///
/// A sender never receives its own frames, and a subscriber that falls
/// more than the channel capacity behind skips the frames it missed. A
/// channel is dropped once its last subscriber goes away.
#[derive(Clone)]
pub struct LocalHub {
    channels: Arc<DashMap<String, broadcast::Sender<HubFrame>>>,
    capacity: usize,
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::with_capacity(HUB_CAPACITY)
    }
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Number of live subscriptions on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of channels with at least one subscriber.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait]
impl RealtimeTransport for LocalHub {
    async fn subscribe(&self, channel: &str) -> Result<Box<dyn ChannelConnection>> {
        // Subscribe under the entry lock so pruning cannot race us
        let entry = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        let receiver = entry.subscribe();
        let sender = entry.value().clone();
        drop(entry);

        Ok(Box::new(LocalConnection {
            origin: Uuid::new_v4(),
            channel: channel.to_string(),
            channels: self.channels.clone(),
            sender,
            receiver: Some(receiver),
        }))
    }
}

struct LocalConnection {
    origin: Uuid,
    channel: String,
    channels: Arc<DashMap<String, broadcast::Sender<HubFrame>>>,
    sender: broadcast::Sender<HubFrame>,
    receiver: Option<broadcast::Receiver<HubFrame>>,
}

#[async_trait]
impl ChannelConnection for LocalConnection {
    async fn send(&self, frame: String) -> Result<()> {
        if self.receiver.is_none() {
            return Err(AppError::Transport(format!(
                "Not subscribed to {}",
                self.channel
            )));
        }
        // No other subscribers is not an error
        let _ = self.sender.send(HubFrame {
            origin: self.origin,
            text: frame.into(),
        });
        Ok(())
    }

    async fn recv(&mut self) -> Option<String> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(frame) if frame.origin == self.origin => continue,
                Ok(frame) => return Some(frame.text.to_string()),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(channel = %self.channel, skipped, "Live event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    async fn unsubscribe(&mut self) {
        if self.release() {
            tracing::debug!(channel = %self.channel, "Unsubscribed");
        }
    }
}

impl LocalConnection {
    /// Drop our receiver and prune the channel if nobody is left.
    fn release(&mut self) -> bool {
        if self.receiver.take().is_none() {
            return false;
        }
        self.channels
            .remove_if(&self.channel, |_, tx| tx.receiver_count() == 0);
        true
    }
}

impl Drop for LocalConnection {
    fn drop(&mut self) {
        self.release();
    }
}

// ─── Coordinator ────────────────────────────────────────────

/// Subscription state of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Subscribing,
    Joined,
}

/// One line of the local chat transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    System(String),
    Message { user_id: UserId, text: String },
}

/// Per-client state machine for one live event.
pub struct LiveEventCoordinator {
    user_id: UserId,
    quest_id: QuestId,
    subquest_ids: Vec<SubquestId>,
    transport: Arc<dyn RealtimeTransport>,
    leaderboard: LeaderboardService,
    state: ConnectionState,
    connection: Option<Box<dyn ChannelConnection>>,
    transcript: Vec<ChatLine>,
    standings: Vec<LeaderboardEntry>,
}

impl LiveEventCoordinator {
    pub fn new(
        user_id: impl Into<UserId>,
        bundle: &QuestBundle,
        transport: Arc<dyn RealtimeTransport>,
        leaderboard: LeaderboardService,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            quest_id: bundle.quest.id,
            subquest_ids: bundle.subquest_ids(),
            transport,
            leaderboard,
            state: ConnectionState::Disconnected,
            connection: None,
            transcript: Vec::new(),
            standings: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn transcript(&self) -> &[ChatLine] {
        &self.transcript
    }

    /// Leaderboard as of the last refresh.
    pub fn standings(&self) -> &[LeaderboardEntry] {
        &self.standings
    }

    pub fn channel(&self) -> String {
        channel_name(self.quest_id)
    }

    /// Subscribe to the event channel and announce ourselves.
    pub async fn join(&mut self) -> Result<()> {
        if self.state == ConnectionState::Joined {
            return Ok(());
        }

        self.state = ConnectionState::Subscribing;
        let connection = match self.transport.subscribe(&self.channel()).await {
            Ok(connection) => connection,
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                tracing::warn!(quest_id = self.quest_id, error = %e, "Live event subscribe failed");
                return Err(e);
            }
        };
        self.connection = Some(connection);
        self.state = ConnectionState::Joined;
        tracing::info!(quest_id = self.quest_id, user_id = %self.user_id, "Joined live event");

        self.broadcast(LiveMessage::Join {
            user_id: self.user_id.clone(),
        })
        .await?;
        self.refresh_leaderboard().await
    }

    /// Send a chat line, then append it locally without waiting for an ack.
    pub async fn send_message(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Message is empty".to_string()));
        }
        self.broadcast(LiveMessage::Chat {
            user_id: self.user_id.clone(),
            message: text.to_string(),
        })
        .await?;
        self.transcript.push(ChatLine::Message {
            user_id: self.user_id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    /// Tell peers we recorded progress so they refresh their leaderboards.
    pub async fn announce_completion(&mut self) -> Result<()> {
        self.broadcast(LiveMessage::Complete {
            user_id: self.user_id.clone(),
        })
        .await?;
        // Our own frame is not echoed back
        self.transcript
            .push(ChatLine::System(COMPLETE_NOTICE.to_string()));
        self.refresh_leaderboard().await
    }

    /// Wait for the next peer frame and apply it.
    ///
    /// Returns `None` once the subscription has ended.
    pub async fn next_event(&mut self) -> Option<Result<LiveMessage>> {
        let frame = self.connection.as_mut()?.recv().await?;
        Some(self.handle_frame(&frame).await)
    }

    /// Apply one inbound frame to local state.
    pub async fn handle_frame(&mut self, frame: &str) -> Result<LiveMessage> {
        let message = LiveMessage::decode(frame).map_err(|e| {
            tracing::warn!(quest_id = self.quest_id, error = %e, "Dropping malformed frame");
            e
        })?;

        match &message {
            LiveMessage::Join { .. } => {
                self.transcript.push(ChatLine::System(JOIN_NOTICE.to_string()));
            }
            LiveMessage::Chat { user_id, message: text } => {
                self.transcript.push(ChatLine::Message {
                    user_id: user_id.clone(),
                    text: text.clone(),
                });
            }
            LiveMessage::Complete { .. } => {
                self.transcript
                    .push(ChatLine::System(COMPLETE_NOTICE.to_string()));
                self.refresh_leaderboard().await?;
            }
        }
        Ok(message)
    }

    /// Recompute the leaderboard from all submissions for the event.
    pub async fn refresh_leaderboard(&mut self) -> Result<()> {
        self.standings = self
            .leaderboard
            .quest_leaderboard(&self.subquest_ids)
            .await?;
        Ok(())
    }

    /// Unsubscribe. Safe to call repeatedly.
    pub async fn leave(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.unsubscribe().await;
            tracing::info!(quest_id = self.quest_id, user_id = %self.user_id, "Left live event");
        }
        self.state = ConnectionState::Disconnected;
    }

    async fn broadcast(&self, message: LiveMessage) -> Result<()> {
        let connection = match (self.state, self.connection.as_ref()) {
            (ConnectionState::Joined, Some(connection)) => connection,
            _ => {
                return Err(AppError::Validation(
                    "Not joined to the live event".to_string(),
                ))
            }
        };
        connection.send(message.encode()?).await
    }
}
