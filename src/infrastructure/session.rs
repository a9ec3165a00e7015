//! Session tracking for connected clients
//!
//! One quest runs per process, so there is a single session. It records who
//! is connected in which role and fans game events out to every socket.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};

use crate::application::ports::outbound::{BroadcastError, Broadcaster};
use crate::domain::events::GameEvent;
use crate::infrastructure::websocket::messages::{OutboundMessage, ParticipantInfo, ParticipantRole};

/// Unique identifier for a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(uuid::Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A connected client
#[derive(Debug, Clone)]
pub struct SessionParticipant {
    pub client_id: ClientId,
    pub user_id: String,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
    /// Channel to send messages to this client
    pub sender: mpsc::UnboundedSender<OutboundMessage>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Another user is already the game master")]
    GameMasterPresent,

    #[error("Client {0} already joined")]
    AlreadyJoined(ClientId),

    #[error("Client {0} has not joined the session")]
    NotJoined(ClientId),

    #[error("User id must not be empty")]
    EmptyUserId,
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::GameMasterPresent => "game_master_present",
            SessionError::AlreadyJoined(_) => "already_joined",
            SessionError::NotJoined(_) => "not_joined",
            SessionError::EmptyUserId => "invalid_user",
        }
    }
}

/// The connected participants of the running quest
#[derive(Debug, Default)]
pub struct SessionManager {
    participants: HashMap<ClientId, SessionParticipant>,
    /// User id of the game master; several tabs of the same user may connect
    game_master: Option<String>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(
        &mut self,
        client_id: ClientId,
        user_id: String,
        role: ParticipantRole,
        sender: mpsc::UnboundedSender<OutboundMessage>,
    ) -> Result<(), SessionError> {
        if user_id.trim().is_empty() {
            return Err(SessionError::EmptyUserId);
        }
        if self.participants.contains_key(&client_id) {
            return Err(SessionError::AlreadyJoined(client_id));
        }
        if role == ParticipantRole::GameMaster {
            match &self.game_master {
                Some(existing) if *existing != user_id => return Err(SessionError::GameMasterPresent),
                _ => self.game_master = Some(user_id.clone()),
            }
        }

        tracing::info!("Client {} (user: {}) joined as {:?}", client_id, user_id, role);
        self.participants.insert(
            client_id,
            SessionParticipant {
                client_id,
                user_id,
                role,
                joined_at: Utc::now(),
                sender,
            },
        );
        Ok(())
    }

    pub fn leave(&mut self, client_id: ClientId) -> Option<SessionParticipant> {
        let participant = self.participants.remove(&client_id)?;
        let game_master_left = participant.role == ParticipantRole::GameMaster
            && !self
                .participants
                .values()
                .any(|p| p.role == ParticipantRole::GameMaster);
        if game_master_left {
            self.game_master = None;
        }
        tracing::info!(
            "Client {} (user: {}) left the session after {}s",
            client_id,
            participant.user_id,
            (Utc::now() - participant.joined_at).num_seconds()
        );
        Some(participant)
    }

    pub fn participant(&self, client_id: ClientId) -> Option<&SessionParticipant> {
        self.participants.get(&client_id)
    }

    pub fn participants(&self) -> Vec<ParticipantInfo> {
        let mut infos: Vec<ParticipantInfo> = self
            .participants
            .values()
            .map(|p| ParticipantInfo {
                user_id: p.user_id.clone(),
                role: p.role,
            })
            .collect();
        infos.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        infos.dedup();
        infos
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Broadcast a message to all participants
    pub fn broadcast(&self, message: &OutboundMessage) {
        for participant in self.participants.values() {
            if let Err(e) = participant.sender.send(message.clone()) {
                tracing::warn!("Failed to send message to client {}: {}", participant.client_id, e);
            }
        }
    }

    /// Broadcast a message to all participants except one
    pub fn broadcast_except(&self, message: &OutboundMessage, exclude: ClientId) {
        for participant in self.participants.values() {
            if participant.client_id == exclude {
                continue;
            }
            if let Err(e) = participant.sender.send(message.clone()) {
                tracing::warn!("Failed to send message to client {}: {}", participant.client_id, e);
            }
        }
    }
}

/// Hands game events to the fan-out worker without blocking the caller
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: mpsc::UnboundedSender<GameEvent>,
}

impl ChannelBroadcaster {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<GameEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn broadcast_event(&self, event: GameEvent) -> Result<(), BroadcastError> {
        self.sender.send(event).map_err(|_| BroadcastError::ChannelClosed)
    }
}

/// Delivers queued game events to every participant until the channel closes
pub async fn event_fanout_worker(
    mut events: mpsc::UnboundedReceiver<GameEvent>,
    sessions: Arc<RwLock<SessionManager>>,
) {
    tracing::info!("Starting event fan-out worker");
    while let Some(event) = events.recv().await {
        tracing::debug!("Broadcasting {}", event.kind());
        let sessions = sessions.read().await;
        sessions.broadcast(&OutboundMessage::Game(event));
    }
    tracing::info!("Event channel closed, fan-out worker stopping");
}
