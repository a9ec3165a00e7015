//! Broadcaster port - Delivery of game events to connected clients
//!
//! Game state is committed before an event is handed over, so a failed
//! broadcast is reported but never rolls anything back.

use crate::domain::events::GameEvent;

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("Event channel is closed")]
    ChannelClosed,
}

/// Port for publishing events to every session participant
///
/// Implementations must not block; the caller may hold a game lock.
pub trait Broadcaster: Send + Sync {
    fn broadcast_event(&self, event: GameEvent) -> Result<(), BroadcastError>;
}
