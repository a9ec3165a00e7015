//! Outbound ports - Interfaces that the application requires from external systems

mod broadcaster_port;
mod quest_repository_port;

pub use broadcaster_port::{BroadcastError, Broadcaster};
pub use quest_repository_port::{QuestLoadError, QuestRepository};
