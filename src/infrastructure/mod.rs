//! Infrastructure layer - External adapters and implementations
//!
//! This layer contains:
//! - Config: `DUNGEON_*` environment configuration
//! - Quest loader: quest files on disk and the built-in demo quest
//! - Session: connected clients and the game event fan-out
//! - WebSocket: real-time game requests from clients
//! - HTTP: read-only REST views of the quest
//! - State: shared application state

pub mod config;
pub mod http;
pub mod quest_loader;
pub mod session;
pub mod state;
pub mod websocket;
