//! Application services - Use case implementations
//!
//! The quest service is the single entry point for game requests. It owns the
//! board, turn engine, dice and visibility memory and publishes every accepted
//! change through the `Broadcaster` port.

pub mod quest_service;

pub use quest_service::{
    ActionOutcome, Actor, EntityView, KnownSets, PlayerView, QuestService, QuestSettings,
    QuestSetupError, QuestSummary,
};
