//! Domain layer - Game rules with no transport or storage concerns
//!
//! This layer contains:
//! - Entities: Board, Player, Monster, TurnState
//! - Value Objects: ids, tiles and edges, dice faces, capabilities
//! - Domain Events: what clients are told after each change
//! - Domain Services: turn engine, movement ledger, visibility, dice

pub mod entities;
pub mod errors;
pub mod events;
pub mod services;
pub mod value_objects;
