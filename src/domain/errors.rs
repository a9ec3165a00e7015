//! Validation errors returned by the game rules
//!
//! Every rejected request maps to one `GameError`. Rejections never leave
//! partial state behind; the caller reports `code()` and the display message
//! back to the requesting client.

use crate::domain::value_objects::{DoorId, EntityId, PlayerId, Tile};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Player already registered: {0}")]
    PlayerExists(PlayerId),

    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    #[error("Unknown door: {0}")]
    UnknownDoor(DoorId),

    #[error("It is not the heroes' turn")]
    NotHeroTurn,

    #[error("It is not the game master's turn")]
    NotGameMasterTurn,

    #[error("It is not your turn")]
    NotYourTurn,

    #[error("Entity {0} is not controlled by this player")]
    NotYourEntity(EntityId),

    #[error("Movement dice already rolled this turn")]
    AlreadyRolled,

    #[error("must roll movement dice before moving")]
    DiceNotRolled,

    #[error("Not enough movement left: need {needed}, have {left}")]
    InsufficientMovement { needed: u32, left: u32 },

    #[error("cannot move right now")]
    CannotMove,

    #[error("No actions left this turn")]
    NoActionsLeft,

    #[error("Turn cannot end yet")]
    CannotEndTurn,

    #[error("Tile {0} is outside the board")]
    OutOfBounds(Tile),

    #[error("Tile {0} is blocked")]
    TileBlocked(Tile),

    #[error("Tile {0} is occupied")]
    TileOccupied(Tile),

    #[error("A wall or closed door blocks the way to {0}")]
    PathBlocked(Tile),

    #[error("Invalid step ({dx},{dy})")]
    InvalidStep { dx: i32, dy: i32 },

    #[error("{to} is not next to {from}")]
    DisjointStep { from: Tile, to: Tile },

    #[error("Target {0} is not adjacent")]
    TargetNotAdjacent(EntityId),

    #[error("Door {0} is out of reach")]
    DoorOutOfReach(DoorId),

    #[error("Tile {0} is not a free starting position")]
    InvalidStartingPosition(Tile),

    #[error("Hero {0} is already on the board")]
    AlreadyPlaced(PlayerId),

    #[error("Hero {0} has not been placed on the board")]
    NotPlaced(PlayerId),

    #[error("Turn order election is not enabled")]
    ElectionDisabled,

    #[error("Another hero's election is pending")]
    ElectionPending,

    #[error("Hero {0} already acted this cycle")]
    AlreadyActed(PlayerId),

    #[error("No election to cancel or confirm")]
    NoElection,

    #[error("Election can no longer be cancelled")]
    ElectionLocked,

    #[error("Hero {0} has been defeated")]
    HeroDefeated(PlayerId),

    #[error("Item {0} cannot be used again this turn")]
    ItemExhausted(String),

    #[error("Die value {0} is outside 1..=6")]
    InvalidDieValue(u8),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl GameError {
    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::PlayerExists(_) => "player_exists",
            GameError::UnknownPlayer(_) => "unknown_player",
            GameError::UnknownEntity(_) => "unknown_entity",
            GameError::UnknownDoor(_) => "unknown_door",
            GameError::NotHeroTurn => "not_hero_turn",
            GameError::NotGameMasterTurn => "not_gm_turn",
            GameError::NotYourTurn => "not_your_turn",
            GameError::NotYourEntity(_) => "not_your_entity",
            GameError::AlreadyRolled => "already_rolled",
            GameError::DiceNotRolled => "dice_not_rolled",
            GameError::InsufficientMovement { .. } => "insufficient_movement",
            GameError::CannotMove => "cannot_move",
            GameError::NoActionsLeft => "no_actions_left",
            GameError::CannotEndTurn => "cannot_end_turn",
            GameError::OutOfBounds(_) => "out_of_bounds",
            GameError::TileBlocked(_) => "tile_blocked",
            GameError::TileOccupied(_) => "tile_occupied",
            GameError::PathBlocked(_) => "path_blocked",
            GameError::InvalidStep { .. } | GameError::DisjointStep { .. } => "invalid_step",
            GameError::TargetNotAdjacent(_) => "target_not_adjacent",
            GameError::DoorOutOfReach(_) => "door_out_of_reach",
            GameError::InvalidStartingPosition(_) => "invalid_starting_position",
            GameError::AlreadyPlaced(_) => "already_placed",
            GameError::NotPlaced(_) => "not_placed",
            GameError::ElectionDisabled => "election_disabled",
            GameError::ElectionPending => "election_pending",
            GameError::AlreadyActed(_) => "already_acted",
            GameError::NoElection => "no_election",
            GameError::ElectionLocked => "election_locked",
            GameError::HeroDefeated(_) => "hero_defeated",
            GameError::ItemExhausted(_) => "item_exhausted",
            GameError::InvalidDieValue(_) => "invalid_die_value",
            GameError::NotSupported(_) => "not_supported",
            GameError::PermissionDenied(_) => "permission_denied",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_messages() {
        assert_eq!(GameError::AlreadyRolled.code(), "already_rolled");
        assert_eq!(
            GameError::DiceNotRolled.to_string(),
            "must roll movement dice before moving"
        );
        assert_eq!(GameError::CannotMove.to_string(), "cannot move right now");
    }
}
