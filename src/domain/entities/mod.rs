//! Domain entities - Core game objects with identity

mod board;
mod monster;
mod player;
mod turn_state;

pub use board::{BlockingWall, Board, BoardError, Door, DoorState};
pub use monster::Monster;
pub use player::{CharacterStats, HeroClass, Player};
pub use turn_state::{
    MovementSegment, MovementTiming, SegmentKind, TurnPhase, TurnState, TurnType,
};

#[cfg(test)]
pub(crate) use board::tests::two_room_board;
