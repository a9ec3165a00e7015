//! Domain events - Notifications of state changes sent to every client

mod game_events;

pub use game_events::{BlockingWallView, DoorView, GameEvent, TurnSnapshot};
