//! Value objects - Immutable objects defined by their attributes

mod capability;
mod dice;
mod ids;
mod tile;

pub use capability::{ItemUsage, TurnCapability};
pub use dice::{CombatFace, DefenderKind, DiceChannel};
pub use ids::*;
pub use tile::{Edge, Step, Tile};
