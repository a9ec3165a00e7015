//! Domain services - Rules that span several entities

mod dice_resolver;
mod movement_ledger;
mod turn_engine;
mod visibility;

pub use dice_resolver::{CombatOutcome, DiceResolver};
pub use movement_ledger::MovementLedger;
pub use turn_engine::{ArchivedTurn, Election, TurnOrderMode, TurnPhaseEngine};
pub use visibility::{SightMap, VisibilityDelta, VisibilityEngine, VisibilityMemory};
