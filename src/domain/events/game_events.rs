//! Game events - What the server tells clients after a state change
//!
//! Events are serialized as `{ "type": ..., "payload": { ... } }` with
//! camelCase payload fields.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::{
    BlockingWall, CharacterStats, Door, DoorState, MovementTiming, TurnPhase, TurnType,
};
use crate::domain::services::{CombatOutcome, Election, TurnPhaseEngine};
use crate::domain::value_objects::{
    ActionId, DoorId, EntityId, PlayerId, RegionId, Tile, TurnCapability, WallId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorView {
    pub id: DoorId,
    pub tiles: [Tile; 2],
    pub regions: [RegionId; 2],
    pub state: DoorState,
}

impl From<&Door> for DoorView {
    fn from(door: &Door) -> Self {
        let (a, b) = door.edge.tiles();
        Self {
            id: door.id.clone(),
            tiles: [a, b],
            regions: [door.regions.0, door.regions.1],
            state: door.state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockingWallView {
    pub id: WallId,
    pub tiles: Vec<Tile>,
}

impl From<&BlockingWall> for BlockingWallView {
    fn from(wall: &BlockingWall) -> Self {
        Self {
            id: wall.id.clone(),
            tiles: wall.tiles.clone(),
        }
    }
}

/// Everything a client needs to render the turn banner and enable controls
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnSnapshot {
    pub turn_number: u32,
    pub turn_type: TurnType,
    pub phase: TurnPhase,
    pub active_player: Option<PlayerId>,
    pub actions_left: u32,
    pub movement_left: u32,
    pub movement_dice_rolled: bool,
    pub movement_roll: Vec<u8>,
    pub has_moved: bool,
    pub action_taken: bool,
    pub movement_timing: Option<MovementTiming>,
    pub can_end_turn: bool,
    pub can_move: bool,
    pub capabilities: Vec<TurnCapability>,
    pub cycle: u32,
    pub acted: Vec<PlayerId>,
    pub election: Option<Election>,
    pub started_at: DateTime<Utc>,
}

impl TurnSnapshot {
    pub fn capture(engine: &TurnPhaseEngine) -> Self {
        let state = engine.state();
        Self {
            turn_number: state.turn_number,
            turn_type: state.turn_type,
            phase: state.phase,
            active_player: state.active_player.clone(),
            actions_left: state.actions_left,
            movement_left: state.movement_left,
            movement_dice_rolled: state.movement_dice_rolled,
            movement_roll: state.movement_roll.clone(),
            has_moved: state.has_moved,
            action_taken: state.action_taken,
            movement_timing: state.movement_timing,
            can_end_turn: state.can_end_turn,
            can_move: engine.can_move(),
            capabilities: state.capabilities.iter().copied().collect(),
            cycle: engine.cycle(),
            acted: engine.acted().iter().cloned().collect(),
            election: engine.election().cloned(),
            started_at: state.started_at,
        }
    }
}

/// Outbound events, broadcast to every participant
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum GameEvent {
    EntityUpdated {
        id: EntityId,
        tile: Tile,
    },
    EntityRemoved {
        id: EntityId,
    },
    /// Regions the mover sees from where they now stand
    VisibleNow {
        observer: EntityId,
        ids: Vec<RegionId>,
    },
    /// Full known-region set after new regions were found
    RegionsKnown {
        ids: Vec<RegionId>,
    },
    RegionsRevealed {
        ids: Vec<RegionId>,
    },
    /// Newly discovered doors
    DoorsVisible {
        doors: Vec<DoorView>,
    },
    /// Newly discovered blocking walls
    BlockingWallsVisible {
        walls: Vec<BlockingWallView>,
    },
    DoorStateChanged {
        threshold_id: DoorId,
        state: DoorState,
    },
    TurnStateChanged(TurnSnapshot),
    TurnPhaseChanged {
        turn_number: u32,
        turn_type: TurnType,
        phase: TurnPhase,
    },
    HeroActionResult {
        action_id: ActionId,
        player_id: PlayerId,
        entity_id: EntityId,
        action: String,
        success: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        combat: Option<CombatOutcome>,
    },
    MonsterActionResult {
        action_id: ActionId,
        monster_id: EntityId,
        action: String,
        success: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        combat: Option<CombatOutcome>,
    },
    PlayerStatsChanged {
        player_id: PlayerId,
        stats: CharacterStats,
    },
    MovementDiceRolled {
        player_id: PlayerId,
        rolls: Vec<u8>,
        movement_left: u32,
    },
}

impl GameEvent {
    /// Wire name of the event, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::EntityUpdated { .. } => "EntityUpdated",
            GameEvent::EntityRemoved { .. } => "EntityRemoved",
            GameEvent::VisibleNow { .. } => "VisibleNow",
            GameEvent::RegionsKnown { .. } => "RegionsKnown",
            GameEvent::RegionsRevealed { .. } => "RegionsRevealed",
            GameEvent::DoorsVisible { .. } => "DoorsVisible",
            GameEvent::BlockingWallsVisible { .. } => "BlockingWallsVisible",
            GameEvent::DoorStateChanged { .. } => "DoorStateChanged",
            GameEvent::TurnStateChanged(_) => "TurnStateChanged",
            GameEvent::TurnPhaseChanged { .. } => "TurnPhaseChanged",
            GameEvent::HeroActionResult { .. } => "HeroActionResult",
            GameEvent::MonsterActionResult { .. } => "MonsterActionResult",
            GameEvent::PlayerStatsChanged { .. } => "PlayerStatsChanged",
            GameEvent::MovementDiceRolled { .. } => "MovementDiceRolled",
        }
    }
}
