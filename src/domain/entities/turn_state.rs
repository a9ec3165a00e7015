//! Turn state entity - whose turn it is and what budgets remain

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ItemUsage, PlayerId, Tile, TurnCapability};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnType {
    Hero,
    Gamemaster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    // Hero turn
    Movement,
    Action,
    End,
    // Game master turn
    MonsterMovement,
    MonsterAction,
    Environment,
    GmEnd,
}

/// Whether this turn's movement happens before or after the main action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementTiming {
    #[serde(rename = "move_before")]
    BeforeAction,
    #[serde(rename = "move_after")]
    AfterAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Step-by-step requests
    Manual,
    /// A whole path submitted at once
    Planned,
}

/// A contiguous run of steps taken within one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementSegment {
    pub kind: SegmentKind,
    pub start: Tile,
    pub path: Vec<Tile>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub executed: bool,
}

impl MovementSegment {
    pub fn open(kind: SegmentKind, start: Tile) -> Self {
        Self {
            kind,
            start,
            path: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            executed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Mutable turn bookkeeping, owned by the turn engine
#[derive(Debug, Clone)]
pub struct TurnState {
    pub turn_number: u32,
    pub turn_type: TurnType,
    pub phase: TurnPhase,
    /// `None` during the game master turn or while heroes are electing
    pub active_player: Option<PlayerId>,
    pub actions_left: u32,
    pub movement_left: u32,
    pub movement_dice_rolled: bool,
    pub movement_roll: Vec<u8>,
    pub has_moved: bool,
    pub action_taken: bool,
    pub movement_timing: Option<MovementTiming>,
    pub can_end_turn: bool,
    pub capabilities: BTreeSet<TurnCapability>,
    pub item_usage: ItemUsage,
    /// Index into `segments` of the open segment
    pub current_segment: Option<usize>,
    pub segments: Vec<MovementSegment>,
    pub started_at: DateTime<Utc>,
}

impl TurnState {
    pub fn new() -> Self {
        Self {
            turn_number: 1,
            turn_type: TurnType::Hero,
            phase: TurnPhase::Movement,
            active_player: None,
            actions_left: 0,
            movement_left: 0,
            movement_dice_rolled: false,
            movement_roll: Vec::new(),
            has_moved: false,
            action_taken: false,
            movement_timing: None,
            can_end_turn: false,
            capabilities: BTreeSet::new(),
            item_usage: ItemUsage::default(),
            current_segment: None,
            segments: Vec::new(),
            started_at: Utc::now(),
        }
    }

    /// Fresh budgets for a hero; `None` leaves the heroes waiting for an election
    pub fn begin_hero_turn(&mut self, player: Option<PlayerId>) {
        self.turn_type = TurnType::Hero;
        self.phase = TurnPhase::Movement;
        self.actions_left = if player.is_some() { 1 } else { 0 };
        self.active_player = player;
        self.reset_movement();
    }

    pub fn begin_gamemaster_turn(&mut self) {
        self.turn_type = TurnType::Gamemaster;
        self.phase = TurnPhase::MonsterMovement;
        self.active_player = None;
        self.actions_left = 0;
        self.reset_movement();
        self.can_end_turn = true;
    }

    fn reset_movement(&mut self) {
        self.movement_left = 0;
        self.movement_dice_rolled = false;
        self.movement_roll.clear();
        self.has_moved = false;
        self.action_taken = false;
        self.movement_timing = None;
        self.can_end_turn = false;
        self.capabilities.clear();
        self.item_usage.clear();
        self.current_segment = None;
        self.segments.clear();
        self.started_at = Utc::now();
    }

    pub fn is_hero_turn(&self) -> bool {
        self.turn_type == TurnType::Hero
    }

    pub fn has_capability(&self, capability: TurnCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

impl Default for TurnState {
    fn default() -> Self {
        Self::new()
    }
}
