//! Turn and phase state machine
//!
//! Decides who may act and which budgets remain. Heroes take turns one at a
//! time, either in id order or by electing themselves, and once every living
//! hero has acted the game master takes a turn. Ending the game master turn
//! starts a new cycle and increments the turn number.
//!
//! Every operation validates first and mutates only on success.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    MovementSegment, MovementTiming, Player, SegmentKind, TurnPhase, TurnState,
};
use crate::domain::errors::GameError;
use crate::domain::services::{DiceResolver, MovementLedger};
use crate::domain::value_objects::{DiceChannel, EntityId, ItemId, PlayerId, Tile, TurnCapability};

/// How the next hero is chosen within a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOrderMode {
    /// Heroes act in id order
    #[default]
    RoundRobin,
    /// Heroes claim the turn themselves
    Election,
}

/// The hero currently holding an elected turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Election {
    pub player: PlayerId,
    /// Confirmed, or implied by rolling or acting; can no longer be cancelled
    pub confirmed: bool,
    /// Assigned because only one hero was left
    pub automatic: bool,
}

impl Election {
    pub fn is_locked(&self) -> bool {
        self.confirmed || self.automatic
    }
}

/// Movement segments of a finished hero turn
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedTurn {
    pub turn_number: u32,
    pub player: PlayerId,
    pub segments: Vec<MovementSegment>,
}

/// Budget taken by [`TurnPhaseEngine::consume_movement`], handed back on refund
#[derive(Debug, Clone)]
pub struct MovementReceipt {
    player: PlayerId,
    cost: u32,
    turn_started_at: DateTime<Utc>,
    had_moved: bool,
    timing_before: Option<MovementTiming>,
    phase_before: TurnPhase,
}

impl MovementReceipt {
    pub fn cost(&self) -> u32 {
        self.cost
    }
}

#[derive(Debug)]
pub struct TurnPhaseEngine {
    mode: TurnOrderMode,
    players: BTreeMap<PlayerId, Player>,
    state: TurnState,
    cycle: u32,
    acted: BTreeSet<PlayerId>,
    election: Option<Election>,
    history: Vec<ArchivedTurn>,
}

impl TurnPhaseEngine {
    pub fn new(mode: TurnOrderMode) -> Self {
        Self {
            mode,
            players: BTreeMap::new(),
            state: TurnState::new(),
            cycle: 1,
            acted: BTreeSet::new(),
            election: None,
            history: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn mode(&self) -> TurnOrderMode {
        self.mode
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn acted(&self) -> &BTreeSet<PlayerId> {
        &self.acted
    }

    pub fn election(&self) -> Option<&Election> {
        self.election.as_ref()
    }

    pub fn history(&self) -> &[ArchivedTurn] {
        &self.history
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player_by_entity(&self, entity: &EntityId) -> Option<&Player> {
        self.players.values().find(|p| &p.entity_id == entity)
    }

    /// Active on a hero turn with something left to do
    pub fn can_player_act(&self, id: &PlayerId) -> bool {
        self.state.is_hero_turn()
            && self.state.active_player.as_ref() == Some(id)
            && (self.state.actions_left > 0
                || self.state.movement_left > 0
                || !self.state.movement_dice_rolled)
    }

    /// False once the hero moved before acting and then acted
    pub fn can_move(&self) -> bool {
        if self.state.has_capability(TurnCapability::SplitMovement) {
            return true;
        }
        !(self.state.has_moved
            && self.state.action_taken
            && self.state.movement_timing == Some(MovementTiming::BeforeAction))
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    pub fn add_player(&mut self, player: Player) -> Result<(), GameError> {
        if self.players.contains_key(&player.id) {
            return Err(GameError::PlayerExists(player.id));
        }
        tracing::info!("Hero {} joined as {:?}", player.id, player.class);
        self.players.insert(player.id.clone(), player);

        // Election mode waits for someone to step up while the roster is forming
        if self.mode == TurnOrderMode::RoundRobin
            && self.state.is_hero_turn()
            && self.state.active_player.is_none()
        {
            self.start_next_hero();
        }
        Ok(())
    }

    /// Called once the quest's hero seats are registered. In election mode a
    /// lone seat is elected straight away.
    pub fn roster_loaded(&mut self) {
        if self.mode == TurnOrderMode::Election
            && self.state.is_hero_turn()
            && self.state.active_player.is_none()
        {
            self.refresh_election();
        }
    }

    /// Returns the damage applied
    pub fn damage_player(&mut self, id: &PlayerId, amount: u32) -> Result<u32, GameError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownPlayer(id.clone()))?;
        let applied = player.take_damage(amount);
        if player.is_defeated() {
            tracing::info!("Hero {} has been defeated", id);
        }
        Ok(applied)
    }

    /// Returns the body points restored
    pub fn heal_player(&mut self, id: &PlayerId, amount: u32) -> Result<u32, GameError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownPlayer(id.clone()))?;
        Ok(player.heal(amount))
    }

    // ------------------------------------------------------------------
    // Hero turn
    // ------------------------------------------------------------------

    /// The hero holding the current turn, still able to fight
    pub fn ensure_active(&self, id: &PlayerId) -> Result<&Player, GameError> {
        let player = self
            .players
            .get(id)
            .ok_or_else(|| GameError::UnknownPlayer(id.clone()))?;
        if !self.state.is_hero_turn() {
            return Err(GameError::NotHeroTurn);
        }
        if self.state.active_player.as_ref() != Some(id) {
            return Err(GameError::NotYourTurn);
        }
        if player.is_defeated() {
            return Err(GameError::HeroDefeated(id.clone()));
        }
        Ok(player)
    }

    pub fn roll_movement_dice(&mut self, id: &PlayerId, dice: &mut DiceResolver) -> Result<Vec<u8>, GameError> {
        let count = self.ensure_active(id)?.stats.movement_dice;
        if self.state.movement_dice_rolled {
            return Err(GameError::AlreadyRolled);
        }

        let rolls = dice.roll_many(DiceChannel::Movement, count);
        self.state.movement_left = rolls.iter().map(|v| u32::from(*v)).sum();
        self.state.movement_dice_rolled = true;
        self.state.movement_roll = rolls.clone();
        self.lock_election();

        tracing::debug!("Hero {} rolled {:?} for movement", id, rolls);
        Ok(rolls)
    }

    /// Takes `cost` movement points with the given timing
    pub fn consume_movement(
        &mut self,
        id: &PlayerId,
        cost: u32,
        timing: MovementTiming,
    ) -> Result<MovementReceipt, GameError> {
        self.ensure_active(id)?;
        if !self.state.movement_dice_rolled {
            return Err(GameError::DiceNotRolled);
        }

        let split = self.state.has_capability(TurnCapability::SplitMovement);
        if !split {
            let mixed = self.state.movement_timing.is_some_and(|t| t != timing);
            let out_of_order = match timing {
                MovementTiming::BeforeAction => self.state.action_taken,
                MovementTiming::AfterAction => !self.state.action_taken,
            };
            if mixed || out_of_order {
                return Err(GameError::CannotMove);
            }
        }

        if cost > self.state.movement_left {
            return Err(GameError::InsufficientMovement {
                needed: cost,
                left: self.state.movement_left,
            });
        }

        let receipt = MovementReceipt {
            player: id.clone(),
            cost,
            turn_started_at: self.state.started_at,
            had_moved: self.state.has_moved,
            timing_before: self.state.movement_timing,
            phase_before: self.state.phase,
        };

        self.state.movement_left -= cost;
        self.state.has_moved = true;
        self.state.movement_timing.get_or_insert(timing);
        if self.state.action_taken {
            if self.state.movement_left == 0 {
                self.state.can_end_turn = true;
            }
        } else {
            self.state.phase = TurnPhase::Movement;
        }
        self.lock_election();
        Ok(receipt)
    }

    /// Gives back budget taken for a move that could not be applied.
    /// Ignored once the turn it was taken in has ended.
    pub fn refund_movement(&mut self, receipt: MovementReceipt) {
        let same_turn = self.state.started_at == receipt.turn_started_at
            && self.state.active_player.as_ref() == Some(&receipt.player);
        if !same_turn {
            tracing::warn!("Dropping stale movement refund for {}", receipt.player);
            return;
        }
        self.state.movement_left += receipt.cost;
        self.state.has_moved = receipt.had_moved;
        self.state.movement_timing = receipt.timing_before;
        self.state.phase = receipt.phase_before;
    }

    /// Records walked tiles in the active hero's movement segment
    pub fn record_path(&mut self, id: &PlayerId, kind: SegmentKind, origin: Tile, path: &[Tile]) -> Result<(), GameError> {
        self.ensure_active(id)?;
        MovementLedger::record(&mut self.state, kind, origin, path);
        Ok(())
    }

    /// Explicitly finishes the current movement segment
    pub fn complete_movement(&mut self, id: &PlayerId) -> Result<Option<MovementSegment>, GameError> {
        self.ensure_active(id)?;
        let closed = MovementLedger::close_segment(&mut self.state);
        if !self.state.action_taken {
            self.state.phase = TurnPhase::Action;
        }
        Ok(closed)
    }

    pub fn consume_action(&mut self, id: &PlayerId) -> Result<(), GameError> {
        self.ensure_active(id)?;
        if self.state.actions_left == 0 {
            return Err(GameError::NoActionsLeft);
        }

        MovementLedger::close_segment(&mut self.state);
        self.state.actions_left -= 1;
        self.state.action_taken = true;
        self.state.can_end_turn = true;
        self.state.phase = if self.state.actions_left == 0 {
            TurnPhase::End
        } else {
            TurnPhase::Action
        };
        self.lock_election();
        Ok(())
    }

    /// Gives up whatever action is left
    pub fn pass_action(&mut self, id: &PlayerId) -> Result<(), GameError> {
        self.ensure_active(id)?;
        MovementLedger::close_segment(&mut self.state);
        self.state.actions_left = 0;
        self.state.can_end_turn = true;
        self.state.phase = TurnPhase::End;
        self.lock_election();
        Ok(())
    }

    /// Returns `false` when the capability was already held
    pub fn grant_capability(&mut self, id: &PlayerId, capability: TurnCapability) -> Result<bool, GameError> {
        self.ensure_active(id)?;
        if !self.state.capabilities.insert(capability) {
            return Ok(false);
        }
        if capability == TurnCapability::ExtraAction {
            self.state.actions_left += 1;
        }
        Ok(true)
    }

    /// Counts one use of an item, at most `limit` per turn
    pub fn record_item_use(&mut self, id: &PlayerId, item: &ItemId, limit: u32) -> Result<(), GameError> {
        self.ensure_active(id)?;
        if !self.state.item_usage.try_record(item, limit) {
            return Err(GameError::ItemExhausted(item.to_string()));
        }
        Ok(())
    }

    pub fn end_hero_turn(&mut self, id: &PlayerId) -> Result<(), GameError> {
        if !self.players.contains_key(id) {
            return Err(GameError::UnknownPlayer(id.clone()));
        }
        if !self.state.is_hero_turn() {
            return Err(GameError::NotHeroTurn);
        }
        if self.state.active_player.as_ref() != Some(id) {
            return Err(GameError::NotYourTurn);
        }
        if !self.state.can_end_turn {
            return Err(GameError::CannotEndTurn);
        }

        MovementLedger::close_segment(&mut self.state);
        self.history.push(ArchivedTurn {
            turn_number: self.state.turn_number,
            player: id.clone(),
            segments: std::mem::take(&mut self.state.segments),
        });
        self.acted.insert(id.clone());
        self.election = None;

        tracing::info!("Hero {} ended their turn", id);
        self.start_next_hero();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Game master turn
    // ------------------------------------------------------------------

    pub fn ensure_gamemaster_turn(&self) -> Result<(), GameError> {
        if self.state.is_hero_turn() {
            return Err(GameError::NotGameMasterTurn);
        }
        Ok(())
    }

    /// Moves the game master turn to `phase`; returns whether it changed
    pub fn set_gamemaster_phase(&mut self, phase: TurnPhase) -> Result<bool, GameError> {
        self.ensure_gamemaster_turn()?;
        if self.state.phase == phase {
            return Ok(false);
        }
        self.state.phase = phase;
        Ok(true)
    }

    /// Ends the game master turn and starts the next cycle
    pub fn end_gamemaster_turn(&mut self) -> Result<(), GameError> {
        self.ensure_gamemaster_turn()?;

        self.state.turn_number += 1;
        self.cycle += 1;
        self.acted.clear();
        self.election = None;

        tracing::info!("Turn {} begins", self.state.turn_number);
        if self.eligible_heroes().next().is_none() && !self.players.is_empty() {
            tracing::warn!("No hero can act, game master keeps the turn");
            self.state.begin_gamemaster_turn();
            self.state.phase = TurnPhase::GmEnd;
            return Ok(());
        }
        self.state.begin_hero_turn(None);
        self.start_next_hero();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Election
    // ------------------------------------------------------------------

    pub fn elect(&mut self, id: &PlayerId) -> Result<(), GameError> {
        if self.mode != TurnOrderMode::Election {
            return Err(GameError::ElectionDisabled);
        }
        let player = self
            .players
            .get(id)
            .ok_or_else(|| GameError::UnknownPlayer(id.clone()))?;
        if !self.state.is_hero_turn() {
            return Err(GameError::NotHeroTurn);
        }
        if player.is_defeated() {
            return Err(GameError::HeroDefeated(id.clone()));
        }
        if self.acted.contains(id) {
            return Err(GameError::AlreadyActed(id.clone()));
        }
        match &self.election {
            Some(current) if &current.player == id => return Ok(()),
            Some(_) => return Err(GameError::ElectionPending),
            None => {}
        }

        self.election = Some(Election {
            player: id.clone(),
            confirmed: false,
            automatic: false,
        });
        self.state.begin_hero_turn(Some(id.clone()));
        tracing::info!("Hero {} elected themselves", id);
        Ok(())
    }

    pub fn confirm_election(&mut self, id: &PlayerId) -> Result<(), GameError> {
        let election = self.election.as_mut().ok_or(GameError::NoElection)?;
        if &election.player != id {
            return Err(GameError::NotYourTurn);
        }
        election.confirmed = true;
        Ok(())
    }

    pub fn cancel_election(&mut self, id: &PlayerId) -> Result<(), GameError> {
        let election = self.election.as_ref().ok_or(GameError::NoElection)?;
        if &election.player != id {
            return Err(GameError::NotYourTurn);
        }
        if election.is_locked() || self.state.movement_dice_rolled || self.state.action_taken {
            return Err(GameError::ElectionLocked);
        }

        self.election = None;
        self.state.begin_hero_turn(None);
        tracing::info!("Hero {} cancelled their election", id);
        Ok(())
    }

    fn lock_election(&mut self) {
        if let Some(election) = self.election.as_mut() {
            election.confirmed = true;
        }
    }

    /// Auto-elects the last hero still to act
    fn refresh_election(&mut self) {
        if self.election.is_some() {
            return;
        }
        let only = {
            let mut eligible = self.eligible_heroes();
            match (eligible.next(), eligible.next()) {
                (Some(only), None) => only.clone(),
                _ => return,
            }
        };
        self.election = Some(Election {
            player: only.clone(),
            confirmed: false,
            automatic: true,
        });
        self.state.begin_hero_turn(Some(only.clone()));
        tracing::info!("Hero {} is the last to act and was elected", only);
    }

    // ------------------------------------------------------------------
    // Turn order
    // ------------------------------------------------------------------

    fn eligible_heroes(&self) -> impl Iterator<Item = &PlayerId> {
        self.players
            .values()
            .filter(move |p| !p.is_defeated() && !self.acted.contains(&p.id))
            .map(|p| &p.id)
    }

    /// Hands the turn to the next hero, or to the game master when none is left
    fn start_next_hero(&mut self) {
        let next = self.eligible_heroes().next().cloned();
        match (next, self.mode) {
            (None, _) if self.players.is_empty() => self.state.begin_hero_turn(None),
            (None, _) => {
                tracing::info!("All heroes acted, game master turn");
                self.state.begin_gamemaster_turn();
            }
            (Some(id), TurnOrderMode::RoundRobin) => {
                tracing::info!("Hero {} is up", id);
                self.state.begin_hero_turn(Some(id));
            }
            (Some(_), TurnOrderMode::Election) => {
                self.state.begin_hero_turn(None);
                self.refresh_election();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{HeroClass, TurnType};

    fn hero(id: &str) -> Player {
        Player::new(PlayerId::new(id), EntityId::new(format!("{id}-hero")), HeroClass::Barbarian)
    }

    fn engine_with(ids: &[&str], mode: TurnOrderMode) -> TurnPhaseEngine {
        let mut engine = TurnPhaseEngine::new(mode);
        for id in ids {
            engine.add_player(hero(id)).unwrap();
        }
        engine
    }

    fn roll(engine: &mut TurnPhaseEngine, id: &str, values: &[u8]) -> Vec<u8> {
        let mut dice = DiceResolver::new(Some(1));
        dice.queue_override(DiceChannel::Movement, values).unwrap();
        engine.roll_movement_dice(&PlayerId::new(id), &mut dice).unwrap()
    }

    #[test]
    fn test_first_registrant_is_active() {
        let engine = engine_with(&["p1", "p2"], TurnOrderMode::RoundRobin);
        assert_eq!(engine.state().active_player, Some(PlayerId::new("p1")));
        assert!(engine.can_player_act(&PlayerId::new("p1")));
        assert!(!engine.can_player_act(&PlayerId::new("p2")));
    }

    #[test]
    fn test_duplicate_player_rejected() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let err = engine.add_player(hero("p1")).unwrap_err();
        assert_eq!(err.code(), "player_exists");
    }

    #[test]
    fn test_roll_sets_movement_to_sum_once() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        assert_eq!(roll(&mut engine, "p1", &[3, 3]), vec![3, 3]);
        assert_eq!(engine.state().movement_left, 6);

        let mut dice = DiceResolver::new(Some(1));
        let err = engine
            .roll_movement_dice(&PlayerId::new("p1"), &mut dice)
            .unwrap_err();
        assert_eq!(err, GameError::AlreadyRolled);
        assert_eq!(engine.state().movement_left, 6);
    }

    #[test]
    fn test_moving_requires_dice() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        let err = engine
            .consume_movement(&p1, 1, MovementTiming::BeforeAction)
            .unwrap_err();
        assert_eq!(err.to_string(), "must roll movement dice before moving");

        roll(&mut engine, "p1", &[3, 3]);
        engine
            .consume_movement(&p1, 1, MovementTiming::BeforeAction)
            .unwrap();
        assert_eq!(engine.state().movement_left, 5);
        assert!(engine.state().has_moved);
    }

    #[test]
    fn test_overspending_leaves_budget_untouched() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        roll(&mut engine, "p1", &[1, 2]);
        engine
            .consume_movement(&p1, 2, MovementTiming::BeforeAction)
            .unwrap();

        let err = engine
            .consume_movement(&p1, 2, MovementTiming::BeforeAction)
            .unwrap_err();
        assert_eq!(err, GameError::InsufficientMovement { needed: 2, left: 1 });
        assert_eq!(engine.state().movement_left, 1);
    }

    #[test]
    fn test_cannot_move_after_moving_then_acting() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        roll(&mut engine, "p1", &[4, 4]);
        engine
            .consume_movement(&p1, 1, MovementTiming::BeforeAction)
            .unwrap();
        engine.consume_action(&p1).unwrap();

        assert!(!engine.can_move());
        let err = engine
            .consume_movement(&p1, 1, MovementTiming::BeforeAction)
            .unwrap_err();
        assert_eq!(err, GameError::CannotMove);
        let err = engine
            .consume_movement(&p1, 1, MovementTiming::AfterAction)
            .unwrap_err();
        assert_eq!(err, GameError::CannotMove);
    }

    #[test]
    fn test_split_movement_allows_both_sides_of_action() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        roll(&mut engine, "p1", &[4, 4]);
        engine
            .grant_capability(&p1, TurnCapability::SplitMovement)
            .unwrap();
        engine
            .consume_movement(&p1, 2, MovementTiming::BeforeAction)
            .unwrap();
        engine.consume_action(&p1).unwrap();

        assert!(engine.can_move());
        engine
            .consume_movement(&p1, 2, MovementTiming::AfterAction)
            .unwrap();
        assert_eq!(engine.state().movement_left, 4);
    }

    #[test]
    fn test_move_after_needs_action_first() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        roll(&mut engine, "p1", &[2, 2]);
        let err = engine
            .consume_movement(&p1, 1, MovementTiming::AfterAction)
            .unwrap_err();
        assert_eq!(err, GameError::CannotMove);

        engine.consume_action(&p1).unwrap();
        engine
            .consume_movement(&p1, 1, MovementTiming::AfterAction)
            .unwrap();
        assert!(engine.can_move());
    }

    #[test]
    fn test_action_consumed_once_unless_extra() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        engine.consume_action(&p1).unwrap();
        assert_eq!(engine.state().phase, TurnPhase::End);
        assert!(engine.state().can_end_turn);
        assert_eq!(engine.consume_action(&p1).unwrap_err(), GameError::NoActionsLeft);

        engine
            .grant_capability(&p1, TurnCapability::ExtraAction)
            .unwrap();
        engine.consume_action(&p1).unwrap();
        assert_eq!(engine.state().actions_left, 0);
    }

    #[test]
    fn test_end_turn_requires_action_or_pass() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        assert_eq!(engine.end_hero_turn(&p1).unwrap_err(), GameError::CannotEndTurn);

        engine.pass_action(&p1).unwrap();
        engine.end_hero_turn(&p1).unwrap();
    }

    #[test]
    fn test_hero_to_gamemaster_and_back() {
        let mut engine = engine_with(&["p1", "p2"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        let p2 = PlayerId::new("p2");

        engine.consume_action(&p1).unwrap();
        engine.end_hero_turn(&p1).unwrap();
        assert_eq!(engine.state().active_player, Some(p2.clone()));
        assert_eq!(engine.state().actions_left, 1);

        engine.consume_action(&p2).unwrap();
        engine.end_hero_turn(&p2).unwrap();
        assert_eq!(engine.state().turn_type, TurnType::Gamemaster);
        assert_eq!(engine.state().active_player, None);
        assert!(engine.state().can_end_turn);

        engine.end_gamemaster_turn().unwrap();
        assert_eq!(engine.state().turn_type, TurnType::Hero);
        assert_eq!(engine.state().turn_number, 2);
        assert_eq!(engine.state().active_player, Some(p1));
        assert_eq!(engine.state().movement_left, 0);
        assert!(!engine.state().movement_dice_rolled);
        assert_eq!(engine.cycle(), 2);
    }

    #[test]
    fn test_gamemaster_cannot_end_hero_turn() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        assert_eq!(engine.end_gamemaster_turn().unwrap_err(), GameError::NotGameMasterTurn);
    }

    #[test]
    fn test_only_active_hero_may_act() {
        let mut engine = engine_with(&["p1", "p2"], TurnOrderMode::RoundRobin);
        let err = engine.consume_action(&PlayerId::new("p2")).unwrap_err();
        assert_eq!(err, GameError::NotYourTurn);
        assert_eq!(engine.state().actions_left, 1);
    }

    #[test]
    fn test_defeated_hero_is_skipped() {
        let mut engine = engine_with(&["p1", "p2", "p3"], TurnOrderMode::RoundRobin);
        engine.damage_player(&PlayerId::new("p2"), 100).unwrap();

        let p1 = PlayerId::new("p1");
        engine.pass_action(&p1).unwrap();
        engine.end_hero_turn(&p1).unwrap();
        assert_eq!(engine.state().active_player, Some(PlayerId::new("p3")));
    }

    #[test]
    fn test_refund_restores_budget() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        roll(&mut engine, "p1", &[2, 3]);
        let receipt = engine
            .consume_movement(&p1, 2, MovementTiming::BeforeAction)
            .unwrap();
        engine.refund_movement(receipt);

        assert_eq!(engine.state().movement_left, 5);
        assert!(!engine.state().has_moved);
        assert_eq!(engine.state().movement_timing, None);
    }

    #[test]
    fn test_refund_restores_phase() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        roll(&mut engine, "p1", &[2, 3]);
        engine.complete_movement(&p1).unwrap();
        assert_eq!(engine.state().phase, TurnPhase::Action);

        let receipt = engine
            .consume_movement(&p1, 1, MovementTiming::BeforeAction)
            .unwrap();
        assert_eq!(engine.state().phase, TurnPhase::Movement);
        engine.refund_movement(receipt);
        assert_eq!(engine.state().phase, TurnPhase::Action);
    }

    #[test]
    fn test_item_use_limited_per_turn() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        let potion = ItemId::new("potion");
        engine.record_item_use(&p1, &potion, 1).unwrap();
        let err = engine.record_item_use(&p1, &potion, 1).unwrap_err();
        assert_eq!(err.code(), "item_exhausted");
    }

    #[test]
    fn test_segments_archived_at_end_of_turn() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        roll(&mut engine, "p1", &[2, 2]);
        engine
            .consume_movement(&p1, 1, MovementTiming::BeforeAction)
            .unwrap();
        engine
            .record_path(&p1, SegmentKind::Manual, Tile::new(5, 5), &[Tile::new(6, 5)])
            .unwrap();
        engine.consume_action(&p1).unwrap();
        engine.end_hero_turn(&p1).unwrap();

        let archived = &engine.history()[0];
        assert_eq!(archived.player, p1);
        assert_eq!(archived.segments.len(), 1);
        assert!(archived.segments[0].is_closed());
        assert_eq!(archived.segments[0].path, vec![Tile::new(6, 5)]);
    }

    #[test]
    fn test_election_disabled_in_round_robin() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        assert_eq!(engine.elect(&PlayerId::new("p1")).unwrap_err(), GameError::ElectionDisabled);
    }

    #[test]
    fn test_election_flow() {
        let mut engine = engine_with(&["p1", "p2"], TurnOrderMode::Election);
        let p1 = PlayerId::new("p1");
        let p2 = PlayerId::new("p2");
        assert_eq!(engine.state().active_player, None);

        engine.elect(&p2).unwrap();
        assert_eq!(engine.state().active_player, Some(p2.clone()));
        assert_eq!(engine.elect(&p1).unwrap_err(), GameError::ElectionPending);
        assert_eq!(engine.cancel_election(&p1).unwrap_err(), GameError::NotYourTurn);

        engine.cancel_election(&p2).unwrap();
        assert_eq!(engine.state().active_player, None);

        engine.elect(&p2).unwrap();
        roll(&mut engine, "p2", &[1, 1]);
        assert_eq!(engine.cancel_election(&p2).unwrap_err(), GameError::ElectionLocked);

        engine.pass_action(&p2).unwrap();
        engine.end_hero_turn(&p2).unwrap();

        // p1 is the only hero left and gets the turn without electing
        let election = engine.election().unwrap();
        assert_eq!(election.player, p1);
        assert!(election.automatic);
        assert_eq!(engine.cancel_election(&p1).unwrap_err(), GameError::ElectionLocked);
        assert_eq!(engine.elect(&p2).unwrap_err(), GameError::AlreadyActed(p2));
    }

    #[test]
    fn test_confirmed_election_cannot_be_cancelled() {
        let mut engine = engine_with(&["p1", "p2"], TurnOrderMode::Election);
        let p1 = PlayerId::new("p1");
        engine.elect(&p1).unwrap();
        engine.confirm_election(&p1).unwrap();
        assert_eq!(engine.cancel_election(&p1).unwrap_err(), GameError::ElectionLocked);
    }

    #[test]
    fn test_single_hero_is_auto_elected_next_cycle() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::Election);
        let p1 = PlayerId::new("p1");
        assert_eq!(engine.state().active_player, None);

        engine.elect(&p1).unwrap();
        engine.pass_action(&p1).unwrap();
        engine.end_hero_turn(&p1).unwrap();
        engine.end_gamemaster_turn().unwrap();

        assert_eq!(engine.state().active_player, Some(p1));
        assert!(engine.election().is_some_and(|e| e.automatic));
    }

    #[test]
    fn test_lone_seat_elected_once_roster_loaded() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::Election);
        assert_eq!(engine.state().active_player, None);
        engine.roster_loaded();
        assert_eq!(engine.state().active_player, Some(PlayerId::new("p1")));
        assert!(engine.election().is_some_and(|e| e.automatic));

        let mut engine = engine_with(&["p1", "p2"], TurnOrderMode::Election);
        engine.roster_loaded();
        assert_eq!(engine.state().active_player, None);
    }

    #[test]
    fn test_gamemaster_keeps_turn_when_every_hero_is_down() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        let p1 = PlayerId::new("p1");
        engine.pass_action(&p1).unwrap();
        engine.end_hero_turn(&p1).unwrap();
        engine.damage_player(&p1, 100).unwrap();

        engine.end_gamemaster_turn().unwrap();
        assert_eq!(engine.state().turn_type, TurnType::Gamemaster);
        assert_eq!(engine.state().phase, TurnPhase::GmEnd);
        assert_eq!(engine.state().turn_number, 2);
    }

    #[test]
    fn test_gamemaster_phase_changes() {
        let mut engine = engine_with(&["p1"], TurnOrderMode::RoundRobin);
        assert!(engine.set_gamemaster_phase(TurnPhase::MonsterAction).is_err());

        let p1 = PlayerId::new("p1");
        engine.pass_action(&p1).unwrap();
        engine.end_hero_turn(&p1).unwrap();
        assert!(engine.set_gamemaster_phase(TurnPhase::MonsterAction).unwrap());
        assert!(!engine.set_gamemaster_phase(TurnPhase::MonsterAction).unwrap());
    }
}
