//! Quest Service - Runs the quest for every connected client
//!
//! Each request goes through the same steps. The turn engine checks it is
//! legal, the board is updated, visibility is recomputed from the new
//! position and the resulting events are handed to the [`Broadcaster`].
//!
//! # Locking
//!
//! All locks are `std::sync` and every critical section is short and
//! synchronous. The board lock and the turn lock are never held at the same
//! time. The dice lock is a leaf and may be taken while holding the turn lock.
//! The visibility memory lock is a leaf.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::application::dto::{HeroActionPayload, InstantActionPayload, MonsterActionPayload, QuestDefinition};
use crate::application::ports::outbound::Broadcaster;
use crate::domain::entities::{
    Board, BoardError, CharacterStats, DoorState, HeroClass, MovementTiming, Player, SegmentKind, TurnPhase,
};
use crate::domain::errors::GameError;
use crate::domain::events::{BlockingWallView, DoorView, GameEvent, TurnSnapshot};
use crate::domain::services::{
    ArchivedTurn, CombatOutcome, DiceResolver, MovementLedger, SightMap, TurnOrderMode, TurnPhaseEngine,
    VisibilityDelta, VisibilityEngine, VisibilityMemory,
};
use crate::domain::value_objects::{
    ActionId, DefenderKind, DiceChannel, DoorId, EntityId, PlayerId, RegionId, Step, Tile, TurnCapability,
};

/// Who is asking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Hero(PlayerId),
    GameMaster,
}

/// Rules switches for one quest
#[derive(Debug, Clone, Default)]
pub struct QuestSettings {
    pub turn_order: TurnOrderMode,
    pub dice_seed: Option<u64>,
    pub debug_tools: bool,
}

/// Errors that stop a quest from starting
#[derive(Debug, thiserror::Error)]
pub enum QuestSetupError {
    #[error("Invalid board: {0}")]
    Board(#[from] BoardError),

    #[error("Invalid hero roster: {0}")]
    Roster(#[from] GameError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestSummary {
    pub name: String,
    pub description: String,
    pub width: i32,
    pub height: i32,
    pub turn_order: TurnOrderMode,
    pub heroes: Vec<PlayerId>,
    pub doors: usize,
    pub monsters: usize,
    pub debug_tools: bool,
}

/// The fog-of-war memory as clients see it
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownSets {
    pub known_regions: Vec<RegionId>,
    pub known_doors: Vec<DoorView>,
    pub known_blocking_walls: Vec<BlockingWallView>,
    pub revealed_regions: Vec<RegionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: EntityId,
    pub tile: Tile,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player_id: PlayerId,
    pub entity_id: EntityId,
    pub class: HeroClass,
    pub stats: CharacterStats,
    /// Active with something left to do this turn
    pub can_act: bool,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            player_id: player.id.clone(),
            entity_id: player.entity_id.clone(),
            class: player.class,
            stats: player.stats.clone(),
            can_act: false,
        }
    }
}

/// Result of an accepted action, also broadcast as an action result event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub action_id: ActionId,
    pub message: String,
    pub combat: Option<CombatOutcome>,
}

pub struct QuestService {
    name: String,
    description: String,
    settings: QuestSettings,
    board: RwLock<Board>,
    turns: Mutex<TurnPhaseEngine>,
    memory: Mutex<VisibilityMemory>,
    dice: Mutex<DiceResolver>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl QuestService {
    pub fn new(
        quest: &QuestDefinition,
        settings: QuestSettings,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Result<Self, QuestSetupError> {
        let board = quest.build_board()?;
        let mut turns = TurnPhaseEngine::new(settings.turn_order);
        for player in quest.players() {
            turns.add_player(player)?;
        }
        turns.roster_loaded();

        tracing::info!(
            "Quest '{}' ready: {}x{} board, {} hero seat(s), {:?} turn order",
            quest.name,
            board.width(),
            board.height(),
            quest.heroes.len(),
            settings.turn_order
        );

        Ok(Self {
            name: quest.name.clone(),
            description: quest.description.clone(),
            dice: Mutex::new(DiceResolver::new(settings.dice_seed)),
            settings,
            board: RwLock::new(board),
            turns: Mutex::new(turns),
            memory: Mutex::new(VisibilityMemory::new()),
            broadcaster,
        })
    }

    fn read_board(&self) -> RwLockReadGuard<'_, Board> {
        self.board.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_board(&self) -> RwLockWriteGuard<'_, Board> {
        self.board.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_turns(&self) -> MutexGuard<'_, TurnPhaseEngine> {
        self.turns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_memory(&self) -> MutexGuard<'_, VisibilityMemory> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dice(&self) -> MutexGuard<'_, DiceResolver> {
        self.dice.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: GameEvent) {
        let kind = event.kind();
        if let Err(e) = self.broadcaster.broadcast_event(event) {
            tracing::warn!("Failed to broadcast {}: {}", kind, e);
        }
    }

    fn emit_turn_state(&self) {
        let snapshot = TurnSnapshot::capture(&self.lock_turns());
        self.emit(GameEvent::TurnStateChanged(snapshot));
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> QuestSummary {
        let (heroes, turn_order) = {
            let turns = self.lock_turns();
            (turns.players().map(|p| p.id.clone()).collect(), turns.mode())
        };
        let board = self.read_board();
        QuestSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            width: board.width(),
            height: board.height(),
            turn_order,
            heroes,
            doors: board.doors().count(),
            monsters: board.positions().keys().filter(|id| board.monster(id).is_some()).count(),
            debug_tools: self.settings.debug_tools,
        }
    }

    pub fn turn_snapshot(&self) -> TurnSnapshot {
        TurnSnapshot::capture(&self.lock_turns())
    }

    pub fn players(&self) -> Vec<PlayerView> {
        let turns = self.lock_turns();
        let views = turns
            .players()
            .map(|player| PlayerView {
                can_act: turns.can_player_act(&player.id),
                ..PlayerView::from(player)
            })
            .collect();
        views
    }

    pub fn movement_history(&self) -> Vec<ArchivedTurn> {
        self.lock_turns().history().to_vec()
    }

    pub fn known_sets(&self) -> KnownSets {
        let memory = self.lock_memory().clone();
        let board = self.read_board();
        KnownSets {
            known_regions: memory.known_regions().iter().copied().collect(),
            known_doors: memory
                .known_doors()
                .iter()
                .filter_map(|id| board.door(id))
                .map(DoorView::from)
                .collect(),
            known_blocking_walls: memory
                .known_blocking_walls()
                .iter()
                .filter_map(|id| board.blocking_wall(id))
                .map(BlockingWallView::from)
                .collect(),
            revealed_regions: memory.revealed_regions().iter().copied().collect(),
        }
    }

    /// Heroes, plus monsters standing in known or revealed regions
    pub fn visible_entities(&self) -> Vec<EntityView> {
        let memory = self.lock_memory().clone();
        let board = self.read_board();
        board
            .positions()
            .iter()
            .filter_map(|(id, tile)| match board.monster(id) {
                Some(monster) => {
                    let region = board.region_at(*tile)?;
                    let seen = memory.known_regions().contains(&region)
                        || memory.revealed_regions().contains(&region);
                    seen.then(|| EntityView {
                        id: id.clone(),
                        tile: *tile,
                        kind: monster.kind.clone(),
                    })
                }
                None => Some(EntityView {
                    id: id.clone(),
                    tile: *tile,
                    kind: "hero".to_string(),
                }),
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Adds a hero who joined without a seat in the quest file
    pub fn register_hero(&self, player_id: PlayerId, class: HeroClass) -> Result<PlayerView, GameError> {
        let entity = EntityId::new(format!("hero-{}", player_id));
        let player = Player::new(player_id, entity, class);
        let mut view = PlayerView::from(&player);
        {
            let mut turns = self.lock_turns();
            turns.add_player(player)?;
            view.can_act = turns.can_player_act(&view.player_id);
        }

        self.emit(GameEvent::PlayerStatsChanged {
            player_id: view.player_id.clone(),
            stats: view.stats.clone(),
        });
        self.emit_turn_state();
        Ok(view)
    }

    pub fn has_player(&self, player_id: &PlayerId) -> bool {
        self.lock_turns().player(player_id).is_some()
    }

    pub fn select_starting_position(&self, player_id: &PlayerId, tile: Tile) -> Result<(), GameError> {
        let entity = self.entity_of(player_id)?;

        let region = {
            let mut board = self.write_board();
            if board.position_of(&entity).is_some() {
                return Err(GameError::AlreadyPlaced(player_id.clone()));
            }
            if !board.starting_tiles().contains(&tile) || board.occupant_at(tile).is_some() {
                return Err(GameError::InvalidStartingPosition(tile));
            }
            board.set_position(entity.clone(), tile);
            board.region_at(tile)
        };
        tracing::info!("Hero {} starts at {}", player_id, tile);

        if let Some(region) = region {
            let revealed = self.lock_memory().reveal_regions(&[region]);
            if !revealed.is_empty() {
                self.emit(GameEvent::RegionsRevealed { ids: revealed });
            }
        }
        self.emit(GameEvent::EntityUpdated { id: entity.clone(), tile });
        self.update_visibility(&entity);
        self.emit_turn_state();
        Ok(())
    }

    fn entity_of(&self, player_id: &PlayerId) -> Result<EntityId, GameError> {
        let turns = self.lock_turns();
        let entity = turns
            .player(player_id)
            .map(|p| p.entity_id.clone())
            .ok_or_else(|| GameError::UnknownPlayer(player_id.clone()))?;
        Ok(entity)
    }

    fn owned_entity(&self, player_id: &PlayerId, entity: &EntityId) -> Result<(), GameError> {
        if &self.entity_of(player_id)? != entity {
            return Err(GameError::NotYourEntity(entity.clone()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    pub fn roll_movement_dice(&self, player_id: &PlayerId) -> Result<Vec<u8>, GameError> {
        let (rolls, movement_left) = {
            let mut turns = self.lock_turns();
            let mut dice = self.lock_dice();
            let rolls = turns.roll_movement_dice(player_id, &mut dice)?;
            (rolls, turns.state().movement_left)
        };

        self.emit(GameEvent::MovementDiceRolled {
            player_id: player_id.clone(),
            rolls: rolls.clone(),
            movement_left,
        });
        self.emit_turn_state();
        Ok(rolls)
    }

    /// One step of at most one square per axis. Without an explicit timing
    /// the move counts as before the action until the action is taken.
    pub fn request_move(
        &self,
        player_id: &PlayerId,
        entity: &EntityId,
        step: Step,
        timing: Option<MovementTiming>,
    ) -> Result<Tile, GameError> {
        self.owned_entity(player_id, entity)?;
        let origin = {
            let board = self.read_board();
            let origin = board
                .position_of(entity)
                .ok_or_else(|| GameError::NotPlaced(player_id.clone()))?;
            MovementLedger::plan_step(&board, entity, origin, step)?;
            origin
        };

        self.commit_move(player_id, entity, origin, step.cost(), timing, SegmentKind::Manual, |board| {
            MovementLedger::plan_step(board, entity, origin, step)
        })
    }

    /// A whole path (origin excluded) submitted at once
    pub fn move_along_path(
        &self,
        player_id: &PlayerId,
        entity: &EntityId,
        path: &[Tile],
        timing: Option<MovementTiming>,
    ) -> Result<Tile, GameError> {
        self.owned_entity(player_id, entity)?;
        let origin = {
            let board = self.read_board();
            let origin = board
                .position_of(entity)
                .ok_or_else(|| GameError::NotPlaced(player_id.clone()))?;
            MovementLedger::plan_path(&board, entity, origin, path)?;
            origin
        };

        self.commit_move(player_id, entity, origin, path.len() as u32, timing, SegmentKind::Planned, |board| {
            MovementLedger::plan_path(board, entity, origin, path)
        })
    }

    /// Takes the budget, applies the move with a fresh check and refunds if
    /// the board changed in between
    #[allow(clippy::too_many_arguments)]
    fn commit_move<F>(
        &self,
        player_id: &PlayerId,
        entity: &EntityId,
        origin: Tile,
        cost: u32,
        timing: Option<MovementTiming>,
        kind: SegmentKind,
        plan: F,
    ) -> Result<Tile, GameError>
    where
        F: Fn(&Board) -> Result<Vec<Tile>, GameError>,
    {
        let receipt = {
            let mut turns = self.lock_turns();
            let timing = timing.unwrap_or(if turns.state().action_taken {
                MovementTiming::AfterAction
            } else {
                MovementTiming::BeforeAction
            });
            turns.consume_movement(player_id, cost, timing)?
        };

        let applied = {
            let mut board = self.write_board();
            if board.position_of(entity) != Some(origin) {
                Err(GameError::CannotMove)
            } else {
                match plan(&board) {
                    Ok(path) => {
                        let destination = path.last().copied().unwrap_or(origin);
                        board.set_position(entity.clone(), destination);
                        Ok((path, destination))
                    }
                    Err(e) => Err(e),
                }
            }
        };

        let (path, destination) = match applied {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!("Move of {} rejected after budget was taken: {}", entity, e);
                self.lock_turns().refund_movement(receipt);
                return Err(e);
            }
        };

        if let Err(e) = self.lock_turns().record_path(player_id, kind, origin, &path) {
            tracing::warn!("Could not record movement of {}: {}", entity, e);
        }
        tracing::debug!("{} moved {} -> {}", entity, origin, destination);

        self.emit(GameEvent::EntityUpdated {
            id: entity.clone(),
            tile: destination,
        });
        self.update_visibility(entity);
        self.emit_turn_state();
        Ok(destination)
    }

    pub fn complete_movement(&self, player_id: &PlayerId) -> Result<(), GameError> {
        self.lock_turns().complete_movement(player_id)?;
        self.emit_turn_state();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Visibility
    // ------------------------------------------------------------------

    /// Recomputes what `observer` sees and publishes anything new
    pub fn update_visibility(&self, observer: &EntityId) -> VisibilityDelta {
        let (map, tile) = {
            let board = self.read_board();
            (SightMap::capture(&board), board.position_of(observer))
        };
        let Some(tile) = tile else {
            return VisibilityDelta::default();
        };

        let report = VisibilityEngine.compute(&map, tile);
        let (delta, known_regions) = {
            let mut memory = self.lock_memory();
            let delta = memory.merge(&report);
            let known: Vec<RegionId> = memory.known_regions().iter().copied().collect();
            (delta, known)
        };

        self.emit(GameEvent::VisibleNow {
            observer: observer.clone(),
            ids: report.visible_regions.iter().copied().collect(),
        });
        if !delta.new_regions.is_empty() {
            self.emit(GameEvent::RegionsKnown { ids: known_regions });
        }
        if !delta.new_doors.is_empty() || !delta.new_walls.is_empty() {
            let (doors, walls) = {
                let board = self.read_board();
                let doors: Vec<DoorView> = delta
                    .new_doors
                    .iter()
                    .filter_map(|id| board.door(id))
                    .map(DoorView::from)
                    .collect();
                let walls: Vec<BlockingWallView> = delta
                    .new_walls
                    .iter()
                    .filter_map(|id| board.blocking_wall(id))
                    .map(BlockingWallView::from)
                    .collect();
                (doors, walls)
            };
            if !doors.is_empty() {
                self.emit(GameEvent::DoorsVisible { doors });
            }
            if !walls.is_empty() {
                tracing::info!("{} discovered {} blocking wall(s)", observer, walls.len());
                self.emit(GameEvent::BlockingWallsVisible { walls });
            }
        }
        delta
    }

    fn refresh_all_visibility(&self) {
        let heroes: Vec<EntityId> = self.lock_turns().players().map(|p| p.entity_id.clone()).collect();
        for hero in &heroes {
            self.update_visibility(hero);
        }
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    pub fn hero_action(
        &self,
        player_id: &PlayerId,
        entity: &EntityId,
        action: HeroActionPayload,
    ) -> Result<ActionOutcome, GameError> {
        self.owned_entity(player_id, entity)?;

        let (message, combat) = match &action {
            HeroActionPayload::Attack { target_id } => {
                let (combat, removed) = self.hero_attack(player_id, entity, target_id)?;
                let message = if removed {
                    format!("{} was slain", target_id)
                } else {
                    format!("{} takes {} damage", target_id, combat.damage)
                };
                (message, Some(combat))
            }
            HeroActionPayload::SearchTreasure => {
                self.lock_turns().consume_action(player_id)?;
                ("You find no treasure".to_string(), None)
            }
            HeroActionPayload::SearchTraps => {
                self.lock_turns().consume_action(player_id)?;
                ("You find no traps".to_string(), None)
            }
            HeroActionPayload::SearchSecretDoors => {
                self.lock_turns().consume_action(player_id)?;
                ("You find no secret doors".to_string(), None)
            }
            HeroActionPayload::CastSpell { spell_id, .. } => {
                return Err(GameError::NotSupported(format!("spell {}", spell_id)));
            }
            HeroActionPayload::Pass => {
                self.lock_turns().pass_action(player_id)?;
                ("Action passed".to_string(), None)
            }
        };

        let outcome = ActionOutcome {
            action_id: ActionId::new(),
            message,
            combat,
        };
        tracing::info!("Hero {} action {}: {}", player_id, action.name(), outcome.message);

        self.emit(GameEvent::HeroActionResult {
            action_id: outcome.action_id,
            player_id: player_id.clone(),
            entity_id: entity.clone(),
            action: action.name().to_string(),
            success: true,
            message: outcome.message.clone(),
            combat: outcome.combat.clone(),
        });
        self.emit_turn_state();
        Ok(outcome)
    }

    fn hero_attack(
        &self,
        player_id: &PlayerId,
        attacker: &EntityId,
        target: &EntityId,
    ) -> Result<(CombatOutcome, bool), GameError> {
        let defend_dice = {
            let board = self.read_board();
            let monster = board
                .monster(target)
                .ok_or_else(|| GameError::UnknownEntity(target.clone()))?;
            check_adjacent(&board, attacker, target)?;
            monster.defend_dice
        };

        let combat = {
            let mut turns = self.lock_turns();
            let attack_dice = turns.ensure_active(player_id)?.stats.total_attack_dice();
            turns.consume_action(player_id)?;
            let mut dice = self.lock_dice();
            dice.roll_combat(attack_dice, defend_dice, DefenderKind::Monster)
        };

        let removed = {
            let mut board = self.write_board();
            match board.monster_mut(target) {
                Some(monster) => {
                    monster.take_damage(combat.damage);
                    if monster.is_defeated() {
                        board.remove_entity(target);
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        if removed {
            self.emit(GameEvent::EntityRemoved { id: target.clone() });
        }
        Ok((combat, removed))
    }

    /// Actions outside the turn budget
    pub fn instant_action(&self, player_id: &PlayerId, action: InstantActionPayload) -> Result<ActionOutcome, GameError> {
        tracing::debug!("Hero {} requests instant action {}", player_id, action.name());
        match action {
            InstantActionPayload::DrinkPotion { item_id, heal } => {
                let (restored, stats) = {
                    let mut turns = self.lock_turns();
                    turns.record_item_use(player_id, &item_id, 1)?;
                    let restored = turns.heal_player(player_id, heal)?;
                    let stats = turns.player(player_id).map(|p| p.stats.clone());
                    (restored, stats)
                };
                if let Some(stats) = stats {
                    self.emit(GameEvent::PlayerStatsChanged {
                        player_id: player_id.clone(),
                        stats,
                    });
                }
                self.emit_turn_state();
                Ok(ActionOutcome {
                    action_id: ActionId::new(),
                    message: format!("{} restores {} body point(s)", item_id, restored),
                    combat: None,
                })
            }
            InstantActionPayload::Trade { .. } => Err(GameError::NotSupported("trading".to_string())),
        }
    }

    /// Opens a door. Returns `false` when it was already open.
    pub fn toggle_door(&self, actor: &Actor, door_id: &DoorId) -> Result<bool, GameError> {
        let hero_entity = match actor {
            Actor::Hero(player_id) => {
                let turns = self.lock_turns();
                let entity = turns.ensure_active(player_id)?.entity_id.clone();
                Some(entity)
            }
            Actor::GameMaster => {
                self.lock_turns().ensure_gamemaster_turn()?;
                None
            }
        };

        let (opened, regions) = {
            let mut board = self.write_board();
            let door = board
                .door(door_id)
                .ok_or_else(|| GameError::UnknownDoor(door_id.clone()))?;
            let (edge, regions) = (door.edge, door.regions);
            if let Some(entity) = &hero_entity {
                let reachable = board.position_of(entity).is_some_and(|tile| edge.touches(tile));
                if !reachable {
                    return Err(GameError::DoorOutOfReach(door_id.clone()));
                }
            }
            (board.open_door(door_id)?, regions)
        };

        if *actor == Actor::GameMaster {
            self.enter_gamemaster_phase(TurnPhase::Environment);
        }

        if !opened {
            tracing::debug!("Door {} already open", door_id);
            self.emit_turn_state();
            return Ok(false);
        }
        tracing::info!("Door {} opened", door_id);

        let revealed = self.lock_memory().reveal_regions(&[regions.0, regions.1]);
        self.emit(GameEvent::DoorStateChanged {
            threshold_id: door_id.clone(),
            state: DoorState::Open,
        });
        if !revealed.is_empty() {
            self.emit(GameEvent::RegionsRevealed { ids: revealed });
        }
        self.refresh_all_visibility();
        self.emit_turn_state();
        Ok(true)
    }

    /// Game master only
    pub fn monster_action(&self, monster_id: &EntityId, action: MonsterActionPayload) -> Result<ActionOutcome, GameError> {
        self.lock_turns().ensure_gamemaster_turn()?;

        let (message, combat, phase) = match &action {
            MonsterActionPayload::Move { dx, dy } => {
                let tile = self.monster_move(monster_id, Step::new(*dx, *dy))?;
                (format!("{} moves to {}", monster_id, tile), None, TurnPhase::MonsterMovement)
            }
            MonsterActionPayload::Attack { target_id } => {
                let combat = self.monster_attack(monster_id, target_id)?;
                (
                    format!("{} deals {} damage to {}", monster_id, combat.damage, target_id),
                    Some(combat),
                    TurnPhase::MonsterAction,
                )
            }
        };

        self.enter_gamemaster_phase(phase);

        let outcome = ActionOutcome {
            action_id: ActionId::new(),
            message,
            combat,
        };
        self.emit(GameEvent::MonsterActionResult {
            action_id: outcome.action_id,
            monster_id: monster_id.clone(),
            action: action.name().to_string(),
            success: true,
            message: outcome.message.clone(),
            combat: outcome.combat.clone(),
        });
        self.emit_turn_state();
        Ok(outcome)
    }

    /// Announces a game master phase change; a no-op outside the game master turn
    fn enter_gamemaster_phase(&self, phase: TurnPhase) {
        let phase_change = {
            let mut turns = self.lock_turns();
            let changed = turns.set_gamemaster_phase(phase).unwrap_or(false);
            changed.then(|| turns.state().clone())
        };
        if let Some(state) = phase_change {
            self.emit(GameEvent::TurnPhaseChanged {
                turn_number: state.turn_number,
                turn_type: state.turn_type,
                phase: state.phase,
            });
        }
    }

    fn monster_move(&self, monster_id: &EntityId, step: Step) -> Result<Tile, GameError> {
        let destination = {
            let mut board = self.write_board();
            if board.monster(monster_id).is_none() {
                return Err(GameError::UnknownEntity(monster_id.clone()));
            }
            let origin = board
                .position_of(monster_id)
                .ok_or_else(|| GameError::UnknownEntity(monster_id.clone()))?;
            let path = MovementLedger::plan_step(&board, monster_id, origin, step)?;
            let destination = path.last().copied().unwrap_or(origin);
            board.set_position(monster_id.clone(), destination);
            destination
        };
        self.emit(GameEvent::EntityUpdated {
            id: monster_id.clone(),
            tile: destination,
        });
        Ok(destination)
    }

    fn monster_attack(&self, monster_id: &EntityId, target: &EntityId) -> Result<CombatOutcome, GameError> {
        let (player_id, defend_dice) = {
            let turns = self.lock_turns();
            let player = turns
                .player_by_entity(target)
                .ok_or_else(|| GameError::UnknownEntity(target.clone()))?;
            (player.id.clone(), player.stats.total_defend_dice())
        };
        let attack_dice = {
            let board = self.read_board();
            let monster = board
                .monster(monster_id)
                .ok_or_else(|| GameError::UnknownEntity(monster_id.clone()))?;
            check_adjacent(&board, monster_id, target)?;
            monster.attack_dice
        };

        let combat = self
            .lock_dice()
            .roll_combat(attack_dice, defend_dice, DefenderKind::Hero);

        let stats = {
            let mut turns = self.lock_turns();
            turns.damage_player(&player_id, combat.damage)?;
            turns.player(&player_id).map(|p| p.stats.clone())
        };
        if let Some(stats) = stats {
            self.emit(GameEvent::PlayerStatsChanged { player_id, stats });
        }
        Ok(combat)
    }

    // ------------------------------------------------------------------
    // Turn flow
    // ------------------------------------------------------------------

    pub fn end_turn(&self, actor: &Actor) -> Result<(), GameError> {
        let snapshot = {
            let mut turns = self.lock_turns();
            match actor {
                Actor::Hero(player_id) => turns.end_hero_turn(player_id)?,
                Actor::GameMaster => turns.end_gamemaster_turn()?,
            }
            TurnSnapshot::capture(&turns)
        };

        self.emit(GameEvent::TurnPhaseChanged {
            turn_number: snapshot.turn_number,
            turn_type: snapshot.turn_type,
            phase: snapshot.phase,
        });
        self.emit(GameEvent::TurnStateChanged(snapshot));
        Ok(())
    }

    pub fn pass_gm_turn(&self) -> Result<(), GameError> {
        self.end_turn(&Actor::GameMaster)
    }

    pub fn elect(&self, player_id: &PlayerId) -> Result<(), GameError> {
        self.lock_turns().elect(player_id)?;
        self.emit_turn_state();
        Ok(())
    }

    pub fn cancel_election(&self, player_id: &PlayerId) -> Result<(), GameError> {
        self.lock_turns().cancel_election(player_id)?;
        self.emit_turn_state();
        Ok(())
    }

    pub fn confirm_election(&self, player_id: &PlayerId) -> Result<(), GameError> {
        self.lock_turns().confirm_election(player_id)?;
        self.emit_turn_state();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Debug tools
    // ------------------------------------------------------------------

    fn ensure_debug(&self) -> Result<(), GameError> {
        if !self.settings.debug_tools {
            return Err(GameError::PermissionDenied("debug tools are disabled".to_string()));
        }
        Ok(())
    }

    pub fn queue_dice_override(&self, channel: DiceChannel, values: &[u8]) -> Result<(), GameError> {
        self.ensure_debug()?;
        self.lock_dice().queue_override(channel, values)
    }

    /// Grants the active hero a rule exception for the rest of the turn
    pub fn grant_capability(&self, player_id: &PlayerId, capability: TurnCapability) -> Result<bool, GameError> {
        self.ensure_debug()?;
        let granted = self.lock_turns().grant_capability(player_id, capability)?;
        if granted {
            tracing::info!("Granted {:?} to {}", capability, player_id);
            self.emit_turn_state();
        }
        Ok(granted)
    }

    pub fn force_door_closed(&self, door_id: &DoorId) -> Result<bool, GameError> {
        self.ensure_debug()?;
        let closed = self.write_board().force_close_door(door_id)?;
        if closed {
            tracing::warn!("Door {} forced closed", door_id);
            self.emit(GameEvent::DoorStateChanged {
                threshold_id: door_id.clone(),
                state: DoorState::Closed,
            });
        }
        Ok(closed)
    }
}

/// Orthogonal neighbours with no wall or closed door between them
fn check_adjacent(board: &Board, attacker: &EntityId, target: &EntityId) -> Result<(), GameError> {
    let from = board
        .position_of(attacker)
        .ok_or_else(|| GameError::UnknownEntity(attacker.clone()))?;
    let to = board
        .position_of(target)
        .ok_or_else(|| GameError::UnknownEntity(target.clone()))?;
    if !from.is_adjacent(to) || board.is_separated(from, to) {
        return Err(GameError::TargetNotAdjacent(target.clone()));
    }
    Ok(())
}
