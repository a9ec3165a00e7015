//! Quest definition DTO - the board file format loaded at start-up

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Board, BoardError, CharacterStats, HeroClass, Monster, Player};
use crate::domain::value_objects::{DoorId, EntityId, PlayerId, RegionId, Tile, WallId};

/// A structural wall on the edge between two neighbouring tiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallDefinition {
    pub a: Tile,
    pub b: Tile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoorDefinition {
    pub id: DoorId,
    pub a: Tile,
    pub b: Tile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingWallDefinition {
    pub id: WallId,
    pub tiles: Vec<Tile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonsterDefinition {
    pub id: EntityId,
    pub kind: String,
    pub tile: Tile,
    pub body_points: u32,
    pub attack_dice: u32,
    pub defend_dice: u32,
}

/// A hero seat known before anyone connects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroDefinition {
    pub player_id: PlayerId,
    pub entity_id: EntityId,
    pub class: HeroClass,
    /// Overrides the class defaults
    #[serde(default)]
    pub stats: Option<CharacterStats>,
}

impl HeroDefinition {
    pub fn to_player(&self) -> Player {
        let player = Player::new(self.player_id.clone(), self.entity_id.clone(), self.class);
        match &self.stats {
            Some(stats) => player.with_stats(stats.clone()),
            None => player,
        }
    }
}

/// A quest as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub width: i32,
    pub height: i32,
    /// One row per board row, one region id per tile
    pub regions: Vec<Vec<u32>>,
    pub corridor_region: u32,
    #[serde(default)]
    pub walls: Vec<WallDefinition>,
    #[serde(default)]
    pub doors: Vec<DoorDefinition>,
    #[serde(default)]
    pub blocking_walls: Vec<BlockingWallDefinition>,
    #[serde(default)]
    pub starting_tiles: Vec<Tile>,
    #[serde(default)]
    pub monsters: Vec<MonsterDefinition>,
    #[serde(default)]
    pub heroes: Vec<HeroDefinition>,
}

impl QuestDefinition {
    pub fn build_board(&self) -> Result<Board, BoardError> {
        let expected = (self.width.max(0) * self.height.max(0)) as usize;
        let ragged = self.regions.len() != self.height.max(0) as usize
            || self.regions.iter().any(|row| row.len() != self.width.max(0) as usize);
        if ragged && self.width > 0 && self.height > 0 {
            return Err(BoardError::RegionMapSize {
                expected,
                actual: self.regions.iter().map(Vec::len).sum(),
            });
        }

        let regions = self
            .regions
            .iter()
            .flatten()
            .map(|id| RegionId(*id))
            .collect();
        let mut board = Board::new(self.width, self.height, regions, RegionId(self.corridor_region))?;

        for wall in &self.walls {
            board.add_wall(wall.a, wall.b)?;
        }
        for door in &self.doors {
            board.add_door(door.id.clone(), door.a, door.b)?;
        }
        for wall in &self.blocking_walls {
            board.add_blocking_wall(wall.id.clone(), wall.tiles.clone())?;
        }
        for tile in &self.starting_tiles {
            board.add_starting_tile(*tile)?;
        }
        for monster in &self.monsters {
            board.add_monster(
                Monster::new(
                    monster.id.clone(),
                    monster.kind.clone(),
                    monster.body_points,
                    monster.attack_dice,
                    monster.defend_dice,
                ),
                monster.tile,
            )?;
        }

        Ok(board)
    }

    pub fn players(&self) -> Vec<Player> {
        self.heroes.iter().map(HeroDefinition::to_player).collect()
    }
}
