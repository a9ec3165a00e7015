//! Board entity - the shared tile grid of a running quest
//!
//! The board owns everything spatial: the region map, structural walls,
//! doors, blocking-wall obstacles and where every entity stands. It is
//! created once from the quest definition and lives until the quest ends.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::entities::Monster;
use crate::domain::errors::GameError;
use crate::domain::value_objects::{DoorId, Edge, EntityId, RegionId, Tile, WallId};

/// Door state; play only ever opens doors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Closed,
    Open,
}

/// A door on the edge between two tiles of different regions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Door {
    pub id: DoorId,
    pub edge: Edge,
    pub regions: (RegionId, RegionId),
    pub state: DoorState,
}

impl Door {
    pub fn is_open(&self) -> bool {
        self.state == DoorState::Open
    }
}

/// An obstacle covering one or more tiles that blocks both movement and sight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingWall {
    pub id: WallId,
    pub tiles: Vec<Tile>,
}

/// Errors raised while assembling a board from quest content
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("Board dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("Region map has {actual} tiles, expected {expected}")]
    RegionMapSize { expected: usize, actual: usize },

    #[error("Tile {0} is outside the board")]
    OutOfBounds(Tile),

    #[error("Tiles {0} and {1} are not adjacent")]
    NotAdjacent(Tile, Tile),

    #[error("Duplicate door id: {0}")]
    DuplicateDoor(DoorId),

    #[error("Edge between {0} and {1} already has a door")]
    DoorEdgeTaken(Tile, Tile),

    #[error("Duplicate blocking wall id: {0}")]
    DuplicateWall(WallId),

    #[error("Duplicate entity id: {0}")]
    DuplicateEntity(EntityId),

    #[error("Tile {0} cannot hold an entity")]
    UnplaceableTile(Tile),
}

#[derive(Debug, Clone)]
pub struct Board {
    width: i32,
    height: i32,
    /// Row-major, shared with visibility snapshots
    regions: Arc<Vec<RegionId>>,
    corridor: RegionId,
    wall_edges: HashSet<Edge>,
    blocked_tiles: HashSet<Tile>,
    blocking_walls: BTreeMap<WallId, BlockingWall>,
    doors: BTreeMap<DoorId, Door>,
    door_edges: HashMap<Edge, DoorId>,
    positions: BTreeMap<EntityId, Tile>,
    starting_tiles: Vec<Tile>,
    monsters: BTreeMap<EntityId, Monster>,
}

impl Board {
    pub fn new(
        width: i32,
        height: i32,
        regions: Vec<RegionId>,
        corridor: RegionId,
    ) -> Result<Self, BoardError> {
        if width <= 0 || height <= 0 {
            return Err(BoardError::InvalidDimensions { width, height });
        }
        let expected = (width * height) as usize;
        if regions.len() != expected {
            return Err(BoardError::RegionMapSize {
                expected,
                actual: regions.len(),
            });
        }

        Ok(Self {
            width,
            height,
            regions: Arc::new(regions),
            corridor,
            wall_edges: HashSet::new(),
            blocked_tiles: HashSet::new(),
            blocking_walls: BTreeMap::new(),
            doors: BTreeMap::new(),
            door_edges: HashMap::new(),
            positions: BTreeMap::new(),
            starting_tiles: Vec::new(),
            monsters: BTreeMap::new(),
        })
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn add_wall(&mut self, a: Tile, b: Tile) -> Result<(), BoardError> {
        let edge = self.edge_in_bounds(a, b)?;
        self.wall_edges.insert(edge);
        Ok(())
    }

    /// Adds a closed door; its regions are read from the region map
    pub fn add_door(&mut self, id: DoorId, a: Tile, b: Tile) -> Result<(), BoardError> {
        let edge = self.edge_in_bounds(a, b)?;
        if self.doors.contains_key(&id) {
            return Err(BoardError::DuplicateDoor(id));
        }
        if self.door_edges.contains_key(&edge) {
            return Err(BoardError::DoorEdgeTaken(a, b));
        }
        let regions = (self.region_or_corridor(a), self.region_or_corridor(b));

        // A door sits in a wall: closed it blocks, open it lets through.
        self.wall_edges.insert(edge);
        self.door_edges.insert(edge, id.clone());
        self.doors.insert(
            id.clone(),
            Door {
                id,
                edge,
                regions,
                state: DoorState::Closed,
            },
        );
        Ok(())
    }

    pub fn add_blocking_wall(&mut self, id: WallId, tiles: Vec<Tile>) -> Result<(), BoardError> {
        if self.blocking_walls.contains_key(&id) {
            return Err(BoardError::DuplicateWall(id));
        }
        if let Some(tile) = tiles.iter().find(|t| !self.in_bounds(**t)) {
            return Err(BoardError::OutOfBounds(*tile));
        }
        self.blocked_tiles.extend(tiles.iter().copied());
        self.blocking_walls.insert(id.clone(), BlockingWall { id, tiles });
        Ok(())
    }

    pub fn add_starting_tile(&mut self, tile: Tile) -> Result<(), BoardError> {
        if !self.in_bounds(tile) || self.blocked_tiles.contains(&tile) {
            return Err(BoardError::UnplaceableTile(tile));
        }
        self.starting_tiles.push(tile);
        Ok(())
    }

    pub fn add_monster(&mut self, monster: Monster, tile: Tile) -> Result<(), BoardError> {
        if self.positions.contains_key(&monster.id) {
            return Err(BoardError::DuplicateEntity(monster.id));
        }
        if !self.in_bounds(tile) || self.blocked_tiles.contains(&tile) || self.occupant_at(tile).is_some() {
            return Err(BoardError::UnplaceableTile(tile));
        }
        self.positions.insert(monster.id.clone(), tile);
        self.monsters.insert(monster.id.clone(), monster);
        Ok(())
    }

    fn edge_in_bounds(&self, a: Tile, b: Tile) -> Result<Edge, BoardError> {
        if !self.in_bounds(a) {
            return Err(BoardError::OutOfBounds(a));
        }
        if !self.in_bounds(b) {
            return Err(BoardError::OutOfBounds(b));
        }
        Edge::between(a, b).ok_or(BoardError::NotAdjacent(a, b))
    }

    fn region_or_corridor(&self, tile: Tile) -> RegionId {
        self.region_at(tile).unwrap_or(self.corridor)
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    pub fn region_at(&self, tile: Tile) -> Option<RegionId> {
        if !self.in_bounds(tile) {
            return None;
        }
        self.regions
            .get((tile.y * self.width + tile.x) as usize)
            .copied()
    }

    pub fn region_map(&self) -> Arc<Vec<RegionId>> {
        Arc::clone(&self.regions)
    }

    pub fn corridor_region(&self) -> RegionId {
        self.corridor
    }

    pub fn is_blocked_tile(&self, tile: Tile) -> bool {
        self.blocked_tiles.contains(&tile)
    }

    /// A wall edge blocks unless a door on it is open
    pub fn edge_blocks(&self, edge: &Edge) -> bool {
        match self.door_edges.get(edge).and_then(|id| self.doors.get(id)) {
            Some(door) => !door.is_open(),
            None => self.wall_edges.contains(edge),
        }
    }

    /// True when moving or looking from `a` straight into neighbour `b` is stopped by an edge
    pub fn is_separated(&self, a: Tile, b: Tile) -> bool {
        Edge::between(a, b).is_some_and(|edge| self.edge_blocks(&edge))
    }

    /// Edges that currently block, with open doors left out
    pub fn blocking_edges(&self) -> HashSet<Edge> {
        self.wall_edges
            .iter()
            .filter(|edge| self.edge_blocks(edge))
            .copied()
            .collect()
    }

    pub fn blocked_tiles(&self) -> &HashSet<Tile> {
        &self.blocked_tiles
    }

    // ------------------------------------------------------------------
    // Doors and obstacles
    // ------------------------------------------------------------------

    pub fn door(&self, id: &DoorId) -> Option<&Door> {
        self.doors.get(id)
    }

    pub fn doors(&self) -> impl Iterator<Item = &Door> {
        self.doors.values()
    }

    pub fn blocking_wall(&self, id: &WallId) -> Option<&BlockingWall> {
        self.blocking_walls.get(id)
    }

    pub fn blocking_walls(&self) -> impl Iterator<Item = &BlockingWall> {
        self.blocking_walls.values()
    }

    /// Opens a door. Returns `false` when it was already open.
    pub fn open_door(&mut self, id: &DoorId) -> Result<bool, GameError> {
        let door = self
            .doors
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownDoor(id.clone()))?;
        if door.is_open() {
            return Ok(false);
        }
        door.state = DoorState::Open;
        Ok(true)
    }

    /// Admin override; normal play never closes a door
    pub fn force_close_door(&mut self, id: &DoorId) -> Result<bool, GameError> {
        let door = self
            .doors
            .get_mut(id)
            .ok_or_else(|| GameError::UnknownDoor(id.clone()))?;
        if !door.is_open() {
            return Ok(false);
        }
        door.state = DoorState::Closed;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    pub fn position_of(&self, entity: &EntityId) -> Option<Tile> {
        self.positions.get(entity).copied()
    }

    pub fn occupant_at(&self, tile: Tile) -> Option<&EntityId> {
        self.positions
            .iter()
            .find(|(_, pos)| **pos == tile)
            .map(|(id, _)| id)
    }

    pub fn positions(&self) -> &BTreeMap<EntityId, Tile> {
        &self.positions
    }

    pub fn set_position(&mut self, entity: EntityId, tile: Tile) {
        self.positions.insert(entity, tile);
    }

    pub fn remove_entity(&mut self, entity: &EntityId) -> Option<Tile> {
        self.monsters.remove(entity);
        self.positions.remove(entity)
    }

    pub fn starting_tiles(&self) -> &[Tile] {
        &self.starting_tiles
    }

    pub fn monster(&self, id: &EntityId) -> Option<&Monster> {
        self.monsters.get(id)
    }

    pub fn monster_mut(&mut self, id: &EntityId) -> Option<&mut Monster> {
        self.monsters.get_mut(id)
    }
}
