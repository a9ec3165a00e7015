//! Fog-of-war: line of sight and the quest's visibility memory
//!
//! Three layers are kept apart:
//! - *visible now*: recomputed from the observer's tile on every call, never stored
//! - *known*: regions, doors and blocking walls ever perceived; only grows
//! - *revealed*: regions disclosed by opening a door, independent of sight
//!
//! Computation runs on a [`SightMap`] captured from the board so callers can
//! release the board lock before raycasting.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::domain::entities::Board;
use crate::domain::value_objects::{DoorId, Edge, RegionId, Tile, WallId};

#[derive(Debug, Clone)]
struct DoorSight {
    id: DoorId,
    edge: Edge,
    regions: (RegionId, RegionId),
}

#[derive(Debug, Clone)]
struct WallSight {
    id: WallId,
    tiles: Vec<Tile>,
}

/// Everything line of sight needs, detached from the board
#[derive(Debug, Clone)]
pub struct SightMap {
    width: i32,
    height: i32,
    regions: Arc<Vec<RegionId>>,
    corridor: RegionId,
    blocking_edges: HashSet<Edge>,
    blocked_tiles: HashSet<Tile>,
    doors: Vec<DoorSight>,
    walls: Vec<WallSight>,
}

impl SightMap {
    pub fn capture(board: &Board) -> Self {
        Self {
            width: board.width(),
            height: board.height(),
            regions: board.region_map(),
            corridor: board.corridor_region(),
            blocking_edges: board.blocking_edges(),
            blocked_tiles: board.blocked_tiles().clone(),
            doors: board
                .doors()
                .map(|d| DoorSight {
                    id: d.id.clone(),
                    edge: d.edge,
                    regions: d.regions,
                })
                .collect(),
            walls: board
                .blocking_walls()
                .map(|w| WallSight {
                    id: w.id.clone(),
                    tiles: w.tiles.clone(),
                })
                .collect(),
        }
    }

    fn in_bounds(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    pub fn region_at(&self, tile: Tile) -> Option<RegionId> {
        if !self.in_bounds(tile) {
            return None;
        }
        self.regions.get((tile.y * self.width + tile.x) as usize).copied()
    }

    fn crossing_blocked(&self, from: Tile, to: Tile) -> bool {
        Edge::between(from, to).is_some_and(|edge| self.blocking_edges.contains(&edge))
    }

    /// Straight-line visibility between tile centres.
    ///
    /// Walks every tile the segment touches. A crossed blocking edge or an
    /// intermediate blocked tile stops the ray; the target tile itself may be
    /// blocked. A ray through an exact corner passes if either L-shaped
    /// detour around the corner is clear.
    pub fn has_line_of_sight(&self, from: Tile, to: Tile) -> bool {
        if from == to {
            return true;
        }
        if !self.in_bounds(from) || !self.in_bounds(to) {
            return false;
        }

        let dx = (to.x - from.x).abs();
        let dy = (to.y - from.y).abs();
        let sx = (to.x - from.x).signum();
        let sy = (to.y - from.y).signum();

        let mut current = from;
        let (mut ix, mut iy) = (0, 0);

        while ix < dx || iy < dy {
            let decision = (1 + 2 * ix) * dy - (1 + 2 * iy) * dx;
            let next = if decision == 0 {
                let next = current.offset(sx, sy);
                let via_x = current.offset(sx, 0);
                let via_y = current.offset(0, sy);
                let open_x = self.detour_open(current, via_x, next, to);
                let open_y = self.detour_open(current, via_y, next, to);
                if !open_x && !open_y {
                    return false;
                }
                ix += 1;
                iy += 1;
                next
            } else if decision < 0 {
                ix += 1;
                let next = current.offset(sx, 0);
                if self.crossing_blocked(current, next) {
                    return false;
                }
                next
            } else {
                iy += 1;
                let next = current.offset(0, sy);
                if self.crossing_blocked(current, next) {
                    return false;
                }
                next
            };

            current = next;
            if current != to && self.blocked_tiles.contains(&current) {
                return false;
            }
        }

        true
    }

    fn detour_open(&self, from: Tile, via: Tile, next: Tile, target: Tile) -> bool {
        let via_clear = via == target || !self.blocked_tiles.contains(&via);
        via_clear && !self.crossing_blocked(from, via) && !self.crossing_blocked(via, next)
    }

    /// Straight corridor run: same row or column, every tile strictly between in the corridor
    fn corridor_run(&self, from: Tile, to: Tile) -> bool {
        if from.x != to.x && from.y != to.y {
            return false;
        }
        let sx = (to.x - from.x).signum();
        let sy = (to.y - from.y).signum();
        let mut current = from.offset(sx, sy);
        while current != to {
            if self.region_at(current) != Some(self.corridor) {
                return false;
            }
            current = current.offset(sx, sy);
        }
        true
    }

    /// "Can see down the hallway": only applies while standing in the corridor
    pub fn corridor_sees(&self, observer: Tile, object: Tile) -> bool {
        if self.region_at(observer) != Some(self.corridor) || !self.in_bounds(object) {
            return false;
        }
        if observer == object {
            return true;
        }
        if observer.x == object.x || observer.y == object.y {
            return self.corridor_run(observer, object);
        }
        object.neighbours().iter().any(|&n| {
            if n == observer {
                return true;
            }
            self.region_at(n) == Some(self.corridor)
                && (n.x == observer.x || n.y == observer.y)
                && self.corridor_run(observer, n)
        })
    }
}

/// What the observer perceives at this instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityReport {
    pub observer_region: Option<RegionId>,
    pub visible_regions: BTreeSet<RegionId>,
    pub perceived_doors: BTreeSet<DoorId>,
    pub perceived_walls: BTreeSet<WallId>,
}

/// Line-of-sight evaluation for one observer tile
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityEngine;

impl VisibilityEngine {
    pub fn compute(&self, map: &SightMap, observer: Tile) -> VisibilityReport {
        let observer_region = map.region_at(observer);
        let mut report = VisibilityReport {
            observer_region,
            ..VisibilityReport::default()
        };
        if observer_region.is_none() {
            return report;
        }

        for y in 0..map.height {
            for x in 0..map.width {
                let tile = Tile::new(x, y);
                let Some(region) = map.region_at(tile) else {
                    continue;
                };
                if report.visible_regions.contains(&region) {
                    continue;
                }
                if map.has_line_of_sight(observer, tile) {
                    report.visible_regions.insert(region);
                }
            }
        }

        // The corridor spans the whole board, so "same room" only means a real room.
        let room = observer_region.filter(|r| *r != map.corridor);

        for door in &map.doors {
            let (a, b) = door.edge.tiles();
            let in_room = room.is_some_and(|r| door.regions.0 == r || door.regions.1 == r);
            let seen = map.has_line_of_sight(observer, a)
                || map.has_line_of_sight(observer, b)
                || map.corridor_sees(observer, a)
                || map.corridor_sees(observer, b);
            if in_room || seen {
                report.perceived_doors.insert(door.id.clone());
            }
        }

        for wall in &map.walls {
            let in_room = room.is_some_and(|r| wall.tiles.iter().any(|t| map.region_at(*t) == Some(r)));
            let seen = wall
                .tiles
                .iter()
                .any(|t| map.has_line_of_sight(observer, *t) || map.corridor_sees(observer, *t));
            if in_room || seen {
                report.perceived_walls.insert(wall.id.clone());
            }
        }

        report
    }
}

/// Items discovered by a single merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityDelta {
    pub new_regions: Vec<RegionId>,
    pub new_doors: Vec<DoorId>,
    pub new_walls: Vec<WallId>,
}

impl VisibilityDelta {
    pub fn is_empty(&self) -> bool {
        self.new_regions.is_empty() && self.new_doors.is_empty() && self.new_walls.is_empty()
    }
}

/// Known and revealed sets for the whole quest. Nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityMemory {
    known_regions: BTreeSet<RegionId>,
    known_doors: BTreeSet<DoorId>,
    known_blocking_walls: BTreeSet<WallId>,
    revealed_regions: BTreeSet<RegionId>,
}

impl VisibilityMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, report: &VisibilityReport) -> VisibilityDelta {
        VisibilityDelta {
            new_regions: insert_new(&mut self.known_regions, &report.visible_regions),
            new_doors: insert_new(&mut self.known_doors, &report.perceived_doors),
            new_walls: insert_new(&mut self.known_blocking_walls, &report.perceived_walls),
        }
    }

    /// Marks regions as revealed by door logic; returns the ones not revealed before
    pub fn reveal_regions(&mut self, regions: &[RegionId]) -> Vec<RegionId> {
        regions
            .iter()
            .filter(|r| self.revealed_regions.insert(**r))
            .copied()
            .collect()
    }

    pub fn known_regions(&self) -> &BTreeSet<RegionId> {
        &self.known_regions
    }

    pub fn known_doors(&self) -> &BTreeSet<DoorId> {
        &self.known_doors
    }

    pub fn known_blocking_walls(&self) -> &BTreeSet<WallId> {
        &self.known_blocking_walls
    }

    pub fn revealed_regions(&self) -> &BTreeSet<RegionId> {
        &self.revealed_regions
    }
}

fn insert_new<T: Ord + Clone>(known: &mut BTreeSet<T>, seen: &BTreeSet<T>) -> Vec<T> {
    seen.iter().filter(|item| known.insert((*item).clone())).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::two_room_board;

    /// 12x8 board. Region 1 is a room at x 3..=7, y 0..=3 walled off from the
    /// corridor (region 0) with one door at the bottom, (5,3)-(5,4).
    /// A blocking wall "rubble" sits in the corridor at (9,5).
    fn corridor_board() -> Board {
        let width = 12;
        let height = 8;
        let in_room = |x: i32, y: i32| (3..=7).contains(&x) && (0..=3).contains(&y);
        let mut regions = Vec::new();
        for y in 0..height {
            for x in 0..width {
                regions.push(RegionId(if in_room(x, y) { 1 } else { 0 }));
            }
        }
        let mut board = Board::new(width, height, regions, RegionId(0)).unwrap();
        for y in 0..=3 {
            board.add_wall(Tile::new(2, y), Tile::new(3, y)).unwrap();
            board.add_wall(Tile::new(7, y), Tile::new(8, y)).unwrap();
        }
        for x in 3..=7 {
            if x == 5 {
                board
                    .add_door(DoorId::new("room-door"), Tile::new(x, 3), Tile::new(x, 4))
                    .unwrap();
            } else {
                board.add_wall(Tile::new(x, 3), Tile::new(x, 4)).unwrap();
            }
        }
        board
            .add_blocking_wall(WallId::new("rubble"), vec![Tile::new(9, 5)])
            .unwrap();
        board
    }

    #[test]
    fn test_same_tile_is_visible() {
        let map = SightMap::capture(&two_room_board());
        assert!(map.has_line_of_sight(Tile::new(1, 1), Tile::new(1, 1)));
    }

    #[test]
    fn test_closed_door_blocks_sight_and_open_door_does_not() {
        let mut board = two_room_board();
        let map = SightMap::capture(&board);
        assert!(!map.has_line_of_sight(Tile::new(0, 1), Tile::new(5, 1)));

        board.open_door(&DoorId::new("door-1")).unwrap();
        let map = SightMap::capture(&board);
        assert!(map.has_line_of_sight(Tile::new(0, 1), Tile::new(5, 1)));
        // The wall beside the doorway still blocks
        assert!(!map.has_line_of_sight(Tile::new(0, 0), Tile::new(5, 0)));
    }

    #[test]
    fn test_blocked_tile_hides_what_is_behind_it() {
        let mut board = two_room_board();
        board
            .add_blocking_wall(WallId::new("pillar"), vec![Tile::new(1, 1)])
            .unwrap();
        let map = SightMap::capture(&board);
        assert!(map.has_line_of_sight(Tile::new(0, 1), Tile::new(1, 1)));
        assert!(!map.has_line_of_sight(Tile::new(0, 1), Tile::new(2, 1)));
    }

    #[test]
    fn test_corner_ray_needs_one_open_detour() {
        let mut board = two_room_board();
        board
            .add_blocking_wall(WallId::new("a"), vec![Tile::new(1, 0)])
            .unwrap();
        let map = SightMap::capture(&board);
        // Every step of (0,0) -> (2,2) passes an exact corner; (0,1) is still open
        assert!(map.has_line_of_sight(Tile::new(0, 0), Tile::new(2, 2)));
        assert!(map.has_line_of_sight(Tile::new(0, 0), Tile::new(1, 1)));
    }

    #[test]
    fn test_diagonal_blocked_when_both_detours_blocked() {
        let mut board = two_room_board();
        board
            .add_blocking_wall(WallId::new("a"), vec![Tile::new(1, 0), Tile::new(0, 1)])
            .unwrap();
        let map = SightMap::capture(&board);
        assert!(!map.has_line_of_sight(Tile::new(0, 0), Tile::new(1, 1)));
        assert!(!map.has_line_of_sight(Tile::new(0, 0), Tile::new(2, 2)));
    }

    #[test]
    fn test_room_visibility_and_door_same_room_rule() {
        let board = two_room_board();
        let report = VisibilityEngine.compute(&SightMap::capture(&board), Tile::new(0, 0));

        assert_eq!(report.observer_region, Some(RegionId(1)));
        assert!(report.visible_regions.contains(&RegionId(1)));
        assert!(!report.visible_regions.contains(&RegionId(2)));
        assert!(report.perceived_doors.contains(&DoorId::new("door-1")));
    }

    #[test]
    fn test_opening_door_makes_next_room_visible() {
        let mut board = two_room_board();
        board.open_door(&DoorId::new("door-1")).unwrap();
        let report = VisibilityEngine.compute(&SightMap::capture(&board), Tile::new(1, 1));
        assert!(report.visible_regions.contains(&RegionId(2)));
    }

    #[test]
    fn test_blocking_wall_in_corridor_found_on_aligned_run() {
        let board = corridor_board();
        let map = SightMap::capture(&board);
        let rubble = WallId::new("rubble");

        let from_room = VisibilityEngine.compute(&map, Tile::new(5, 2));
        assert!(!from_room.perceived_walls.contains(&rubble));

        let from_corridor = VisibilityEngine.compute(&map, Tile::new(5, 5));
        assert!(from_corridor.perceived_walls.contains(&rubble));
    }

    #[test]
    fn test_corridor_rule_checks_region_run() {
        let map = SightMap::capture(&corridor_board());
        // Same row, corridor all the way
        assert!(map.corridor_sees(Tile::new(0, 5), Tile::new(11, 5)));
        // Same column but the room lies between
        assert!(!map.corridor_sees(Tile::new(5, 7), Tile::new(5, 0)));
        // Not aligned: neighbour (9,6) lines up with the observer on row 6
        assert!(map.corridor_sees(Tile::new(2, 6), Tile::new(9, 5)));
        // Observer inside the room never uses the corridor rule
        assert!(!map.corridor_sees(Tile::new(4, 2), Tile::new(4, 6)));
    }

    #[test]
    fn test_corridor_is_not_a_room_for_disclosure() {
        let mut board = corridor_board();
        board
            .add_blocking_wall(WallId::new("far-rubble"), vec![Tile::new(0, 0)])
            .unwrap();
        // Far corner of the corridor, hidden behind the room
        let report = VisibilityEngine.compute(&SightMap::capture(&board), Tile::new(11, 0));
        assert!(!report.perceived_walls.contains(&WallId::new("far-rubble")));
    }

    #[test]
    fn test_memory_only_grows() {
        let board = corridor_board();
        let map = SightMap::capture(&board);
        let mut memory = VisibilityMemory::new();

        let delta = memory.merge(&VisibilityEngine.compute(&map, Tile::new(5, 5)));
        assert!(delta.new_walls.contains(&WallId::new("rubble")));
        let known_after_corridor = memory.clone();

        let delta = memory.merge(&VisibilityEngine.compute(&map, Tile::new(5, 2)));
        assert!(delta.new_walls.is_empty());
        assert!(memory.known_blocking_walls().is_superset(known_after_corridor.known_blocking_walls()));
        assert!(memory.known_regions().is_superset(known_after_corridor.known_regions()));
        assert!(memory.known_doors().is_superset(known_after_corridor.known_doors()));
    }

    #[test]
    fn test_merge_reports_only_new_items() {
        let board = two_room_board();
        let map = SightMap::capture(&board);
        let mut memory = VisibilityMemory::new();
        let report = VisibilityEngine.compute(&map, Tile::new(0, 0));

        let first = memory.merge(&report);
        assert!(!first.is_empty());
        let second = memory.merge(&report);
        assert!(second.is_empty());
    }

    #[test]
    fn test_reveal_regions_is_independent_of_sight() {
        let mut memory = VisibilityMemory::new();
        assert_eq!(memory.reveal_regions(&[RegionId(1), RegionId(2)]), vec![RegionId(1), RegionId(2)]);
        assert_eq!(memory.reveal_regions(&[RegionId(2)]), Vec::<RegionId>::new());
        assert!(memory.known_regions().is_empty());
    }
}
