//! Movement validation and segment bookkeeping
//!
//! The ledger holds no state of its own. Path checks read the board; segment
//! recording writes into the turn state. Callers hold whichever lock guards
//! the structure they pass in, never both at once.

use chrono::Utc;

use crate::domain::entities::{Board, MovementSegment, SegmentKind, TurnState};
use crate::domain::errors::GameError;
use crate::domain::value_objects::{EntityId, Step, Tile};

pub struct MovementLedger;

impl MovementLedger {
    /// Checks a single orthogonal step for `mover`
    pub fn check_step(board: &Board, mover: &EntityId, from: Tile, to: Tile) -> Result<(), GameError> {
        if !from.is_adjacent(to) {
            return Err(GameError::DisjointStep { from, to });
        }
        if !board.in_bounds(to) {
            return Err(GameError::OutOfBounds(to));
        }
        if board.is_blocked_tile(to) {
            return Err(GameError::TileBlocked(to));
        }
        if board.is_separated(from, to) {
            return Err(GameError::PathBlocked(to));
        }
        if board.occupant_at(to).is_some_and(|occupant| occupant != mover) {
            return Err(GameError::TileOccupied(to));
        }
        Ok(())
    }

    /// Expands a unit step into the tiles walked.
    ///
    /// A diagonal becomes two orthogonal steps, x first. If that route is
    /// stopped the y-first route is tried; the x-first error is reported when
    /// both fail.
    pub fn plan_step(board: &Board, mover: &EntityId, origin: Tile, step: Step) -> Result<Vec<Tile>, GameError> {
        if !step.is_unit() {
            return Err(GameError::InvalidStep {
                dx: step.dx,
                dy: step.dy,
            });
        }

        if !step.is_diagonal() {
            let to = origin.offset(step.dx, step.dy);
            Self::check_step(board, mover, origin, to)?;
            return Ok(vec![to]);
        }

        let x_first = [origin.offset(step.dx, 0), origin.offset(step.dx, step.dy)];
        match Self::check_walk(board, mover, origin, &x_first) {
            Ok(()) => Ok(x_first.to_vec()),
            Err(x_err) => {
                let y_first = [origin.offset(0, step.dy), origin.offset(step.dx, step.dy)];
                Self::check_walk(board, mover, origin, &y_first).map_err(|_| x_err)?;
                Ok(y_first.to_vec())
            }
        }
    }

    /// Validates a submitted path (origin excluded) as a contiguous orthogonal walk
    pub fn plan_path(board: &Board, mover: &EntityId, origin: Tile, path: &[Tile]) -> Result<Vec<Tile>, GameError> {
        if path.is_empty() {
            return Err(GameError::InvalidStep { dx: 0, dy: 0 });
        }
        Self::check_walk(board, mover, origin, path)?;
        Ok(path.to_vec())
    }

    fn check_walk(board: &Board, mover: &EntityId, origin: Tile, path: &[Tile]) -> Result<(), GameError> {
        let mut from = origin;
        for &to in path {
            Self::check_step(board, mover, from, to)?;
            from = to;
        }
        Ok(())
    }

    /// Appends walked tiles to the open segment, opening a new one on the
    /// first step of the turn or when the segment kind changes
    pub fn record(state: &mut TurnState, kind: SegmentKind, origin: Tile, path: &[Tile]) {
        let open = state
            .current_segment
            .filter(|&i| state.segments.get(i).is_some_and(|s| s.kind == kind && !s.is_closed()));

        let index = match open {
            Some(index) => index,
            None => {
                Self::close_segment(state);
                state.segments.push(MovementSegment::open(kind, origin));
                state.segments.len() - 1
            }
        };

        if let Some(segment) = state.segments.get_mut(index) {
            segment.path.extend_from_slice(path);
            segment.executed = true;
        }
        state.current_segment = Some(index);
    }

    /// Closes the open segment, if any. Returns a copy of what was closed.
    pub fn close_segment(state: &mut TurnState) -> Option<MovementSegment> {
        let index = state.current_segment.take()?;
        let segment = state.segments.get_mut(index)?;
        if segment.is_closed() {
            return None;
        }
        segment.ended_at = Some(Utc::now());
        Some(segment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{two_room_board, Monster};
    use crate::domain::value_objects::{DoorId, WallId};

    fn hero() -> EntityId {
        EntityId::new("hero-1")
    }

    #[test]
    fn test_orthogonal_step() {
        let board = two_room_board();
        let path = MovementLedger::plan_step(&board, &hero(), Tile::new(0, 0), Step::new(1, 0)).unwrap();
        assert_eq!(path, vec![Tile::new(1, 0)]);
    }

    #[test]
    fn test_step_out_of_bounds() {
        let board = two_room_board();
        let err = MovementLedger::plan_step(&board, &hero(), Tile::new(0, 0), Step::new(-1, 0)).unwrap_err();
        assert_eq!(err, GameError::OutOfBounds(Tile::new(-1, 0)));
    }

    #[test]
    fn test_wall_and_closed_door_block() {
        let mut board = two_room_board();
        let err = MovementLedger::plan_step(&board, &hero(), Tile::new(2, 0), Step::new(1, 0)).unwrap_err();
        assert_eq!(err.code(), "path_blocked");
        let err = MovementLedger::plan_step(&board, &hero(), Tile::new(2, 1), Step::new(1, 0)).unwrap_err();
        assert_eq!(err.code(), "path_blocked");

        board.open_door(&DoorId::new("door-1")).unwrap();
        assert!(MovementLedger::plan_step(&board, &hero(), Tile::new(2, 1), Step::new(1, 0)).is_ok());
    }

    #[test]
    fn test_blocked_and_occupied_tiles() {
        let mut board = two_room_board();
        board
            .add_blocking_wall(WallId::new("rubble"), vec![Tile::new(1, 0)])
            .unwrap();
        board
            .add_monster(Monster::new(EntityId::new("orc-1"), "orc", 1, 3, 2), Tile::new(0, 1))
            .unwrap();

        let err = MovementLedger::plan_step(&board, &hero(), Tile::new(0, 0), Step::new(1, 0)).unwrap_err();
        assert_eq!(err, GameError::TileBlocked(Tile::new(1, 0)));
        let err = MovementLedger::plan_step(&board, &hero(), Tile::new(0, 0), Step::new(0, 1)).unwrap_err();
        assert_eq!(err, GameError::TileOccupied(Tile::new(0, 1)));
    }

    #[test]
    fn test_diagonal_falls_back_to_y_first() {
        let mut board = two_room_board();
        board
            .add_blocking_wall(WallId::new("rubble"), vec![Tile::new(1, 0)])
            .unwrap();
        let path = MovementLedger::plan_step(&board, &hero(), Tile::new(0, 0), Step::new(1, 1)).unwrap();
        assert_eq!(path, vec![Tile::new(0, 1), Tile::new(1, 1)]);
    }

    #[test]
    fn test_diagonal_prefers_x_first() {
        let board = two_room_board();
        let path = MovementLedger::plan_step(&board, &hero(), Tile::new(0, 0), Step::new(1, 1)).unwrap();
        assert_eq!(path, vec![Tile::new(1, 0), Tile::new(1, 1)]);
    }

    #[test]
    fn test_invalid_steps_rejected() {
        let board = two_room_board();
        for step in [Step::new(0, 0), Step::new(2, 0), Step::new(1, -2)] {
            let err = MovementLedger::plan_step(&board, &hero(), Tile::new(1, 1), step).unwrap_err();
            assert_eq!(err.code(), "invalid_step");
        }
    }

    #[test]
    fn test_planned_path_must_be_contiguous() {
        let board = two_room_board();
        let ok = MovementLedger::plan_path(
            &board,
            &hero(),
            Tile::new(0, 0),
            &[Tile::new(0, 1), Tile::new(1, 1), Tile::new(2, 1)],
        );
        assert!(ok.is_ok());

        let err = MovementLedger::plan_path(&board, &hero(), Tile::new(0, 0), &[Tile::new(0, 1), Tile::new(2, 1)])
            .unwrap_err();
        assert_eq!(err.code(), "invalid_step");
    }

    #[test]
    fn test_far_away_tiles_rejected_without_overflow() {
        let board = two_room_board();
        let err = MovementLedger::plan_path(&board, &hero(), Tile::new(0, 0), &[Tile::new(i32::MIN, i32::MAX)])
            .unwrap_err();
        assert_eq!(
            err,
            GameError::DisjointStep {
                from: Tile::new(0, 0),
                to: Tile::new(i32::MIN, i32::MAX)
            }
        );

        let err = MovementLedger::plan_step(&board, &hero(), Tile::new(1, 1), Step::new(i32::MIN, 0)).unwrap_err();
        assert_eq!(err.code(), "invalid_step");
    }

    #[test]
    fn test_record_opens_and_extends_segments() {
        let mut state = TurnState::new();
        MovementLedger::record(&mut state, SegmentKind::Manual, Tile::new(0, 0), &[Tile::new(1, 0)]);
        MovementLedger::record(&mut state, SegmentKind::Manual, Tile::new(1, 0), &[Tile::new(2, 0)]);
        assert_eq!(state.segments.len(), 1);
        assert_eq!(state.segments[0].path, vec![Tile::new(1, 0), Tile::new(2, 0)]);

        // Kind change closes the manual segment
        MovementLedger::record(&mut state, SegmentKind::Planned, Tile::new(2, 0), &[Tile::new(2, 1)]);
        assert_eq!(state.segments.len(), 2);
        assert!(state.segments[0].is_closed());
        assert_eq!(state.current_segment, Some(1));
    }

    #[test]
    fn test_closed_segment_is_not_extended() {
        let mut state = TurnState::new();
        MovementLedger::record(&mut state, SegmentKind::Manual, Tile::new(0, 0), &[Tile::new(1, 0)]);
        let closed = MovementLedger::close_segment(&mut state).unwrap();
        assert_eq!(closed.path, vec![Tile::new(1, 0)]);
        assert!(MovementLedger::close_segment(&mut state).is_none());

        MovementLedger::record(&mut state, SegmentKind::Manual, Tile::new(1, 0), &[Tile::new(1, 1)]);
        assert_eq!(state.segments.len(), 2);
        assert_eq!(state.segments[0].path, vec![Tile::new(1, 0)]);
    }
}
