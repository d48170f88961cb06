//! Move phase: one-cell steps, BFS fallback and simultaneous conflict
//! resolution.
//!
//! A unit ordered to a cell farther than one step away advances a single
//! cell along a shortest path, so external planners may think in multi-cell
//! waypoints while the engine still moves everyone at most one cell a turn.

use crate::bitset::{CellSet, MAX_CELLS};
use crate::config::{Coord, UnitSlot, MAX_UNITS};
use crate::state::{cell_index, SimState};

const UNVISITED: u16 = u16::MAX;

/// Movement counters for one resolved turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveStats {
    /// Units that changed cell.
    pub moved: u32,
    /// Units whose step was cancelled by a conflict.
    pub cancelled: u32,
}

impl SimState {
    /// The single cell a unit standing on `from` would step into when
    /// ordered towards `to`, or `None` if it cannot move.
    ///
    /// Adjacent targets are taken directly when free of cover. Farther
    /// targets use a breadth-first search that first routes around living
    /// units and, if that fails, ignores them.
    #[must_use]
    pub fn next_step(&self, from: Coord, to: Coord) -> Option<Coord> {
        let config = self.config();
        if from == to || !config.in_bounds(to) || !config.in_bounds(from) {
            return None;
        }
        if from.manhattan(to) == 1 {
            return config.is_walkable(to).then_some(to);
        }
        self.bfs_first_step(from, to, true)
            .or_else(|| self.bfs_first_step(from, to, false))
    }

    /// Reverse BFS from `to`; returns the neighbour of `from` closest to it.
    fn bfs_first_step(&self, from: Coord, to: Coord, avoid_units: bool) -> Option<Coord> {
        let config = self.config();
        if !config.is_walkable(to) {
            return None;
        }

        let passable = |c: Coord| {
            config.is_walkable(c) && (!avoid_units || c == from || c == to || !self.is_occupied(c))
        };

        let mut dist = [UNVISITED; MAX_CELLS];
        let mut queue = [0u16; MAX_CELLS];
        let (mut head, mut tail) = (0, 0);

        dist[cell_index(to)] = 0;
        queue[tail] = cell_index(to) as u16;
        tail += 1;

        let from_idx = cell_index(from);
        while head < tail && dist[from_idx] == UNVISITED {
            let idx = queue[head] as usize;
            head += 1;
            let (x, y) = CellSet::coords(idx);
            let here = Coord::new(x as i16, y as i16);
            for next in here.neighbors() {
                if !passable(next) {
                    continue;
                }
                let next_idx = cell_index(next);
                if dist[next_idx] == UNVISITED {
                    dist[next_idx] = dist[idx] + 1;
                    queue[tail] = next_idx as u16;
                    tail += 1;
                }
            }
        }

        let remaining = dist[from_idx];
        if remaining == UNVISITED {
            return None;
        }
        from.neighbors()
            .find(|&n| config.in_bounds(n) && dist[cell_index(n)] == remaining - 1)
    }

    /// Apply the candidate steps of every unit at once.
    ///
    /// `steps[slot]` is the cell a unit wants to enter. All units aiming at
    /// the same cell cancel; exact swaps cancel; a unit aiming at a cell
    /// whose occupant stays put cancels, and that cancellation propagates
    /// along chains. The result does not depend on slot order.
    pub(crate) fn resolve_moves(&mut self, steps: &[Option<Coord>; MAX_UNITS]) -> MoveStats {
        let n = self.unit_count;
        let mut dest = *steps;
        let mut stats = MoveStats::default();

        let mut cancel = [false; MAX_UNITS];
        for a in 0..n {
            let Some(target) = steps[a] else { continue };
            for b in (a + 1)..n {
                if steps[b] == Some(target) {
                    cancel[a] = true;
                    cancel[b] = true;
                }
                if target == self.units[b].pos && steps[b] == Some(self.units[a].pos) {
                    cancel[a] = true;
                    cancel[b] = true;
                }
            }
        }
        for slot in 0..n {
            if cancel[slot] {
                dest[slot] = None;
                stats.cancelled += 1;
            }
        }

        loop {
            let mut changed = false;
            for slot in 0..n {
                let Some(target) = dest[slot] else { continue };
                let blocked = self
                    .occupant(target)
                    .is_some_and(|other| other != slot && dest[other].is_none());
                if blocked {
                    dest[slot] = None;
                    stats.cancelled += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        for slot in 0..n {
            if dest[slot].is_some() {
                self.occupancy.clear(cell_index(self.units[slot].pos));
            }
        }
        for slot in 0..n {
            if let Some(target) = dest[slot] {
                self.units[slot].pos = target;
                self.occupancy.set(cell_index(target));
                stats.moved += 1;
            }
        }
        stats
    }

    fn occupant(&self, c: Coord) -> Option<UnitSlot> {
        self.unit_at(c)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ClassPreset, MatchConfig, Side, Tile, UnitProfile};

    fn open_state(width: usize, height: usize, positions: &[Coord]) -> SimState {
        let roster = positions
            .iter()
            .enumerate()
            .map(|(i, _)| {
                let side = if i % 2 == 0 { Side::Zero } else { Side::One };
                UnitProfile::from_preset(i as u32 + 1, side, ClassPreset::Gunner)
            })
            .collect();
        let config =
            MatchConfig::new(width, height, vec![Tile::Empty; width * height], roster).unwrap();
        SimState::new(Arc::new(config), positions).unwrap()
    }

    fn steps(pairs: &[(UnitSlot, Coord)]) -> [Option<Coord>; MAX_UNITS] {
        let mut out = [None; MAX_UNITS];
        for &(slot, c) in pairs {
            out[slot] = Some(c);
        }
        out
    }

    #[test]
    fn test_adjacent_step() {
        let state = open_state(5, 5, &[Coord::new(2, 2)]);
        assert_eq!(
            state.next_step(Coord::new(2, 2), Coord::new(2, 3)),
            Some(Coord::new(2, 3))
        );
        assert_eq!(state.next_step(Coord::new(2, 2), Coord::new(2, 2)), None);
    }

    #[test]
    fn test_bfs_routes_around_cover() {
        let mut tiles = vec![Tile::Empty; 25];
        // Wall in column 2 except the bottom row.
        for y in 0..4 {
            tiles[y * 5 + 2] = Tile::HighCover;
        }
        let roster = vec![UnitProfile::from_preset(1, Side::Zero, ClassPreset::Gunner)];
        let config = Arc::new(MatchConfig::new(5, 5, tiles, roster).unwrap());
        let state = SimState::new(config, &[Coord::new(1, 0)]).unwrap();

        let step = state.next_step(Coord::new(1, 0), Coord::new(3, 0));
        assert_eq!(step, Some(Coord::new(1, 1)));
    }

    #[test]
    fn test_unreachable_target_stays() {
        let mut tiles = vec![Tile::Empty; 9];
        tiles[4] = Tile::LowCover;
        let roster = vec![UnitProfile::from_preset(1, Side::Zero, ClassPreset::Gunner)];
        let config = Arc::new(MatchConfig::new(3, 3, tiles, roster).unwrap());
        let state = SimState::new(config, &[Coord::new(0, 0)]).unwrap();

        assert_eq!(state.next_step(Coord::new(0, 0), Coord::new(1, 1)), None);
        assert_eq!(state.next_step(Coord::new(0, 0), Coord::new(9, 9)), None);
    }

    #[test]
    fn test_same_destination_cancels_all() {
        let mut state = open_state(5, 5, &[Coord::new(1, 2), Coord::new(3, 2)]);
        let stats = state.resolve_moves(&steps(&[(0, Coord::new(2, 2)), (1, Coord::new(2, 2))]));
        assert_eq!(stats.moved, 0);
        assert_eq!(state.units()[0].pos, Coord::new(1, 2));
        assert_eq!(state.units()[1].pos, Coord::new(3, 2));
    }

    #[test]
    fn test_swap_cancels_both() {
        let mut state = open_state(5, 5, &[Coord::new(1, 1), Coord::new(2, 1)]);
        state.resolve_moves(&steps(&[(0, Coord::new(2, 1)), (1, Coord::new(1, 1))]));
        assert_eq!(state.units()[0].pos, Coord::new(1, 1));
        assert_eq!(state.units()[1].pos, Coord::new(2, 1));
    }

    #[test]
    fn test_follow_the_leader() {
        let mut state = open_state(5, 1, &[Coord::new(0, 0), Coord::new(1, 0)]);
        let stats = state.resolve_moves(&steps(&[(0, Coord::new(1, 0)), (1, Coord::new(2, 0))]));
        assert_eq!(stats.moved, 2);
        assert_eq!(state.units()[0].pos, Coord::new(1, 0));
        assert!(state.is_occupied(Coord::new(2, 0)));
        assert!(!state.is_occupied(Coord::new(0, 0)));
    }

    #[test]
    fn test_blocked_chain_cascades() {
        // 0 -> 1's cell, 1 -> 2's cell, 2 stays.
        let mut state = open_state(
            4,
            1,
            &[Coord::new(0, 0), Coord::new(1, 0), Coord::new(2, 0)],
        );
        let stats = state.resolve_moves(&steps(&[(0, Coord::new(1, 0)), (1, Coord::new(2, 0))]));
        assert_eq!(stats.moved, 0);
        assert_eq!(stats.cancelled, 2);
    }
}
