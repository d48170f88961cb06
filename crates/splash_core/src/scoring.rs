//! Territory control.
//!
//! Every cover-free cell goes to the side whose nearest living unit is
//! strictly closer. Units at [`HANDICAP_WETNESS`](crate::state::HANDICAP_WETNESS)
//! or more count their distance twice.

use crate::config::{Coord, Side};
use crate::state::SimState;

/// Cells controlled by each side, indexed by [`Side::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Territory {
    /// Cell counts per side.
    pub cells: [u32; 2],
}

impl Territory {
    /// Cells held by one side.
    #[must_use]
    pub const fn of(&self, side: Side) -> u32 {
        self.cells[side.index()]
    }

    /// `side`'s cells minus the opponent's.
    #[must_use]
    pub fn margin(&self, side: Side) -> i32 {
        self.of(side) as i32 - self.of(side.opponent()) as i32
    }
}

impl SimState {
    /// Handicapped distance from a side's nearest living unit to `cell`.
    fn reach(&self, side: Side, cell: Coord) -> i32 {
        self.units()
            .iter()
            .filter(|unit| unit.alive && unit.owner == side)
            .map(|unit| {
                let d = unit.pos.manhattan(cell);
                if unit.is_handicapped() {
                    d * 2
                } else {
                    d
                }
            })
            .min()
            .unwrap_or(i32::MAX)
    }

    /// Current territory split.
    #[must_use]
    pub fn territory(&self) -> Territory {
        let mut territory = Territory::default();
        for cell in self.config().open_cells() {
            let mine = self.reach(Side::Zero, cell);
            let theirs = self.reach(Side::One, cell);
            if mine < theirs {
                territory.cells[0] += 1;
            } else if theirs < mine {
                territory.cells[1] += 1;
            }
        }
        territory
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ClassPreset, MatchConfig, Tile, UnitProfile};

    fn duel(a: Coord, b: Coord) -> SimState {
        let config = MatchConfig::new(
            5,
            1,
            vec![Tile::Empty; 5],
            vec![
                UnitProfile::from_preset(1, Side::Zero, ClassPreset::Gunner),
                UnitProfile::from_preset(2, Side::One, ClassPreset::Gunner),
            ],
        )
        .unwrap();
        SimState::new(Arc::new(config), &[a, b]).unwrap()
    }

    #[test]
    fn test_split_with_tie() {
        let state = duel(Coord::new(0, 0), Coord::new(4, 0));
        let territory = state.territory();
        // Middle cell is equidistant.
        assert_eq!(territory.cells, [2, 2]);
        assert_eq!(territory.margin(Side::Zero), 0);
    }

    #[test]
    fn test_wet_units_reach_half_as_far() {
        let mut state = duel(Coord::new(0, 0), Coord::new(4, 0));
        state.units[1].wetness = 50;
        let territory = state.territory();
        // The former tie at x = 2 flips to side zero (2 vs 4).
        assert_eq!(territory.cells, [3, 2]);
    }

    #[test]
    fn test_wiped_side_holds_nothing() {
        let mut state = duel(Coord::new(0, 0), Coord::new(4, 0));
        state.units[1].alive = false;
        assert_eq!(state.territory().cells, [5, 0]);
    }
}
