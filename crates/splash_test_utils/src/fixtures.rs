//! Test fixtures and helpers.
//!
//! Pre-built maps and states for consistent testing. Maps are written as
//! rows of characters: `.` empty, `l` low cover, `H` high cover.

use std::sync::Arc;

use splash_core::prelude::*;

/// One unit in a fixture: owner, class and starting cell.
pub type UnitSpec = (Side, ClassPreset, Coord);

/// Parse a row layout into tiles.
///
/// # Panics
///
/// Panics on ragged rows or unknown characters.
#[must_use]
pub fn tiles_from_rows(rows: &[&str]) -> (usize, usize, Vec<Tile>) {
    let height = rows.len();
    let width = rows.first().map_or(0, |row| row.len());
    let mut tiles = Vec::with_capacity(width * height);
    for row in rows {
        assert_eq!(row.len(), width, "ragged fixture row: {row:?}");
        for ch in row.chars() {
            tiles.push(match ch {
                '.' => Tile::Empty,
                'l' => Tile::LowCover,
                'H' => Tile::HighCover,
                other => panic!("unknown fixture tile {other:?}"),
            });
        }
    }
    (width, height, tiles)
}

/// Build a state from a layout and a unit list. External ids are `slot + 1`.
///
/// # Panics
///
/// Panics if the layout or placements are invalid.
#[must_use]
pub fn state_from_rows(rows: &[&str], units: &[UnitSpec]) -> SimState {
    let (width, height, tiles) = tiles_from_rows(rows);
    let roster = units
        .iter()
        .enumerate()
        .map(|(slot, &(side, preset, _))| UnitProfile::from_preset(slot as u32 + 1, side, preset))
        .collect();
    let config = MatchConfig::new(width, height, tiles, roster).expect("valid fixture map");
    let positions: Vec<Coord> = units.iter().map(|&(_, _, pos)| pos).collect();
    SimState::new(Arc::new(config), &positions).expect("valid fixture placement")
}

/// An open `width x height` map with the given units.
#[must_use]
pub fn open_state(width: usize, height: usize, units: &[UnitSpec]) -> SimState {
    let row = ".".repeat(width);
    let rows: Vec<&str> = (0..height).map(|_| row.as_str()).collect();
    state_from_rows(&rows, units)
}

/// Two gunners facing each other across a 12x6 map with some cover.
#[must_use]
pub fn duel() -> SimState {
    state_from_rows(
        &[
            "............",
            "...l....H...",
            "............",
            "............",
            "...H....l...",
            "............",
        ],
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(0, 2)),
            (Side::One, ClassPreset::Gunner, Coord::new(11, 3)),
        ],
    )
}

/// Three-a-side skirmish on a 14x8 map covering every class.
#[must_use]
pub fn skirmish() -> SimState {
    state_from_rows(
        &[
            "..............",
            "..l.......H...",
            "......H.......",
            "...H......l...",
            "...l......H...",
            ".......H......",
            "...H.......l..",
            "..............",
        ],
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(0, 1)),
            (Side::Zero, ClassPreset::Sniper, Coord::new(0, 4)),
            (Side::Zero, ClassPreset::Bomber, Coord::new(1, 6)),
            (Side::One, ClassPreset::Assault, Coord::new(13, 1)),
            (Side::One, ClassPreset::Berserker, Coord::new(13, 4)),
            (Side::One, ClassPreset::Bomber, Coord::new(12, 6)),
        ],
    )
}

/// Overwrite a unit's wetness, keeping everything else.
///
/// # Panics
///
/// Panics if the slot is not a living unit.
pub fn set_wetness(state: &mut SimState, slot: UnitSlot, wetness: u16) {
    let unit = *state.unit(slot).expect("fixture slot exists");
    assert!(unit.alive, "fixture slot {slot} is dead");
    state.sync_unit(
        slot,
        UnitStatus {
            pos: unit.pos,
            cooldown: unit.cooldown,
            bombs: unit.bombs,
            wetness,
        },
    );
}

/// Command where every listed slot gets the same order.
#[must_use]
pub fn command_for(slots: &[UnitSlot], order: Order) -> TurnCommand {
    let mut command = TurnCommand::new();
    for &slot in slots {
        command.set(slot, order);
    }
    command
}

/// Step order towards a cell with no combat action.
#[must_use]
pub fn step(x: i16, y: i16) -> Order {
    Order::new(MoveTarget::StepTo(Coord::new(x, y)), CombatAction::None)
}

/// Stay-and-act order.
#[must_use]
pub fn act(action: CombatAction) -> Order {
    Order::new(MoveTarget::Stay, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_valid() {
        assert_eq!(duel().units().len(), 2);
        let state = skirmish();
        assert_eq!(state.living_count(Side::Zero), 3);
        assert_eq!(state.living_count(Side::One), 3);
        assert_eq!(state.config().tile(Coord::new(2, 1)), Tile::LowCover);
    }

    #[test]
    fn test_set_wetness() {
        let mut state = duel();
        set_wetness(&mut state, 1, 60);
        assert_eq!(state.unit(1).unwrap().wetness, 60);
        assert_eq!(state.unit_at(Coord::new(11, 3)), Some(1));
    }
}
