//! Mutable per-branch simulation state.
//!
//! A [`SimState`] owns a fixed-capacity unit array, the occupancy bitset and
//! the running match counters. The tile layout and roster live in a shared
//! [`MatchConfig`]; forking a state copies only the mutable part and bumps
//! the config's reference count.
//!
//! # Determinism
//!
//! Units are always processed in slot order and no operation depends on
//! hash-map iteration or wall-clock time, so identical inputs produce
//! bit-identical states (see [`SimState::state_hash`]).

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bitset::CellSet;
use crate::config::{Coord, MatchConfig, Side, UnitClass, UnitSlot, MAX_UNITS};
use crate::error::{GameError, Result};

/// Wetness at which a unit is knocked out.
pub const DEATH_WETNESS: u16 = 100;

/// Wetness at which a unit's territory reach is halved.
pub const HANDICAP_WETNESS: u16 = 50;

/// Last turn of a match.
pub const TURN_LIMIT: u32 = 100;

/// Score lead that ends the match early.
pub const WIN_LEAD: u32 = 600;

/// Live per-unit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Unit {
    /// Owning player.
    pub owner: Side,
    /// Current cell.
    pub pos: Coord,
    /// Turns until the unit may shoot again.
    pub cooldown: u8,
    /// Accumulated damage.
    pub wetness: u16,
    /// Splash bombs left.
    pub bombs: u8,
    /// Hunkering this turn.
    pub hunkering: bool,
    /// Still in play.
    pub alive: bool,
}

impl Unit {
    /// Whether this unit's territory distance is doubled.
    #[must_use]
    pub const fn is_handicapped(&self) -> bool {
        self.wetness >= HANDICAP_WETNESS
    }
}

/// How a finished match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// One side won.
    Winner(Side),
    /// Nobody won.
    Draw,
}

/// Live status reported for one unit by the game server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStatus {
    /// Current cell.
    pub pos: Coord,
    /// Shooting cooldown.
    pub cooldown: u8,
    /// Bombs left.
    pub bombs: u8,
    /// Accumulated damage.
    pub wetness: u16,
}

/// Serializable mutable part of a [`SimState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Units in slot order.
    pub units: Vec<Unit>,
    /// Turn counter.
    pub turn: u32,
    /// Cumulative scores per side.
    pub scores: [u32; 2],
    /// Final result, if the match is over.
    pub outcome: Option<Outcome>,
}

/// The state of one simulation branch.
#[derive(Debug, Clone)]
pub struct SimState {
    config: Arc<MatchConfig>,
    pub(crate) units: [Unit; MAX_UNITS],
    pub(crate) unit_count: usize,
    pub(crate) occupancy: CellSet,
    pub(crate) turn: u32,
    pub(crate) scores: [u32; 2],
    pub(crate) outcome: Option<Outcome>,
}

impl SimState {
    /// Build the starting state with one position per roster slot.
    ///
    /// # Errors
    ///
    /// Fails if the number of positions differs from the roster size, or if
    /// a unit is placed off the map, on cover, or on an occupied cell.
    pub fn new(config: Arc<MatchConfig>, positions: &[Coord]) -> Result<Self> {
        if positions.len() != config.unit_count() {
            return Err(GameError::InvalidRosterSize {
                size: positions.len(),
                max: config.unit_count(),
            });
        }

        let mut state = Self::unplaced(config);
        for (slot, &pos) in positions.iter().enumerate() {
            let external = state.config.roster()[slot].external_id;
            let reject = |reason| GameError::InvalidPlacement {
                unit: external,
                x: i64::from(pos.x),
                y: i64::from(pos.y),
                reason,
            };
            if !state.config.in_bounds(pos) {
                return Err(reject("off the map"));
            }
            if !state.config.is_walkable(pos) {
                return Err(reject("cell has cover"));
            }
            if state.is_occupied(pos) {
                return Err(reject("cell already occupied"));
            }

            let unit = &mut state.units[slot];
            unit.pos = pos;
            unit.alive = true;
            state.occupancy.set(cell_index(pos));
        }
        Ok(state)
    }

    /// State with every roster unit present but not yet on the board.
    ///
    /// Used by protocol readers that learn positions from the first turn.
    #[must_use]
    pub fn unplaced(config: Arc<MatchConfig>) -> Self {
        let mut units = [Unit::default(); MAX_UNITS];
        for (unit, profile) in units.iter_mut().zip(config.roster()) {
            unit.owner = profile.owner;
            unit.bombs = profile.bombs;
        }
        Self {
            unit_count: config.unit_count(),
            config,
            units,
            occupancy: CellSet::EMPTY,
            turn: 0,
            scores: [0; 2],
            outcome: None,
        }
    }

    /// Overwrite this state with another branch, reusing the buffers.
    pub fn fork_from(&mut self, other: &SimState) {
        if !Arc::ptr_eq(&self.config, &other.config) {
            self.config = Arc::clone(&other.config);
        }
        self.units = other.units;
        self.unit_count = other.unit_count;
        self.occupancy = other.occupancy;
        self.turn = other.turn;
        self.scores = other.scores;
        self.outcome = other.outcome;
    }

    /// Shared match configuration.
    #[must_use]
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Handle to the shared configuration.
    #[must_use]
    pub fn config_handle(&self) -> &Arc<MatchConfig> {
        &self.config
    }

    /// All roster units in slot order, dead ones included.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units[..self.unit_count]
    }

    /// Unit in a slot.
    #[must_use]
    pub fn unit(&self, slot: UnitSlot) -> Option<&Unit> {
        self.units().get(slot)
    }

    /// Stats for a slot.
    #[must_use]
    pub fn class_of(&self, slot: UnitSlot) -> UnitClass {
        self.config.class_of(slot)
    }

    /// Slots of one side's living units.
    pub fn living(&self, side: Side) -> impl Iterator<Item = UnitSlot> + '_ {
        self.units()
            .iter()
            .enumerate()
            .filter(move |(_, unit)| unit.alive && unit.owner == side)
            .map(|(slot, _)| slot)
    }

    /// Number of living units on a side.
    #[must_use]
    pub fn living_count(&self, side: Side) -> usize {
        self.living(side).count()
    }

    /// Turns resolved so far.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Cumulative score of a side.
    #[must_use]
    pub const fn score(&self, side: Side) -> u32 {
        self.scores[side.index()]
    }

    /// Match result once finished.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Whether the match has ended.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Occupancy bitset of living units.
    #[must_use]
    pub const fn occupancy(&self) -> &CellSet {
        &self.occupancy
    }

    /// Whether a living unit stands on a cell.
    #[must_use]
    pub fn is_occupied(&self, c: Coord) -> bool {
        self.config.in_bounds(c) && self.occupancy.test(cell_index(c))
    }

    /// Slot of the living unit standing on a cell.
    #[must_use]
    pub fn unit_at(&self, c: Coord) -> Option<UnitSlot> {
        if !self.is_occupied(c) {
            return None;
        }
        self.units()
            .iter()
            .position(|unit| unit.alive && unit.pos == c)
    }

    /// Walkable and not occupied.
    #[must_use]
    pub fn is_free(&self, c: Coord) -> bool {
        self.config.is_walkable(c) && !self.is_occupied(c)
    }

    /// Overwrite one unit with values reported by the server.
    ///
    /// Marks the unit alive and sets its new cell. The old cell is only
    /// cleared when no other living unit already stands there, so syncing
    /// a column of units that each step into the next one's cell keeps
    /// every bit. Out-of-range slots and off-map positions are ignored.
    pub fn sync_unit(&mut self, slot: UnitSlot, status: UnitStatus) {
        if slot >= self.unit_count || !self.config.in_bounds(status.pos) {
            return;
        }
        let old = self.units[slot];
        if old.alive {
            let shared = self.units[..self.unit_count]
                .iter()
                .enumerate()
                .any(|(other, unit)| other != slot && unit.alive && unit.pos == old.pos);
            if !shared {
                self.occupancy.clear(cell_index(old.pos));
            }
        }
        let unit = &mut self.units[slot];
        unit.pos = status.pos;
        unit.cooldown = status.cooldown;
        unit.bombs = status.bombs;
        unit.wetness = status.wetness;
        unit.hunkering = false;
        unit.alive = true;
        self.occupancy.set(cell_index(status.pos));
    }

    /// Kill every unit whose slot bit is not in `seen`, after a turn sync.
    ///
    /// Occupancy is rebuilt from the survivors afterwards.
    pub fn retire_unseen(&mut self, seen: u16) {
        for slot in 0..self.unit_count {
            if seen & (1 << slot) == 0 {
                self.units[slot].alive = false;
            }
        }
        self.rebuild_occupancy();
    }

    /// Recompute the occupancy bitset from living units.
    pub fn rebuild_occupancy(&mut self) {
        self.occupancy = CellSet::EMPTY;
        for unit in self.units[..self.unit_count].iter().filter(|unit| unit.alive) {
            self.occupancy.set(cell_index(unit.pos));
        }
    }

    /// Set counters from an external source (protocol sync).
    pub fn set_progress(&mut self, turn: u32, scores: [u32; 2]) {
        self.turn = turn;
        self.scores = scores;
    }

    /// Deterministic hash of all mutable state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.turn.hash(&mut hasher);
        self.scores.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        self.occupancy.hash(&mut hasher);
        self.units().hash(&mut hasher);
        hasher.finish()
    }

    /// Mutable part of the state as a plain value.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            units: self.units().to_vec(),
            turn: self.turn,
            scores: self.scores,
            outcome: self.outcome,
        }
    }

    /// Rebuild a state from a snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the snapshot's unit count does not match the roster.
    pub fn restore(config: Arc<MatchConfig>, snapshot: &StateSnapshot) -> Result<Self> {
        if snapshot.units.len() != config.unit_count() {
            return Err(GameError::Snapshot(format!(
                "snapshot has {} units, roster has {}",
                snapshot.units.len(),
                config.unit_count()
            )));
        }
        let mut state = Self::unplaced(config);
        state.units[..snapshot.units.len()].copy_from_slice(&snapshot.units);
        for unit in snapshot.units.iter().filter(|unit| unit.alive) {
            if !state.config.in_bounds(unit.pos) {
                return Err(GameError::Snapshot(format!(
                    "unit off the map at ({}, {})",
                    unit.pos.x, unit.pos.y
                )));
            }
            state.occupancy.set(cell_index(unit.pos));
        }
        state.turn = snapshot.turn;
        state.scores = snapshot.scores;
        state.outcome = snapshot.outcome;
        Ok(state)
    }

    /// Serialize the mutable state with bincode.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.snapshot())
            .map_err(|e| GameError::Snapshot(format!("Failed to serialize state: {e}")))
    }

    /// Deserialize a state produced by [`SimState::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid snapshot for `config`.
    pub fn decode(config: Arc<MatchConfig>, data: &[u8]) -> Result<Self> {
        let snapshot: StateSnapshot = bincode::deserialize(data)
            .map_err(|e| GameError::Snapshot(format!("Failed to deserialize state: {e}")))?;
        Self::restore(config, &snapshot)
    }
}

/// Bitset index of an on-map coordinate.
#[inline]
pub(crate) fn cell_index(c: Coord) -> usize {
    CellSet::index(c.x as usize, c.y as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClassPreset, Tile, UnitProfile};

    fn config() -> Arc<MatchConfig> {
        let mut tiles = vec![Tile::Empty; 16];
        tiles[5] = Tile::HighCover;
        Arc::new(
            MatchConfig::new(
                4,
                4,
                tiles,
                vec![
                    UnitProfile::from_preset(10, Side::Zero, ClassPreset::Gunner),
                    UnitProfile::from_preset(20, Side::One, ClassPreset::Bomber),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_new_places_units() {
        let state = SimState::new(config(), &[Coord::new(0, 0), Coord::new(3, 3)]).unwrap();
        assert!(state.is_occupied(Coord::new(0, 0)));
        assert_eq!(state.unit_at(Coord::new(3, 3)), Some(1));
        assert_eq!(state.unit(1).unwrap().bombs, 4);
        assert_eq!(state.occupancy().len(), 2);
        assert_eq!(state.living_count(Side::Zero), 1);
    }

    #[test]
    fn test_new_rejects_bad_placement() {
        let on_cover = SimState::new(config(), &[Coord::new(1, 1), Coord::new(3, 3)]);
        assert!(matches!(
            on_cover,
            Err(GameError::InvalidPlacement { unit: 10, .. })
        ));

        let stacked = SimState::new(config(), &[Coord::new(2, 2), Coord::new(2, 2)]);
        assert!(stacked.is_err());

        let off_map = SimState::new(config(), &[Coord::new(4, 0), Coord::new(3, 3)]);
        assert!(off_map.is_err());
    }

    #[test]
    fn test_fork_is_independent() {
        let base = SimState::new(config(), &[Coord::new(0, 0), Coord::new(3, 3)]).unwrap();
        let mut fork = SimState::unplaced(config());
        fork.fork_from(&base);
        assert_eq!(fork.state_hash(), base.state_hash());

        fork.units[0].wetness = 40;
        assert_ne!(fork.state_hash(), base.state_hash());
        assert_eq!(base.unit(0).unwrap().wetness, 0);
    }

    #[test]
    fn test_sync_and_retire() {
        let mut state = SimState::unplaced(config());
        state.sync_unit(
            1,
            UnitStatus {
                pos: Coord::new(2, 0),
                cooldown: 1,
                bombs: 3,
                wetness: 12,
            },
        );
        assert_eq!(state.unit_at(Coord::new(2, 0)), Some(1));

        state.retire_unseen(0b01);
        assert!(!state.unit(1).unwrap().alive);
        assert!(state.occupancy().is_empty());
    }

    #[test]
    fn test_sync_follow_the_leader_keeps_occupancy() {
        let mut state = SimState::new(config(), &[Coord::new(0, 0), Coord::new(1, 0)]).unwrap();
        let status = |x| UnitStatus {
            pos: Coord::new(x, 0),
            cooldown: 0,
            bombs: 2,
            wetness: 0,
        };
        // Slot 0 steps into the cell slot 1 is leaving.
        state.sync_unit(0, status(1));
        state.sync_unit(1, status(2));

        assert_eq!(state.unit_at(Coord::new(1, 0)), Some(0));
        assert_eq!(state.unit_at(Coord::new(2, 0)), Some(1));
        assert!(!state.is_occupied(Coord::new(0, 0)));
        assert_eq!(state.occupancy().len(), 2);

        // Swapped cells.
        state.sync_unit(0, status(2));
        state.sync_unit(1, status(1));
        assert_eq!(state.unit_at(Coord::new(2, 0)), Some(0));
        assert_eq!(state.unit_at(Coord::new(1, 0)), Some(1));
        assert_eq!(state.occupancy().len(), 2);
    }

    #[test]
    fn test_retire_keeps_survivor_on_shared_stale_cell() {
        let mut state = SimState::new(config(), &[Coord::new(0, 0), Coord::new(1, 0)]).unwrap();
        // Slot 0 moves onto the stale cell of slot 1, which is then retired.
        state.sync_unit(
            0,
            UnitStatus {
                pos: Coord::new(1, 0),
                cooldown: 0,
                bombs: 2,
                wetness: 0,
            },
        );
        state.retire_unseen(0b01);
        assert_eq!(state.unit_at(Coord::new(1, 0)), Some(0));
        assert_eq!(state.occupancy().len(), 1);
    }

    #[test]
    fn test_encode_roundtrip() {
        let mut state = SimState::new(config(), &[Coord::new(0, 0), Coord::new(3, 3)]).unwrap();
        state.units[1].wetness = 55;
        state.turn = 7;

        let bytes = state.encode().unwrap();
        let restored = SimState::decode(config(), &bytes).unwrap();
        assert_eq!(restored.state_hash(), state.state_hash());
    }
}
