//! Immutable per-match configuration: tile layout and unit roster.
//!
//! A [`MatchConfig`] is built and validated once, then shared by every
//! [`SimState`](crate::state::SimState) branch through an `Arc`. Nothing in
//! here is mutated after construction.

use serde::{Deserialize, Serialize};

use crate::bitset::{MAX_HEIGHT, MAX_WIDTH};
use crate::error::{GameError, Result};

/// Maximum number of units in a match (both sides together).
pub const MAX_UNITS: usize = 16;

/// Index of a unit in the roster and in every state's unit array.
pub type UnitSlot = usize;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    /// Player 0.
    #[default]
    Zero,
    /// Player 1.
    One,
}

impl Side {
    /// Both sides in index order.
    pub const ALL: [Side; 2] = [Side::Zero, Side::One];

    /// The other player.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Side::Zero => Side::One,
            Side::One => Side::Zero,
        }
    }

    /// 0 or 1.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::Zero => 0,
            Side::One => 1,
        }
    }

    /// Side from a protocol player id.
    #[must_use]
    pub const fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Side::Zero),
            1 => Some(Side::One),
            _ => None,
        }
    }
}

/// Grid coordinate. Signed so that off-map targets are representable and
/// can be rejected instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coord {
    /// Column.
    pub x: i16,
    /// Row.
    pub y: i16,
}

impl Coord {
    /// Orthogonal step offsets in a fixed order (up, right, down, left).
    pub const DIRECTIONS: [(i16, i16); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

    /// Create a coordinate.
    #[must_use]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Taxicab distance.
    #[must_use]
    pub fn manhattan(self, other: Coord) -> i32 {
        i32::from((self.x - other.x).abs()) + i32::from((self.y - other.y).abs())
    }

    /// King-move distance.
    #[must_use]
    pub fn chebyshev(self, other: Coord) -> i32 {
        i32::from((self.x - other.x).abs()).max(i32::from((self.y - other.y).abs()))
    }

    /// Coordinate shifted by an offset.
    #[must_use]
    pub const fn offset(self, dx: i16, dy: i16) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The four orthogonal neighbours in [`Coord::DIRECTIONS`] order.
    pub fn neighbors(self) -> impl Iterator<Item = Coord> {
        Self::DIRECTIONS
            .into_iter()
            .map(move |(dx, dy)| self.offset(dx, dy))
    }
}

/// Static tile type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tile {
    /// Walkable, no protection.
    #[default]
    Empty,
    /// Blocks movement, halves damage behind it.
    LowCover,
    /// Blocks movement, quarters damage behind it.
    HighCover,
}

impl Tile {
    /// Decode a protocol tile code (0, 1, 2).
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Tile::Empty),
            1 => Ok(Tile::LowCover),
            2 => Ok(Tile::HighCover),
            other => Err(GameError::UnknownTileCode(other)),
        }
    }

    /// Whether units may stand here.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        matches!(self, Tile::Empty)
    }
}

/// Per-class combat stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitClass {
    /// Turns to wait between shots.
    pub shoot_cooldown: u8,
    /// Full-damage range; shots reach twice as far at half damage.
    pub optimal_range: u8,
    /// Base damage per shot.
    pub soaking_power: u16,
}

impl UnitClass {
    /// Balanced rifle.
    pub const GUNNER: Self = Self::new(1, 4, 16);
    /// Long range, slow.
    pub const SNIPER: Self = Self::new(5, 6, 24);
    /// Weak gun, many bombs.
    pub const BOMBER: Self = Self::new(2, 2, 8);
    /// All-rounder.
    pub const ASSAULT: Self = Self::new(2, 4, 16);
    /// Short range, heavy hitter.
    pub const BERSERKER: Self = Self::new(5, 2, 32);

    /// Create a class.
    #[must_use]
    pub const fn new(shoot_cooldown: u8, optimal_range: u8, soaking_power: u16) -> Self {
        Self {
            shoot_cooldown,
            optimal_range,
            soaking_power,
        }
    }

    /// Farthest reachable target (Manhattan).
    #[must_use]
    pub const fn max_range(self) -> i32 {
        2 * self.optimal_range as i32
    }
}

/// Named class presets with their starting bomb counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassPreset {
    /// See [`UnitClass::GUNNER`].
    Gunner,
    /// See [`UnitClass::SNIPER`].
    Sniper,
    /// See [`UnitClass::BOMBER`].
    Bomber,
    /// See [`UnitClass::ASSAULT`].
    Assault,
    /// See [`UnitClass::BERSERKER`].
    Berserker,
}

impl ClassPreset {
    /// Stats for this preset.
    #[must_use]
    pub const fn class(self) -> UnitClass {
        match self {
            ClassPreset::Gunner => UnitClass::GUNNER,
            ClassPreset::Sniper => UnitClass::SNIPER,
            ClassPreset::Bomber => UnitClass::BOMBER,
            ClassPreset::Assault => UnitClass::ASSAULT,
            ClassPreset::Berserker => UnitClass::BERSERKER,
        }
    }

    /// Bombs carried at match start.
    #[must_use]
    pub const fn starting_bombs(self) -> u8 {
        match self {
            ClassPreset::Gunner => 1,
            ClassPreset::Sniper => 0,
            ClassPreset::Bomber => 4,
            ClassPreset::Assault => 2,
            ClassPreset::Berserker => 1,
        }
    }
}

/// Fixed roster entry decided at match setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitProfile {
    /// Id used on the wire.
    pub external_id: u32,
    /// Owning player.
    pub owner: Side,
    /// Combat stats.
    pub class: UnitClass,
    /// Starting bomb count.
    pub bombs: u8,
}

impl UnitProfile {
    /// Profile from a preset.
    #[must_use]
    pub const fn from_preset(external_id: u32, owner: Side, preset: ClassPreset) -> Self {
        Self {
            external_id,
            owner,
            class: preset.class(),
            bombs: preset.starting_bombs(),
        }
    }
}

/// Immutable match setup shared by all simulation branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    width: usize,
    height: usize,
    /// Row-major, `width * height` entries.
    tiles: Vec<Tile>,
    roster: Vec<UnitProfile>,
}

impl MatchConfig {
    /// Validate and build a configuration.
    ///
    /// # Errors
    ///
    /// Fails on unsupported dimensions, a tile array of the wrong length, an
    /// empty or oversized roster, or duplicated unit ids.
    pub fn new(
        width: usize,
        height: usize,
        tiles: Vec<Tile>,
        roster: Vec<UnitProfile>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || width > MAX_WIDTH || height > MAX_HEIGHT {
            return Err(GameError::InvalidDimensions {
                width,
                height,
                max_width: MAX_WIDTH,
                max_height: MAX_HEIGHT,
            });
        }
        if tiles.len() != width * height {
            return Err(GameError::TileCountMismatch {
                expected: width * height,
                actual: tiles.len(),
            });
        }
        if roster.is_empty() || roster.len() > MAX_UNITS {
            return Err(GameError::InvalidRosterSize {
                size: roster.len(),
                max: MAX_UNITS,
            });
        }
        for (i, profile) in roster.iter().enumerate() {
            if roster[..i]
                .iter()
                .any(|other| other.external_id == profile.external_id)
            {
                return Err(GameError::DuplicateUnitId(profile.external_id));
            }
        }

        Ok(Self {
            width,
            height,
            tiles,
            roster,
        })
    }

    /// Map width.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Map height.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Whether a coordinate lies on the map.
    #[must_use]
    pub fn in_bounds(&self, c: Coord) -> bool {
        c.x >= 0 && c.y >= 0 && (c.x as usize) < self.width && (c.y as usize) < self.height
    }

    /// Tile at a coordinate; off-map reads as [`Tile::Empty`].
    #[must_use]
    pub fn tile(&self, c: Coord) -> Tile {
        if self.in_bounds(c) {
            self.tiles[c.y as usize * self.width + c.x as usize]
        } else {
            Tile::Empty
        }
    }

    /// On the map and free of cover.
    #[must_use]
    pub fn is_walkable(&self, c: Coord) -> bool {
        self.in_bounds(c) && self.tile(c).is_walkable()
    }

    /// Iterate every walkable cell in row-major order.
    pub fn open_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width).filter_map(move |x| {
                let c = Coord::new(x as i16, y as i16);
                self.tile(c).is_walkable().then_some(c)
            })
        })
    }

    /// Number of roster entries.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.roster.len()
    }

    /// Roster entries in slot order.
    #[must_use]
    pub fn roster(&self) -> &[UnitProfile] {
        &self.roster
    }

    /// Roster entry for a slot.
    #[must_use]
    pub fn profile(&self, slot: UnitSlot) -> Option<&UnitProfile> {
        self.roster.get(slot)
    }

    /// Combat stats for a slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is outside the roster.
    #[must_use]
    pub fn class_of(&self, slot: UnitSlot) -> UnitClass {
        self.roster[slot].class
    }

    /// Slot holding an external id.
    #[must_use]
    pub fn slot_of(&self, external_id: u32) -> Option<UnitSlot> {
        self.roster
            .iter()
            .position(|profile| profile.external_id == external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<UnitProfile> {
        vec![
            UnitProfile::from_preset(1, Side::Zero, ClassPreset::Gunner),
            UnitProfile::from_preset(2, Side::One, ClassPreset::Sniper),
        ]
    }

    #[test]
    fn test_tile_codes() {
        assert_eq!(Tile::from_code(0).unwrap(), Tile::Empty);
        assert_eq!(Tile::from_code(2).unwrap(), Tile::HighCover);
        assert!(matches!(
            Tile::from_code(7),
            Err(GameError::UnknownTileCode(7))
        ));
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        let err = MatchConfig::new(MAX_WIDTH + 1, 1, vec![], roster()).unwrap_err();
        assert!(matches!(err, GameError::InvalidDimensions { .. }));

        let err = MatchConfig::new(3, 3, vec![Tile::Empty; 8], roster()).unwrap_err();
        assert!(matches!(
            err,
            GameError::TileCountMismatch {
                expected: 9,
                actual: 8
            }
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut units = roster();
        units[1].external_id = 1;
        let err = MatchConfig::new(2, 2, vec![Tile::Empty; 4], units).unwrap_err();
        assert!(matches!(err, GameError::DuplicateUnitId(1)));
    }

    #[test]
    fn test_lookup() {
        let mut tiles = vec![Tile::Empty; 6];
        tiles[4] = Tile::LowCover;
        let config = MatchConfig::new(3, 2, tiles, roster()).unwrap();

        assert_eq!(config.tile(Coord::new(1, 1)), Tile::LowCover);
        assert!(!config.is_walkable(Coord::new(1, 1)));
        assert!(!config.is_walkable(Coord::new(-1, 0)));
        assert_eq!(config.open_cells().count(), 5);
        assert_eq!(config.slot_of(2), Some(1));
        assert_eq!(config.class_of(1), UnitClass::SNIPER);
    }

    #[test]
    fn test_distances() {
        let a = Coord::new(1, 1);
        let b = Coord::new(4, 3);
        assert_eq!(a.manhattan(b), 5);
        assert_eq!(a.chebyshev(b), 3);
        assert_eq!(a.neighbors().count(), 4);
    }
}
