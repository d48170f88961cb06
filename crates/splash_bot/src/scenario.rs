//! Scenario loading and configuration.
//!
//! Scenarios define a starting map and roster for local self-play. Maps are
//! written as rows of characters: `.` empty, `l` low cover, `H` high cover.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use splash_core::prelude::{
    ClassPreset, Coord, GameError, MatchConfig, Side, SimState, Tile, UnitProfile,
};
use splash_core::state::TURN_LIMIT;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Map rows are ragged or use an unknown character.
    #[error("Invalid map layout: {0}")]
    Layout(String),
    /// The map or placements were rejected by the simulation.
    #[error("Invalid scenario setup: {0}")]
    Setup(#[from] GameError),
}

/// One unit placed at match start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Owning player.
    pub side: Side,
    /// Class preset.
    pub preset: ClassPreset,
    /// Column.
    pub x: i16,
    /// Row.
    pub y: i16,
}

impl UnitPlacement {
    /// Create a placement.
    #[must_use]
    pub const fn new(side: Side, preset: ClassPreset, x: i16, y: i16) -> Self {
        Self { side, preset, x, y }
    }
}

fn default_max_turns() -> u32 {
    TURN_LIMIT
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Map rows, top to bottom.
    pub rows: Vec<String>,
    /// Units in roster order. External ids are assigned from 1.
    pub units: Vec<UnitPlacement>,
    /// Turns the referee plays before giving up.
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::default_duel()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Two teams of three on a 16x8 map with a cover line on each flank.
    #[must_use]
    pub fn default_duel() -> Self {
        let rows = [
            "................",
            "..l..........l..",
            "..l...H..H...l..",
            "................",
            "................",
            "..l...H..H...l..",
            "..l..........l..",
            "................",
        ];
        Self {
            name: "Default Duel".to_string(),
            rows: rows.iter().map(|row| (*row).to_string()).collect(),
            units: vec![
                UnitPlacement::new(Side::Zero, ClassPreset::Gunner, 0, 2),
                UnitPlacement::new(Side::Zero, ClassPreset::Sniper, 0, 4),
                UnitPlacement::new(Side::Zero, ClassPreset::Bomber, 1, 6),
                UnitPlacement::new(Side::One, ClassPreset::Gunner, 15, 5),
                UnitPlacement::new(Side::One, ClassPreset::Sniper, 15, 3),
                UnitPlacement::new(Side::One, ClassPreset::Bomber, 14, 1),
            ],
            max_turns: TURN_LIMIT,
        }
    }

    /// Parse the map rows into dimensions and tiles.
    pub fn tiles(&self) -> Result<(usize, usize, Vec<Tile>), ScenarioError> {
        let height = self.rows.len();
        let width = self.rows.first().map_or(0, |row| row.chars().count());
        let mut tiles = Vec::with_capacity(width * height);
        for (y, row) in self.rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(ScenarioError::Layout(format!(
                    "row {y} has {} cells, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, ch) in row.chars().enumerate() {
                tiles.push(match ch {
                    '.' => Tile::Empty,
                    'l' => Tile::LowCover,
                    'H' => Tile::HighCover,
                    other => {
                        return Err(ScenarioError::Layout(format!(
                            "unknown tile {other:?} at ({x}, {y})"
                        )))
                    }
                });
            }
        }
        Ok((width, height, tiles))
    }

    /// Validate the scenario and build its starting state.
    pub fn build_state(&self) -> Result<SimState, ScenarioError> {
        let (width, height, tiles) = self.tiles()?;
        let roster = self
            .units
            .iter()
            .enumerate()
            .map(|(slot, unit)| UnitProfile::from_preset(slot as u32 + 1, unit.side, unit.preset))
            .collect();
        let config = MatchConfig::new(width, height, tiles, roster)?;
        let positions: Vec<Coord> = self.units.iter().map(|unit| Coord::new(unit.x, unit.y)).collect();
        let state = SimState::new(Arc::new(config), &positions)?;

        tracing::debug!(
            scenario = %self.name,
            width,
            height,
            units = self.units.len(),
            "Scenario state built"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_duel_builds() {
        let scenario = Scenario::default();
        let state = scenario.build_state().unwrap();
        assert_eq!(state.config().width(), 16);
        assert_eq!(state.config().height(), 8);
        assert_eq!(state.living_count(Side::Zero), 3);
        assert_eq!(state.living_count(Side::One), 3);
        assert_eq!(state.config().tile(Coord::new(6, 2)), Tile::HighCover);
    }

    #[test]
    fn test_ron_roundtrip() {
        let scenario = Scenario::default_duel();
        let text = ron::to_string(&scenario).unwrap();
        let loaded = Scenario::from_ron_str(&text).unwrap();
        assert_eq!(loaded.rows, scenario.rows);
        assert_eq!(loaded.units, scenario.units);
        assert_eq!(loaded.max_turns, TURN_LIMIT);
    }

    #[test]
    fn test_max_turns_defaults() {
        let ron = r#"(
            name: "tiny",
            rows: ["...", "..."],
            units: [
                (side: Zero, preset: Gunner, x: 0, y: 0),
                (side: One, preset: Gunner, x: 2, y: 1),
            ],
        )"#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.max_turns, TURN_LIMIT);
        assert!(scenario.build_state().is_ok());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let mut scenario = Scenario::default_duel();
        scenario.rows[3].push('.');
        assert!(matches!(scenario.build_state(), Err(ScenarioError::Layout(_))));
    }

    #[test]
    fn test_unit_on_cover_rejected() {
        let mut scenario = Scenario::default_duel();
        scenario.units[0] = UnitPlacement::new(Side::Zero, ClassPreset::Gunner, 2, 1);
        assert!(matches!(
            scenario.build_state(),
            Err(ScenarioError::Setup(GameError::InvalidPlacement { .. }))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/nonexistent/duel.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
