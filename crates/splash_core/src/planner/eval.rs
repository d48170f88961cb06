//! Weighted linear evaluation of a whole state from one side's view.

use serde::{Deserialize, Serialize};

use crate::combat::cover_modifier;
use crate::config::Side;
use crate::state::{Outcome, SimState};

/// Feature weights for [`evaluate`].
///
/// Penalties (`deaths`, `front_distance`) are stored as positive numbers and
/// subtracted. Positional terms count for `side` and against its opponent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    /// Per cell of territory margin this turn.
    pub territory: f64,
    /// Per point of cumulative score difference.
    pub score: f64,
    /// Per point of opponent wetness minus own wetness (living units).
    pub wetness: f64,
    /// Per opponent unit knocked out.
    pub kills: f64,
    /// Per own unit knocked out.
    pub deaths: f64,
    /// Per unit's protection from its nearest enemy (0 to 0.75).
    pub cover: f64,
    /// Per cell a unit stands beyond optimal range of its nearest enemy.
    pub front_distance: f64,
    /// Value of a won match (negated for a loss).
    pub terminal: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            territory: 2.0,
            score: 0.5,
            wetness: 1.0,
            kills: 80.0,
            deaths: 100.0,
            cover: 12.0,
            front_distance: 1.5,
            terminal: 100_000.0,
        }
    }
}

/// Score `state` for `side`. Higher is better for `side`.
#[must_use]
pub fn evaluate(state: &SimState, side: Side, weights: &EvalWeights) -> f64 {
    let score_margin = f64::from(state.score(side)) - f64::from(state.score(side.opponent()));

    match state.outcome() {
        Some(Outcome::Winner(winner)) => {
            let sign = if winner == side { 1.0 } else { -1.0 };
            return sign * weights.terminal + weights.score * score_margin;
        }
        Some(Outcome::Draw) => return weights.score * score_margin,
        None => {}
    }

    let mut value = weights.score * score_margin;
    value += weights.territory * f64::from(state.territory().margin(side));

    let mut wetness = 0.0;
    for unit in state.units() {
        if !unit.alive {
            let weight = if unit.owner == side {
                -weights.deaths
            } else {
                weights.kills
            };
            value += weight;
            continue;
        }
        if unit.owner == side {
            wetness -= f64::from(unit.wetness);
        } else {
            wetness += f64::from(unit.wetness);
        }
    }
    value += weights.wetness * wetness;

    for (slot, unit) in state.units().iter().enumerate() {
        if !unit.alive {
            continue;
        }
        let sign = if unit.owner == side { 1.0 } else { -1.0 };
        let nearest = state
            .living(unit.owner.opponent())
            .map(|enemy| state.units()[enemy].pos)
            .min_by_key(|pos| pos.manhattan(unit.pos));
        let Some(enemy) = nearest else {
            continue;
        };
        let protection = 1.0 - cover_modifier(state.config(), enemy, unit.pos).to_num::<f64>();
        let optimal = i32::from(state.class_of(slot).optimal_range);
        let gap = (enemy.manhattan(unit.pos) - optimal).max(0);
        value += sign * (weights.cover * protection - weights.front_distance * f64::from(gap));
    }
    value
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ClassPreset, Coord, MatchConfig, Tile, UnitProfile};

    fn duel() -> SimState {
        let config = MatchConfig::new(
            8,
            1,
            vec![Tile::Empty; 8],
            vec![
                UnitProfile::from_preset(1, Side::Zero, ClassPreset::Gunner),
                UnitProfile::from_preset(2, Side::One, ClassPreset::Gunner),
            ],
        )
        .unwrap();
        SimState::new(Arc::new(config), &[Coord::new(0, 0), Coord::new(7, 0)]).unwrap()
    }

    #[test]
    fn test_symmetric_position_is_zero_sum() {
        let state = duel();
        let weights = EvalWeights::default();
        let a = evaluate(&state, Side::Zero, &weights);
        let b = evaluate(&state, Side::One, &weights);
        assert!((a + b).abs() < 1e-9);
    }

    #[test]
    fn test_wetter_opponent_is_better() {
        let mut state = duel();
        let weights = EvalWeights::default();
        let before = evaluate(&state, Side::Zero, &weights);
        state.units[1].wetness = 30;
        assert!(evaluate(&state, Side::Zero, &weights) > before);
    }

    #[test]
    fn test_terminal_dominates() {
        let mut state = duel();
        state.outcome = Some(Outcome::Winner(Side::One));
        let weights = EvalWeights::default();
        assert!(evaluate(&state, Side::Zero, &weights) <= -weights.terminal);
        assert!(evaluate(&state, Side::One, &weights) >= weights.terminal);
    }

    #[test]
    fn test_weights_from_partial_ron() {
        let weights: EvalWeights = ron::from_str("(kills: 5.0)").unwrap();
        assert!((weights.kills - 5.0).abs() < f64::EPSILON);
        assert!((weights.deaths - EvalWeights::default().deaths).abs() < f64::EPSILON);
    }
}
