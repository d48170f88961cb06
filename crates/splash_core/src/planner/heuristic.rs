//! Cheap per-unit order ranking.
//!
//! The beam search cannot afford every unit's full order list, so each
//! unit keeps only its best few orders by this local score. The score
//! looks at one unit in isolation; it is an approximation, and the joint
//! evaluation in [`super::eval`] has the final say.

use crate::combat::{cover_modifier, shot_damage, SPLASH_DAMAGE};
use crate::command::{CombatAction, MoveTarget, Order};
use crate::config::{Coord, Side, UnitSlot};
use crate::orders::{legal_orders, splash_area};
use crate::state::{SimState, DEATH_WETNESS, HANDICAP_WETNESS};

const ADVANCE: f64 = 3.0;
const COVER: f64 = 4.0;
const DAMAGE: f64 = 1.0;
const KILL: f64 = 60.0;
const HANDICAP: f64 = 10.0;
const SPLASH_ENEMY: f64 = 1.2;
const SPLASH_ALLY: f64 = 1.5;
const WASTED_BOMB: f64 = 8.0;
const HUNKER: f64 = 0.8;
const HUNKER_IDLE: f64 = 2.0;
const STACKING: f64 = 2.5;

/// Cell the unit would occupy after the move phase, ignoring conflicts.
fn destination(state: &SimState, from: Coord, movement: MoveTarget) -> Coord {
    match movement {
        MoveTarget::Stay => from,
        MoveTarget::StepTo(target) => state.next_step(from, target).unwrap_or(from),
    }
}

/// Distance past optimal range to the closest living enemy.
fn gap_to_front(state: &SimState, side: Side, from: Coord, optimal: i32) -> i32 {
    state
        .living(side.opponent())
        .map(|enemy| (state.units()[enemy].pos.manhattan(from) - optimal).max(0))
        .min()
        .unwrap_or(0)
}

/// Average protection (0 = exposed, 0.75 = high cover) against every
/// living enemy when standing on `cell`.
fn protection(state: &SimState, side: Side, cell: Coord) -> f64 {
    let mut total = 0.0;
    let mut count = 0u32;
    for enemy in state.living(side.opponent()) {
        let modifier = cover_modifier(state.config(), state.units()[enemy].pos, cell);
        total += 1.0 - modifier.to_num::<f64>();
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        total / f64::from(count)
    }
}

/// Wetness value of soaking a unit that already has `wetness`.
fn soak_value(wetness: u16, damage: u16) -> f64 {
    let after = wetness.saturating_add(damage);
    let mut value = DAMAGE * f64::from(damage.min(DEATH_WETNESS.saturating_sub(wetness)));
    if after >= DEATH_WETNESS {
        value += KILL;
    } else if wetness < HANDICAP_WETNESS && after >= HANDICAP_WETNESS {
        value += HANDICAP;
    }
    value
}

/// Damage an enemy could deal to a unit on `cell` this turn, with and
/// without hunkering.
fn threat(state: &SimState, side: Side, cell: Coord) -> (u16, u16) {
    let mut exposed = 0u16;
    let mut hunkered = 0u16;
    for enemy in state.living(side.opponent()) {
        let unit = state.units()[enemy];
        if unit.cooldown > 0 {
            continue;
        }
        let class = state.class_of(enemy);
        let distance = unit.pos.manhattan(cell);
        let cover = cover_modifier(state.config(), unit.pos, cell);
        exposed = exposed.saturating_add(shot_damage(class, distance, cover, false));
        hunkered = hunkered.saturating_add(shot_damage(class, distance, cover, true));
    }
    (exposed, hunkered)
}

/// Local desirability of `order` for the unit in `slot`. Higher is better.
///
/// Dead or unknown units score zero for everything.
#[must_use]
pub fn score_order(state: &SimState, slot: UnitSlot, order: &Order) -> f64 {
    let Some(unit) = state.unit(slot).copied().filter(|u| u.alive) else {
        return 0.0;
    };
    let side = unit.owner;
    let class = state.class_of(slot);
    let optimal = i32::from(class.optimal_range);
    let dest = destination(state, unit.pos, order.movement);

    let mut score = ADVANCE
        * f64::from(
            gap_to_front(state, side, unit.pos, optimal) - gap_to_front(state, side, dest, optimal),
        );
    score += COVER * protection(state, side, dest);

    let crowding = state
        .living(side)
        .filter(|&ally| ally != slot && state.units()[ally].pos.chebyshev(dest) <= 1)
        .count();
    score -= STACKING * crowding as f64;

    match order.action {
        CombatAction::None => {}
        CombatAction::Hunker => {
            let (exposed, hunkered) = threat(state, side, dest);
            score += HUNKER * f64::from(exposed.saturating_sub(hunkered)) - HUNKER_IDLE;
        }
        CombatAction::Shoot(target) => {
            if let Some(victim) = state.unit(target).filter(|v| v.alive) {
                let cover = cover_modifier(state.config(), dest, victim.pos);
                let damage =
                    shot_damage(class, dest.manhattan(victim.pos), cover, victim.hunkering);
                score += soak_value(victim.wetness, damage);
            }
        }
        CombatAction::Throw(center) => {
            let mut net = 0.0;
            let mut hit_anything = false;
            for cell in splash_area(center) {
                let victim = if cell == dest {
                    Some(slot)
                } else if cell == unit.pos {
                    None
                } else {
                    state.unit_at(cell)
                };
                let Some(victim) = victim else {
                    continue;
                };
                let target = state.units()[victim];
                if target.owner == side {
                    net -= SPLASH_ALLY * soak_value(target.wetness, SPLASH_DAMAGE);
                } else {
                    net += SPLASH_ENEMY * soak_value(target.wetness, SPLASH_DAMAGE);
                    hit_anything = true;
                }
            }
            score += if hit_anything { net } else { net - WASTED_BOMB };
        }
    }
    score
}

/// The `k` best legal orders for `slot`, best first.
///
/// Ties keep the generator's order, so the ranking is deterministic.
/// Leaves `out` empty for dead units.
pub fn top_k_orders(state: &SimState, slot: UnitSlot, k: usize, out: &mut Vec<Order>) {
    legal_orders(state, slot, out);
    if out.is_empty() {
        return;
    }
    let mut scored: Vec<(f64, Order)> = out
        .iter()
        .map(|order| (score_order(state, slot, order), *order))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    out.clear();
    out.extend(scored.into_iter().take(k.max(1)).map(|(_, order)| order));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ClassPreset, MatchConfig, Tile, UnitProfile};

    fn state_with(units: &[(Side, ClassPreset, Coord)], tiles: &[(usize, Tile)]) -> SimState {
        let mut grid = vec![Tile::Empty; 100];
        for &(idx, tile) in tiles {
            grid[idx] = tile;
        }
        let roster = units
            .iter()
            .enumerate()
            .map(|(i, &(side, preset, _))| UnitProfile::from_preset(i as u32 + 1, side, preset))
            .collect();
        let positions: Vec<Coord> = units.iter().map(|&(_, _, pos)| pos).collect();
        let config = MatchConfig::new(10, 10, grid, roster).unwrap();
        SimState::new(Arc::new(config), &positions).unwrap()
    }

    #[test]
    fn test_advancing_beats_retreating() {
        let state = state_with(
            &[
                (Side::Zero, ClassPreset::Sniper, Coord::new(0, 5)),
                (Side::One, ClassPreset::Gunner, Coord::new(9, 5)),
            ],
            &[],
        );
        let forward = Order::new(MoveTarget::StepTo(Coord::new(1, 5)), CombatAction::None);
        let back = Order::new(MoveTarget::StepTo(Coord::new(0, 4)), CombatAction::None);
        assert!(score_order(&state, 0, &forward) > score_order(&state, 0, &back));
    }

    #[test]
    fn test_killing_shot_ranks_first() {
        let mut state = state_with(
            &[
                (Side::Zero, ClassPreset::Sniper, Coord::new(4, 4)),
                (Side::One, ClassPreset::Gunner, Coord::new(5, 4)),
                (Side::One, ClassPreset::Gunner, Coord::new(4, 6)),
            ],
            &[],
        );
        state.units[2].wetness = 90;
        let mut out = Vec::new();
        top_k_orders(&state, 0, 3, &mut out);
        assert_eq!(out.len(), 3);
        assert!(matches!(out[0].action, CombatAction::Shoot(2)));
    }

    #[test]
    fn test_bomb_on_ally_is_penalised() {
        let state = state_with(
            &[
                (Side::Zero, ClassPreset::Bomber, Coord::new(4, 4)),
                (Side::Zero, ClassPreset::Gunner, Coord::new(6, 4)),
                (Side::One, ClassPreset::Gunner, Coord::new(9, 9)),
            ],
            &[],
        );
        let on_ally = Order::new(MoveTarget::Stay, CombatAction::Throw(Coord::new(6, 4)));
        assert!(score_order(&state, 0, &on_ally) < score_order(&state, 0, &Order::stay()));
    }

    #[test]
    fn test_cover_cell_preferred() {
        // High cover at (3, 4) shields (4, 4) from an enemy to the west.
        let state = state_with(
            &[
                (Side::Zero, ClassPreset::Gunner, Coord::new(4, 5)),
                (Side::One, ClassPreset::Gunner, Coord::new(0, 4)),
            ],
            &[(4 * 10 + 3, Tile::HighCover)],
        );
        let behind = Order::new(MoveTarget::StepTo(Coord::new(4, 4)), CombatAction::None);
        let exposed = Order::new(MoveTarget::StepTo(Coord::new(4, 6)), CombatAction::None);
        assert!(score_order(&state, 0, &behind) > score_order(&state, 0, &exposed));
    }

    #[test]
    fn test_top_k_for_dead_unit_is_empty() {
        let mut state = state_with(
            &[
                (Side::Zero, ClassPreset::Gunner, Coord::new(0, 0)),
                (Side::One, ClassPreset::Gunner, Coord::new(9, 9)),
            ],
            &[],
        );
        state.units[0].alive = false;
        let mut out = Vec::new();
        top_k_orders(&state, 0, 4, &mut out);
        assert!(out.is_empty());
    }
}
