//! Shooting and splash-bomb resolution.
//!
//! Damage is computed with fixed-point modifiers:
//!
//! ```text
//! damage = round(power × range_mod × (cover_mod − hunker_bonus))
//! ```
//!
//! - `range_mod` is 1 within optimal range, ½ up to twice that
//! - `cover_mod` is 1, ½ (low cover) or ¼ (high cover)
//! - `hunker_bonus` is ¼ when the target hunkers
//!
//! Every combat action reads the state as it was when the phase started,
//! so shots within one turn are simultaneous.

use crate::command::CombatAction;
use crate::config::{Coord, MatchConfig, Tile, UnitClass, MAX_UNITS};
use crate::math::{percent, round_to_u16, Fixed};
use crate::state::SimState;

/// Flat wetness added by a splash bomb.
pub const SPLASH_DAMAGE: u16 = 30;

/// Farthest cell a bomb can be thrown to (Manhattan).
pub const THROW_RANGE: i32 = 4;

/// Combat counters for one resolved turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatStats {
    /// Shots that dealt damage.
    pub hits: u32,
    /// Bombs thrown.
    pub bombs: u32,
}

/// Protection granted by the tile at `cover` to a unit shot from `shooter`.
fn axis_modifier(config: &MatchConfig, shooter: Coord, cover: Coord) -> Fixed {
    // A shooter standing beside the same cover piece ignores it.
    if shooter.chebyshev(cover) <= 1 {
        return Fixed::ONE;
    }
    match config.tile(cover) {
        Tile::Empty => Fixed::ONE,
        Tile::LowCover => percent(50),
        Tile::HighCover => percent(25),
    }
}

/// Best cover the target has against the shooter: 1, ½ or ¼.
#[must_use]
pub fn cover_modifier(config: &MatchConfig, shooter: Coord, target: Coord) -> Fixed {
    let dx = target.x - shooter.x;
    let dy = target.y - shooter.y;
    let mut modifier = Fixed::ONE;
    if dx.abs() > 1 {
        let cover = Coord::new(target.x - dx.signum(), target.y);
        modifier = modifier.min(axis_modifier(config, shooter, cover));
    }
    if dy.abs() > 1 {
        let cover = Coord::new(target.x, target.y - dy.signum());
        modifier = modifier.min(axis_modifier(config, shooter, cover));
    }
    modifier
}

/// Wetness a shot would deal, 0 when out of range or fully absorbed.
#[must_use]
pub fn shot_damage(class: UnitClass, distance: i32, cover: Fixed, hunkering: bool) -> u16 {
    if distance > class.max_range() {
        return 0;
    }
    let range = if distance <= i32::from(class.optimal_range) {
        Fixed::ONE
    } else {
        percent(50)
    };
    let hunker = if hunkering { percent(25) } else { Fixed::ZERO };
    round_to_u16(Fixed::from_num(class.soaking_power) * range * (cover - hunker))
}

impl SimState {
    /// Damage `shooter` would deal to `target` in the current state,
    /// ignoring cooldown.
    #[must_use]
    pub fn expected_damage(&self, shooter: usize, target: usize) -> u16 {
        let (Some(from), Some(to)) = (self.unit(shooter), self.unit(target)) else {
            return 0;
        };
        let cover = cover_modifier(self.config(), from.pos, to.pos);
        shot_damage(
            self.class_of(shooter),
            from.pos.manhattan(to.pos),
            cover,
            to.hunkering,
        )
    }

    /// Resolve every unit's combat action at once.
    ///
    /// Invalid actions (dead shooter, cooldown, bad target, out of range,
    /// no bombs, off-map cell) do nothing.
    pub(crate) fn resolve_combat(&mut self, actions: &[CombatAction; MAX_UNITS]) -> CombatStats {
        let n = self.unit_count;
        let mut stats = CombatStats::default();
        let mut incoming = [0u16; MAX_UNITS];

        for slot in 0..n {
            let CombatAction::Shoot(target) = actions[slot] else {
                continue;
            };
            let shooter = self.units[slot];
            if !shooter.alive || shooter.cooldown > 0 || target >= n {
                continue;
            }
            let victim = self.units[target];
            if !victim.alive || victim.owner == shooter.owner {
                continue;
            }
            let damage = self.expected_damage(slot, target);
            if damage > 0 {
                incoming[target] = incoming[target].saturating_add(damage);
                self.units[slot].cooldown = self.class_of(slot).shoot_cooldown.saturating_add(1);
                stats.hits += 1;
            }
        }

        for slot in 0..n {
            let CombatAction::Throw(cell) = actions[slot] else {
                continue;
            };
            let thrower = self.units[slot];
            if !thrower.alive
                || thrower.bombs == 0
                || !self.config().in_bounds(cell)
                || thrower.pos.manhattan(cell) > THROW_RANGE
            {
                continue;
            }
            self.units[slot].bombs -= 1;
            stats.bombs += 1;
            for victim in 0..n {
                let unit = &self.units[victim];
                if unit.alive && unit.pos.chebyshev(cell) <= 1 {
                    incoming[victim] = incoming[victim].saturating_add(SPLASH_DAMAGE);
                }
            }
        }

        for slot in 0..n {
            let unit = &mut self.units[slot];
            unit.wetness = unit.wetness.saturating_add(incoming[slot]);
        }
        stats
    }
}
