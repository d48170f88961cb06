//! Legal order enumeration for a single unit.

use crate::combat::THROW_RANGE;
use crate::command::{CombatAction, MoveTarget, Order};
use crate::config::{Coord, UnitSlot};
use crate::state::SimState;

/// Upper bound on orders generated for one unit.
pub const MAX_ORDERS: usize = 512;

/// Fill `out` with every (move × combat) order available to `slot`.
///
/// Moves are staying put or stepping into one of the four free orthogonal
/// neighbours. Combat options are nothing, hunkering, shooting any living
/// opponent within twice the optimal range (only when off cooldown) and
/// throwing a bomb at any cell within Manhattan distance 4 (only with
/// bombs left); ranges are measured from the unit's current cell. The
/// cross product is truncated to [`MAX_ORDERS`]. Dead or unknown units
/// produce nothing.
pub fn legal_orders(state: &SimState, slot: UnitSlot, out: &mut Vec<Order>) {
    out.clear();
    let Some(unit) = state.unit(slot).copied() else {
        return;
    };
    if !unit.alive {
        return;
    }

    let mut moves = [MoveTarget::Stay; 5];
    let mut move_count = 1;
    for next in unit.pos.neighbors() {
        if state.is_free(next) {
            moves[move_count] = MoveTarget::StepTo(next);
            move_count += 1;
        }
    }

    let mut actions = vec![CombatAction::None, CombatAction::Hunker];
    if unit.cooldown == 0 {
        let reach = state.class_of(slot).max_range();
        for target in state.living(unit.owner.opponent()) {
            if unit.pos.manhattan(state.units()[target].pos) <= reach {
                actions.push(CombatAction::Shoot(target));
            }
        }
    }
    if unit.bombs > 0 {
        let config = state.config();
        for dy in -THROW_RANGE..=THROW_RANGE {
            let span = THROW_RANGE - dy.abs();
            for dx in -span..=span {
                let cell = unit.pos.offset(dx as i16, dy as i16);
                if config.in_bounds(cell) {
                    actions.push(CombatAction::Throw(cell));
                }
            }
        }
    }

    'outer: for &movement in &moves[..move_count] {
        for &action in &actions {
            if out.len() == MAX_ORDERS {
                break 'outer;
            }
            out.push(Order::new(movement, action));
        }
    }
}

/// Cells a bomb thrown at `center` would soak.
pub fn splash_area(center: Coord) -> impl Iterator<Item = Coord> {
    (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| center.offset(dx, dy)))
}
