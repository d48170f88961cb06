//! Per-turn orders for one side.
//!
//! A [`TurnCommand`] holds at most one [`Order`] per unit slot plus a
//! bitmask of the slots that actually carry an order, so resolution only
//! walks the units that were told to do something. Units are referenced by
//! slot, never by pointer, so the same command can be applied to any fork of
//! the state it was built from.

use serde::{Deserialize, Serialize};

use crate::config::{Coord, UnitSlot, MAX_UNITS};

/// Where a unit should go this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MoveTarget {
    /// Keep position.
    #[default]
    Stay,
    /// Head towards a cell. Targets farther than one step advance one cell
    /// along a shortest path.
    StepTo(Coord),
}

/// What a unit should do after moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombatAction {
    /// Nothing.
    #[default]
    None,
    /// Take 25% less damage this turn.
    Hunker,
    /// Fire at a unit slot.
    Shoot(UnitSlot),
    /// Lob a splash bomb at a cell.
    Throw(Coord),
}

/// A move and a combat action for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Order {
    /// Movement part.
    pub movement: MoveTarget,
    /// Combat part.
    pub action: CombatAction,
}

impl Order {
    /// Build an order.
    #[must_use]
    pub const fn new(movement: MoveTarget, action: CombatAction) -> Self {
        Self { movement, action }
    }

    /// Stay put, no combat.
    #[must_use]
    pub const fn stay() -> Self {
        Self::new(MoveTarget::Stay, CombatAction::None)
    }

    /// Whether the order does nothing at all.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        *self == Self::stay()
    }
}

/// Fixed-size order container for one side's turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TurnCommand {
    orders: [Order; MAX_UNITS],
    active: u16,
}

impl TurnCommand {
    /// A command with no orders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an order to a slot. Slots beyond capacity are ignored.
    pub fn set(&mut self, slot: UnitSlot, order: Order) {
        if slot < MAX_UNITS {
            self.orders[slot] = order;
            self.active |= 1 << slot;
        }
    }

    /// Builder form of [`TurnCommand::set`].
    #[must_use]
    pub fn with(mut self, slot: UnitSlot, order: Order) -> Self {
        self.set(slot, order);
        self
    }

    /// Remove a slot's order.
    pub fn clear(&mut self, slot: UnitSlot) {
        if slot < MAX_UNITS {
            self.orders[slot] = Order::stay();
            self.active &= !(1 << slot);
        }
    }

    /// Order for a slot, if one was set.
    #[must_use]
    pub fn get(&self, slot: UnitSlot) -> Option<&Order> {
        (slot < MAX_UNITS && self.active & (1 << slot) != 0).then(|| &self.orders[slot])
    }

    /// Number of slots with an order.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.count_ones() as usize
    }

    /// Whether no slot has an order.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Raw active-slot mask.
    #[must_use]
    pub const fn active_mask(&self) -> u16 {
        self.active
    }

    /// Iterate `(slot, order)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitSlot, &Order)> + '_ {
        let mut mask = self.active;
        std::iter::from_fn(move || {
            if mask == 0 {
                return None;
            }
            let slot = mask.trailing_zeros() as usize;
            mask &= mask - 1;
            Some((slot, &self.orders[slot]))
        })
    }
}
