//! Lazy enumeration of joint commands.
//!
//! With `n` units and `k` candidates each there are `k^n` joint commands.
//! [`JointOrders`] walks them one at a time with an index vector, so the
//! caller can stop at any point without the product ever being built.

use crate::command::{Order, TurnCommand};
use crate::config::{UnitSlot, MAX_UNITS};

/// Odometer over the Cartesian product of per-unit candidate lists.
///
/// The first command combines every unit's first candidate. A unit with no
/// candidates contributes [`Order::stay`].
#[derive(Debug, Clone)]
pub struct JointOrders<'a> {
    slots: &'a [UnitSlot],
    candidates: &'a [Vec<Order>],
    digits: [usize; MAX_UNITS],
    exhausted: bool,
}

impl<'a> JointOrders<'a> {
    /// Enumerate commands for `slots`, where `candidates[i]` belongs to
    /// `slots[i]`. Extra slots beyond [`MAX_UNITS`] are ignored.
    #[must_use]
    pub fn new(slots: &'a [UnitSlot], candidates: &'a [Vec<Order>]) -> Self {
        let len = slots.len().min(candidates.len()).min(MAX_UNITS);
        Self {
            slots: &slots[..len],
            candidates: &candidates[..len],
            digits: [0; MAX_UNITS],
            exhausted: false,
        }
    }

    /// Number of joint commands in the full product, saturating.
    #[must_use]
    pub fn total(&self) -> usize {
        self.candidates
            .iter()
            .fold(1usize, |acc, list| acc.saturating_mul(list.len().max(1)))
    }

    fn current(&self) -> TurnCommand {
        let mut command = TurnCommand::new();
        for (i, (&slot, list)) in self.slots.iter().zip(self.candidates).enumerate() {
            command.set(slot, list.get(self.digits[i]).copied().unwrap_or_else(Order::stay));
        }
        command
    }

    /// Advance the lowest digit, carrying into higher ones.
    fn advance(&mut self) {
        for (digit, list) in self.digits.iter_mut().zip(self.candidates) {
            *digit += 1;
            if *digit < list.len() {
                return;
            }
            *digit = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for JointOrders<'_> {
    type Item = TurnCommand;

    fn next(&mut self) -> Option<TurnCommand> {
        if self.exhausted {
            return None;
        }
        let command = self.current();
        self.advance();
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CombatAction, MoveTarget};
    use crate::config::Coord;

    fn step(x: i16) -> Order {
        Order::new(MoveTarget::StepTo(Coord::new(x, 0)), CombatAction::None)
    }

    #[test]
    fn test_full_product_in_odometer_order() {
        let slots = [0, 3];
        let candidates = vec![vec![step(1), step(2)], vec![step(5), step(6), step(7)]];
        let all: Vec<TurnCommand> = JointOrders::new(&slots, &candidates).collect();
        assert_eq!(all.len(), 6);
        assert_eq!(JointOrders::new(&slots, &candidates).total(), 6);

        assert_eq!(all[0].get(0), Some(&step(1)));
        assert_eq!(all[0].get(3), Some(&step(5)));
        assert_eq!(all[1].get(0), Some(&step(2)));
        assert_eq!(all[1].get(3), Some(&step(5)));
        assert_eq!(all[5].get(3), Some(&step(7)));
    }

    #[test]
    fn test_empty_candidate_list_means_stay() {
        let slots = [1, 2];
        let candidates = vec![vec![], vec![step(4), step(5)]];
        let all: Vec<TurnCommand> = JointOrders::new(&slots, &candidates).collect();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|c| c.get(1) == Some(&Order::stay())));
    }

    #[test]
    fn test_no_units_yields_single_empty_command() {
        let all: Vec<TurnCommand> = JointOrders::new(&[], &[]).collect();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_empty());
    }

    #[test]
    fn test_can_stop_early() {
        let slots: Vec<UnitSlot> = (0..MAX_UNITS).collect();
        let candidates = vec![vec![step(1), step(2), step(3)]; MAX_UNITS];
        let mut odometer = JointOrders::new(&slots, &candidates);
        assert_eq!(odometer.total(), 3usize.pow(16));
        assert_eq!(odometer.by_ref().take(10).count(), 10);
        assert!(odometer.next().is_some());
    }
}
