//! Decision makers.
//!
//! A [`Policy`] turns a state into one side's [`TurnCommand`]. Policies
//! are interchangeable: the referee, the protocol loop and the planner's
//! opponent model all take any `Policy`.

use crate::command::{Order, TurnCommand};
use crate::config::Side;
use crate::orders::legal_orders;
use crate::planner::heuristic::top_k_orders;
use crate::state::SimState;

/// Something that picks a turn command for a side.
///
/// Implementations must not depend on anything but the state they are
/// given and their own internal state, so matches stay reproducible.
pub trait Policy {
    /// Choose orders for `side`'s living units.
    fn get_move(&mut self, state: &SimState, side: Side) -> TurnCommand;

    /// Short display name.
    fn name(&self) -> &'static str;
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn get_move(&mut self, state: &SimState, side: Side) -> TurnCommand {
        (**self).get_move(state, side)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Every unit stays put and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdlePolicy;

impl Policy for IdlePolicy {
    fn get_move(&mut self, state: &SimState, side: Side) -> TurnCommand {
        let mut command = TurnCommand::new();
        for slot in state.living(side) {
            command.set(slot, Order::stay());
        }
        command
    }

    fn name(&self) -> &'static str {
        "idle"
    }
}

/// Deterministic linear congruential generator.
#[derive(Debug, Clone)]
struct PolicyRng {
    state: u64,
}

impl PolicyRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state >> 33
    }

    fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next() % bound as u64) as usize
    }
}

/// Uniformly random legal orders from a seeded generator.
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: PolicyRng,
    buffer: Vec<Order>,
}

impl RandomPolicy {
    /// Policy whose choices are fully determined by `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: PolicyRng::new(seed),
            buffer: Vec::new(),
        }
    }
}

impl Policy for RandomPolicy {
    fn get_move(&mut self, state: &SimState, side: Side) -> TurnCommand {
        let mut command = TurnCommand::new();
        for slot in state.living(side) {
            legal_orders(state, slot, &mut self.buffer);
            let pick = self.rng.below(self.buffer.len());
            command.set(slot, self.buffer.get(pick).copied().unwrap_or_else(Order::stay));
        }
        command
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Each unit takes its single best order by the local heuristic.
#[derive(Debug, Clone, Default)]
pub struct GreedyPolicy {
    buffer: Vec<Order>,
}

impl GreedyPolicy {
    /// New greedy policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Policy for GreedyPolicy {
    fn get_move(&mut self, state: &SimState, side: Side) -> TurnCommand {
        greedy_command(state, side, &mut self.buffer)
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}

/// Top-1 heuristic order for every living unit of `side`.
pub(crate) fn greedy_command(state: &SimState, side: Side, buffer: &mut Vec<Order>) -> TurnCommand {
    let mut command = TurnCommand::new();
    for slot in state.living(side) {
        top_k_orders(state, slot, 1, buffer);
        command.set(slot, buffer.first().copied().unwrap_or_else(Order::stay));
    }
    command
}
