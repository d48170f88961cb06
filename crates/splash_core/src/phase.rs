//! Phase-driven policy: opening, development, combat.
//!
//! The match is split into three phases, each with its own way of picking
//! orders:
//!
//! - **Opening** - walk every unit towards a cover spot near the centre,
//!   firing only at targets of opportunity
//! - **Development** - greedy heuristic orders
//! - **Combat** - full beam search
//!
//! [`PhasePolicy`] checks the current phase's exit condition once per turn
//! and advances at most one phase per turn.

use crate::command::{CombatAction, MoveTarget, Order, TurnCommand};
use crate::config::{Coord, Side, MAX_UNITS};
use crate::planner::{BeamSearchPolicy, PlannerConfig};
use crate::policy::{GreedyPolicy, Policy};
use crate::state::SimState;

/// Turns after which the opening ends regardless of position.
const OPENING_TURNS: u32 = 8;

/// Extra cells beyond shooting reach that already count as contact.
const CONTACT_MARGIN: i32 = 2;

/// Stage of the match, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Taking positions.
    Opening,
    /// Manoeuvring at range.
    Development,
    /// Trading shots.
    Combat,
}

impl Phase {
    /// The phase that follows this one. Combat is final.
    #[must_use]
    pub const fn next_phase(self) -> Self {
        match self {
            Self::Opening => Self::Development,
            Self::Development | Self::Combat => Self::Combat,
        }
    }
}

/// Closest own-enemy distance minus the own unit's reach, over all pairs.
fn closest_approach(state: &SimState, side: Side) -> Option<i32> {
    state
        .living(side)
        .flat_map(|slot| {
            let unit = state.units()[slot];
            let reach = state.class_of(slot).max_range();
            state
                .living(side.opponent())
                .map(move |enemy| state.units()[enemy].pos.manhattan(unit.pos) - reach)
        })
        .min()
}

/// Controller that delegates to the current [`Phase`].
#[derive(Debug)]
pub struct PhasePolicy {
    phase: Phase,
    entered: bool,
    last_transition: Option<u32>,
    targets: [Option<Coord>; MAX_UNITS],
    greedy: GreedyPolicy,
    beam: BeamSearchPolicy,
}

impl PhasePolicy {
    /// Start in the opening; combat searches with `config`.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            phase: Phase::Opening,
            entered: false,
            last_transition: None,
            targets: [None; MAX_UNITS],
            greedy: GreedyPolicy::new(),
            beam: BeamSearchPolicy::new(config),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Opening destination assigned to a slot, if any.
    #[must_use]
    pub fn target(&self, slot: usize) -> Option<Coord> {
        self.targets.get(slot).copied().flatten()
    }

    /// Set up the current phase.
    pub fn enter(&mut self, state: &SimState, side: Side) {
        self.entered = true;
        if self.phase == Phase::Opening {
            self.assign_cover_targets(state, side);
        }
        tracing::debug!(phase = ?self.phase, turn = state.turn(), "Entering phase");
    }

    /// Whether the current phase is done.
    #[must_use]
    pub fn should_exit(&self, state: &SimState, side: Side) -> bool {
        let approach = closest_approach(state, side);
        match self.phase {
            Phase::Opening => {
                let arrived = state
                    .living(side)
                    .all(|slot| self.target(slot).map_or(true, |t| state.units()[slot].pos == t));
                arrived || state.turn() >= OPENING_TURNS || approach.is_some_and(|gap| gap <= 0)
            }
            Phase::Development => approach.is_some_and(|gap| gap <= CONTACT_MARGIN),
            Phase::Combat => false,
        }
    }

    /// Give each living unit the free cover-adjacent cell that is closest
    /// to the map centre and to the unit, claimed in slot order.
    fn assign_cover_targets(&mut self, state: &SimState, side: Side) {
        let config = state.config();
        let centre = Coord::new((config.width() / 2) as i16, (config.height() / 2) as i16);
        let mut spots: Vec<Coord> = config
            .open_cells()
            .filter(|cell| cell.neighbors().any(|n| config.in_bounds(n) && !config.is_walkable(n)))
            .collect();

        self.targets = [None; MAX_UNITS];
        for slot in state.living(side) {
            let pos = state.units()[slot].pos;
            let pick = spots
                .iter()
                .enumerate()
                .min_by_key(|(_, spot)| spot.manhattan(centre) + spot.manhattan(pos))
                .map(|(i, _)| i);
            if let Some(i) = pick {
                self.targets[slot] = Some(spots.swap_remove(i));
            }
        }
    }

    fn opening_move(&self, state: &SimState, side: Side) -> TurnCommand {
        let mut command = TurnCommand::new();
        for slot in state.living(side) {
            let unit = state.units()[slot];
            let movement = match self.target(slot) {
                Some(target) if target != unit.pos => MoveTarget::StepTo(target),
                _ => MoveTarget::Stay,
            };
            let action = if unit.cooldown == 0 {
                state
                    .living(side.opponent())
                    .map(|enemy| (state.expected_damage(slot, enemy), enemy))
                    .filter(|&(damage, _)| damage > 0)
                    .max_by_key(|&(damage, enemy)| (damage, std::cmp::Reverse(enemy)))
                    .map_or(CombatAction::None, |(_, enemy)| CombatAction::Shoot(enemy))
            } else {
                CombatAction::None
            };
            command.set(slot, Order::new(movement, action));
        }
        command
    }
}

impl Policy for PhasePolicy {
    fn get_move(&mut self, state: &SimState, side: Side) -> TurnCommand {
        if !self.entered {
            self.enter(state, side);
        }
        if self.last_transition != Some(state.turn()) && self.should_exit(state, side) {
            let next = self.phase.next_phase();
            if next != self.phase {
                self.phase = next;
                self.last_transition = Some(state.turn());
                self.enter(state, side);
            }
        }

        match self.phase {
            Phase::Opening => self.opening_move(state, side),
            Phase::Development => self.greedy.get_move(state, side),
            Phase::Combat => self.beam.get_move(state, side),
        }
    }

    fn name(&self) -> &'static str {
        "phase"
    }
}
