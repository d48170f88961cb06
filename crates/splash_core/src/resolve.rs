//! Turn resolution pipeline.
//!
//! [`SimState::apply`] resolves both sides' commands simultaneously in a
//! fixed phase order:
//!
//! 1. **Move** - one-cell steps with conflict cancellation
//! 2. **Hunker** - flags reset, then set from this turn's orders
//! 3. **Combat** - shots and splash bombs
//! 4. **Cleanup** - soaked units leave the board, cooldowns tick, turn advances
//! 5. **Scoring** - territory added to cumulative scores
//! 6. **Game over** - elimination, score lead, turn limit
//!
//! Orders for units a side does not own, dead units or unknown slots are
//! ignored rather than reported; resolution never fails.

use crate::combat::CombatStats;
use crate::command::{CombatAction, MoveTarget, TurnCommand};
use crate::config::{Coord, Side, MAX_UNITS};
use crate::movement::MoveStats;
use crate::scoring::Territory;
use crate::state::{cell_index, Outcome, SimState, DEATH_WETNESS, TURN_LIMIT, WIN_LEAD};

/// What happened during one [`SimState::apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Move phase counters.
    pub moves: MoveStats,
    /// Combat phase counters.
    pub combat: CombatStats,
    /// Units knocked out this turn.
    pub deaths: u32,
    /// Territory awarded this turn (zero when scoring was skipped).
    pub territory: Territory,
}

impl SimState {
    /// Resolve one turn with `side0`'s and `side1`'s commands.
    ///
    /// Does nothing once the game is over.
    pub fn apply(&mut self, side0: &TurnCommand, side1: &TurnCommand) -> ResolveReport {
        let mut report = ResolveReport::default();
        if self.is_game_over() {
            return report;
        }

        let n = self.unit_count;
        let mut steps: [Option<Coord>; MAX_UNITS] = [None; MAX_UNITS];
        let mut actions = [CombatAction::None; MAX_UNITS];
        for (side, command) in [(Side::Zero, side0), (Side::One, side1)] {
            for (slot, order) in command.iter() {
                if slot >= n {
                    continue;
                }
                let unit = self.units[slot];
                if !unit.alive || unit.owner != side {
                    continue;
                }
                if let MoveTarget::StepTo(target) = order.movement {
                    steps[slot] = self.next_step(unit.pos, target);
                }
                actions[slot] = order.action;
            }
        }

        report.moves = self.resolve_moves(&steps);

        for slot in 0..n {
            let unit = &mut self.units[slot];
            unit.hunkering = unit.alive && actions[slot] == CombatAction::Hunker;
        }

        report.combat = self.resolve_combat(&actions);
        report.deaths = self.cleanup();

        if let Some(outcome) = self.elimination() {
            self.finish(outcome);
            return report;
        }

        report.territory = self.territory();
        for side in Side::ALL {
            self.scores[side.index()] += report.territory.of(side);
        }

        if let Some(outcome) = self.decided_by_score() {
            self.finish(outcome);
        }

        tracing::trace!(
            turn = self.turn,
            score0 = self.scores[0],
            score1 = self.scores[1],
            moved = report.moves.moved,
            hits = report.combat.hits,
            deaths = report.deaths,
            "Turn resolved"
        );
        report
    }

    /// Remove soaked units, tick cooldowns and advance the turn counter.
    fn cleanup(&mut self) -> u32 {
        let mut deaths = 0;
        for slot in 0..self.unit_count {
            let unit = &mut self.units[slot];
            if !unit.alive {
                continue;
            }
            if unit.wetness >= DEATH_WETNESS {
                unit.alive = false;
                unit.hunkering = false;
                let pos = unit.pos;
                self.occupancy.clear(cell_index(pos));
                deaths += 1;
            } else if unit.cooldown > 0 {
                unit.cooldown -= 1;
            }
        }
        self.turn += 1;
        deaths
    }

    fn elimination(&self) -> Option<Outcome> {
        match (self.living_count(Side::Zero), self.living_count(Side::One)) {
            (0, 0) => Some(Outcome::Draw),
            (0, _) => Some(Outcome::Winner(Side::One)),
            (_, 0) => Some(Outcome::Winner(Side::Zero)),
            _ => None,
        }
    }

    fn decided_by_score(&self) -> Option<Outcome> {
        let [a, b] = self.scores;
        if a.abs_diff(b) >= WIN_LEAD || self.turn >= TURN_LIMIT {
            return Some(match a.cmp(&b) {
                std::cmp::Ordering::Greater => Outcome::Winner(Side::Zero),
                std::cmp::Ordering::Less => Outcome::Winner(Side::One),
                std::cmp::Ordering::Equal => Outcome::Draw,
            });
        }
        None
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        tracing::debug!(
            turn = self.turn,
            score0 = self.scores[0],
            score1 = self.scores[1],
            ?outcome,
            "Game over"
        );
    }
}
