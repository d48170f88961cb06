//! Local referee for self-play.
//!
//! Plays two policies against each other on a [`SimState`]. Commands travel
//! through the text protocol exactly as a live server would see them, so
//! every local match also exercises the output format.

use serde::{Deserialize, Serialize};
use splash_core::prelude::*;

use crate::protocol::{format_command, parse_command};

/// Summary of one finished (or abandoned) match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Turns resolved.
    pub turns: u32,
    /// Final scores per side.
    pub scores: [u32; 2],
    /// Result, or `None` if `max_turns` ran out first.
    pub outcome: Option<Outcome>,
    /// Final state hash (for determinism validation).
    pub final_hash: u64,
    /// Damaging shots over the match.
    pub hits: u32,
    /// Bombs thrown over the match.
    pub bombs: u32,
    /// Units eliminated over the match.
    pub deaths: u32,
    /// Orders the wire round trip could not read back. Always zero for
    /// well-behaved policies.
    pub rejected_lines: u32,
}

impl MatchReport {
    /// Winning side, if any.
    pub fn winner(&self) -> Option<Side> {
        match self.outcome {
            Some(Outcome::Winner(side)) => Some(side),
            _ => None,
        }
    }
}

/// Send a command through the wire format and read it back.
fn relay(state: &SimState, side: Side, command: &TurnCommand, rejected: &mut u32) -> TurnCommand {
    let lines = format_command(state, side, command);
    match parse_command(state, lines.iter().map(String::as_str)) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, side = ?side, "Dropping unreadable command");
            *rejected += 1;
            TurnCommand::new()
        }
    }
}

/// Play until the match ends or `max_turns` turns have been resolved.
pub fn run_match(
    mut state: SimState,
    zero: &mut dyn Policy,
    one: &mut dyn Policy,
    max_turns: u32,
) -> MatchReport {
    let mut report = MatchReport {
        turns: 0,
        scores: [0; 2],
        outcome: None,
        final_hash: 0,
        hits: 0,
        bombs: 0,
        deaths: 0,
        rejected_lines: 0,
    };

    while !state.is_game_over() && report.turns < max_turns {
        let a = zero.get_move(&state, Side::Zero);
        let b = one.get_move(&state, Side::One);
        let a = relay(&state, Side::Zero, &a, &mut report.rejected_lines);
        let b = relay(&state, Side::One, &b, &mut report.rejected_lines);

        let resolved = state.apply(&a, &b);
        report.turns += 1;
        report.hits += resolved.combat.hits;
        report.bombs += resolved.combat.bombs;
        report.deaths += resolved.deaths;
    }

    report.scores = [state.score(Side::Zero), state.score(Side::One)];
    report.outcome = state.outcome();
    report.final_hash = state.state_hash();

    tracing::info!(
        zero = zero.name(),
        one = one.name(),
        turns = report.turns,
        score0 = report.scores[0],
        score1 = report.scores[1],
        outcome = ?report.outcome,
        "Match finished"
    );
    report
}

/// Outcome of replaying one match several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Final hash of every run.
    pub hashes: Vec<u64>,
    /// Whether every run ended on the same hash and the final state
    /// survived a snapshot round trip.
    pub deterministic: bool,
}

/// Replay the same seeded match `runs` times and compare final hashes.
///
/// Side zero plays [`GreedyPolicy`], side one a [`RandomPolicy`] seeded
/// with `seed`. Neither reads the clock, so every run must agree.
pub fn verify_match(start: &SimState, seed: u64, runs: u32, max_turns: u32) -> VerifyReport {
    let mut hashes = Vec::with_capacity(runs as usize);
    let mut snapshots_ok = true;

    for _ in 0..runs {
        let mut state = start.clone();
        let mut zero = GreedyPolicy::new();
        let mut one = RandomPolicy::new(seed);
        for _ in 0..max_turns {
            if state.is_game_over() {
                break;
            }
            let a = zero.get_move(&state, Side::Zero);
            let b = one.get_move(&state, Side::One);
            state.apply(&a, &b);
        }
        hashes.push(state.state_hash());

        let restored = state
            .encode()
            .and_then(|bytes| SimState::decode(state.config_handle().clone(), &bytes));
        snapshots_ok &= matches!(restored, Ok(copy) if copy.state_hash() == state.state_hash());
    }

    let deterministic = snapshots_ok && hashes.windows(2).all(|w| w[0] == w[1]);
    tracing::info!(runs, seed, deterministic, "Determinism check complete");
    VerifyReport {
        hashes,
        deterministic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    #[test]
    fn test_match_respects_turn_cap() {
        let state = Scenario::default_duel().build_state().unwrap();
        let report = run_match(state, &mut IdlePolicy, &mut IdlePolicy, 5);
        assert_eq!(report.turns, 5);
        assert_eq!(report.outcome, None);
        assert_eq!(report.hits, 0);
        assert_eq!(report.rejected_lines, 0);
    }

    #[test]
    fn test_greedy_match_reaches_an_outcome() {
        let state = Scenario::default_duel().build_state().unwrap();
        let report = run_match(
            state,
            &mut GreedyPolicy::new(),
            &mut RandomPolicy::new(9),
            200,
        );
        assert!(report.outcome.is_some());
        assert!(report.turns <= 100);
        assert_eq!(report.rejected_lines, 0);
    }

    #[test]
    fn test_verify_agrees_with_itself() {
        let state = Scenario::default_duel().build_state().unwrap();
        let report = verify_match(&state, 4, 3, 40);
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 3);
    }
}
