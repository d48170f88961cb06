//! Determinism testing utilities.
//!
//! Provides a harness for verifying that turn resolution and the policies
//! produce identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Forked search branches and replayed matches must agree bit for bit.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: damage uses [`splash_core::math::Fixed`]; the
//!   planner's `f64` scores never feed back into state.
//! - **Iteration order**: units are always processed in slot order.
//! - **System randomness**: random policies use an explicit seed.
//! - **Wall-clock time**: only the planner's deadline reads the clock, so
//!   determinism checks use fixed-seed or heuristic policies.

use splash_core::prelude::*;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of turns simulated.
    pub turns: u32,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a match multiple times and verify determinism.
///
/// `policies` builds a fresh pair of policies for each run so internal
/// RNG state starts over every time.
pub fn verify_determinism<Setup, Policies, A, B>(
    runs: usize,
    turns: u32,
    setup: Setup,
    policies: Policies,
) -> DeterminismResult
where
    Setup: Fn() -> SimState,
    Policies: Fn() -> (A, B),
    A: Policy,
    B: Policy,
{
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let mut state = setup();
        let (mut zero, mut one) = policies();
        play_turns(&mut state, &mut zero, &mut one, turns);
        hashes.push(state.state_hash());
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    tracing::debug!(runs, turns, is_deterministic, "Determinism check complete");

    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// Play up to `turns` turns, stopping early when the match ends.
pub fn play_turns(state: &mut SimState, zero: &mut dyn Policy, one: &mut dyn Policy, turns: u32) {
    for _ in 0..turns {
        if state.is_game_over() {
            break;
        }
        let a = zero.get_move(state, Side::Zero);
        let b = one.get_move(state, Side::One);
        state.apply(&a, &b);
    }
}

/// Play two copies of a match turn by turn and return the first turn at
/// which their hashes differ.
pub fn find_first_divergence<Setup, Policies, A, B>(
    setup: Setup,
    policies: Policies,
    turns: u32,
) -> Option<u32>
where
    Setup: Fn() -> SimState,
    Policies: Fn() -> (A, B),
    A: Policy,
    B: Policy,
{
    let mut first = setup();
    let mut second = setup();
    let (mut a0, mut a1) = policies();
    let (mut b0, mut b1) = policies();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }
    for turn in 1..=turns {
        play_turns(&mut first, &mut a0, &mut a1, 1);
        play_turns(&mut second, &mut b0, &mut b1, 1);
        if first.state_hash() != second.state_hash() {
            return Some(turn);
        }
    }
    None
}

/// Verify that a bincode round trip preserves the state exactly.
#[must_use]
pub fn verify_serialization_roundtrip(state: &SimState) -> bool {
    let Ok(bytes) = state.encode() else {
        return false;
    };
    match SimState::decode(state.config_handle().clone(), &bytes) {
        Ok(restored) => restored.state_hash() == state.state_hash(),
        Err(_) => false,
    }
}

/// Proptest strategies for resolution testing.
///
/// States are generated from a small random map with random tiles, unit
/// classes, positions and wetness. Commands come either from legal orders
/// (picked by index) or from raw, possibly invalid, orders.
pub mod strategies {
    use std::sync::Arc;

    use proptest::prelude::*;
    use splash_core::orders::legal_orders;
    use splash_core::prelude::*;

    const PRESETS: [ClassPreset; 5] = [
        ClassPreset::Gunner,
        ClassPreset::Sniper,
        ClassPreset::Bomber,
        ClassPreset::Assault,
        ClassPreset::Berserker,
    ];

    /// Build a state from raw generated numbers. Even slots belong to
    /// side zero, odd slots to side one.
    fn build_state(
        width: usize,
        height: usize,
        tile_codes: &[u8],
        picks: &[(u16, u8, u8)],
    ) -> SimState {
        let tiles: Vec<Tile> = (0..width * height)
            .map(|i| match tile_codes.get(i).copied().unwrap_or(0) {
                8 => Tile::LowCover,
                9 => Tile::HighCover,
                _ => Tile::Empty,
            })
            .collect();
        let mut open: Vec<Coord> = (0..height)
            .flat_map(|y| (0..width).map(move |x| Coord::new(x as i16, y as i16)))
            .filter(|c| tiles[c.y as usize * width + c.x as usize] == Tile::Empty)
            .collect();

        let count = picks.len().min(open.len()).max(2);
        let mut roster = Vec::with_capacity(count);
        let mut positions = Vec::with_capacity(count);
        for (slot, &(cell, class, _)) in picks.iter().take(count).enumerate() {
            let side = if slot % 2 == 0 { Side::Zero } else { Side::One };
            let preset = PRESETS[class as usize % PRESETS.len()];
            roster.push(UnitProfile::from_preset(slot as u32 + 1, side, preset));
            positions.push(open.swap_remove(cell as usize % open.len()));
        }

        let config = MatchConfig::new(width, height, tiles, roster).expect("generated map");
        let mut state = SimState::new(Arc::new(config), &positions).expect("generated placement");
        for (slot, &(_, _, wetness)) in picks.iter().take(count).enumerate() {
            let unit = state.units()[slot];
            state.sync_unit(
                slot,
                UnitStatus {
                    pos: unit.pos,
                    cooldown: wetness % 3,
                    bombs: unit.bombs,
                    wetness: u16::from(wetness % 100),
                },
            );
        }
        state
    }

    /// A random in-progress state with 2 to 8 units on a map of at least 5x4.
    pub fn arb_state() -> impl Strategy<Value = SimState> {
        (
            5usize..=12,
            4usize..=8,
            proptest::collection::vec(0u8..10, 96),
            proptest::collection::vec((any::<u16>(), any::<u8>(), any::<u8>()), 2..=8),
        )
            .prop_map(|(w, h, codes, picks)| build_state(w, h, &codes, &picks))
    }

    /// Any coordinate, including a margin outside the largest map.
    pub fn arb_coord() -> impl Strategy<Value = Coord> {
        (-2i16..22, -2i16..14).prop_map(|(x, y)| Coord::new(x, y))
    }

    /// Any order, valid or not.
    pub fn arb_raw_order() -> impl Strategy<Value = Order> {
        let movement = prop_oneof![
            Just(MoveTarget::Stay),
            arb_coord().prop_map(MoveTarget::StepTo),
        ];
        let action = prop_oneof![
            Just(CombatAction::None),
            Just(CombatAction::Hunker),
            (0usize..20).prop_map(CombatAction::Shoot),
            arb_coord().prop_map(CombatAction::Throw),
        ];
        (movement, action).prop_map(|(movement, action)| Order::new(movement, action))
    }

    /// A command with raw orders on arbitrary slots.
    pub fn arb_raw_command() -> impl Strategy<Value = TurnCommand> {
        proptest::collection::vec((0usize..MAX_UNITS, arb_raw_order()), 0..10).prop_map(
            |orders| {
                let mut command = TurnCommand::new();
                for (slot, order) in orders {
                    command.set(slot, order);
                }
                command
            },
        )
    }

    /// Per-slot indices used by [`legal_command`].
    pub fn arb_picks() -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(any::<u32>(), MAX_UNITS)
    }

    /// A legal command for `side`, choosing each unit's order by index.
    #[must_use]
    pub fn legal_command(state: &SimState, side: Side, picks: &[u32]) -> TurnCommand {
        let mut command = TurnCommand::new();
        let mut buffer = Vec::new();
        for slot in state.living(side) {
            legal_orders(state, slot, &mut buffer);
            let pick = picks.get(slot).copied().unwrap_or(0) as usize;
            if let Some(order) = buffer.get(pick % buffer.len().max(1)) {
                command.set(slot, *order);
            }
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_random_duel_is_deterministic() {
        let result = verify_determinism(
            3,
            30,
            fixtures::skirmish,
            || (RandomPolicy::new(1), RandomPolicy::new(2)),
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_no_divergence_with_greedy() {
        let divergence =
            find_first_divergence(fixtures::duel, || (GreedyPolicy::new(), GreedyPolicy::new()), 20);
        assert_eq!(divergence, None);
    }

    #[test]
    fn test_roundtrip_after_play() {
        let mut state = fixtures::skirmish();
        play_turns(&mut state, &mut RandomPolicy::new(5), &mut IdlePolicy, 10);
        assert!(verify_serialization_roundtrip(&state));
    }
}
