//! Resolution pipeline tests.
//!
//! Scenario tests pin exact numbers for shooting, splash bombs, knock-outs
//! and early wins; property tests check conflict symmetry, idle turns,
//! cover bounds and determinism over generated states.

use proptest::prelude::*;
use splash_core::combat::cover_modifier;
use splash_core::math::percent;
use splash_core::prelude::*;
use splash_test_utils::determinism::strategies::{
    arb_picks, arb_raw_command, arb_state, legal_command,
};
use splash_test_utils::fixtures::{
    act, command_for, open_state, set_wetness, state_from_rows, step,
};

// =============================================================================
// Helpers
// =============================================================================

fn idle() -> TurnCommand {
    TurnCommand::new()
}

/// Occupancy bits match living units one to one.
fn assert_consistent(state: &SimState) {
    let living: Vec<&splash_core::state::Unit> =
        state.units().iter().filter(|u| u.alive).collect();
    assert_eq!(state.occupancy().len(), living.len());
    for unit in &living {
        assert!(state.is_occupied(unit.pos));
        assert!(state.config().is_walkable(unit.pos));
    }
    for (i, a) in living.iter().enumerate() {
        for b in &living[i + 1..] {
            assert_ne!(a.pos, b.pos, "two living units share a cell");
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_a_adjacent_shot() {
    let mut state = open_state(
        6,
        6,
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(2, 2)),
            (Side::One, ClassPreset::Gunner, Coord::new(2, 3)),
        ],
    );
    let report = state.apply(&idle().with(0, act(CombatAction::Shoot(1))), &idle());

    assert_eq!(report.combat.hits, 1);
    assert_eq!(state.unit(1).unwrap().wetness, 16);
    // Set to shoot_cooldown + 1 = 2 in combat, then ticked once in cleanup.
    assert_eq!(state.unit(0).unwrap().cooldown, 1);
}

#[test]
fn scenario_b_splash_bomb() {
    let mut state = open_state(
        10,
        10,
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(5, 5)),
            (Side::Zero, ClassPreset::Sniper, Coord::new(3, 3)),
            (Side::One, ClassPreset::Sniper, Coord::new(2, 2)),
            (Side::One, ClassPreset::Sniper, Coord::new(9, 9)),
        ],
    );
    let report = state.apply(
        &idle().with(0, act(CombatAction::Throw(Coord::new(3, 3)))),
        &idle(),
    );

    assert_eq!(report.combat.bombs, 1);
    assert_eq!(state.unit(0).unwrap().wetness, 0);
    assert_eq!(state.unit(0).unwrap().bombs, 0);
    assert_eq!(state.unit(1).unwrap().wetness, 30);
    assert_eq!(state.unit(2).unwrap().wetness, 30);
    assert_eq!(state.unit(3).unwrap().wetness, 0);
}

#[test]
fn scenario_b_bomb_spent_on_empty_cell() {
    let mut state = open_state(
        10,
        10,
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(5, 5)),
            (Side::One, ClassPreset::Sniper, Coord::new(9, 9)),
        ],
    );
    state.apply(
        &idle().with(0, act(CombatAction::Throw(Coord::new(5, 1)))),
        &idle(),
    );
    assert_eq!(state.unit(0).unwrap().bombs, 0);

    // Out of bombs: a second throw does nothing.
    let report = state.apply(
        &idle().with(0, act(CombatAction::Throw(Coord::new(8, 8)))),
        &idle(),
    );
    assert_eq!(report.combat.bombs, 0);
    assert_eq!(state.unit(1).unwrap().wetness, 0);
}

#[test]
fn scenario_c_knocked_out_unit_frees_its_cell() {
    let mut state = open_state(
        8,
        8,
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(2, 2)),
            (Side::One, ClassPreset::Gunner, Coord::new(3, 2)),
            (Side::One, ClassPreset::Gunner, Coord::new(7, 7)),
            (Side::Zero, ClassPreset::Gunner, Coord::new(3, 3)),
        ],
    );
    set_wetness(&mut state, 1, 90);

    let report = state.apply(&idle().with(0, act(CombatAction::Shoot(1))), &idle());
    assert_eq!(report.deaths, 1);
    assert!(!state.unit(1).unwrap().alive);
    assert!(!state.is_occupied(Coord::new(3, 2)));
    assert!(!state.is_game_over());

    state.apply(&idle().with(3, step(3, 2)), &idle());
    assert_eq!(state.unit(3).unwrap().pos, Coord::new(3, 2));
}

#[test]
fn scenario_d_score_lead_ends_match_early() {
    let mut state = open_state(
        6,
        6,
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(0, 0)),
            (Side::One, ClassPreset::Gunner, Coord::new(5, 5)),
        ],
    );
    state.set_progress(10, [100, 800]);
    state.apply(&idle(), &idle());

    assert_eq!(state.turn(), 11);
    assert_eq!(state.outcome(), Some(Outcome::Winner(Side::One)));
}

#[test]
fn last_unit_soaked_wins_by_elimination() {
    let mut state = open_state(
        6,
        6,
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(0, 0)),
            (Side::One, ClassPreset::Gunner, Coord::new(1, 0)),
        ],
    );
    set_wetness(&mut state, 1, 95);
    state.apply(&idle().with(0, act(CombatAction::Shoot(1))), &idle());
    assert_eq!(state.outcome(), Some(Outcome::Winner(Side::Zero)));
    // Scoring is skipped on the turn the match ends by elimination.
    assert_eq!(state.score(Side::Zero), 0);
}

#[test]
fn mutual_wipe_is_a_draw() {
    let mut state = open_state(
        6,
        6,
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(0, 0)),
            (Side::One, ClassPreset::Gunner, Coord::new(2, 0)),
        ],
    );
    set_wetness(&mut state, 0, 80);
    set_wetness(&mut state, 1, 80);
    state.apply(
        &idle().with(0, act(CombatAction::Throw(Coord::new(1, 0)))),
        &idle(),
    );
    assert_eq!(state.outcome(), Some(Outcome::Draw));
}

#[test]
fn simultaneous_shots_both_land() {
    let mut state = open_state(
        6,
        6,
        &[
            (Side::Zero, ClassPreset::Berserker, Coord::new(1, 1)),
            (Side::One, ClassPreset::Berserker, Coord::new(2, 1)),
            (Side::One, ClassPreset::Gunner, Coord::new(5, 5)),
        ],
    );
    set_wetness(&mut state, 0, 70);
    set_wetness(&mut state, 1, 70);
    state.apply(
        &idle().with(0, act(CombatAction::Shoot(1))),
        &idle().with(1, act(CombatAction::Shoot(0))),
    );
    // Both shots resolve against the pre-combat state.
    assert!(!state.unit(0).unwrap().alive);
    assert!(!state.unit(1).unwrap().alive);
    assert_eq!(state.outcome(), Some(Outcome::Winner(Side::One)));
}

#[test]
fn far_target_takes_one_bfs_step_around_cover() {
    let mut state = state_from_rows(
        &[
            ".....", //
            ".HHH.",
            ".....",
            ".....",
        ],
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(2, 0)),
            (Side::One, ClassPreset::Gunner, Coord::new(2, 3)),
        ],
    );
    state.apply(&idle().with(0, step(2, 2)), &idle());
    // Both detours are equally long; ties break towards the right.
    assert_eq!(state.unit(0).unwrap().pos, Coord::new(3, 0));
}

#[test]
fn cover_and_hunker_stack() {
    let mut state = state_from_rows(
        &[
            "......", //
            "...l..",
            "......",
        ],
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(0, 1)),
            (Side::One, ClassPreset::Gunner, Coord::new(4, 1)),
        ],
    );
    state.apply(
        &idle().with(0, act(CombatAction::Shoot(1))),
        &idle().with(1, act(CombatAction::Hunker)),
    );
    // 16 x (0.5 - 0.25) = 4.
    assert_eq!(state.unit(1).unwrap().wetness, 4);
}

#[test]
fn focused_fire_adds_up() {
    let mut state = open_state(
        10,
        10,
        &[
            (Side::Zero, ClassPreset::Gunner, Coord::new(2, 2)),
            (Side::Zero, ClassPreset::Gunner, Coord::new(2, 4)),
            (Side::One, ClassPreset::Gunner, Coord::new(2, 3)),
        ],
    );
    let report = state.apply(&command_for(&[0, 1], act(CombatAction::Shoot(2))), &idle());

    assert_eq!(report.combat.hits, 2);
    assert_eq!(state.unit(2).unwrap().wetness, 32);
    assert_eq!(state.unit(0).unwrap().cooldown, 1);
    assert_eq!(state.unit(1).unwrap().cooldown, 1);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Two units stepping into the same cell both stay, whatever their
    /// slots or sides.
    #[test]
    fn prop_same_destination_cancels(
        tx in 1i16..7,
        ty in 1i16..7,
        dirs in proptest::sample::subsequence(vec![0usize, 1, 2, 3], 2),
        side_a in any::<bool>(),
        side_b in any::<bool>(),
        reversed in any::<bool>(),
    ) {
        let target = Coord::new(tx, ty);
        let (dx0, dy0) = Coord::DIRECTIONS[dirs[0]];
        let (dx1, dy1) = Coord::DIRECTIONS[dirs[1]];
        let mut starts = [target.offset(dx0, dy0), target.offset(dx1, dy1)];
        if reversed {
            starts.swap(0, 1);
        }
        let side = |flag: bool| if flag { Side::One } else { Side::Zero };
        let mut state = open_state(8, 8, &[
            (side(side_a), ClassPreset::Gunner, starts[0]),
            (side(side_b), ClassPreset::Gunner, starts[1]),
        ]);

        let mut commands = [TurnCommand::new(), TurnCommand::new()];
        commands[side(side_a).index()].set(0, step(tx, ty));
        commands[side(side_b).index()].set(1, step(tx, ty));
        let report = state.apply(&commands[0], &commands[1]);

        prop_assert_eq!(state.unit(0).unwrap().pos, starts[0]);
        prop_assert_eq!(state.unit(1).unwrap().pos, starts[1]);
        prop_assert_eq!(report.moves.moved, 0);
        prop_assert!(!state.is_occupied(target));
    }

    /// Two adjacent units trading places both stay.
    #[test]
    fn prop_swap_cancels(
        x in 1i16..6,
        y in 1i16..6,
        dir in 0usize..4,
        same_side in any::<bool>(),
    ) {
        let a = Coord::new(x, y);
        let (dx, dy) = Coord::DIRECTIONS[dir];
        let b = a.offset(dx, dy);
        let other = if same_side { Side::Zero } else { Side::One };
        let mut state = open_state(8, 8, &[
            (Side::Zero, ClassPreset::Gunner, a),
            (other, ClassPreset::Gunner, b),
            (Side::One, ClassPreset::Gunner, Coord::new(7, 7)),
        ]);

        let mut commands = [TurnCommand::new(), TurnCommand::new()];
        commands[0].set(0, step(b.x, b.y));
        commands[other.index()].set(1, step(a.x, a.y));
        state.apply(&commands[0], &commands[1]);

        prop_assert_eq!(state.unit(0).unwrap().pos, a);
        prop_assert_eq!(state.unit(1).unwrap().pos, b);
    }

    /// An idle turn only advances the clock, resets hunkering, ticks
    /// cooldowns and banks the unchanged territory.
    #[test]
    fn prop_idle_turn_changes_only_counters(state in arb_state()) {
        let before = state.clone();
        let territory = before.territory();
        let mut after = state;
        after.apply(&TurnCommand::new(), &TurnCommand::new());

        prop_assert_eq!(after.turn(), before.turn() + 1);
        prop_assert_eq!(after.occupancy(), before.occupancy());
        for side in Side::ALL {
            prop_assert_eq!(after.score(side), before.score(side) + territory.of(side));
        }
        for (old, new) in before.units().iter().zip(after.units()) {
            prop_assert_eq!(old.pos, new.pos);
            prop_assert_eq!(old.wetness, new.wetness);
            prop_assert_eq!(old.alive, new.alive);
            prop_assert!(!new.hunkering);
            prop_assert_eq!(new.cooldown, old.cooldown.saturating_sub(1));
        }
    }

    /// Cover is always 1, 1/2 or 1/4.
    #[test]
    fn prop_cover_modifier_is_bounded(
        state in arb_state(),
        sx in 0i16..12, sy in 0i16..8,
        tx in 0i16..12, ty in 0i16..8,
    ) {
        let modifier = cover_modifier(state.config(), Coord::new(sx, sy), Coord::new(tx, ty));
        prop_assert!(
            modifier == Fixed::ONE || modifier == percent(50) || modifier == percent(25)
        );
    }

    /// Several turns of legal orders from both sides keep occupancy and
    /// living units in step, and never touch an eliminated unit.
    #[test]
    fn prop_legal_turns_keep_state_consistent(
        state in arb_state(),
        turns in proptest::collection::vec((arb_picks(), arb_picks()), 1..6),
    ) {
        let mut state = state;
        for (zero, one) in &turns {
            if state.is_game_over() {
                break;
            }
            let a = legal_command(&state, Side::Zero, zero);
            let b = legal_command(&state, Side::One, one);
            prop_assert_eq!(a.len(), state.living_count(Side::Zero));
            prop_assert_eq!(b.len(), state.living_count(Side::One));

            let dead: Vec<usize> = (0..state.units().len())
                .filter(|&slot| !state.units()[slot].alive)
                .collect();
            state.apply(&a, &b);
            assert_consistent(&state);
            for slot in dead {
                prop_assert!(!state.units()[slot].alive);
            }
        }
    }

    /// Identical inputs give identical results, and arbitrary (even
    /// invalid) commands never break occupancy.
    #[test]
    fn prop_resolution_is_deterministic(
        state in arb_state(),
        a in arb_raw_command(),
        b in arb_raw_command(),
    ) {
        let mut first = state.clone();
        let mut second = state;
        first.apply(&a, &b);
        second.apply(&a, &b);
        prop_assert_eq!(first.state_hash(), second.state_hash());
        assert_consistent(&first);
    }
}
