//! The beam-search planner.
//!
//! Each ply expands every frontier node into the joint commands formed by
//! the units' top-k orders, applies them against a forecast of the
//! opponent, evaluates the result and keeps the best `beam_width` children.
//! Every child remembers the ply-0 command it descends from, and the best
//! ply-0 command seen so far is always available: stopping the search at
//! any moment yields a complete answer.

use std::time::{Duration, Instant};

use crate::command::{Order, TurnCommand};
use crate::config::{Side, UnitSlot};
use crate::policy::{greedy_command, GreedyPolicy, IdlePolicy, Policy};
use crate::pool::StatePool;
use crate::state::SimState;

use super::eval::evaluate;
use super::heuristic::top_k_orders;
use super::odometer::JointOrders;
use super::{OpponentModel, PlannerConfig};

/// Upper bound on buffers allocated up front by the first search.
pub const PREWARM_CAP: usize = 4096;

/// Buffers one ply can hold at once: the frontier plus every child.
#[must_use]
pub fn expected_nodes(config: &PlannerConfig, units: usize) -> usize {
    let beam_width = config.beam_width.max(1);
    let branching = config
        .top_k
        .max(1)
        .saturating_pow(u32::try_from(units).unwrap_or(u32::MAX));
    beam_width
        .saturating_mul(branching.saturating_add(1))
        .saturating_add(1)
        .min(PREWARM_CAP)
}

/// Result of one [`BeamPlanner::plan`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    /// Chosen command, with an order for every living own unit.
    pub command: TurnCommand,
    /// Evaluation of the best node found (`-inf` if none was evaluated).
    pub score: f64,
    /// States evaluated.
    pub nodes: u64,
    /// Plies fully completed.
    pub plies: usize,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    /// Whether the deadline cut the search short.
    pub timed_out: bool,
}

#[derive(Debug)]
struct Node {
    state: SimState,
    root: TurnCommand,
    score: f64,
}

/// Beam-search planner with a reusable state pool.
#[derive(Debug)]
pub struct BeamPlanner {
    config: PlannerConfig,
    pool: StatePool,
    warmed: bool,
    slots: Vec<UnitSlot>,
    candidates: Vec<Vec<Order>>,
}

impl BeamPlanner {
    /// Planner with the given parameters.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            pool: StatePool::new(),
            warmed: false,
            slots: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Search parameters.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Buffer pool `(reused, freshly created, available)` counts.
    #[must_use]
    pub fn pool_stats(&self) -> (u64, u64, usize) {
        let (reused, created) = self.pool.stats();
        (reused, created, self.pool.available())
    }

    /// Pick a command for `side`, forecasting the other side with
    /// `opponent`.
    ///
    /// Never fails. With no time left, the top heuristic order of every
    /// living unit is returned.
    pub fn plan(&mut self, state: &SimState, side: Side, opponent: &mut dyn Policy) -> PlanOutcome {
        let start = Instant::now();
        let deadline = start + self.config.time_budget();
        let weights = self.config.weights;
        let beam_width = self.config.beam_width.max(1);
        let top_k = self.config.top_k.max(1);

        let mut best = PlanOutcome {
            command: greedy_command(state, side, &mut Vec::new()),
            score: f64::NEG_INFINITY,
            nodes: 0,
            plies: 0,
            elapsed: Duration::ZERO,
            timed_out: false,
        };
        if state.is_game_over() || state.living_count(side) == 0 {
            best.elapsed = start.elapsed();
            return best;
        }
        if !self.warmed {
            let size = expected_nodes(&self.config, state.living_count(side));
            self.pool = StatePool::with_capacity(state, size);
            self.warmed = true;
        }

        let mut frontier = vec![Node {
            state: self.pool.acquire(state),
            root: TurnCommand::new(),
            score: 0.0,
        }];

        'plies: for ply in 0..self.config.depth {
            let mut children: Vec<Node> = Vec::new();

            for node in &frontier {
                if node.state.is_game_over() {
                    children.push(Node {
                        state: self.pool.acquire(&node.state),
                        root: node.root,
                        score: node.score,
                    });
                    continue;
                }

                self.slots.clear();
                self.slots.extend(node.state.living(side));
                self.candidates.resize_with(self.slots.len(), Vec::new);
                for (&slot, list) in self.slots.iter().zip(self.candidates.iter_mut()) {
                    top_k_orders(&node.state, slot, top_k, list);
                }
                let reply = opponent.get_move(&node.state, side.opponent());

                let joint = JointOrders::new(&self.slots, &self.candidates[..self.slots.len()]);
                for command in joint {
                    if Instant::now() >= deadline {
                        best.timed_out = true;
                        self.pool.release_all(children.drain(..).map(|n| n.state));
                        break 'plies;
                    }

                    let mut child = self.pool.acquire(&node.state);
                    match side {
                        Side::Zero => child.apply(&command, &reply),
                        Side::One => child.apply(&reply, &command),
                    };
                    let score = evaluate(&child, side, &weights);
                    best.nodes += 1;

                    let root = if ply == 0 { command } else { node.root };
                    if score > best.score {
                        best.score = score;
                        best.command = root;
                    }
                    children.push(Node {
                        state: child,
                        root,
                        score,
                    });
                }
            }

            self.pool.release_all(frontier.drain(..).map(|n| n.state));
            children.sort_by(|a, b| b.score.total_cmp(&a.score));
            if children.len() > beam_width {
                self.pool
                    .release_all(children.drain(beam_width..).map(|n| n.state));
            }
            frontier = children;
            best.plies += 1;

            tracing::debug!(
                ply,
                frontier = frontier.len(),
                nodes = best.nodes,
                elapsed_us = start.elapsed().as_micros() as u64,
                "Ply complete"
            );
        }

        self.pool.release_all(frontier.into_iter().map(|n| n.state));
        best.elapsed = start.elapsed();
        tracing::debug!(
            nodes = best.nodes,
            plies = best.plies,
            timed_out = best.timed_out,
            score = best.score,
            "Plan chosen"
        );
        best
    }
}

/// [`Policy`] adapter around [`BeamPlanner`].
pub struct BeamSearchPolicy {
    planner: BeamPlanner,
    opponent: Box<dyn Policy>,
    last: Option<PlanOutcome>,
}

impl std::fmt::Debug for BeamSearchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeamSearchPolicy")
            .field("planner", &self.planner)
            .field("opponent", &self.opponent.name())
            .finish_non_exhaustive()
    }
}

impl BeamSearchPolicy {
    /// Policy using the opponent model named in `config`.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        let opponent: Box<dyn Policy> = match config.opponent {
            OpponentModel::Idle => Box::new(IdlePolicy),
            OpponentModel::Greedy => Box::new(GreedyPolicy::new()),
        };
        Self::with_opponent(config, opponent)
    }

    /// Policy with an explicit opponent forecast.
    #[must_use]
    pub fn with_opponent(config: PlannerConfig, opponent: Box<dyn Policy>) -> Self {
        Self {
            planner: BeamPlanner::new(config),
            opponent,
            last: None,
        }
    }

    /// Statistics of the most recent decision.
    #[must_use]
    pub const fn last_outcome(&self) -> Option<&PlanOutcome> {
        self.last.as_ref()
    }
}

impl Policy for BeamSearchPolicy {
    fn get_move(&mut self, state: &SimState, side: Side) -> TurnCommand {
        let outcome = self.planner.plan(state, side, self.opponent.as_mut());
        let command = outcome.command;
        self.last = Some(outcome);
        command
    }

    fn name(&self) -> &'static str {
        "beam"
    }
}
