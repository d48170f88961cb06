//! Batch self-play runner.
//!
//! Runs many seeded matches in parallel using rayon and aggregates the
//! results. Each match is single-threaded; only whole matches run
//! concurrently.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use splash_core::prelude::{
    BeamSearchPolicy, GreedyPolicy, IdlePolicy, PhasePolicy, PlannerConfig, Policy,
    RandomPolicy, Side, SimState,
};
use tracing::{debug, info};

use crate::referee::{run_match, MatchReport};
use crate::scenario::{Scenario, ScenarioError};

/// Policies selectable from the command line and batch configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Every unit stays put.
    Idle,
    /// Uniformly random legal orders.
    Random,
    /// Best heuristic order per unit.
    Greedy,
    /// Time-budgeted beam search.
    Beam,
    /// Opening, development and combat phases.
    #[default]
    Phase,
}

impl PolicyKind {
    /// Instantiate the policy. `seed` only matters for [`PolicyKind::Random`].
    pub fn build(self, seed: u64, planner: &PlannerConfig) -> Box<dyn Policy> {
        match self {
            PolicyKind::Idle => Box::new(IdlePolicy),
            PolicyKind::Random => Box::new(RandomPolicy::new(seed)),
            PolicyKind::Greedy => Box::new(GreedyPolicy::new()),
            PolicyKind::Beam => Box::new(BeamSearchPolicy::new(planner.clone())),
            PolicyKind::Phase => Box::new(PhasePolicy::new(planner.clone())),
        }
    }
}

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to play.
    pub scenario: Scenario,
    /// Number of matches.
    pub game_count: u32,
    /// Maximum parallel matches (0 = use rayon default).
    pub parallel_games: u32,
    /// Starting seed for deterministic runs.
    pub seed_start: u64,
    /// Policy under test.
    pub bot: PolicyKind,
    /// Opponent policy.
    pub opponent: PolicyKind,
    /// Search settings for beam and phase policies.
    pub planner: PlannerConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::default_duel(),
            game_count: 20,
            parallel_games: 0,
            seed_start: 0,
            bot: PolicyKind::Greedy,
            opponent: PolicyKind::Random,
            planner: PlannerConfig::default(),
        }
    }
}

impl BatchConfig {
    /// Create config for a scenario.
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            scenario,
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set both policies.
    pub fn with_policies(mut self, bot: PolicyKind, opponent: PolicyKind) -> Self {
        self.bot = bot;
        self.opponent = opponent;
        self
    }
}

/// One match of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// Index within the batch.
    pub index: u32,
    /// Seed used.
    pub seed: u64,
    /// Side the bot played. Alternates so neither side is favoured.
    pub bot_side: Side,
    /// Match result.
    pub report: MatchReport,
}

impl GameRecord {
    /// Whether the bot won this match.
    pub fn bot_won(&self) -> bool {
        self.report.winner() == Some(self.bot_side)
    }
}

/// Aggregate results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total matches played.
    pub total_games: u32,
    /// Matches won by the bot.
    pub bot_wins: u32,
    /// Matches won by the opponent.
    pub opponent_wins: u32,
    /// Draws and matches abandoned at the turn cap.
    pub draws: u32,
    /// `bot_wins / total_games`.
    pub bot_win_rate: f64,
    /// Average match length in turns.
    pub avg_turns: f64,
    /// Shortest match.
    pub min_turns: u32,
    /// Longest match.
    pub max_turns: u32,
}

impl BatchSummary {
    /// Calculate summary from a list of games.
    #[must_use]
    pub fn from_games(games: &[GameRecord]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_games: games.len() as u32,
            min_turns: u32::MAX,
            ..Default::default()
        };
        let mut turn_sum = 0u64;

        for game in games {
            turn_sum += u64::from(game.report.turns);
            summary.min_turns = summary.min_turns.min(game.report.turns);
            summary.max_turns = summary.max_turns.max(game.report.turns);
            if game.bot_won() {
                summary.bot_wins += 1;
            } else if game.report.winner().is_some() {
                summary.opponent_wins += 1;
            } else {
                summary.draws += 1;
            }
        }

        summary.avg_turns = turn_sum as f64 / games.len() as f64;
        summary.bot_win_rate = f64::from(summary.bot_wins) / games.len() as f64;
        summary
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Individual matches, in index order.
    pub games: Vec<GameRecord>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

fn play_one(config: &BatchConfig, start: &SimState, index: u32) -> GameRecord {
    let seed = config.seed_start.wrapping_add(u64::from(index));
    let bot_side = if index % 2 == 0 { Side::Zero } else { Side::One };
    let mut bot = config.bot.build(seed, &config.planner);
    // Offset so a random bot and a random opponent never mirror each other.
    let mut opponent = config
        .opponent
        .build(seed.wrapping_add(0x5EED), &config.planner);

    let report = match bot_side {
        Side::Zero => run_match(start.clone(), &mut *bot, &mut *opponent, config.scenario.max_turns),
        Side::One => run_match(start.clone(), &mut *opponent, &mut *bot, config.scenario.max_turns),
    };
    debug!(index, seed, bot_side = ?bot_side, turns = report.turns, "Batch game finished");

    GameRecord {
        index,
        seed,
        bot_side,
        report,
    }
}

/// Run a batch of matches.
///
/// # Errors
///
/// Fails only if the scenario cannot be built.
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let start_time = Instant::now();
    let start = config.scenario.build_state()?;

    info!(
        scenario = %config.scenario.name,
        games = config.game_count,
        bot = ?config.bot,
        opponent = ?config.opponent,
        "Starting batch run"
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let games: Vec<GameRecord> = (0..config.game_count)
        .into_par_iter()
        .map(|index| play_one(&config, &start, index))
        .collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start_time.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} games in {:.1}s, bot won {:.0}%",
        games.len(),
        duration_seconds,
        summary.bot_win_rate * 100.0
    );

    Ok(BatchResults {
        config,
        games,
        summary,
        duration_seconds,
    })
}
