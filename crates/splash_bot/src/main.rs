//! Soak arena contest bot.
//!
//! Plays the live turn protocol on stdin/stdout by default. Subcommands run
//! local self-play batches and determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Live play (default) with the phase-driven policy
//! cargo run -p splash_bot --release
//!
//! # Live play with plain beam search and a tuned planner
//! cargo run -p splash_bot --release -- play --policy beam --config planner.ron
//!
//! # Self-play batch
//! cargo run -p splash_bot --release -- selfplay --count 100 --output results/
//!
//! # Verify determinism on a scenario
//! cargo run -p splash_bot -- verify --scenario crates/splash_bot/scenarios/duel.ron
//! ```
//!
//! Logs go to stderr; stdout carries nothing but protocol lines.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splash_bot::{
    batch::{run_batch, BatchConfig, PolicyKind},
    protocol::{format_command, Session, TokenReader},
    referee::verify_match,
    scenario::Scenario,
};
use splash_core::prelude::PlannerConfig;

#[derive(Parser)]
#[command(name = "splash_bot")]
#[command(about = "Soak arena bot: live play, self-play and determinism checks")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play the live protocol on stdin/stdout
    Play {
        /// Policy to play with
        #[arg(short, long, value_enum, default_value_t = PolicyKind::Phase)]
        policy: PolicyKind,

        /// Planner settings (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a batch of local matches in parallel
    Selfplay {
        /// Scenario file (RON); the built-in duel if omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of matches
        #[arg(short = 'n', long, default_value = "20")]
        count: u32,

        /// Parallel matches (0 = all cores)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Policy under test
        #[arg(long, value_enum, default_value_t = PolicyKind::Greedy)]
        bot: PolicyKind,

        /// Opponent policy
        #[arg(long, value_enum, default_value_t = PolicyKind::Random)]
        opponent: PolicyKind,

        /// Planner settings (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Replay one seeded match several times and compare final states
    Verify {
        /// Scenario file (RON); the built-in duel if omitted
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed for the random opponent
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of runs to compare
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(log_level).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Play { policy, config }) => cmd_play(policy, config),
        Some(Commands::Selfplay {
            scenario,
            count,
            parallel,
            bot,
            opponent,
            config,
            seed,
            output,
        }) => cmd_selfplay(scenario, count, parallel, bot, opponent, config, seed, output),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => cmd_verify(scenario, seed, runs),
        None => {
            // Default: live play
            cmd_play(PolicyKind::Phase, None);
        }
    }
}

/// Load planner settings or fall back to defaults; exits on a bad file.
fn load_planner(path: Option<PathBuf>) -> PlannerConfig {
    let Some(path) = path else {
        return PlannerConfig::default();
    };
    match PlannerConfig::load(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Loaded planner config");
            config
        }
        Err(e) => {
            eprintln!("FATAL: Cannot load planner config '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Load a scenario or use the built-in duel; exits on a bad file.
fn load_scenario(path: Option<PathBuf>) -> Scenario {
    let Some(path) = path else {
        return Scenario::default_duel();
    };
    match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("FATAL: Cannot load scenario '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

/// Live game loop
fn cmd_play(policy: PolicyKind, config: Option<PathBuf>) {
    let planner = load_planner(config);
    let mut bot = policy.build(0, &planner);
    tracing::info!(policy = bot.name(), budget_ms = planner.time_budget_ms, "Starting live session");

    let stdin = io::stdin();
    let mut input = TokenReader::new(stdin.lock());
    let mut output = BufWriter::new(io::stdout().lock());

    let mut session = match Session::read_setup(&mut input) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("FATAL: Bad setup: {e}");
            std::process::exit(1);
        }
    };

    loop {
        match session.read_turn(&mut input) {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(e) => {
                eprintln!("FATAL: Bad turn input: {e}");
                std::process::exit(1);
            }
        }

        let command = bot.get_move(session.state(), session.side());
        let lines = format_command(session.state(), session.side(), &command);
        let written = lines
            .iter()
            .try_for_each(|line| writeln!(output, "{line}"))
            .and_then(|()| output.flush());
        if let Err(e) = written {
            tracing::error!(error = %e, "Lost connection to the server");
            break;
        }
    }
    tracing::info!("Input closed, shutting down");
}

/// Run a batch of self-play matches
fn cmd_selfplay(
    scenario: Option<PathBuf>,
    count: u32,
    parallel: u32,
    bot: PolicyKind,
    opponent: PolicyKind,
    config: Option<PathBuf>,
    seed: u64,
    output: PathBuf,
) {
    let mut batch = BatchConfig::new(load_scenario(scenario), count)
        .with_seed(seed)
        .with_policies(bot, opponent);
    batch.parallel_games = parallel;
    batch.planner = load_planner(config);

    let results = match run_batch(batch) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let results_path = output.join("batch_results.json");
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("SELF-PLAY COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played:   {}", summary.total_games);
    eprintln!(
        "Bot wins:       {} ({:.1}%)",
        summary.bot_wins,
        summary.bot_win_rate * 100.0
    );
    eprintln!("Opponent wins:  {}", summary.opponent_wins);
    eprintln!("Draws:          {}", summary.draws);
    eprintln!(
        "Turns:          avg {:.1}, min {}, max {}",
        summary.avg_turns, summary.min_turns, summary.max_turns
    );
    eprintln!("Results saved to {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(scenario: Option<PathBuf>, seed: u64, runs: u32) {
    let scenario = load_scenario(scenario);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    let state = match scenario.build_state() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };
    let report = verify_match(&state, seed, runs, scenario.max_turns);

    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected! Hashes: {:?}", report.hashes);
        std::process::exit(1);
    }
}
