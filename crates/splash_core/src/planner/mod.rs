//! Time-budgeted beam search over joint commands.
//!
//! - [`heuristic`] - per-unit order ranking used for pruning
//! - [`eval`] - weighted linear state evaluation
//! - [`odometer`] - lazy joint-command enumeration
//! - [`beam`] - the planner itself and its [`Policy`](crate::policy::Policy) wrapper

pub mod beam;
pub mod eval;
pub mod heuristic;
pub mod odometer;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use beam::{BeamPlanner, BeamSearchPolicy, PlanOutcome};
pub use eval::{evaluate, EvalWeights};
pub use heuristic::{score_order, top_k_orders};
pub use odometer::JointOrders;

/// Error type for planner configuration loading.
#[derive(Error, Debug)]
pub enum PlannerConfigError {
    /// File not found.
    #[error("Planner config not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read planner config: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse planner config: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// Policy the planner assumes the opponent follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpponentModel {
    /// Opponent stands still.
    Idle,
    /// Opponent plays the top heuristic order per unit.
    #[default]
    Greedy,
}

/// Search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Nodes kept per ply.
    pub beam_width: usize,
    /// Plies searched at most.
    pub depth: usize,
    /// Candidate orders kept per unit.
    pub top_k: usize,
    /// Wall-clock budget per decision, in milliseconds.
    pub time_budget_ms: u64,
    /// Opponent forecast used inside the search.
    pub opponent: OpponentModel,
    /// Evaluation weights.
    pub weights: EvalWeights,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            beam_width: 12,
            depth: 3,
            top_k: 3,
            time_budget_ms: 40,
            opponent: OpponentModel::Greedy,
            weights: EvalWeights::default(),
        }
    }
}

impl PlannerConfig {
    /// Load a config from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PlannerConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PlannerConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: PlannerConfig = ron::from_str(&contents)?;
        Ok(config)
    }

    /// Load from a RON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid config.
    pub fn from_ron_str(ron: &str) -> Result<Self, PlannerConfigError> {
        let config: PlannerConfig = ron::from_str(ron)?;
        Ok(config)
    }

    /// Set the time budget.
    #[must_use]
    pub const fn with_budget_ms(mut self, ms: u64) -> Self {
        self.time_budget_ms = ms;
        self
    }

    /// Budget as a [`Duration`].
    #[must_use]
    pub const fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }
}
