//! # Splash Core
//!
//! Deterministic simulation and search for a two-player grid soak-combat
//! game: units move, shoot water and throw splash bombs, and a side wins by
//! soaking the other or by holding more territory.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math in the rules (damage uses fixed-point)
//!
//! The one exception is the planner, which reads the wall clock to honour
//! its time budget. Search scores are `f64` but never feed back into a
//! [`SimState`](state::SimState).
//!
//! ## Crate Structure
//!
//! - [`config`] - Immutable map and roster shared by every state
//! - [`state`] - Mutable branch state and snapshots
//! - [`command`] - Per-side turn commands
//! - [`resolve`] - Turn resolution pipeline
//! - [`orders`] - Legal order enumeration
//! - [`policy`] / [`phase`] - Decision makers
//! - [`planner`] - Time-budgeted beam search

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod bitset;
pub mod combat;
pub mod command;
pub mod config;
pub mod error;
pub mod math;
pub mod movement;
pub mod orders;
pub mod phase;
pub mod planner;
pub mod policy;
pub mod pool;
pub mod resolve;
pub mod scoring;
pub mod state;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::command::{CombatAction, MoveTarget, Order, TurnCommand};
    pub use crate::config::{
        ClassPreset, Coord, MatchConfig, Side, Tile, UnitClass, UnitProfile, UnitSlot, MAX_UNITS,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::math::Fixed;
    pub use crate::orders::legal_orders;
    pub use crate::phase::{Phase, PhasePolicy};
    pub use crate::planner::{BeamPlanner, BeamSearchPolicy, EvalWeights, PlanOutcome, PlannerConfig};
    pub use crate::policy::{GreedyPolicy, IdlePolicy, Policy, RandomPolicy};
    pub use crate::resolve::ResolveReport;
    pub use crate::state::{Outcome, SimState, UnitStatus};
}
