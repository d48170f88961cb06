//! Contest bot runner for the soak arena.
//!
//! This crate connects the deterministic core to the outside world:
//!
//! - **Live play**: read the server's turn protocol on stdin, answer on stdout
//! - **Self-play**: run seeded local matches and batches for tuning
//! - **Verification**: check that replayed matches end on identical state
//!
//! # Protocol
//!
//! Communication is line based:
//!
//! - **stdin**: setup block, then one update per turn (integers)
//! - **stdout**: one `id;MOVE x y;ACTION` line per own living unit
//! - **stderr**: logs (human-readable)
//!
//! See the [`protocol`] module for the exact layout.
//!
//! # Example
//!
//! ```bash
//! # Play against the server
//! cargo run -p splash_bot --release -- play --policy beam
//!
//! # Self-play batch
//! cargo run -p splash_bot --release -- selfplay --count 50 --output results
//!
//! # Verify determinism
//! cargo run -p splash_bot -- verify --runs 3
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod protocol;
pub mod referee;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary, PolicyKind};
pub use protocol::{format_command, parse_command, ProtocolError, Session, TokenReader};
pub use referee::{run_match, verify_match, MatchReport, VerifyReport};
pub use scenario::{Scenario, ScenarioError, UnitPlacement};
