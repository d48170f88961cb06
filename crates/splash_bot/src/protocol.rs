//! Line protocol spoken with the game server.
//!
//! Input is a stream of whitespace-separated integers; output is one line
//! per own living unit.
//!
//! # Protocol Flow
//!
//! 1. Setup (once): `my_id`, `unit_count`, then per unit
//!    `id owner shoot_cooldown optimal_range soaking_power bombs`, then
//!    `width height`, then `width * height` cells as `x y tile`.
//! 2. Every turn: `live_count`, then per living unit
//!    `id x y cooldown bombs wetness`, then `my_unit_count`.
//! 3. The bot answers every turn with one line per own living unit.
//!
//! # Example Session
//!
//! ```text
//! <- 0
//! <- 2
//! <- 1 0 1 4 16 1
//! <- 2 1 1 4 16 1
//! <- 4 1
//! <- 0 0 0
//! <- 1 0 1
//! <- 2 0 0
//! <- 3 0 2
//! <- 2
//! <- 1 0 0 0 1 0
//! <- 2 2 0 0 1 0
//! <- 1
//! -> 1;SHOOT 2
//! ```

use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::Arc;

use splash_core::bitset::{MAX_HEIGHT, MAX_WIDTH};
use splash_core::prelude::*;
use thiserror::Error;

/// Error type for protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Failed to read input.
    #[error("Failed to read input: {0}")]
    Io(#[from] io::Error),
    /// Input ended in the middle of a message.
    #[error("Unexpected end of input while reading {expected}")]
    UnexpectedEof {
        /// Field that was being read.
        expected: &'static str,
    },
    /// A token could not be parsed or is out of range.
    #[error("Invalid {expected}: {token:?}")]
    InvalidToken {
        /// Field that was being read.
        expected: &'static str,
        /// Offending token.
        token: String,
    },
    /// The setup describes an impossible match.
    #[error("Invalid setup: {0}")]
    Setup(#[from] GameError),
}

/// Result type alias using [`ProtocolError`].
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Whitespace-separated token reader over any buffered input.
#[derive(Debug)]
pub struct TokenReader<R> {
    input: R,
    line: String,
    /// Tokens of the current line, reversed so `pop` yields the next one.
    pending: Vec<String>,
}

impl<R: BufRead> TokenReader<R> {
    /// Wrap a reader.
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: String::new(),
            pending: Vec::new(),
        }
    }

    /// Refill the token buffer. Returns `false` at end of input.
    fn fill(&mut self) -> Result<bool> {
        while self.pending.is_empty() {
            self.line.clear();
            if self.input.read_line(&mut self.line)? == 0 {
                return Ok(false);
            }
            self.pending = self.line.split_whitespace().rev().map(str::to_owned).collect();
        }
        Ok(true)
    }

    /// True when no tokens remain.
    pub fn at_eof(&mut self) -> Result<bool> {
        Ok(!self.fill()?)
    }

    /// Next raw token.
    pub fn token(&mut self, expected: &'static str) -> Result<String> {
        if !self.fill()? {
            return Err(ProtocolError::UnexpectedEof { expected });
        }
        self.pending
            .pop()
            .ok_or(ProtocolError::UnexpectedEof { expected })
    }

    /// Next token parsed as `T`.
    pub fn parse<T: FromStr>(&mut self, expected: &'static str) -> Result<T> {
        let token = self.token(expected)?;
        token
            .parse()
            .map_err(|_| ProtocolError::InvalidToken { expected, token })
    }
}

/// Pass `value` through when `ok`, otherwise report it as the bad token.
fn bounded<T>(value: T, ok: bool, expected: &'static str) -> Result<T>
where
    T: ToString,
{
    if ok {
        Ok(value)
    } else {
        Err(ProtocolError::InvalidToken {
            expected,
            token: value.to_string(),
        })
    }
}

/// What the server told us at the start of one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnInfo {
    /// Turns resolved so far.
    pub turn: u32,
    /// Living units reported.
    pub live_units: usize,
    /// Own living units, as counted by the server.
    pub my_units: usize,
}

/// Our view of a running match, kept in sync with the server.
#[derive(Debug, Clone)]
pub struct Session {
    side: Side,
    state: SimState,
    turns_seen: u32,
    scores: [u32; 2],
}

impl Session {
    /// Read the setup block and build the match.
    ///
    /// # Errors
    ///
    /// Any malformed or inconsistent setup is fatal.
    pub fn read_setup<R: BufRead>(reader: &mut TokenReader<R>) -> Result<Self> {
        let my_id: i64 = reader.parse("player id")?;
        let side = Side::from_index(my_id).ok_or_else(|| ProtocolError::InvalidToken {
            expected: "player id",
            token: my_id.to_string(),
        })?;

        let unit_count: usize = reader.parse("unit count")?;
        let unit_count = bounded(unit_count, unit_count <= MAX_UNITS, "unit count")?;
        let mut roster = Vec::with_capacity(unit_count);
        for _ in 0..unit_count {
            roster.push(read_profile(reader)?);
        }

        let width: usize = reader.parse("map width")?;
        let height: usize = reader.parse("map height")?;
        if width == 0 || height == 0 || width > MAX_WIDTH || height > MAX_HEIGHT {
            return Err(GameError::InvalidDimensions {
                width,
                height,
                max_width: MAX_WIDTH,
                max_height: MAX_HEIGHT,
            }
            .into());
        }
        let mut tiles = vec![Tile::Empty; width * height];
        for _ in 0..width * height {
            let x: usize = reader.parse("cell x")?;
            let y: usize = reader.parse("cell y")?;
            let code: i64 = reader.parse("tile code")?;
            let x = bounded(x, x < width, "cell x")?;
            let y = bounded(y, y < height, "cell y")?;
            tiles[y * width + x] = Tile::from_code(code)?;
        }

        let config = MatchConfig::new(width, height, tiles, roster)?;
        tracing::info!(
            side = ?side,
            width,
            height,
            units = unit_count,
            "Match setup received"
        );

        Ok(Self {
            side,
            state: SimState::unplaced(Arc::new(config)),
            turns_seen: 0,
            scores: [0; 2],
        })
    }

    /// Read one turn update. Returns `None` when the input is exhausted
    /// cleanly between turns.
    ///
    /// Units the server no longer lists are marked dead. Scores are not
    /// sent, so they are tracked locally from the territory the synced
    /// positions hold.
    pub fn read_turn<R: BufRead>(&mut self, reader: &mut TokenReader<R>) -> Result<Option<TurnInfo>> {
        if reader.at_eof()? {
            return Ok(None);
        }
        let live_units: usize = reader.parse("live unit count")?;
        let mut seen = 0u16;
        for _ in 0..live_units {
            let id: u32 = reader.parse("unit id")?;
            let x: i16 = reader.parse("unit x")?;
            let y: i16 = reader.parse("unit y")?;
            let cooldown: u8 = reader.parse("cooldown")?;
            let bombs: u8 = reader.parse("bomb count")?;
            let wetness: u16 = reader.parse("wetness")?;

            let slot = self
                .state
                .config()
                .slot_of(id)
                .ok_or(GameError::UnknownUnitId(id))?;
            let pos = Coord::new(x, y);
            if !self.state.config().in_bounds(pos) {
                return Err(ProtocolError::InvalidToken {
                    expected: "unit position",
                    token: format!("{x} {y}"),
                });
            }
            self.state.sync_unit(
                slot,
                UnitStatus {
                    pos,
                    cooldown,
                    bombs,
                    wetness,
                },
            );
            seen |= 1 << slot;
        }
        self.state.retire_unseen(seen);
        let my_units: usize = reader.parse("own unit count")?;

        if self.turns_seen > 0 {
            let territory = self.state.territory();
            for side in Side::ALL {
                self.scores[side.index()] += territory.of(side);
            }
        }
        let turn = self.turns_seen;
        self.state.set_progress(turn, self.scores);
        self.turns_seen += 1;

        if my_units != self.state.living_count(self.side) {
            tracing::warn!(
                reported = my_units,
                tracked = self.state.living_count(self.side),
                "Own unit count disagrees with the roster"
            );
        }
        tracing::debug!(turn, live_units, hash = self.state.state_hash(), "Turn synced");

        Ok(Some(TurnInfo {
            turn,
            live_units,
            my_units,
        }))
    }

    /// The side we play.
    pub fn side(&self) -> Side {
        self.side
    }

    /// The synced state.
    pub fn state(&self) -> &SimState {
        &self.state
    }
}

fn read_profile<R: BufRead>(reader: &mut TokenReader<R>) -> Result<UnitProfile> {
    let external_id: u32 = reader.parse("unit id")?;
    let owner: i64 = reader.parse("unit owner")?;
    let owner = Side::from_index(owner).ok_or_else(|| ProtocolError::InvalidToken {
        expected: "unit owner",
        token: owner.to_string(),
    })?;
    let shoot_cooldown: u8 = reader.parse("shoot cooldown")?;
    let optimal_range: u8 = reader.parse("optimal range")?;
    let soaking_power: u16 = reader.parse("soaking power")?;
    let bombs: u8 = reader.parse("bomb count")?;
    Ok(UnitProfile {
        external_id,
        owner,
        class: UnitClass::new(shoot_cooldown, optimal_range, soaking_power),
        bombs,
    })
}

/// Render one order. `None` if the slot has no roster entry.
pub fn format_order(state: &SimState, slot: UnitSlot, order: &Order) -> Option<String> {
    let config = state.config();
    let id = config.profile(slot)?.external_id;
    let mut line = id.to_string();

    if let MoveTarget::StepTo(to) = order.movement {
        line.push_str(&format!(";MOVE {} {}", to.x, to.y));
    }
    match order.action {
        CombatAction::None => {}
        CombatAction::Hunker => line.push_str(";HUNKER_DOWN"),
        CombatAction::Shoot(target) => {
            if let Some(profile) = config.profile(target) {
                line.push_str(&format!(";SHOOT {}", profile.external_id));
            }
        }
        CombatAction::Throw(at) => line.push_str(&format!(";THROW {} {}", at.x, at.y)),
    }

    if !line.contains(';') {
        // The server wants at least one action per unit.
        let pos = state.unit(slot)?.pos;
        line.push_str(&format!(";MOVE {} {}", pos.x, pos.y));
    }
    Some(line)
}

/// Render a command as the lines the server expects: one per own living
/// unit, in slot order. Units without an order stay put.
pub fn format_command(state: &SimState, side: Side, command: &TurnCommand) -> Vec<String> {
    state
        .living(side)
        .filter_map(|slot| {
            let order = command.get(slot).copied().unwrap_or_default();
            format_order(state, slot, &order)
        })
        .collect()
}

/// Parse one output line back into a slot and an order.
///
/// A move onto the unit's own cell reads as staying.
///
/// # Errors
///
/// Fails on unknown ids, unknown verbs, and bad numbers.
pub fn parse_order_line(state: &SimState, line: &str) -> Result<(UnitSlot, Order)> {
    let config = state.config();
    let mut clauses = line.trim().split(';');
    let id_token = clauses.next().unwrap_or_default().trim();
    let id: u32 = id_token.parse().map_err(|_| ProtocolError::InvalidToken {
        expected: "unit id",
        token: id_token.to_owned(),
    })?;
    let slot = config.slot_of(id).ok_or(GameError::UnknownUnitId(id))?;

    let mut order = Order::stay();
    for clause in clauses {
        let mut words = clause.split_whitespace();
        let verb = words.next().unwrap_or_default();
        let mut number = |expected: &'static str| -> Result<i16> {
            let token = words.next().ok_or(ProtocolError::UnexpectedEof { expected })?;
            token.parse().map_err(|_| ProtocolError::InvalidToken {
                expected,
                token: token.to_owned(),
            })
        };
        match verb {
            "MOVE" => {
                let to = Coord::new(number("move x")?, number("move y")?);
                let here = state.unit(slot).map(|unit| unit.pos);
                if here != Some(to) {
                    order.movement = MoveTarget::StepTo(to);
                }
            }
            "SHOOT" => {
                let target = number("target id")?;
                let id = u32::try_from(target).map_err(|_| ProtocolError::InvalidToken {
                    expected: "target id",
                    token: target.to_string(),
                })?;
                let target = config.slot_of(id).ok_or(GameError::UnknownUnitId(id))?;
                order.action = CombatAction::Shoot(target);
            }
            "THROW" => {
                order.action = CombatAction::Throw(Coord::new(number("throw x")?, number("throw y")?));
            }
            "HUNKER_DOWN" => order.action = CombatAction::Hunker,
            // Debug text the server displays; no effect on play.
            "MESSAGE" => {}
            other => {
                return Err(ProtocolError::InvalidToken {
                    expected: "action",
                    token: other.to_owned(),
                })
            }
        }
    }
    Ok((slot, order))
}

/// Parse a full turn of output lines into a command.
///
/// # Errors
///
/// Fails on the first malformed line.
pub fn parse_command<'a, I>(state: &SimState, lines: I) -> Result<TurnCommand>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut command = TurnCommand::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let (slot, order) = parse_order_line(state, line)?;
        command.set(slot, order);
    }
    Ok(command)
}
