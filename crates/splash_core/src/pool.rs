//! Reusable state buffers for search branches.
//!
//! The planner forks a state for every joint command it evaluates. Drawing
//! those forks from a free list keeps allocation flat across plies instead
//! of spiking inside the time budget.

use crate::state::SimState;

/// Free list of [`SimState`] buffers.
#[derive(Debug, Default)]
pub struct StatePool {
    free: Vec<SimState>,
    reused: u64,
    created: u64,
}

impl StatePool {
    /// Empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool pre-filled with `capacity` copies of `template`.
    #[must_use]
    pub fn with_capacity(template: &SimState, capacity: usize) -> Self {
        Self {
            free: vec![template.clone(); capacity],
            reused: 0,
            created: 0,
        }
    }

    /// A fork of `parent`, reusing a released buffer when one is available.
    pub fn acquire(&mut self, parent: &SimState) -> SimState {
        match self.free.pop() {
            Some(mut state) => {
                state.fork_from(parent);
                self.reused += 1;
                state
            }
            None => {
                self.created += 1;
                parent.clone()
            }
        }
    }

    /// Return a buffer to the pool.
    pub fn release(&mut self, state: SimState) {
        self.free.push(state);
    }

    /// Return many buffers at once.
    pub fn release_all<I: IntoIterator<Item = SimState>>(&mut self, states: I) {
        self.free.extend(states);
    }

    /// Buffers currently available.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// `(reused, freshly created)` acquisition counts.
    #[must_use]
    pub const fn stats(&self) -> (u64, u64) {
        (self.reused, self.created)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ClassPreset, Coord, MatchConfig, Side, Tile, UnitProfile};

    fn base() -> SimState {
        let config = MatchConfig::new(
            3,
            3,
            vec![Tile::Empty; 9],
            vec![UnitProfile::from_preset(1, Side::Zero, ClassPreset::Gunner)],
        )
        .unwrap();
        SimState::new(Arc::new(config), &[Coord::new(1, 1)]).unwrap()
    }

    #[test]
    fn test_acquire_reuses_released_buffers() {
        let parent = base();
        let mut pool = StatePool::new();

        let first = pool.acquire(&parent);
        assert_eq!(pool.stats(), (0, 1));
        pool.release(first);

        let second = pool.acquire(&parent);
        assert_eq!(pool.stats(), (1, 1));
        assert_eq!(second.state_hash(), parent.state_hash());
    }

    #[test]
    fn test_prewarmed_pool() {
        let parent = base();
        let mut pool = StatePool::with_capacity(&parent, 4);
        assert_eq!(pool.available(), 4);
        let state = pool.acquire(&parent);
        assert_eq!(pool.available(), 3);
        pool.release_all([state]);
        assert_eq!(pool.available(), 4);
    }
}
