//! Fixed-capacity occupancy set over grid cells.
//!
//! Cells are linearised with a constant row stride of [`MAX_WIDTH`] so that
//! indices stay stable regardless of the match's actual width.

use serde::{Deserialize, Serialize};

/// Widest supported map.
pub const MAX_WIDTH: usize = 20;

/// Tallest supported map.
pub const MAX_HEIGHT: usize = 12;

/// Number of addressable cells.
pub const MAX_CELLS: usize = MAX_WIDTH * MAX_HEIGHT;

const WORDS: usize = 4;

/// Occupancy bitset with O(1) set/clear/test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CellSet {
    words: [u64; WORDS],
}

impl CellSet {
    /// An empty set.
    pub const EMPTY: Self = Self { words: [0; WORDS] };

    /// Linear index of a cell.
    #[inline]
    #[must_use]
    pub const fn index(x: usize, y: usize) -> usize {
        x + y * MAX_WIDTH
    }

    /// Inverse of [`CellSet::index`].
    #[inline]
    #[must_use]
    pub const fn coords(idx: usize) -> (usize, usize) {
        (idx % MAX_WIDTH, idx / MAX_WIDTH)
    }

    /// Mark a cell.
    #[inline]
    pub fn set(&mut self, idx: usize) {
        debug_assert!(idx < MAX_CELLS, "cell index {idx} out of range");
        self.words[idx >> 6] |= 1 << (idx & 63);
    }

    /// Unmark a cell.
    #[inline]
    pub fn clear(&mut self, idx: usize) {
        debug_assert!(idx < MAX_CELLS, "cell index {idx} out of range");
        self.words[idx >> 6] &= !(1 << (idx & 63));
    }

    /// Whether a cell is marked.
    #[inline]
    #[must_use]
    pub fn test(&self, idx: usize) -> bool {
        debug_assert!(idx < MAX_CELLS, "cell index {idx} out of range");
        self.words[idx >> 6] & (1 << (idx & 63)) != 0
    }

    /// Number of marked cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Whether no cell is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Iterate marked indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(i * 64 + tz)
            })
        })
    }
}
