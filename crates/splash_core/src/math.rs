//! Fixed-point helpers for deterministic damage math.
//!
//! Damage modifiers are exact binary fractions, so fixed-point keeps every
//! platform on the same result without touching floats.

use fixed::types::I32F32;

/// Fixed-point number type for all damage math.
pub type Fixed = I32F32;

/// `n / 100` as a fixed-point value.
#[must_use]
pub fn percent(n: i32) -> Fixed {
    Fixed::from_num(n) / Fixed::from_num(100)
}

/// Round to the nearest integer (ties away from zero), clamped to `0..=u16::MAX`.
#[must_use]
pub fn round_to_u16(value: Fixed) -> u16 {
    if value <= Fixed::ZERO {
        return 0;
    }
    let rounded: i64 = value.round().to_num();
    rounded.clamp(0, i64::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_exact() {
        assert_eq!(percent(50) * Fixed::from_num(16), Fixed::from_num(8));
        assert_eq!(percent(25) * Fixed::from_num(4), Fixed::ONE);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to_u16(Fixed::from_num(2) + percent(50)), 3);
        assert_eq!(round_to_u16(Fixed::from_num(2) + percent(25)), 2);
        assert_eq!(round_to_u16(-Fixed::ONE), 0);
    }
}
