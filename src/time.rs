use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A point on the virtual clock, counted in whole minutes from the start
/// of the simulation.
#[derive(Debug, Clone, Copy, Default, Ord, Eq, PartialEq, Hash, Serialize, Deserialize, PartialOrd)]
pub struct Minute(pub u64);

impl Minute {
    pub const ZERO: Minute = Minute(0);

    /// Minutes elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn since(self, earlier: Minute) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn checked_next(self) -> Option<Minute> {
        self.0.checked_add(1).map(Minute)
    }
}

impl std::fmt::Display for Minute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl Add<u64> for Minute {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Minute(self.0 + rhs)
    }
}

impl Sub<Minute> for Minute {
    type Output = u64;

    fn sub(self, rhs: Minute) -> Self::Output {
        self.since(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!("0007", Minute(7).to_string());
        assert_eq!("12345", Minute(12345).to_string());
    }

    #[test]
    fn test_since_saturates() {
        assert_eq!(3, Minute(5) - Minute(2));
        assert_eq!(0, Minute(2) - Minute(5));
    }

    #[test]
    fn test_checked_next_at_the_edge() {
        assert_eq!(Some(Minute(1)), Minute::ZERO.checked_next());
        assert_eq!(None, Minute(u64::MAX).checked_next());
    }
}
