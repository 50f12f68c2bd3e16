//! Virtual clock for the tick loop.
//!
//! The clock is the only source of time the engine reads. It starts at
//! minute 0 and moves forward one minute per call to [`Clock::advance`].

use crate::error::ClockError;
use crate::time::Minute;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clock {
    minute: Minute,
}

impl Clock {
    pub fn new() -> Self {
        Self { minute: Minute::ZERO }
    }

    #[cfg(test)]
    pub fn starting_at(minute: Minute) -> Self {
        Self { minute }
    }

    /// Advance by exactly one minute and return the new minute.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Overflow`] if the counter is already at `u64::MAX`.
    pub fn advance(&mut self) -> Result<Minute, ClockError> {
        self.minute = self
            .minute
            .checked_next()
            .ok_or(ClockError::Overflow(self.minute.0))?;
        Ok(self.minute)
    }

    pub const fn now(&self) -> Minute {
        self.minute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero() {
        assert_eq!(Minute(0), Clock::new().now());
    }

    #[test]
    fn test_clock_advances_one_minute_at_a_time() {
        let mut clock = Clock::new();
        assert_eq!(Ok(Minute(1)), clock.advance());
        assert_eq!(Ok(Minute(2)), clock.advance());
        assert_eq!(Minute(2), clock.now());
    }

    #[test]
    fn test_clock_refuses_to_wrap() {
        let mut clock = Clock::starting_at(Minute(u64::MAX));
        assert_eq!(Err(ClockError::Overflow(u64::MAX)), clock.advance());
        assert_eq!(Minute(u64::MAX), clock.now());
    }
}
