//! Mission time and clock sources
//!
//! The engine timestamps watchpoint transitions with whatever the host's
//! clock service reports. Time is carried as a seconds/subseconds pair so
//! the engine never does epoch arithmetic; it only copies timestamps into
//! transition records.
//!
//! `FixedClock` exists for tests: the harness sets the time, the engine
//! reads it, assertions compare recorded stamps against known values.

use crate::traits::TimeSource;

/// Mission elapsed time as reported by the clock service.
///
/// `subseconds` is a binary fraction of a second (2^-32 units), matching
/// common spacecraft time formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MissionTime {
    /// Whole seconds
    pub seconds: u32,
    /// Binary fraction of a second (2^-32 units)
    pub subseconds: u32,
}

impl MissionTime {
    /// Time zero, used for cleared transition records
    pub const ZERO: Self = Self {
        seconds: 0,
        subseconds: 0,
    };

    /// Construct from a seconds/subseconds pair
    pub const fn new(seconds: u32, subseconds: u32) -> Self {
        Self {
            seconds,
            subseconds,
        }
    }
}

/// Wall-clock source backed by the host system clock
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[cfg(feature = "std")]
impl TimeSource for SystemClock {
    fn now(&self) -> MissionTime {
        use std::time::{SystemTime, UNIX_EPOCH};

        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        MissionTime {
            seconds: elapsed.as_secs() as u32,
            // Scale nanoseconds into 2^-32 second units
            subseconds: (((elapsed.subsec_nanos() as u64) << 32) / 1_000_000_000) as u32,
        }
    }
}

/// Settable clock for tests
#[derive(Debug, Clone, Default)]
pub struct FixedClock {
    now: MissionTime,
}

impl FixedClock {
    /// Create a clock reading the given time
    pub const fn new(now: MissionTime) -> Self {
        Self { now }
    }

    /// Set the reported time
    pub fn set(&mut self, now: MissionTime) {
        self.now = now;
    }

    /// Advance the reported time by whole seconds
    pub fn advance(&mut self, seconds: u32) {
        self.now.seconds = self.now.seconds.saturating_add(seconds);
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> MissionTime {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = FixedClock::new(MissionTime::new(100, 0));
        assert_eq!(clock.now(), MissionTime::new(100, 0));

        clock.advance(5);
        assert_eq!(clock.now().seconds, 105);
    }

    #[test]
    fn zero_is_default() {
        assert_eq!(MissionTime::ZERO, MissionTime::default());
    }
}
