//! # Game Clock
//!
//! Monotonic tick counter with calendar accessors. One tick is one in-game
//! second. The counter is atomic so background passes can read the time
//! without any lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// Seconds per in-game minute.
pub const SECONDS_PER_MINUTE: u64 = 10;
/// Minutes per in-game hour.
pub const MINUTES_PER_HOUR: u64 = 10;
/// Hours per in-game day.
pub const HOURS_PER_DAY: u64 = 24;
/// Days per in-game month.
pub const DAYS_PER_MONTH: u64 = 28;
/// Months per in-game year. One month per season.
pub const MONTHS_PER_YEAR: u64 = 4;

const TICKS_PER_HOUR: u64 = SECONDS_PER_MINUTE * MINUTES_PER_HOUR;
const TICKS_PER_DAY: u64 = TICKS_PER_HOUR * HOURS_PER_DAY;
const TICKS_PER_MONTH: u64 = TICKS_PER_DAY * DAYS_PER_MONTH;
const TICKS_PER_YEAR: u64 = TICKS_PER_MONTH * MONTHS_PER_YEAR;

/// One season per in-game month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    /// Month 0.
    Spring,
    /// Month 1.
    Summer,
    /// Month 2.
    Fall,
    /// Month 3.
    Winter,
}

/// Monotonic simulation clock.
#[derive(Debug, Default)]
pub struct GameClock {
    ticks: AtomicU64,
}

impl GameClock {
    /// Clock at tick zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
        }
    }

    /// Clock resumed at a stored tick count.
    #[must_use]
    pub const fn starting_at(ticks: u64) -> Self {
        Self {
            ticks: AtomicU64::new(ticks),
        }
    }

    /// Advances one tick and returns the new count.
    pub fn tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current tick count.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Second within the current minute.
    #[must_use]
    pub fn second(&self) -> u64 {
        self.ticks() % SECONDS_PER_MINUTE
    }

    /// Minute within the current hour.
    #[must_use]
    pub fn minute(&self) -> u64 {
        (self.ticks() / SECONDS_PER_MINUTE) % MINUTES_PER_HOUR
    }

    /// Hour within the current day.
    #[must_use]
    pub fn hour(&self) -> u64 {
        (self.ticks() / TICKS_PER_HOUR) % HOURS_PER_DAY
    }

    /// Day within the current month.
    #[must_use]
    pub fn day(&self) -> u64 {
        (self.ticks() / TICKS_PER_DAY) % DAYS_PER_MONTH
    }

    /// Month within the current year.
    #[must_use]
    pub fn month(&self) -> u64 {
        (self.ticks() / TICKS_PER_MONTH) % MONTHS_PER_YEAR
    }

    /// Completed years.
    #[must_use]
    pub fn year(&self) -> u64 {
        self.ticks() / TICKS_PER_YEAR
    }

    /// Season of the current month.
    #[must_use]
    pub fn season(&self) -> Season {
        match self.month() {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Fall,
            _ => Season::Winter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_advances_by_one() {
        let clock = GameClock::new();
        assert_eq!(clock.ticks(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn calendar_math() {
        // 1 day, 3 hours, 2 minutes, 5 seconds.
        let ticks = TICKS_PER_DAY + 3 * TICKS_PER_HOUR + 2 * SECONDS_PER_MINUTE + 5;
        let clock = GameClock::starting_at(ticks);
        assert_eq!(clock.second(), 5);
        assert_eq!(clock.minute(), 2);
        assert_eq!(clock.hour(), 3);
        assert_eq!(clock.day(), 1);
        assert_eq!(clock.month(), 0);
        assert_eq!(clock.year(), 0);
        assert_eq!(clock.season(), Season::Spring);
    }

    #[test]
    fn seasons_follow_months() {
        for (month, season) in [
            (0, Season::Spring),
            (1, Season::Summer),
            (2, Season::Fall),
            (3, Season::Winter),
        ] {
            let clock = GameClock::starting_at(month * TICKS_PER_MONTH);
            assert_eq!(clock.season(), season);
        }
        // Year wraps back to spring.
        let clock = GameClock::starting_at(TICKS_PER_YEAR);
        assert_eq!(clock.season(), Season::Spring);
        assert_eq!(clock.year(), 1);
    }
}
