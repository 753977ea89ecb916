//! ## amdsim-core::time
//! **Day-resolution simulation clock**
//!
//! The engines never consult wall-clock time. Simulated time is a day counter
//! anchored at the run's start date; calendar dates are derived from it.

use chrono::{Days, NaiveDate};

/// Days per year used to convert a duration in years into a horizon.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Average days per month used by duration-based rules.
pub const DAYS_PER_MONTH: f64 = DAYS_PER_YEAR / 12.0;

/// A simple virtual clock that advances in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    start: NaiveDate,
    day: u64,
}

impl SimulationClock {
    /// Creates a clock positioned at `start` (day 0).
    pub fn new(start: NaiveDate) -> Self {
        Self { start, day: 0 }
    }

    /// Days elapsed since the start date.
    #[inline]
    pub fn now_day(&self) -> u64 {
        self.day
    }

    /// Calendar date of the current day.
    #[inline]
    pub fn today(&self) -> NaiveDate {
        self.date_at(self.day)
    }

    /// Advances the clock by the given number of days.
    #[inline]
    pub fn advance(&mut self, days: u64) {
        self.day += days;
    }

    /// Calendar date `day` days after the start.
    pub fn date_at(&self, day: u64) -> NaiveDate {
        add_days(self.start, day)
    }
}

/// Adds whole days to a date, saturating at the maximum representable date.
pub fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

/// Signed number of days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Converts a duration in years into a whole-day horizon.
pub fn horizon_days(duration_years: f64) -> i64 {
    (duration_years * DAYS_PER_YEAR).round() as i64
}
