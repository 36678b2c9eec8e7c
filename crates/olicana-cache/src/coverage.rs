//! Date ranges and the cache completeness rule.

use std::fmt;

use time::{Date, Duration, OffsetDateTime};

/// Inclusive range of calendar days.
///
/// A range whose start is after its end is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Creates the range `[start, end]`.
    #[must_use]
    pub const fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// Returns the first day.
    #[must_use]
    pub const fn start(&self) -> Date {
        self.start
    }

    /// Returns the last day.
    #[must_use]
    pub const fn end(&self) -> Date {
        self.end
    }

    /// Returns whether the range holds no days.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Returns a copy whose end is no later than `limit`.
    #[must_use]
    pub fn clamp_end(self, limit: Date) -> Self {
        Self {
            start: self.start,
            end: self.end.min(limit),
        }
    }

    /// Returns whether `held`, the span of days already stored, satisfies
    /// this range.
    ///
    /// The last `source_lag` days before `today` are not required, since the
    /// upstream source has not published them yet.
    #[must_use]
    pub fn is_covered_by(&self, held: Self, today: Date, source_lag: Duration) -> bool {
        let published = today.checked_sub(source_lag).unwrap_or(Date::MIN);
        held.start <= self.start && held.end >= self.end.min(published)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Source of the current date.
pub trait Clock: fmt::Debug {
    /// Returns today's date.
    fn today(&self) -> Date;
}

/// Clock reading the system time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().date()
    }
}

/// Clock stuck on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}
