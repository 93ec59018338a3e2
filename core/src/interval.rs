//! Half-open time intervals.
//!
//! Every stay, slot, and reconciliation window in the engine is a
//! `[start, end)` interval over UTC instants. Half-open semantics mean a
//! booking ending at `T` and one starting at `T` never conflict.

use crate::error::EngineError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const SECONDS_PER_HOUR: i64 = 3600;
const SECONDS_PER_NIGHT: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_MONTH: i64 = 30 * SECONDS_PER_NIGHT;

/// Half-open interval `[start, end)` over UTC instants.
///
/// Construction enforces `start < end`; an `Interval` value is therefore
/// always non-empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Interval {
    /// Creates an interval, rejecting `end <= start`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidInterval`] when the interval would be
    /// empty or reversed.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, EngineError> {
        if end <= start {
            return Err(EngineError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Inclusive start instant
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end instant
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Interval length
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test: `a.start < b.end && b.start < a.end`.
    ///
    /// Touching endpoints do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `instant` falls inside the interval (start inclusive, end
    /// exclusive)
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Duration of the overlap with `other`, zero when disjoint
    #[must_use]
    pub fn intersection_duration(&self, other: &Self) -> Duration {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if end <= start {
            Duration::zero()
        } else {
            end - start
        }
    }

    /// Whole hours covered, rounding partial hours up
    #[must_use]
    pub fn whole_hours(&self) -> u32 {
        Self::ceil_units(self.duration(), SECONDS_PER_HOUR)
    }

    /// Whole nights covered, rounding partial nights up
    #[must_use]
    pub fn whole_nights(&self) -> u32 {
        Self::ceil_units(self.duration(), SECONDS_PER_NIGHT)
    }

    /// Whole 30-day months covered, rounding partial months up
    #[must_use]
    pub fn whole_months(&self) -> u32 {
        Self::ceil_units(self.duration(), SECONDS_PER_MONTH)
    }

    /// Returns a copy shifted forward by `offset`
    #[must_use]
    pub fn shifted_by(&self, offset: Duration) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    /// Returns a copy with the end extended by `extra`
    #[must_use]
    pub fn extended_by(&self, extra: Duration) -> Self {
        Self {
            start: self.start,
            end: self.end + extra,
        }
    }

    fn ceil_units(duration: Duration, unit_seconds: i64) -> u32 {
        let seconds = duration.num_seconds().max(0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            ((seconds + unit_seconds - 1) / unit_seconds) as u32
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%dT%H:%M:%SZ"),
            self.end.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }
}
