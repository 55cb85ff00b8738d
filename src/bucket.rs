//! Time-bucket key scheme
//!
//! Cache entries for mutable assets are segmented into hour-wide windows so
//! they age out on their own. A bucket token is the zero-padded day-of-month
//! and hour-of-day, joined with a dash (`"07-23"`). Tokens wrap every month;
//! they are cache discriminators, never calendar records.
//!
//! Buckets are derived from a process-local UTC clock. No external time
//! service is consulted, so bucket boundaries are deterministic for a given
//! `DateTime<Utc>` and cheap to compute per request.

use std::fmt;

use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc};

/// How many future hourly buckets a write-back pre-warms
pub const PRE_WARM_HOURS: u32 = 3;

/// An hour-wide cache window identified by day-of-month and hour-of-day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBucket {
    day: u32,
    hour: u32,
}

impl TimeBucket {
    /// The bucket containing the given instant
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            day: now.day(),
            hour: now.hour(),
        }
    }

    /// The buckets for `now + 1h` through `now + count·h`, in order.
    ///
    /// Whole hours are added before re-deriving day and hour, so day and
    /// month boundaries roll over correctly (hour 23 + 1h lands on the next
    /// day's hour 00, including across month-end).
    pub fn upcoming(now: DateTime<Utc>, count: u32) -> Vec<Self> {
        (1..=i64::from(count))
            .map(|offset| Self::at(now + TimeDelta::hours(offset)))
            .collect()
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.day, self.hour)
    }
}

/// Composite cache key for a bucketed entry (`"<name>@<DD-HH>"`).
///
/// The bare asset name, without a bucket suffix, keys a permanent entry.
pub fn bucketed_key(name: &str, bucket: TimeBucket) -> String {
    format!("{name}@{bucket}")
}
