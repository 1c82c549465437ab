//! Wall clock time used for query timestamps and maintenance decisions.
use std::fmt::Debug;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

pub trait Clock: Debug + Sync + Send {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, dur: Duration) {
        let mut now = self.now.lock();
        *now = add_duration(*now, dur);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Convert a std duration, saturating at the largest representable delta.
pub fn to_time_delta(dur: Duration) -> TimeDelta {
    TimeDelta::from_std(dur).unwrap_or(TimeDelta::MAX)
}

/// Add a duration to a timestamp, saturating at the maximum timestamp.
pub fn add_duration(time: DateTime<Utc>, dur: Duration) -> DateTime<Utc> {
    time.checked_add_signed(to_time_delta(dur))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Subtract a duration from a timestamp, saturating at the minimum timestamp.
pub fn sub_duration(time: DateTime<Utc>, dur: Duration) -> DateTime<Utc> {
    time.checked_sub_signed(to_time_delta(dur))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Time elapsed from `start` to `end`, zero if `end` is earlier.
pub fn elapsed_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    (end - start).to_std().unwrap_or_default()
}
