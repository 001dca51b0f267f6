use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    /// Returns the current time of the clock
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that never hands out the same instant twice.
///
/// History entries in the key-value backend use their timestamp as the sort
/// key, so two entries for one link written within the same tick would
/// otherwise overwrite each other. When the wrapped clock has not advanced
/// (or went backwards) the previous value plus one nanosecond is returned.
pub struct MonotonicClock<C = SystemClock> {
    inner: C,
    last: Mutex<Option<Timestamp>>,
}

impl MonotonicClock<SystemClock> {
    pub fn new() -> Self {
        Self::wrap(SystemClock)
    }
}

impl Default for MonotonicClock<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MonotonicClock<C> {
    pub fn wrap(inner: C) -> Self {
        Self {
            inner,
            last: Mutex::new(None),
        }
    }
}

impl<C: Clock> Clock for MonotonicClock<C> {
    fn now(&self) -> Timestamp {
        let mut last = self.last.lock();
        let now = self.inner.now();
        let next = match *last {
            Some(prev) if now <= prev => prev + SignedDuration::from_nanos(1),
            _ => now,
        };
        *last = Some(next);
        next
    }
}
