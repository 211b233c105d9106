//! Time source passed explicitly into every engine operation.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::types::Timestamp;

/// Source of "now" for the engine.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to. Millisecond resolution.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn set(&self, time: Timestamp) {
        self.millis.store(time.timestamp_millis(), Ordering::SeqCst);
    }

    /// Move the clock forward and return the new time.
    pub fn advance(&self, by: chrono::Duration) -> Timestamp {
        let millis = self
            .millis
            .fetch_add(by.num_milliseconds(), Ordering::SeqCst)
            + by.num_milliseconds();
        from_millis(millis)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        from_millis(self.millis.load(Ordering::SeqCst))
    }
}

fn from_millis(millis: i64) -> Timestamp {
    chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default()
}
