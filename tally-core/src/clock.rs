use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};

/// Abstraction over "current time" to make default windows deterministic in tests.
pub trait Clock: Send + Sync {
    /// Wall-clock time in the organization's local calendar
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    fn current_year(&self) -> i32 {
        self.now().year()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClock {
    now: NaiveDateTime,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }
}
