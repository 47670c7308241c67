//! Time source for the engine.
//!
//! Every engine operation reads the clock once at its start and uses that value throughout, so a
//! report computed across midnight never mixes two different `today` values.

use chrono::{DateTime, Local, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    /// The current calendar date in the clinic's local time.
    fn today(&self) -> NaiveDate;

    /// The current instant, used for `administered_at` / `created_at` stamps.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a single instant. Used by tests and batch re-evaluation.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    today: NaiveDate,
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(today: NaiveDate, now: DateTime<Utc>) -> Self {
        Self { today, now }
    }

    /// Pins the clock to midday UTC of `today`.
    pub fn on(today: NaiveDate) -> Self {
        let now = today
            .and_hms_opt(12, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        Self { today, now }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
