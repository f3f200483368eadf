use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use std::sync::{Mutex, PoisonError};

/// Source of "now" for accrual and approval timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    fn current_year(&self) -> i32 {
        self.today().year()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Manually driven clock, for tests and replaying past dates.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock pinned to midnight of `date`.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_time(chrono::NaiveTime::MIN))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn set_date(&self, date: NaiveDate) {
        self.set(date.and_time(chrono::NaiveTime::MIN));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_moves_only_when_told() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        let clock = FixedClock::on(start);
        assert_eq!(clock.today(), start);
        assert_eq!(clock.current_year(), 2026);

        clock.set_date(NaiveDate::from_ymd_opt(2027, 2, 1).unwrap());
        assert_eq!(clock.current_year(), 2027);
    }
}
