//! Expiration window shared by the expiration rule and the date picker.
//!
//! Both checks go through [`ExpirationWindow::check`], so a date the picker
//! offers is always a date the rule accepts and vice versa:
//! - lower bound: end of the current day (in `now`'s offset), inclusive.
//! - upper bound: at most `max_days` whole days after the start of today.

use chrono::{DateTime, FixedOffset, TimeDelta, Timelike};

pub const DEFAULT_MAX_DAYS: i64 = 60;
pub const DEFAULT_OFFSET_DAYS: i64 = 28;

/// Why a timestamp falls outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationViolation {
    /// At or before `now`.
    InPast,
    /// Later today; the earliest allowed instant is the end of today.
    Today,
    /// More than `max_days` days out.
    TooFar { max_days: i64 },
}

impl ExpirationViolation {
    pub fn message(self) -> String {
        match self {
            ExpirationViolation::InPast => "Expiration must be in the future".to_string(),
            ExpirationViolation::Today => "Expiration must be after the end of today".to_string(),
            ExpirationViolation::TooFar { max_days } => {
                format!("Expiration cannot be more than {max_days} days from now")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationWindow {
    now: DateTime<FixedOffset>,
    start_of_day: DateTime<FixedOffset>,
    end_of_day: DateTime<FixedOffset>,
    max_days: i64,
}

impl ExpirationWindow {
    pub fn new(now: DateTime<FixedOffset>, max_days: i64) -> Self {
        let since_midnight = TimeDelta::seconds(i64::from(now.num_seconds_from_midnight()))
            + TimeDelta::nanoseconds(i64::from(now.nanosecond()));
        let start_of_day = now - since_midnight;
        let end_of_day = start_of_day + TimeDelta::days(1) - TimeDelta::milliseconds(1);
        Self {
            now,
            start_of_day,
            end_of_day,
            max_days,
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    pub fn max_days(&self) -> i64 {
        self.max_days
    }

    /// Earliest accepted instant.
    pub fn earliest(&self) -> DateTime<FixedOffset> {
        self.end_of_day
    }

    pub fn check(&self, candidate: DateTime<FixedOffset>) -> Result<(), ExpirationViolation> {
        if candidate <= self.now {
            return Err(ExpirationViolation::InPast);
        }
        if candidate < self.end_of_day {
            return Err(ExpirationViolation::Today);
        }
        // Whole days, truncated toward zero.
        if (candidate - self.start_of_day).num_days() > self.max_days {
            return Err(ExpirationViolation::TooFar {
                max_days: self.max_days,
            });
        }
        Ok(())
    }

    pub fn contains(&self, candidate: DateTime<FixedOffset>) -> bool {
        self.check(candidate).is_ok()
    }

    /// Date-picker predicate: a candidate is greyed out iff the rule rejects it.
    pub fn is_disabled(&self, candidate: DateTime<FixedOffset>) -> bool {
        !self.contains(candidate)
    }

    /// Default expiration offered for a fresh form.
    pub fn default_expiration(&self, offset_days: i64) -> DateTime<FixedOffset> {
        self.now + TimeDelta::days(offset_days)
    }
}
