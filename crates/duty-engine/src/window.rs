//! The calendar query window: a whole number of days starting at midnight.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{DutyError, Result};
use crate::interval::Interval;

/// Number of days shown by the rotation preview unless the caller asks otherwise.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// A `[start, start + days)` window aligned to local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_date: NaiveDate,
    pub days: u32,
}

impl TimeWindow {
    /// # Errors
    /// Returns `DutyError::InvalidWindow` when `days` is zero or the window
    /// would end past the last representable date.
    pub fn new(start_date: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(DutyError::InvalidWindow(
                "window must span at least one day".to_string(),
            ));
        }
        if start_date.checked_add_days(Days::new(days.into())).is_none() {
            return Err(DutyError::InvalidWindow(format!(
                "{} days from {} is out of range",
                days, start_date
            )));
        }
        Ok(Self { start_date, days })
    }

    /// A default-length window starting on the date of `now`.
    pub fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            start_date: now.date(),
            days: DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start_date.and_time(chrono::NaiveTime::MIN)
    }

    /// Saturates at `NaiveDateTime::MAX` for a window that was deserialized
    /// without going through [`TimeWindow::new`].
    pub fn end(&self) -> NaiveDateTime {
        self.start()
            .checked_add_days(Days::new(self.days.into()))
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn as_interval(&self) -> Interval {
        Interval {
            start: self.start(),
            end: self.end(),
        }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.as_interval().contains(instant)
    }

    /// Every date covered by the window, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take(self.days as usize)
            .collect()
    }

    /// Move the window by `pages` whole window lengths (negative = backwards).
    ///
    /// # Errors
    /// Returns `DutyError::InvalidWindow` when the moved window leaves the
    /// representable date range.
    pub fn shifted(&self, pages: i64) -> Result<Self> {
        let out_of_range = || {
            DutyError::InvalidWindow(format!(
                "shifting {} by {} windows is out of range",
                self.start_date, pages
            ))
        };
        let offset = pages
            .checked_mul(i64::from(self.days))
            .and_then(Duration::try_days)
            .ok_or_else(out_of_range)?;
        let start_date = self
            .start_date
            .checked_add_signed(offset)
            .ok_or_else(out_of_range)?;
        Self::new(start_date, self.days)
    }

    pub fn next(&self) -> Result<Self> {
        self.shifted(1)
    }

    pub fn previous(&self) -> Result<Self> {
        self.shifted(-1)
    }
}
