//! Map timestamps to fractional and pixel coordinates and back.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::rule::MINUTES_PER_DAY;

/// A `[start, end]` span in fractions of some reference interval (a day
/// column or the whole window).
///
/// The boundary flags mark spans that begin or end exactly on local midnight,
/// so a renderer can skip the border it would otherwise draw twice where two
/// day columns meet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractionalRange {
    pub start: f64,
    pub end: f64,
    pub starts_at_day_boundary: bool,
    pub ends_at_day_boundary: bool,
}

/// Position of `instant` within `reference`, clamped to `[0, 1]`.
pub fn fraction_of(reference: &Interval, instant: NaiveDateTime) -> f64 {
    let total = reference.duration().num_seconds();
    if total <= 0 {
        return 0.0;
    }
    let offset = (instant - reference.start).num_seconds();
    (offset as f64 / total as f64).clamp(0.0, 1.0)
}

/// Inverse of [`fraction_of`], rounded to the nearest second.
pub fn instant_at(reference: &Interval, fraction: f64) -> NaiveDateTime {
    let total = reference.duration().num_seconds() as f64;
    let offset = (fraction.clamp(0.0, 1.0) * total).round() as i64;
    reference.start + Duration::seconds(offset)
}

pub fn to_pixels(fraction: f64, width: f64) -> f64 {
    fraction * width
}

pub fn from_pixels(pixels: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    (pixels / width).clamp(0.0, 1.0)
}

pub fn is_day_boundary(instant: NaiveDateTime) -> bool {
    instant.time() == NaiveTime::MIN
}

/// Fractional span of `interval` relative to `reference`.
pub fn range_within(reference: &Interval, interval: &Interval) -> FractionalRange {
    FractionalRange {
        start: fraction_of(reference, interval.start),
        end: fraction_of(reference, interval.end),
        starts_at_day_boundary: is_day_boundary(interval.start),
        ends_at_day_boundary: is_day_boundary(interval.end),
    }
}

/// The day `date` as an interval.
pub fn day_interval(date: NaiveDate) -> Interval {
    let start = date.and_time(NaiveTime::MIN);
    Interval {
        start,
        end: start + Duration::days(1),
    }
}

/// Split an interval at every midnight it crosses.
pub fn split_by_day(interval: &Interval) -> Vec<(NaiveDate, Interval)> {
    let mut pieces = Vec::new();
    let mut date = interval.start.date();
    while date.and_time(NaiveTime::MIN) < interval.end {
        if let Some(piece) = interval.intersection(&day_interval(date)) {
            pieces.push((date, piece));
        }
        date += Duration::days(1);
    }
    pieces
}

/// Minutes since midnight; the end of a day column (next midnight) maps to
/// 1440 when `date` is the day being measured.
pub fn minute_of_day(date: NaiveDate, instant: NaiveDateTime) -> u32 {
    let day = day_interval(date);
    if instant >= day.end {
        return MINUTES_PER_DAY;
    }
    if instant <= day.start {
        return 0;
    }
    instant.hour() * 60 + instant.minute()
}

/// Format a minute of day as `"HH:MM"`; 1440 prints as `"24:00"`.
pub fn format_minute(minute: u32) -> String {
    let minute = minute.min(MINUTES_PER_DAY);
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// The `(start, end)` minute-of-day pair of an interval lying within `date`.
pub fn minute_range(date: NaiveDate, interval: &Interval) -> (u32, u32) {
    (minute_of_day(date, interval.start), minute_of_day(date, interval.end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn fraction_roundtrips_through_instant() {
        let day = day_interval(NaiveDate::from_ymd_opt(2026, 3, 16).unwrap());
        let noon = at(16, 12, 0);
        assert_eq!(fraction_of(&day, noon), 0.5);
        assert_eq!(instant_at(&day, 0.5), noon);
        assert_eq!(instant_at(&day, 0.25), at(16, 6, 0));
    }

    #[test]
    fn fractions_are_clamped_to_the_reference() {
        let day = day_interval(NaiveDate::from_ymd_opt(2026, 3, 16).unwrap());
        assert_eq!(fraction_of(&day, at(15, 23, 0)), 0.0);
        assert_eq!(fraction_of(&day, at(17, 1, 0)), 1.0);
        assert_eq!(instant_at(&day, 7.0), day.end);
    }

    #[test]
    fn pixels_scale_linearly() {
        assert_eq!(to_pixels(0.25, 800.0), 200.0);
        assert_eq!(from_pixels(200.0, 800.0), 0.25);
        assert_eq!(from_pixels(10.0, 0.0), 0.0);
    }

    #[test]
    fn split_by_day_cuts_at_midnight() {
        let overnight = Interval::new(at(16, 22, 0), at(17, 6, 1)).unwrap();
        let pieces = split_by_day(&overnight);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].1.end, at(17, 0, 0));
        assert_eq!(pieces[1].1.start, at(17, 0, 0));

        let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        assert_eq!(minute_range(date, &pieces[0].1), (1320, MINUTES_PER_DAY));
        assert_eq!(format_minute(MINUTES_PER_DAY), "24:00");
        assert_eq!(format_minute(361), "06:01");
    }

    #[test]
    fn midnight_start_is_flagged() {
        let day = day_interval(NaiveDate::from_ymd_opt(2026, 3, 17).unwrap());
        let morning = Interval::new(at(17, 0, 0), at(17, 6, 1)).unwrap();
        let range = range_within(&day, &morning);
        assert!(range.starts_at_day_boundary);
        assert!(!range.ends_at_day_boundary);
        assert_eq!(range.start, 0.0);
    }
}
