//! Rule expansion: converts a rule's declarative work time into concrete
//! per-day intervals.
//!
//! Each `duty_time` entry is applied to every calendar day that qualifies as a
//! work day (every day for daily, matching ISO weekdays for weekly, matching
//! days of month for monthly, with 31 meaning the last day of the month).
//! Wrapping ranges place their morning tail on the day after the work day.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::interval::Interval;
use crate::rule::{DutyRule, DutyTime, WorkType};
use crate::window::TimeWindow;

/// Day-of-month value that always means "last day of the month".
pub const LAST_DAY_OF_MONTH: u32 = 31;

/// Number of days in the given month.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Resolve a monthly work day against a concrete month.
///
/// `31` resolves to the month's last day; any other value must exist in the
/// month, so day 30 never fires in February.
pub fn resolve_work_day(day: u32, year: i32, month: u32) -> Option<u32> {
    let last = last_day_of_month(year, month);
    if day == LAST_DAY_OF_MONTH {
        Some(last)
    } else if day <= last {
        Some(day)
    } else {
        None
    }
}

/// Resolve a monthly handoff date against a concrete month, clamping to the
/// month's last day so every month has exactly one handoff.
pub fn resolve_handoff_day(day: u32, year: i32, month: u32) -> u32 {
    day.min(last_day_of_month(year, month))
}

/// Whether `date` is a work day for this duty time.
pub fn is_work_day(duty_time: &DutyTime, date: NaiveDate) -> bool {
    match duty_time.work_type {
        WorkType::Daily => true,
        WorkType::Weekly => duty_time
            .work_days
            .contains(&date.weekday().number_from_monday()),
        WorkType::Monthly => duty_time
            .work_days
            .iter()
            .any(|&day| resolve_work_day(day, date.year(), date.month()) == Some(date.day())),
    }
}

/// Expand one duty time into raw intervals clipped to `[lo, hi)`.
///
/// The day before `lo` is visited too so that a wrapping range started the
/// previous evening contributes its morning tail. Output is sorted.
pub fn expand_duty_time(duty_time: &DutyTime, lo: NaiveDateTime, hi: NaiveDateTime) -> Vec<Interval> {
    let mut intervals = Vec::new();
    if lo >= hi {
        return intervals;
    }

    let mut date = lo.date() - Duration::days(1);
    let last = hi.date();
    while date <= last {
        if is_work_day(duty_time, date) {
            for range in &duty_time.ranges {
                intervals.extend(
                    range
                        .intervals_on(date)
                        .into_iter()
                        .filter_map(|interval| interval.clip(lo, hi)),
                );
            }
        }
        date += Duration::days(1);
    }

    intervals.sort();
    intervals
}

/// Expand all of a rule's duty times into raw per-day intervals clipped to
/// `[lo, hi)`.
///
/// Overlapping pieces from different duty times are fused so the rule never
/// overlaps itself; merely adjacent pieces (such as the two halves of a
/// wrapping range) stay separate.
pub fn expand_work_time(rule: &DutyRule, lo: NaiveDateTime, hi: NaiveDateTime) -> Vec<Interval> {
    let mut raw: Vec<Interval> = rule
        .duty_times
        .iter()
        .flat_map(|duty_time| expand_duty_time(duty_time, lo, hi))
        .collect();
    raw.sort();

    let mut fused: Vec<Interval> = Vec::with_capacity(raw.len());
    for interval in raw {
        if let Some(last) = fused.last_mut() {
            if interval.start < last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        fused.push(interval);
    }
    fused
}

/// Expand a rule over a window.
///
/// Intervals before the rule's effective time are dropped and a straddling
/// interval is truncated to start exactly at the effective time. The rule's
/// end time bounds the other side.
pub fn expand_rule(rule: &DutyRule, window: &TimeWindow) -> Vec<Interval> {
    let lo = window.start().max(rule.effective_time);
    let hi = match rule.end_time {
        Some(end) => window.end().min(end),
        None => window.end(),
    };
    expand_work_time(rule, lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_lengths() {
        assert_eq!(last_day_of_month(2026, 1), 31);
        assert_eq!(last_day_of_month(2026, 2), 28);
        assert_eq!(last_day_of_month(2028, 2), 29);
        assert_eq!(last_day_of_month(2026, 4), 30);
        assert_eq!(last_day_of_month(2026, 12), 31);
    }

    #[test]
    fn day_31_means_last_day() {
        assert_eq!(resolve_work_day(31, 2026, 2), Some(28));
        assert_eq!(resolve_work_day(31, 2026, 4), Some(30));
        assert_eq!(resolve_work_day(30, 2026, 2), None);
        assert_eq!(resolve_work_day(15, 2026, 2), Some(15));
        assert_eq!(resolve_handoff_day(30, 2026, 2), 28);
        assert_eq!(resolve_handoff_day(31, 2028, 2), 29);
    }
}
