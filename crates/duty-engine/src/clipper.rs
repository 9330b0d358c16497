//! Range clipping for occurrences.

use chrono::NaiveDateTime;

use crate::interval::Interval;
use crate::occurrence::Occurrence;
use crate::rule::DutyRule;
use crate::window::TimeWindow;

/// The part of `window` in which `rule` may be on duty:
/// `[max(effective, window start), min(end time, window end))`.
pub fn rule_bounds(rule: &DutyRule, window: &TimeWindow) -> Option<Interval> {
    rule.active_span()?.intersection(&window.as_interval())
}

/// Clip every occurrence to `[lo, hi)`, dropping those left empty.
pub fn clip_occurrences(occurrences: Vec<Occurrence>, lo: NaiveDateTime, hi: NaiveDateTime) -> Vec<Occurrence> {
    occurrences
        .into_iter()
        .filter_map(|occurrence| {
            let clipped = occurrence.interval.clip(lo, hi)?;
            Some(if clipped == occurrence.interval {
                occurrence
            } else {
                occurrence.with_interval(clipped)
            })
        })
        .collect()
}
