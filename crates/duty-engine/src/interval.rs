//! Half-open time intervals and sorted-interval helpers.
//!
//! Every interval in the engine is `[start, end)`: the start instant is covered,
//! the end instant is not. Two intervals where one ends exactly when the other
//! starts are *adjacent*, never overlapping.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` interval of local-naive time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    /// Build an interval, returning `None` when it would be empty or inverted.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }

    /// `true` when the two intervals share at least one instant.
    /// Adjacent intervals do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// `true` when `other` lies entirely within `self`.
    pub fn covers(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        Interval::new(self.start.max(other.start), self.end.min(other.end))
    }

    /// Clip to `[lo, hi)`, discarding the interval if nothing remains.
    pub fn clip(&self, lo: NaiveDateTime, hi: NaiveDateTime) -> Option<Interval> {
        Interval::new(self.start.max(lo), self.end.min(hi))
    }
}

/// Merge overlapping or adjacent intervals.
///
/// Returns a sorted, non-overlapping list where no two neighbours touch.
pub fn merge(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.to_vec();
    sorted.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

/// Subtract `minus` from `from`. Both inputs must be sorted and merged
/// (as produced by [`merge`]); the output is too.
pub fn subtract(from: &[Interval], minus: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let mut j = 0;

    for interval in from {
        let mut cursor = interval.start;
        // Skip removals that end before this interval begins.
        while j < minus.len() && minus[j].end <= cursor {
            j += 1;
        }
        let mut k = j;
        while k < minus.len() && minus[k].start < interval.end {
            if minus[k].start > cursor {
                out.push(Interval {
                    start: cursor,
                    end: minus[k].start,
                });
            }
            cursor = cursor.max(minus[k].end);
            if cursor >= interval.end {
                break;
            }
            k += 1;
        }
        if cursor < interval.end {
            out.push(Interval {
                start: cursor,
                end: interval.end,
            });
        }
    }
    out
}

/// Total covered time of a sorted, merged interval list.
pub fn total_duration(intervals: &[Interval]) -> Duration {
    intervals
        .iter()
        .fold(Duration::zero(), |acc, interval| acc + interval.duration())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn iv(day: u32, sh: u32, eh: u32) -> Interval {
        Interval::new(at(day, sh, 0), at(day, eh, 0)).unwrap()
    }

    #[test]
    fn empty_interval_is_rejected() {
        assert!(Interval::new(at(1, 9, 0), at(1, 9, 0)).is_none());
        assert!(Interval::new(at(1, 10, 0), at(1, 9, 0)).is_none());
    }

    #[test]
    fn adjacent_intervals_do_not_overlap_but_merge() {
        let a = iv(1, 9, 10);
        let b = iv(1, 10, 11);
        assert!(!a.overlaps(&b));
        assert_eq!(merge(&[b, a]), vec![iv(1, 9, 11)]);
    }

    #[test]
    fn subtract_punches_holes() {
        let from = vec![iv(1, 8, 18)];
        let minus = vec![iv(1, 9, 10), iv(1, 12, 13), iv(1, 17, 20)];
        assert_eq!(
            subtract(&from, &minus),
            vec![iv(1, 8, 9), iv(1, 10, 12), iv(1, 13, 17)]
        );
    }

    #[test]
    fn subtract_spanning_removal_consumes_several_intervals() {
        let from = vec![iv(1, 8, 9), iv(1, 10, 11), iv(1, 12, 14)];
        let minus = vec![iv(1, 7, 13)];
        assert_eq!(subtract(&from, &minus), vec![iv(1, 13, 14)]);
    }
}
