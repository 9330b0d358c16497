//! Handoff sequencing: cuts continuous work runs at handoff boundaries and
//! assigns each slice to a rotating user group.
//!
//! Boundaries are counted from the rule's effective time, never from the
//! viewed window, so paging the calendar does not change who is on duty.
//! A handoff period that contains no work does not consume a group: the next
//! group takes over at the first boundary that actually separates two pieces
//! of work.

use chrono::{Datelike, Duration, NaiveDateTime};

use crate::expander::resolve_handoff_day;
use crate::interval::{self, Interval};
use crate::rule::{Handoff, WorkType};

/// A piece of work owned by a single group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub interval: Interval,
    pub group_index: usize,
}

/// All handoff instants strictly after `after` and strictly before `until`,
/// in order.
pub fn handoff_boundaries(handoff: &Handoff, after: NaiveDateTime, until: NaiveDateTime) -> Vec<NaiveDateTime> {
    let mut boundaries = Vec::new();
    let mut date = after.date();
    let last = until.date();

    while date <= last {
        let is_handoff_day = match handoff.rotation {
            WorkType::Daily => true,
            WorkType::Weekly => date.weekday().number_from_monday() == handoff.date,
            WorkType::Monthly => date.day() == resolve_handoff_day(handoff.date, date.year(), date.month()),
        };
        if is_handoff_day {
            let instant = date.and_time(handoff.time);
            if after < instant && instant < until {
                boundaries.push(instant);
            }
        }
        date += Duration::days(1);
    }
    boundaries
}

/// Cut one interval at every boundary strictly inside it. The pieces,
/// concatenated, are exactly the input.
pub fn split_at_boundaries(run: Interval, boundaries: &[NaiveDateTime]) -> Vec<Interval> {
    let first = boundaries.partition_point(|b| *b <= run.start);
    let mut pieces = Vec::new();
    let mut cursor = run.start;

    for &boundary in &boundaries[first..] {
        if boundary >= run.end {
            break;
        }
        pieces.push(Interval {
            start: cursor,
            end: boundary,
        });
        cursor = boundary;
    }
    pieces.push(Interval {
        start: cursor,
        end: run.end,
    });
    pieces
}

/// Sequence raw work intervals through the rotation.
///
/// Adjacent raw intervals are first stitched into continuous runs (a wrapping
/// shift is one run across midnight), then every run is cut at the handoff
/// boundaries after `origin`. The group advances once per boundary crossed
/// between consecutive slices and wraps modulo `group_count`.
pub fn sequence(raw: &[Interval], handoff: &Handoff, origin: NaiveDateTime, group_count: usize) -> Vec<Slice> {
    let runs = interval::merge(raw);
    let Some(last_run) = runs.last() else {
        return Vec::new();
    };
    let boundaries = handoff_boundaries(handoff, origin, last_run.end);
    let group_count = group_count.max(1);

    let mut slices = Vec::new();
    let mut rotation = 0usize;
    let mut current_period: Option<usize> = None;

    for run in runs {
        for piece in split_at_boundaries(run, &boundaries) {
            let period = boundaries.partition_point(|b| *b <= piece.start);
            if let Some(previous) = current_period {
                if period != previous {
                    rotation += 1;
                }
            }
            current_period = Some(period);
            slices.push(Slice {
                interval: piece,
                group_index: rotation % group_count,
            });
        }
    }
    slices
}
