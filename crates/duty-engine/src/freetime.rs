//! Compute free (idle) time inside the window.
//!
//! Sorts occupied intervals, merges overlapping or adjacent ones, then walks
//! the window collecting the gaps. Gaps shorter than the noise threshold are
//! dropped; these only arise from second-level effective times cutting into
//! minute-aligned work time.

use chrono::Duration;

use crate::interval::{self, Interval};

/// Free intervals of `window` not covered by any of `busy`.
///
/// - no busy intervals: the whole window is free;
/// - one busy interval: at most two free intervals, before and after;
/// - gaps with `duration < min_gap` are discarded.
pub fn find_free_intervals(busy: &[Interval], window: Interval, min_gap: Duration) -> Vec<Interval> {
    let clipped: Vec<Interval> = busy
        .iter()
        .filter_map(|b| b.clip(window.start, window.end))
        .collect();
    let merged = interval::merge(&clipped);

    let mut free = Vec::new();
    let mut cursor = window.start;
    for busy in &merged {
        if let Some(gap) = Interval::new(cursor, busy.start) {
            free.push(gap);
        }
        cursor = cursor.max(busy.end);
    }
    // Trailing free interval after the last busy period.
    if let Some(gap) = Interval::new(cursor, window.end) {
        free.push(gap);
    }

    free.retain(|gap| gap.duration() >= min_gap);
    free
}

/// The first free interval lasting at least `min_duration`.
pub fn find_first_free(busy: &[Interval], window: Interval, min_duration: Duration) -> Option<Interval> {
    find_free_intervals(busy, window, Duration::zero())
        .into_iter()
        .find(|gap| gap.duration() >= min_duration)
}
