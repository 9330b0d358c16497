//! Detect time regions covered by more than one rule, and decide who is
//! actually on duty there.
//!
//! Rules are ordered by priority (index 0 = highest). Overlap bands are
//! advisory: they tell the renderer where to draw a marker, but the on-duty
//! answer inside a band is always the highest-priority rule's assignment.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::interval::{self, Interval};
use crate::occurrence::{sort_occurrences, Occurrence, OccurrenceKind};

/// A time region covered by the rules in rows `rule_rows.0..=rule_rows.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapBand {
    pub interval: Interval,
    pub rule_rows: (usize, usize),
}

impl OverlapBand {
    /// `true` when `other` is inside `self` both in time and in rows.
    fn subsumes(&self, other: &OverlapBand) -> bool {
        self.interval.covers(&other.interval)
            && self.rule_rows.0 <= other.rule_rows.0
            && other.rule_rows.1 <= self.rule_rows.1
    }
}

/// Intersect two sorted, non-overlapping interval lists in a single merge
/// sweep. Adjacent intervals do not intersect.
pub fn intersect_sorted(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if let Some(common) = a[i].intersection(&b[j]) {
            out.push(common);
        }
        // Advance whichever interval finishes first.
        if a[i].end <= b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Find overlap bands between every pair of rules, clipped to `window`.
///
/// Each rule's occurrences are first merged into a coverage list, so backups
/// overlapping their own rule never count. Candidates with a wider row span
/// are recorded first; a candidate contained in an already-recorded band is
/// discarded, so three rules overlapping at once produce one `[0, 2]` band
/// rather than three stacked markers. Output is sorted by time, then rows.
pub fn find_overlaps(per_rule: &[Vec<Occurrence>], window: Interval) -> Vec<OverlapBand> {
    let coverage: Vec<Vec<Interval>> = per_rule.iter().map(|occurrences| coverage_of(occurrences, window)).collect();

    let mut candidates = Vec::new();
    for i in 0..coverage.len() {
        for j in (i + 1)..coverage.len() {
            for region in interval::merge(&intersect_sorted(&coverage[i], &coverage[j])) {
                candidates.push(OverlapBand {
                    interval: region,
                    rule_rows: (i, j),
                });
            }
        }
    }

    candidates.sort_by(|a, b| {
        let span_a = a.rule_rows.1 - a.rule_rows.0;
        let span_b = b.rule_rows.1 - b.rule_rows.0;
        span_b
            .cmp(&span_a)
            .then(b.interval.duration().cmp(&a.interval.duration()))
            .then(a.interval.cmp(&b.interval))
            .then(a.rule_rows.cmp(&b.rule_rows))
    });

    let mut recorded: Vec<OverlapBand> = Vec::new();
    for candidate in candidates {
        if recorded.iter().any(|band| band.subsumes(&candidate)) {
            continue;
        }
        recorded.push(candidate);
    }

    recorded.sort_by(|a, b| a.interval.cmp(&b.interval).then(a.rule_rows.cmp(&b.rule_rows)));
    recorded
}

/// The highest-priority non-backup occurrence covering `instant`.
pub fn on_duty_at(per_rule: &[Vec<Occurrence>], instant: NaiveDateTime) -> Option<&Occurrence> {
    per_rule.iter().find_map(|occurrences| {
        occurrences
            .iter()
            .find(|o| o.kind != OccurrenceKind::Backup && o.interval.contains(instant))
    })
}

/// Priority-resolved on-duty timeline.
///
/// Every rule keeps only the time not already claimed by a higher-priority
/// rule. Backups are excluded; they are parallel cover, not the answer to
/// "who is on duty". The result never overlaps itself.
pub fn resolve_on_duty(per_rule: &[Vec<Occurrence>]) -> Vec<Occurrence> {
    let mut claimed: Vec<Interval> = Vec::new();
    let mut resolved = Vec::new();

    for occurrences in per_rule {
        let mut own: Vec<&Occurrence> = occurrences
            .iter()
            .filter(|o| o.kind != OccurrenceKind::Backup)
            .collect();
        own.sort_by_key(|o| o.interval);

        let mut taken_here: Vec<Interval> = Vec::new();
        for occurrence in own {
            // Earlier occurrences of the same rule win over later ones.
            let blocked = interval::merge(&[claimed.as_slice(), taken_here.as_slice()].concat());
            for piece in interval::subtract(&[occurrence.interval], &blocked) {
                resolved.push(occurrence.with_interval(piece));
                taken_here.push(piece);
            }
        }
        claimed = interval::merge(&[claimed, taken_here].concat());
    }

    sort_occurrences(&mut resolved);
    resolved
}

fn coverage_of(occurrences: &[Occurrence], window: Interval) -> Vec<Interval> {
    let clipped: Vec<Interval> = occurrences
        .iter()
        .filter_map(|o| o.interval.clip(window.start, window.end))
        .collect();
    interval::merge(&clipped)
}
