//! The full pipeline: rule records in, render-ready schedule out.
//!
//! [`compute_schedule`] is a pure function of its inputs. Every stage gets a
//! fresh value from the previous one; nothing is mutated after it has been
//! handed on, and every collection in the output is ordered, so identical
//! inputs serialize to identical bytes.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clipper::{clip_occurrences, rule_bounds};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::expander::{expand_duty_time, expand_rule, expand_work_time};
use crate::freetime::{find_first_free, find_free_intervals};
use crate::handoff::{sequence, Slice};
use crate::interval::{self, Interval};
use crate::lanes::assign_lanes;
use crate::occurrence::{sort_occurrences, Occurrence, OccurrenceKind};
use crate::overlap::{find_overlaps, resolve_on_duty};
use crate::percent::{day_interval, range_within, split_by_day, FractionalRange};
use crate::preview::{preview_occurrences, PreviewRecord};
use crate::rule::{DutyRule, DutyUser, RuleId, RuleRecord};
use crate::window::TimeWindow;

/// Everything the caller sends in one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub rules: Vec<RuleRecord>,
    #[serde(default)]
    pub previews: Vec<PreviewRecord>,
}

impl ScheduleInput {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The rule contributes nothing.
    Error,
    /// Part of the rule (a backup or an exclusion) was skipped.
    Warning,
}

/// A problem with one rule, reported next to the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub rule_id: RuleId,
    pub severity: Severity,
    pub message: String,
}

/// One drawable piece of an occurrence inside a single day column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub users: Vec<DutyUser>,
    pub color: String,
    pub group_index: Option<usize>,
    pub kind: OccurrenceKind,
    pub lane: usize,
    pub time_range: Interval,
    /// Position within the day column.
    pub fractional_range: FractionalRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateColumn {
    pub date: NaiveDate,
    pub bands: Vec<Band>,
}

/// A rule's row in the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRow {
    pub rule_id: RuleId,
    pub category: String,
    /// Priority position; 0 is the highest priority.
    pub row: usize,
    /// Number of lanes needed to draw this row without overlaps.
    pub max_row: usize,
    pub occurrences: Vec<Occurrence>,
    pub columns: Vec<DateColumn>,
}

/// A span of the window with its position across the whole window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBand {
    pub time_range: Interval,
    pub fractional_range: FractionalRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapMarker {
    pub time_range: Interval,
    pub rule_rows: (usize, usize),
    pub fractional_range: FractionalRange,
}

/// The render-ready result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub window: TimeWindow,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<RuleRow>,
    /// Who is actually on duty, by priority; never overlaps itself.
    pub on_duty: Vec<Occurrence>,
    pub free: Vec<TimeBand>,
    pub overlaps: Vec<OverlapMarker>,
    pub issues: Vec<ValidationIssue>,
}

impl Schedule {
    /// The authoritative assignment at `instant`, if anyone is on duty.
    pub fn on_duty_at(&self, instant: NaiveDateTime) -> Option<&Occurrence> {
        let index = self.on_duty.partition_point(|o| o.interval.end <= instant);
        self.on_duty
            .get(index)
            .filter(|o| o.interval.contains(instant))
    }

    /// The first free interval lasting at least `min_duration`.
    pub fn first_free(&self, min_duration: Duration) -> Option<Interval> {
        let busy: Vec<Interval> = self
            .rows
            .iter()
            .flat_map(|row| row.occurrences.iter().map(|o| o.interval))
            .collect();
        find_first_free(&busy, self.window.as_interval(), min_duration)
    }
}

/// Run the pipeline.
///
/// Disabled rules are skipped. A malformed rule keeps its row (so row numbers
/// match the caller's rule order) but contributes no occurrences, and an
/// error issue names it. A preview for a rule replaces the rule's derived
/// rotation; its backups are still derived.
pub fn compute_schedule(
    rules: &[RuleRecord],
    previews: &[PreviewRecord],
    window: &TimeWindow,
    now: NaiveDateTime,
    config: &EngineConfig,
) -> Schedule {
    let window_interval = window.as_interval();
    let mut issues = Vec::new();
    let mut color_offset = 0;
    let mut per_rule: Vec<Vec<Occurrence>> = Vec::new();
    let mut active: Vec<&RuleRecord> = Vec::new();

    for record in rules.iter().filter(|r| r.enabled) {
        let parsed = DutyRule::from_record(record, now, config, color_offset);
        color_offset += record.duty_users.len();

        let occurrences = match parsed {
            Ok(rule) => {
                issues.extend(rule.warnings.iter().map(|message| ValidationIssue {
                    rule_id: rule.id,
                    severity: Severity::Warning,
                    message: message.clone(),
                }));
                let mut occurrences = match merged_preview(previews, rule.id) {
                    Some(preview) => {
                        let planned = preview_occurrences(&preview, Some(&rule), config);
                        clip_occurrences(planned, window_interval.start, window_interval.end)
                    }
                    None => primary_occurrences(&rule, window),
                };
                occurrences.extend(backup_occurrences(&rule, window, config));
                sort_occurrences(&mut occurrences);
                occurrences
            }
            Err(e) => {
                warn!(rule_id = record.id, error = %e, "rule is malformed, rendering it empty");
                issues.push(ValidationIssue {
                    rule_id: record.id,
                    severity: Severity::Error,
                    message: e.to_string(),
                });
                Vec::new()
            }
        };
        debug!(rule_id = record.id, occurrences = occurrences.len(), "expanded rule");
        per_rule.push(occurrences);
        active.push(record);
    }

    let overlaps: Vec<OverlapMarker> = find_overlaps(&per_rule, window_interval)
        .into_iter()
        .map(|band| OverlapMarker {
            time_range: band.interval,
            rule_rows: band.rule_rows,
            fractional_range: range_within(&window_interval, &band.interval),
        })
        .collect();

    let on_duty = resolve_on_duty(&per_rule);

    let busy: Vec<Interval> = per_rule
        .iter()
        .flat_map(|occurrences| occurrences.iter().map(|o| o.interval))
        .collect();
    let free: Vec<TimeBand> = find_free_intervals(&busy, window_interval, config.min_free_gap())
        .into_iter()
        .map(|gap| TimeBand {
            time_range: gap,
            fractional_range: range_within(&window_interval, &gap),
        })
        .collect();

    let dates = window.dates();
    let rows: Vec<RuleRow> = active
        .iter()
        .zip(per_rule)
        .enumerate()
        .map(|(row, (record, occurrences))| build_row(record, row, occurrences, &dates))
        .collect();

    debug!(
        rules = rows.len(),
        overlaps = overlaps.len(),
        free = free.len(),
        issues = issues.len(),
        "schedule computed"
    );

    Schedule {
        window: *window,
        dates,
        rows,
        on_duty,
        free,
        overlaps,
        issues,
    }
}

/// Occurrences from the rule's own work time and rotation, clipped to the
/// rule's active span and the window.
///
/// A rotating rule is expanded day by day from its effective time, because
/// periods without work do not advance the rotation. The cost is linear in
/// the days between the effective time and the window end, not in the
/// window length; a rule effective decades ago costs thousands of days of
/// expansion per call.
pub fn primary_occurrences(rule: &DutyRule, window: &TimeWindow) -> Vec<Occurrence> {
    let Some(bounds) = rule_bounds(rule, window) else {
        return Vec::new();
    };

    let slices: Vec<Slice> = match &rule.handoff {
        Some(handoff) => {
            // The rotation position depends on every period since the
            // effective time, not just the visible ones.
            let raw = expand_work_time(rule, rule.effective_time, bounds.end);
            sequence(&raw, handoff, rule.effective_time, rule.groups.len())
        }
        None => interval::merge(&expand_rule(rule, window))
            .into_iter()
            .map(|interval| Slice {
                interval,
                group_index: 0,
            })
            .collect(),
    };

    let occurrences = slices
        .into_iter()
        .map(|slice| {
            let group = rule.groups.get(slice.group_index);
            Occurrence {
                rule_id: rule.id,
                interval: slice.interval,
                group_index: Some(slice.group_index),
                users: group.map(|g| g.users.clone()).unwrap_or_default(),
                color: group.map(|g| g.color.clone()).unwrap_or_default(),
                kind: OccurrenceKind::Primary,
            }
        })
        .collect();

    clip_occurrences(occurrences, bounds.start, bounds.end)
}

/// Occurrences of the rule's backups inside the window, minus their
/// exclusions.
pub fn backup_occurrences(rule: &DutyRule, window: &TimeWindow, config: &EngineConfig) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    for backup in &rule.backups {
        let Some(span) = backup.span.intersection(&window.as_interval()) else {
            continue;
        };
        let covered = interval::merge(&expand_duty_time(&backup.duty_time, span.start, span.end));
        let excluded = interval::merge(&backup.excluded);
        for piece in interval::subtract(&covered, &excluded) {
            occurrences.push(Occurrence {
                rule_id: rule.id,
                interval: piece,
                group_index: None,
                users: backup.users.clone(),
                color: config.backup_color.clone(),
                kind: OccurrenceKind::Backup,
            });
        }
    }
    occurrences
}

/// Combine every preview sent for `rule_id` into one.
fn merged_preview(previews: &[PreviewRecord], rule_id: RuleId) -> Option<PreviewRecord> {
    let matching: Vec<&PreviewRecord> = previews.iter().filter(|p| p.rule_id == rule_id).collect();
    if matching.is_empty() {
        return None;
    }
    Some(PreviewRecord {
        rule_id,
        duty_plans: matching
            .into_iter()
            .flat_map(|p| p.duty_plans.iter().cloned())
            .collect(),
    })
}

fn build_row(record: &RuleRecord, row: usize, occurrences: Vec<Occurrence>, dates: &[NaiveDate]) -> RuleRow {
    let intervals: Vec<Interval> = occurrences.iter().map(|o| o.interval).collect();
    let lanes = assign_lanes(&intervals);

    let mut columns: Vec<DateColumn> = dates
        .iter()
        .map(|&date| DateColumn {
            date,
            bands: Vec::new(),
        })
        .collect();

    for (occurrence, &lane) in occurrences.iter().zip(&lanes.lanes) {
        for (date, piece) in split_by_day(&occurrence.interval) {
            let Some(column) = columns.iter_mut().find(|c| c.date == date) else {
                continue;
            };
            column.bands.push(Band {
                users: occurrence.users.clone(),
                color: occurrence.color.clone(),
                group_index: occurrence.group_index,
                kind: occurrence.kind,
                lane,
                time_range: piece,
                fractional_range: range_within(&day_interval(date), &piece),
            });
        }
    }
    for column in &mut columns {
        column
            .bands
            .sort_by(|a, b| a.time_range.cmp(&b.time_range).then(a.lane.cmp(&b.lane)));
    }

    RuleRow {
        rule_id: record.id,
        category: record.category.clone(),
        row,
        max_row: lanes.max_row,
        occurrences,
        columns,
    }
}
