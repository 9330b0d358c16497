//! Server-precomputed duty plans.
//!
//! When the backend has already arranged a rule, its plans are used as-is
//! instead of re-deriving the rotation. Plans are frequently repeated across
//! pages of the server response, so they are deduplicated by
//! `(user_index, start, end)`.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::EngineConfig;
use crate::interval::Interval;
use crate::occurrence::{sort_occurrences, Occurrence, OccurrenceKind};
use crate::rule::{parse_inclusive_end, parse_timestamp, DutyRule, DutyUser, RuleId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewRecord {
    pub rule_id: RuleId,
    #[serde(default)]
    pub duty_plans: Vec<DutyPlanRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyPlanRecord {
    #[serde(default)]
    pub users: Vec<DutyUser>,
    #[serde(default)]
    pub user_index: usize,
    #[serde(default)]
    pub work_times: Vec<WorkTimeRecord>,
}

/// One planned shift. `end_time` names the last covered minute (or second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkTimeRecord {
    pub start_time: String,
    pub end_time: String,
}

/// Identity of a planned shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlanKey {
    pub user_index: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Convert a preview into occurrences, dropping duplicates and malformed
/// shifts.
///
/// Colors follow the rule's own group colors when `rule` is known, so a
/// precomputed plan looks the same as a derived one. The group index is then
/// reduced modulo the rule's group count; without a rule it is kept as sent.
pub fn preview_occurrences(preview: &PreviewRecord, rule: Option<&DutyRule>, config: &EngineConfig) -> Vec<Occurrence> {
    let mut seen: BTreeSet<PlanKey> = BTreeSet::new();
    let mut occurrences = Vec::new();

    for plan in &preview.duty_plans {
        for work_time in &plan.work_times {
            let Some(interval) = parse_work_time(work_time) else {
                warn!(
                    rule_id = preview.rule_id,
                    start = %work_time.start_time,
                    end = %work_time.end_time,
                    "skipping malformed preview work time"
                );
                continue;
            };

            let key = PlanKey {
                user_index: plan.user_index,
                start: interval.start,
                end: interval.end,
            };
            if !seen.insert(key) {
                continue;
            }

            // Server indexes keep counting past the last group.
            let group_index = match rule.map(|r| r.groups.len()) {
                Some(groups) if groups > 0 => plan.user_index % groups,
                _ => plan.user_index,
            };
            let group = rule.and_then(|r| r.groups.get(group_index));
            let users = if plan.users.is_empty() {
                group.map(|g| g.users.clone()).unwrap_or_default()
            } else {
                plan.users.clone()
            };
            occurrences.push(Occurrence {
                rule_id: preview.rule_id,
                interval,
                group_index: Some(group_index),
                users,
                color: group
                    .map(|g| g.color.clone())
                    .unwrap_or_else(|| config.preview_color.clone()),
                kind: OccurrenceKind::Preview,
            });
        }
    }

    sort_occurrences(&mut occurrences);
    occurrences
}

fn parse_work_time(work_time: &WorkTimeRecord) -> Option<Interval> {
    let start = parse_timestamp(&work_time.start_time).ok()?;
    let end = parse_inclusive_end(&work_time.end_time).ok()?;
    Interval::new(start, end)
}
