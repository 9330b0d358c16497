//! Duty rules: wire records as the admin app sends them, and the validated
//! domain form the pipeline works on.
//!
//! Validation is strict per rule but never global. [`DutyRule::from_record`]
//! returns an error for a malformed rule, and the schedule stage turns that
//! error into a validation issue keyed by rule id so the other rules still
//! render.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::{DutyError, Result};
use crate::interval::Interval;

pub type RuleId = u64;

/// Minutes in one day; the exclusive upper bound of a minute-of-day value.
pub const MINUTES_PER_DAY: u32 = 1440;

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

/// A rotation rule exactly as the admin app stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Explicit rotation switch. When absent the rule rotates iff its
    /// category is `"handoff"`.
    #[serde(default)]
    pub need_rotation: Option<bool>,
    #[serde(default)]
    pub duty_time: Vec<DutyTimeRecord>,
    #[serde(default)]
    pub duty_users: Vec<Vec<DutyUser>>,
    #[serde(default)]
    pub handoff_time: Option<HandoffRecord>,
    #[serde(default)]
    pub effective_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub backups: Vec<BackupRecord>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DutyTimeRecord {
    #[serde(default)]
    pub work_type: String,
    #[serde(default)]
    pub work_days: Vec<u32>,
    #[serde(default)]
    pub work_time: WorkTimeField,
}

/// `work_time` is a single `"HH:MM--HH:MM"` string in the preview form and a
/// list of them in the stored rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkTimeField {
    One(String),
    Many(Vec<String>),
}

impl Default for WorkTimeField {
    fn default() -> Self {
        WorkTimeField::Many(Vec::new())
    }
}

impl WorkTimeField {
    fn entries(&self) -> Vec<&str> {
        let entries: Vec<&str> = match self {
            WorkTimeField::One(text) => vec![text.as_str()],
            WorkTimeField::Many(list) => list.iter().map(|s| s.as_str()).collect(),
        };
        entries
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect()
    }
}

/// A user or user group on duty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DutyUser {
    pub id: String,
    #[serde(default, alias = "display_name")]
    pub name: String,
    #[serde(rename = "type", default = "default_user_type")]
    pub kind: String,
}

fn default_user_type() -> String {
    "user".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRecord {
    #[serde(default)]
    pub rotation_type: String,
    #[serde(default)]
    pub date: Option<u32>,
    #[serde(default)]
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    #[serde(default)]
    pub users: Vec<DutyUser>,
    pub begin_time: String,
    pub end_time: String,
    pub duty_time: DutyTimeRecord,
    #[serde(default)]
    pub exclude_settings: Vec<ExcludeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludeRecord {
    pub date: String,
    pub time: String,
}

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    Daily,
    Weekly,
    Monthly,
}

impl FromStr for WorkType {
    type Err = DutyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "daily" => Ok(WorkType::Daily),
            "weekly" => Ok(WorkType::Weekly),
            "monthly" => Ok(WorkType::Monthly),
            other => Err(DutyError::InvalidWorkType(other.to_string())),
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkType::Daily => "daily",
            WorkType::Weekly => "weekly",
            WorkType::Monthly => "monthly",
        })
    }
}

/// A daily work-time definition in minutes of day.
///
/// `end_minute` is the *last covered minute*, so `"09:00--18:00"` covers
/// `[09:00, 18:01)`. A start after the end wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkTimeRange {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl WorkTimeRange {
    /// Parse `"HH:MM--HH:MM"`.
    pub fn parse(text: &str) -> Result<Self> {
        let (start, end) = text
            .split_once("--")
            .ok_or_else(|| DutyError::InvalidWorkTime(text.to_string()))?;
        Ok(Self {
            start_minute: parse_minute_of_day(start)?,
            end_minute: parse_minute_of_day(end)?,
        })
    }

    pub fn wraps(&self) -> bool {
        self.start_minute > self.end_minute
    }

    /// Half-open pieces of one work day as `(day offset, start, end)` minutes.
    /// A wrapping range yields its evening piece on the work day itself and
    /// its morning tail on the following day.
    pub fn segments(&self) -> Vec<(i64, u32, u32)> {
        if self.wraps() {
            vec![
                (0, self.start_minute, MINUTES_PER_DAY),
                (1, 0, self.end_minute + 1),
            ]
        } else {
            vec![(0, self.start_minute, self.end_minute + 1)]
        }
    }

    /// Concrete intervals for the work day `date`.
    pub fn intervals_on(&self, date: NaiveDate) -> Vec<Interval> {
        self.segments()
            .into_iter()
            .filter_map(|(offset, start, end)| {
                let day = date.and_time(NaiveTime::MIN) + Duration::days(offset);
                Interval::new(
                    day + Duration::minutes(i64::from(start)),
                    day + Duration::minutes(i64::from(end)),
                )
            })
            .collect()
    }
}

/// One validated `duty_time` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyTime {
    pub work_type: WorkType,
    /// ISO weekdays (1-7) for weekly, days of month (1-31, 31 = last) for
    /// monthly, empty for daily.
    pub work_days: BTreeSet<u32>,
    pub ranges: Vec<WorkTimeRange>,
}

impl DutyTime {
    pub fn from_record(record: &DutyTimeRecord) -> Result<Self> {
        let work_type: WorkType = record.work_type.parse()?;

        let entries = record.work_time.entries();
        if entries.is_empty() {
            return Err(DutyError::InvalidWorkTime("missing work time".to_string()));
        }
        let ranges = entries
            .into_iter()
            .map(WorkTimeRange::parse)
            .collect::<Result<Vec<_>>>()?;

        let max_day = match work_type {
            WorkType::Daily => None,
            WorkType::Weekly => Some(7),
            WorkType::Monthly => Some(31),
        };
        let work_days = match max_day {
            None => BTreeSet::new(),
            Some(max_day) => {
                if record.work_days.is_empty() {
                    return Err(DutyError::MissingWorkDays(work_type.to_string()));
                }
                for &day in &record.work_days {
                    if !(1..=max_day).contains(&day) {
                        return Err(DutyError::InvalidWorkDay {
                            work_type: work_type.to_string(),
                            day,
                        });
                    }
                }
                record.work_days.iter().copied().collect()
            }
        };

        Ok(Self {
            work_type,
            work_days,
            ranges,
        })
    }
}

/// When responsibility moves to the next user group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handoff {
    pub rotation: WorkType,
    /// ISO weekday for weekly, day of month for monthly, unused for daily.
    pub date: u32,
    pub time: NaiveTime,
}

impl Handoff {
    pub fn from_record(record: &HandoffRecord) -> Result<Self> {
        let rotation: WorkType = record
            .rotation_type
            .parse()
            .map_err(|_| DutyError::InvalidHandoff(format!("rotation type '{}'", record.rotation_type)))?;

        if record.time.trim().is_empty() {
            return Err(DutyError::InvalidHandoff("missing handoff time".to_string()));
        }
        let minute = parse_minute_of_day(&record.time)
            .map_err(|_| DutyError::InvalidHandoff(format!("handoff time '{}'", record.time)))?;
        let time = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)
            .ok_or_else(|| DutyError::InvalidHandoff(format!("handoff time '{}'", record.time)))?;

        let date = match rotation {
            WorkType::Daily => 0,
            WorkType::Weekly | WorkType::Monthly => {
                let max_day = if rotation == WorkType::Weekly { 7 } else { 31 };
                match record.date {
                    None | Some(0) => {
                        return Err(DutyError::InvalidHandoff(format!(
                            "missing handoff date for {} rotation",
                            rotation
                        )))
                    }
                    Some(day) if day > max_day => {
                        return Err(DutyError::InvalidHandoff(format!(
                            "handoff date {} out of range for {} rotation",
                            day, rotation
                        )))
                    }
                    Some(day) => day,
                }
            }
        };

        Ok(Self {
            rotation,
            date,
            time,
        })
    }
}

/// An ordered rotation member: the users on duty together and their color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserGroup {
    pub users: Vec<DutyUser>,
    pub color: String,
}

/// A substitute assignment layered on top of the rule's own rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub users: Vec<DutyUser>,
    pub span: Interval,
    pub duty_time: DutyTime,
    pub excluded: Vec<Interval>,
}

impl Backup {
    /// Parse a backup record. Malformed exclusions are skipped individually
    /// and reported through `warnings`.
    pub fn from_record(record: &BackupRecord, warnings: &mut Vec<String>) -> Result<Self> {
        let begin = parse_timestamp(&record.begin_time)?;
        let end = parse_inclusive_end(&record.end_time)?;
        let span = Interval::new(begin, end).ok_or_else(|| {
            DutyError::InvalidTimestamp(format!(
                "backup ends before it begins: {} -- {}",
                record.begin_time, record.end_time
            ))
        })?;
        let duty_time = DutyTime::from_record(&record.duty_time)?;

        let mut excluded = Vec::new();
        for exclude in &record.exclude_settings {
            match parse_exclusion(exclude) {
                Ok(intervals) => excluded.extend(intervals),
                Err(e) => {
                    warn!(date = %exclude.date, time = %exclude.time, error = %e, "skipping malformed backup exclusion");
                    warnings.push(format!("skipped backup exclusion {} {}: {}", exclude.date, exclude.time, e));
                }
            }
        }

        Ok(Self {
            users: record.users.clone(),
            span,
            duty_time,
            excluded,
        })
    }
}

fn parse_exclusion(exclude: &ExcludeRecord) -> Result<Vec<Interval>> {
    let date = NaiveDate::parse_from_str(exclude.date.trim(), "%Y-%m-%d")
        .map_err(|_| DutyError::InvalidTimestamp(exclude.date.clone()))?;
    Ok(WorkTimeRange::parse(&exclude.time)?.intervals_on(date))
}

/// A validated rule, ready for expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DutyRule {
    pub id: RuleId,
    pub category: String,
    pub duty_times: Vec<DutyTime>,
    pub handoff: Option<Handoff>,
    pub effective_time: NaiveDateTime,
    /// Exclusive: no occurrence reaches past it.
    pub end_time: Option<NaiveDateTime>,
    pub groups: Vec<UserGroup>,
    pub backups: Vec<Backup>,
    /// Non-fatal problems found while validating (skipped backups and exclusions).
    pub warnings: Vec<String>,
}

impl DutyRule {
    /// Validate a wire record.
    ///
    /// `now` stands in for a missing effective time. Group colors are taken
    /// from the palette starting at `color_offset`, so colors stay stable
    /// across rules as long as the rule order does.
    ///
    /// # Errors
    /// Any structural problem with the rule's duty times, handoff, effective
    /// time, end time or user groups.
    pub fn from_record(
        record: &RuleRecord,
        now: NaiveDateTime,
        config: &EngineConfig,
        color_offset: usize,
    ) -> Result<Self> {
        if record.duty_users.is_empty() {
            return Err(DutyError::NoUserGroups);
        }
        if record.duty_time.is_empty() {
            return Err(DutyError::InvalidWorkTime("missing duty time".to_string()));
        }
        let duty_times = record
            .duty_time
            .iter()
            .map(DutyTime::from_record)
            .collect::<Result<Vec<_>>>()?;

        let rotates = record
            .need_rotation
            .unwrap_or(record.category == "handoff");
        let handoff = if rotates {
            let handoff_record = record
                .handoff_time
                .as_ref()
                .ok_or_else(|| DutyError::InvalidHandoff("missing handoff settings".to_string()))?;
            Some(Handoff::from_record(handoff_record)?)
        } else {
            None
        };

        let effective_time = match record.effective_time.as_deref() {
            Some(text) if !text.trim().is_empty() => parse_timestamp(text)?,
            _ => now,
        };
        let end_time = match record.end_time.as_deref() {
            Some(text) if !text.trim().is_empty() => Some(parse_timestamp(text)?),
            _ => None,
        };

        let groups = record
            .duty_users
            .iter()
            .enumerate()
            .map(|(index, users)| UserGroup {
                users: users.clone(),
                color: config.group_color(color_offset + index),
            })
            .collect();

        let mut warnings = Vec::new();
        let mut backups = Vec::new();
        for backup in &record.backups {
            match Backup::from_record(backup, &mut warnings) {
                Ok(parsed) => backups.push(parsed),
                Err(e) => {
                    warn!(rule_id = record.id, error = %e, "skipping malformed backup");
                    warnings.push(format!("skipped backup: {}", e));
                }
            }
        }

        Ok(Self {
            id: record.id,
            category: record.category.clone(),
            duty_times,
            handoff,
            effective_time,
            end_time,
            groups,
            backups,
            warnings,
        })
    }

    /// The span in which the rule's own rotation may produce occurrences.
    pub fn active_span(&self) -> Option<Interval> {
        let end = self.end_time.unwrap_or(NaiveDateTime::MAX);
        Interval::new(self.effective_time, end)
    }
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse `"HH:MM"` into minutes since midnight.
pub fn parse_minute_of_day(text: &str) -> Result<u32> {
    let time = NaiveTime::parse_from_str(text.trim(), "%H:%M")
        .map_err(|_| DutyError::InvalidWorkTime(text.to_string()))?;
    Ok(time.hour() * 60 + time.minute())
}

/// How much of a timestamp the text spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precision {
    Day,
    Minute,
    Second,
}

const SECOND_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const MINUTE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];

fn parse_with_precision(text: &str) -> Result<(NaiveDateTime, Precision)> {
    let text = text.trim();
    for format in SECOND_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok((ts, Precision::Second));
        }
    }
    for format in MINUTE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Ok((ts, Precision::Minute));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok((date.and_time(NaiveTime::MIN), Precision::Day));
    }
    Err(DutyError::InvalidTimestamp(text.to_string()))
}

/// Parse `"YYYY-MM-DD HH:MM[:SS]"` (a `T` separator and a bare date are
/// accepted too).
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    parse_with_precision(text).map(|(ts, _)| ts)
}

/// Parse a timestamp naming the *last covered* unit and return the exclusive
/// end: `"2026-03-16 06:00"` → `06:01`, `"2026-03-16 23:59:59"` → next
/// midnight, `"2026-03-16"` → next midnight.
pub fn parse_inclusive_end(text: &str) -> Result<NaiveDateTime> {
    let (ts, precision) = parse_with_precision(text)?;
    Ok(match precision {
        Precision::Day => ts + Duration::days(1),
        Precision::Minute => ts + Duration::minutes(1),
        Precision::Second => ts + Duration::seconds(1),
    })
}
