//! End-to-end tests for the schedule pipeline.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use duty_engine::interval::Interval;
use duty_engine::rule::{parse_timestamp, RuleRecord};
use duty_engine::schedule::{Severity, ValidationIssue};
use duty_engine::preview::PreviewRecord;
use duty_engine::{compute_schedule, EngineConfig, OccurrenceKind, Schedule, ScheduleInput, TimeWindow};
use serde_json::json;

fn ts(text: &str) -> NaiveDateTime {
    parse_timestamp(text).unwrap()
}

fn iv(start: &str, end: &str) -> Interval {
    Interval::new(ts(start), ts(end)).unwrap()
}

fn window(date: &str, days: u32) -> TimeWindow {
    let start = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    TimeWindow::new(start, days).unwrap()
}

fn rules(value: serde_json::Value) -> Vec<RuleRecord> {
    serde_json::from_value(value).unwrap()
}

/// A single-group daily rule effective since the start of March.
fn daily(id: u64, user: &str, work_time: &str) -> serde_json::Value {
    json!({
        "id": id,
        "category": "regular",
        "duty_time": [{"work_type": "daily", "work_time": work_time}],
        "duty_users": [[{"id": user}]],
        "effective_time": "2026-03-01 00:00"
    })
}

fn run(records: &[RuleRecord], window: &TimeWindow, now: &str) -> Schedule {
    compute_schedule(records, &[], window, ts(now), &EngineConfig::default())
}

// ── Expansion into day columns ──────────────────────────────────────────────

#[test]
fn overnight_rule_shows_two_bands_per_day() {
    let records = rules(json!([daily(1, "alice", "22:00--06:00")]));
    let schedule = run(&records, &window("2026-03-16", 7), "2026-03-16 00:00");

    let row = &schedule.rows[0];
    assert_eq!(row.columns.len(), 7);
    assert_eq!(row.max_row, 1);
    for column in &row.columns {
        assert_eq!(column.bands.len(), 2, "{}", column.date);
        let morning = &column.bands[0];
        let evening = &column.bands[1];
        assert_eq!(morning.time_range.start, column.date.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(morning.time_range.end, column.date.and_hms_opt(6, 1, 0).unwrap());
        assert!(morning.fractional_range.starts_at_day_boundary);
        assert_eq!(evening.time_range.start, column.date.and_hms_opt(22, 0, 0).unwrap());
        assert!(evening.fractional_range.ends_at_day_boundary);
        assert_eq!(evening.fractional_range.end, 1.0);
    }
}

#[test]
fn rotation_alternates_groups_from_the_effective_time() {
    let records = rules(json!([{
        "id": 5,
        "category": "regular",
        "need_rotation": true,
        "duty_time": [{"work_type": "daily", "work_time": "00:00--23:59"}],
        "duty_users": [[{"id": "alice"}], [{"id": "bob"}]],
        "handoff_time": {"rotation_type": "daily", "time": "09:00"}
    }]));
    // No effective time: it defaults to now.
    let schedule = run(&records, &window("2026-03-16", 7), "2026-03-16 09:00");

    let occurrences = &schedule.rows[0].occurrences;
    assert_eq!(occurrences.len(), 7);
    for (i, occurrence) in occurrences.iter().enumerate() {
        assert_eq!(occurrence.group_index, Some(i % 2));
        assert_eq!(occurrence.kind, OccurrenceKind::Primary);
    }
    assert_eq!(occurrences[0].interval, iv("2026-03-16 09:00", "2026-03-17 09:00"));
    assert_eq!(occurrences[1].users[0].id, "bob");

    // The 17th shows the tail of alice's slice, then bob's.
    let column = &schedule.rows[0].columns[1];
    assert_eq!(column.bands.len(), 2);
    assert_eq!(column.bands[0].group_index, Some(0));
    assert_eq!(column.bands[1].group_index, Some(1));
}

#[test]
fn rotation_is_stable_when_paging_the_window() {
    let records = rules(json!([{
        "id": 5,
        "category": "handoff",
        "duty_time": [{"work_type": "daily", "work_time": "00:00--23:59"}],
        "duty_users": [[{"id": "alice"}], [{"id": "bob"}], [{"id": "carol"}]],
        "handoff_time": {"rotation_type": "daily", "time": "09:00"},
        "effective_time": "2026-03-02 09:00"
    }]));
    let week = window("2026-03-16", 7);
    let fortnight = window("2026-03-09", 14);

    let a = run(&records, &week, "2026-03-16 00:00");
    let b = run(&records, &fortnight, "2026-03-16 00:00");

    let noon = ts("2026-03-18 12:00");
    assert_eq!(a.on_duty_at(noon).unwrap().users, b.on_duty_at(noon).unwrap().users);
    // 2026-03-18 09:00 is 16 handoffs after the effective time: 16 % 3 = 1.
    assert_eq!(a.on_duty_at(noon).unwrap().group_index, Some(1));
}

#[test]
fn rotation_counts_every_period_since_a_distant_effective_time() {
    let records = rules(json!([{
        "id": 5,
        "category": "handoff",
        "duty_time": [{"work_type": "daily", "work_time": "00:00--23:59"}],
        "duty_users": [[{"id": "alice"}], [{"id": "bob"}], [{"id": "carol"}]],
        "handoff_time": {"rotation_type": "daily", "time": "09:00"},
        "effective_time": "2000-01-01 09:00"
    }]));
    let schedule = run(&records, &window("2026-03-16", 7), "2026-03-16 00:00");

    // 9571 daily handoffs between 2000-01-01 09:00 and 2026-03-16 09:00.
    let noon = schedule.on_duty_at(ts("2026-03-16 12:00")).unwrap();
    assert_eq!(noon.group_index, Some(9571 % 3));
    assert_eq!(noon.users[0].id, "bob");
    let next = schedule.on_duty_at(ts("2026-03-17 12:00")).unwrap();
    assert_eq!(next.users[0].id, "carol");
}

// ── Overlaps and priority ───────────────────────────────────────────────────

#[test]
fn two_full_day_rules_overlap_and_first_wins() {
    let records = rules(json!([
        daily(1, "alice", "00:00--23:59"),
        daily(2, "bob", "00:00--23:59")
    ]));
    let schedule = run(&records, &window("2026-03-16", 1), "2026-03-16 00:00");

    assert_eq!(schedule.overlaps.len(), 1);
    let band = &schedule.overlaps[0];
    assert_eq!(band.time_range, iv("2026-03-16 00:00", "2026-03-17 00:00"));
    assert_eq!(band.rule_rows, (0, 1));
    assert_eq!(band.fractional_range.start, 0.0);
    assert_eq!(band.fractional_range.end, 1.0);

    assert_eq!(schedule.on_duty.len(), 1);
    assert_eq!(schedule.on_duty[0].rule_id, 1);
    assert_eq!(schedule.on_duty_at(ts("2026-03-16 15:00")).unwrap().rule_id, 1);
    assert!(schedule.free.is_empty());
}

#[test]
fn group_colors_continue_across_rules() {
    let records = rules(json!([
        {
            "id": 1,
            "category": "regular",
            "duty_time": [{"work_type": "daily", "work_time": "09:00--17:59"}],
            "duty_users": [[{"id": "alice"}], [{"id": "bob"}]],
            "effective_time": "2026-03-01 00:00"
        },
        daily(2, "carol", "09:00--17:59")
    ]));
    let config = EngineConfig::default();
    let schedule = compute_schedule(&records, &[], &window("2026-03-16", 1), ts("2026-03-16 00:00"), &config);

    assert_eq!(schedule.rows[1].occurrences[0].color, config.palette[2]);
}

// ── Validation ──────────────────────────────────────────────────────────────

#[test]
fn disabled_rules_are_skipped() {
    let mut disabled = daily(1, "alice", "09:00--17:59");
    disabled["enabled"] = json!(false);
    let records = rules(json!([disabled, daily(2, "bob", "09:00--17:59")]));

    let schedule = run(&records, &window("2026-03-16", 1), "2026-03-16 00:00");

    assert_eq!(schedule.rows.len(), 1);
    assert_eq!(schedule.rows[0].rule_id, 2);
    assert_eq!(schedule.rows[0].row, 0);
}

#[test]
fn malformed_rule_renders_empty_with_an_issue() {
    let mut broken = daily(1, "alice", "09:00--17:59");
    broken["duty_time"][0]["work_type"] = json!("hourly");
    let records = rules(json!([broken, daily(2, "bob", "09:00--17:59")]));

    let schedule = run(&records, &window("2026-03-16", 1), "2026-03-16 00:00");

    assert_eq!(schedule.rows.len(), 2);
    assert!(schedule.rows[0].occurrences.is_empty());
    assert_eq!(schedule.rows[0].max_row, 0);
    assert_eq!(schedule.rows[1].occurrences.len(), 1);
    assert_eq!(schedule.issues.len(), 1);
    let ValidationIssue { rule_id, severity, message } = &schedule.issues[0];
    assert_eq!(*rule_id, 1);
    assert_eq!(*severity, Severity::Error);
    assert!(message.contains("hourly"));
}

#[test]
fn rotating_rule_without_handoff_is_an_error() {
    let mut rule = daily(1, "alice", "09:00--17:59");
    rule["category"] = json!("handoff");
    let records = rules(json!([rule]));

    let schedule = run(&records, &window("2026-03-16", 1), "2026-03-16 00:00");

    assert_eq!(schedule.issues[0].severity, Severity::Error);
    assert!(schedule.rows[0].occurrences.is_empty());
}

// ── Backups ─────────────────────────────────────────────────────────────────

#[test]
fn backups_stack_in_a_second_lane_and_honor_exclusions() {
    let mut rule = daily(1, "alice", "09:00--17:59");
    rule["backups"] = json!([{
        "users": [{"id": "carol"}],
        "begin_time": "2026-03-16 00:00",
        "end_time": "2026-03-17 23:59",
        "duty_time": {"work_type": "daily", "work_time": "12:00--13:59"},
        "exclude_settings": [{"date": "2026-03-17", "time": "12:00--13:59"}]
    }]);
    let records = rules(json!([rule]));
    let config = EngineConfig::default();

    let schedule = compute_schedule(&records, &[], &window("2026-03-16", 3), ts("2026-03-16 00:00"), &config);

    let row = &schedule.rows[0];
    let backups: Vec<_> = row
        .occurrences
        .iter()
        .filter(|o| o.kind == OccurrenceKind::Backup)
        .collect();
    assert_eq!(backups.len(), 1, "17th excluded, 18th outside the backup span");
    assert_eq!(backups[0].interval, iv("2026-03-16 12:00", "2026-03-16 14:00"));
    assert_eq!(backups[0].color, config.backup_color);
    assert_eq!(backups[0].group_index, None);

    assert_eq!(row.max_row, 2);
    let first_day = &row.columns[0];
    assert_eq!(first_day.bands[0].lane, 0);
    assert_eq!(first_day.bands[1].lane, 1);
    assert_eq!(first_day.bands[1].kind, OccurrenceKind::Backup);

    assert!(schedule.overlaps.is_empty());
    assert!(schedule.on_duty.iter().all(|o| o.kind != OccurrenceKind::Backup));
}

#[test]
fn malformed_backup_is_a_warning() {
    let mut rule = daily(1, "alice", "09:00--17:59");
    rule["backups"] = json!([{
        "users": [{"id": "carol"}],
        "begin_time": "2026-03-18 00:00",
        "end_time": "2026-03-16 00:00",
        "duty_time": {"work_type": "daily", "work_time": "12:00--13:59"}
    }]);
    let records = rules(json!([rule]));

    let schedule = run(&records, &window("2026-03-16", 1), "2026-03-16 00:00");

    assert_eq!(schedule.issues.len(), 1);
    assert_eq!(schedule.issues[0].severity, Severity::Warning);
    assert_eq!(schedule.rows[0].occurrences.len(), 1);
}

// ── Previews ────────────────────────────────────────────────────────────────

#[test]
fn preview_replaces_the_derived_rotation() {
    let records = rules(json!([{
        "id": 9,
        "category": "handoff",
        "duty_time": [{"work_type": "daily", "work_time": "00:00--23:59"}],
        "duty_users": [[{"id": "alice"}], [{"id": "bob"}]],
        "handoff_time": {"rotation_type": "daily", "time": "09:00"},
        "effective_time": "2026-03-16 09:00"
    }]));
    let previews: Vec<PreviewRecord> = serde_json::from_value(json!([
        {"rule_id": 9, "duty_plans": [
            {"user_index": 1, "work_times": [{"start_time": "2026-03-16 09:00", "end_time": "2026-03-16 20:59"}]}
        ]},
        {"rule_id": 9, "duty_plans": [
            {"user_index": 1, "work_times": [{"start_time": "2026-03-16 09:00", "end_time": "2026-03-16 20:59"}]}
        ]}
    ]))
    .unwrap();

    let schedule = compute_schedule(
        &records,
        &previews,
        &window("2026-03-16", 2),
        ts("2026-03-16 00:00"),
        &EngineConfig::default(),
    );

    let occurrences = &schedule.rows[0].occurrences;
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].kind, OccurrenceKind::Preview);
    assert_eq!(occurrences[0].interval, iv("2026-03-16 09:00", "2026-03-16 21:00"));
    assert_eq!(occurrences[0].users[0].id, "bob");
}

// ── Free time ───────────────────────────────────────────────────────────────

#[test]
fn free_time_is_the_complement_of_coverage() {
    let records = rules(json!([daily(1, "alice", "09:00--17:59")]));
    let schedule = run(&records, &window("2026-03-16", 1), "2026-03-16 00:00");

    let free: Vec<Interval> = schedule.free.iter().map(|f| f.time_range).collect();
    assert_eq!(
        free,
        vec![
            iv("2026-03-16 00:00", "2026-03-16 09:00"),
            iv("2026-03-16 18:00", "2026-03-17 00:00"),
        ]
    );
    assert_eq!(schedule.free[1].fractional_range.start, 0.75);

    assert_eq!(
        schedule.first_free(Duration::hours(8)),
        Some(iv("2026-03-16 00:00", "2026-03-16 09:00"))
    );
    assert_eq!(schedule.first_free(Duration::hours(10)), None);
}

#[test]
fn empty_rule_set_leaves_the_window_free() {
    let schedule = run(&[], &window("2026-03-16", 7), "2026-03-16 00:00");

    assert!(schedule.rows.is_empty());
    assert_eq!(schedule.free.len(), 1);
    assert_eq!(schedule.free[0].time_range, window("2026-03-16", 7).as_interval());
    assert_eq!(schedule.dates.len(), 7);
}

// ── Determinism ─────────────────────────────────────────────────────────────

#[test]
fn identical_inputs_serialize_identically() {
    let input = ScheduleInput::from_json(
        &json!({
            "rules": [
                daily(1, "alice", "22:00--06:00"),
                daily(2, "bob", "00:00--23:59"),
                {
                    "id": 3,
                    "category": "handoff",
                    "duty_time": [{"work_type": "weekly", "work_days": [1, 3, 5], "work_time": "09:00--17:59"}],
                    "duty_users": [[{"id": "carol"}], [{"id": "dave"}]],
                    "handoff_time": {"rotation_type": "weekly", "date": 1, "time": "09:00"},
                    "effective_time": "2026-02-02 09:00"
                }
            ]
        })
        .to_string(),
    )
    .unwrap();
    assert!(input.previews.is_empty());

    let w = window("2026-03-16", 14);
    let first = compute_schedule(&input.rules, &input.previews, &w, ts("2026-03-16 00:00"), &EngineConfig::default());
    let second = compute_schedule(&input.rules, &input.previews, &w, ts("2026-03-16 00:00"), &EngineConfig::default());

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
