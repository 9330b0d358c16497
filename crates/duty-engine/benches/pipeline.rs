use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use duty_engine::rule::RuleRecord;
use duty_engine::{compute_schedule, EngineConfig, TimeWindow};
use serde_json::json;

fn rules(count: u64) -> Vec<RuleRecord> {
    let records: Vec<serde_json::Value> = (0..count)
        .map(|id| {
            json!({
                "id": id,
                "category": "handoff",
                "duty_time": [
                    {"work_type": "weekly", "work_days": [1, 2, 3, 4, 5], "work_time": "09:00--17:59"},
                    {"work_type": "daily", "work_time": "22:00--06:00"}
                ],
                "duty_users": [[{"id": "alice"}], [{"id": "bob"}], [{"id": "carol"}]],
                "handoff_time": {"rotation_type": "weekly", "date": 1, "time": "10:00"},
                "effective_time": "2025-01-06 10:00",
                "backups": [{
                    "users": [{"id": "dave"}],
                    "begin_time": "2026-03-01 00:00",
                    "end_time": "2026-04-30 23:59",
                    "duty_time": {"work_type": "daily", "work_time": "12:00--13:59"}
                }]
            })
        })
        .collect();
    serde_json::from_value(serde_json::Value::Array(records)).unwrap_or_default()
}

fn bench_pipeline(c: &mut Criterion) {
    let config = EngineConfig::default();
    let start = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
    let now = start.and_hms_opt(0, 0, 0).unwrap();
    let week = TimeWindow::new(start, 7).unwrap();
    let month = TimeWindow::new(start, 31).unwrap();

    let few = rules(5);
    let many = rules(50);

    c.bench_function("schedule_5_rules_week", |b| {
        b.iter(|| compute_schedule(black_box(&few), &[], black_box(&week), now, &config))
    });
    c.bench_function("schedule_50_rules_week", |b| {
        b.iter(|| compute_schedule(black_box(&many), &[], black_box(&week), now, &config))
    });
    c.bench_function("schedule_50_rules_month", |b| {
        b.iter(|| compute_schedule(black_box(&many), &[], black_box(&month), now, &config))
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
