//! # duty-engine
//!
//! Deterministic duty-rotation scheduling for on-call calendars.
//!
//! Turns declarative rotation rules (work days, daily work time, handoff
//! cadence, ordered user groups, backups) into concrete on-duty intervals for
//! a calendar window, then analyses them: which rules overlap, who is really
//! on duty under rule priority, where nobody is, and how to lay every piece
//! out on a day-column grid. All times are naive local wall-clock times.
//!
//! ## Modules
//!
//! - [`interval`]: Half-open intervals and sorted-interval helpers
//! - [`rule`]: Rule wire records and their validated domain form
//! - [`expander`]: Work days × work time → raw per-day intervals
//! - [`handoff`]: Cut work runs at handoff boundaries, assign rotating groups
//! - [`clipper`]: Clip occurrences to the window and the rule's active span
//! - [`overlap`]: Cross-rule overlap bands and priority-resolved on-duty timeline
//! - [`freetime`]: Uncovered intervals inside the window
//! - [`lanes`]: Lane assignment for occurrences that overlap within one rule
//! - [`percent`]: Time ↔ fractional ↔ pixel mapping, day splitting
//! - [`occurrence`]: Concrete on-duty intervals
//! - [`preview`]: Server-precomputed duty plans
//! - [`schedule`]: The full pipeline and its render-ready output
//! - [`window`]: The calendar query window
//! - [`cache`]: Recomputation cache keys
//! - [`config`]: Tunables (noise threshold, palette)
//! - [`error`]: Error types

pub mod cache;
pub mod clipper;
pub mod config;
pub mod error;
pub mod expander;
pub mod freetime;
pub mod handoff;
pub mod interval;
pub mod lanes;
pub mod occurrence;
pub mod overlap;
pub mod percent;
pub mod preview;
pub mod rule;
pub mod schedule;
pub mod window;

pub use config::EngineConfig;
pub use error::DutyError;
pub use expander::{expand_rule, expand_work_time};
pub use freetime::{find_first_free, find_free_intervals};
pub use handoff::sequence;
pub use interval::Interval;
pub use lanes::assign_lanes;
pub use occurrence::{Occurrence, OccurrenceKind};
pub use overlap::{find_overlaps, on_duty_at, resolve_on_duty, OverlapBand};
pub use rule::{DutyRule, RuleRecord};
pub use schedule::{compute_schedule, Schedule, ScheduleInput};
pub use window::TimeWindow;
