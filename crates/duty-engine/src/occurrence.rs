//! Concrete on-duty intervals produced by the pipeline.

use serde::{Deserialize, Serialize};

use crate::interval::Interval;
use crate::rule::{DutyUser, RuleId};

/// Where an occurrence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceKind {
    /// Derived from the rule's own work time and rotation.
    Primary,
    /// A substitute layered on top of the rotation; may overlap primaries.
    Backup,
    /// Taken verbatim from a server-precomputed plan.
    Preview,
}

/// A half-open interval during which a specific user group is on duty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub rule_id: RuleId,
    pub interval: Interval,
    /// Index into the rule's user groups; `None` for backups.
    pub group_index: Option<usize>,
    pub users: Vec<DutyUser>,
    pub color: String,
    pub kind: OccurrenceKind,
}

impl Occurrence {
    /// The same assignment over a different span.
    pub fn with_interval(&self, interval: Interval) -> Self {
        Self {
            interval,
            ..self.clone()
        }
    }
}

/// Sort occurrences by time, breaking ties on the remaining fields so the
/// order is fully deterministic.
pub fn sort_occurrences(occurrences: &mut [Occurrence]) {
    occurrences.sort_by(|a, b| {
        a.interval
            .cmp(&b.interval)
            .then(a.kind.cmp(&b.kind))
            .then(a.group_index.cmp(&b.group_index))
            .then(a.users.cmp(&b.users))
    });
}
