//! Engine configuration.
//!
//! Every field has a default so an empty TOML document (or no file at all)
//! yields a working configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunables for the schedule pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Free intervals shorter than this many seconds are dropped as noise.
    /// Zero keeps every non-empty gap.
    #[serde(default = "default_min_free_gap_secs")]
    pub min_free_gap_secs: i64,

    /// Colors handed out to user groups, in order, across all rules.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// Color for backup (substitute) occurrences.
    #[serde(default = "default_backup_color")]
    pub backup_color: String,

    /// Color for server-precomputed plans whose group is unknown.
    #[serde(default = "default_preview_color")]
    pub preview_color: String,
}

fn default_min_free_gap_secs() -> i64 {
    60
}

fn default_palette() -> Vec<String> {
    [
        "#3A84FF", "#2DCB56", "#FF9C01", "#EA3636", "#A55DF1", "#0FC7C0", "#FF5E9E", "#8C9B2E",
        "#4D78A6", "#C97A2B",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn default_backup_color() -> String {
    "#979BA5".to_string()
}

fn default_preview_color() -> String {
    "#FF9C00".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_free_gap_secs: default_min_free_gap_secs(),
            palette: default_palette(),
            backup_color: default_backup_color(),
            preview_color: default_preview_color(),
        }
    }
}

impl EngineConfig {
    /// Negative values count as zero; values past `Duration::MAX` saturate.
    pub fn min_free_gap(&self) -> Duration {
        Duration::try_seconds(self.min_free_gap_secs.max(0)).unwrap_or(Duration::MAX)
    }

    /// Color for the `slot`-th user group handed out so far.
    pub fn group_color(&self, slot: usize) -> String {
        if self.palette.is_empty() {
            return self.preview_color.clone();
        }
        self.palette[slot % self.palette.len()].clone()
    }
}
