//! Error types for duty-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DutyError {
    #[error("Invalid work type: {0}")]
    InvalidWorkType(String),

    #[error("Invalid work time: {0}")]
    InvalidWorkTime(String),

    #[error("Invalid work day {day} for {work_type} rotation")]
    InvalidWorkDay { work_type: String, day: u32 },

    #[error("Work days are required for {0} rotation")]
    MissingWorkDays(String),

    #[error("Invalid handoff: {0}")]
    InvalidHandoff(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Rule has no user groups")]
    NoUserGroups,

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DutyError>;
