//! Scheduler types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of an armed schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePhase {
    Armed,
    Firing,
    Fired,
    Cancelled,
}

impl SchedulePhase {
    /// Whether the schedule can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SchedulePhase::Fired | SchedulePhase::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid input: {0}")]
    InputInvalid(String),
}

/// Time left until `target`, zero once it has passed.
pub fn remaining_until(target: DateTime<Utc>) -> Duration {
    (target - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

/// Render a countdown as `MM:SS`; minutes are not wrapped into hours.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
