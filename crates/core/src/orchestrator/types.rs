//! Types for the distribution orchestrator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::{DistributionItem, MessageTemplate};
use crate::dispatch::{DispatchOutcome, DispatchProgress};

/// State of the orchestrator's single job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Scheduled,
    Processing,
    Completed,
    PartiallyFailed,
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Scheduled => "scheduled",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::PartiallyFailed => "partially_failed",
            JobState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::PartiallyFailed | JobState::Cancelled
        )
    }

    /// Whether a new job may be started or armed from this state.
    pub fn accepts_new_job(&self) -> bool {
        *self == JobState::Idle || self.is_terminal()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read model of the current (or last) job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Option<String>,
    pub state: JobState,
    /// Number of items in the batch.
    pub total: usize,
    /// Items processed so far.
    pub processed: usize,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Set once the job reaches Completed or PartiallyFailed.
    pub outcome: Option<DispatchOutcome>,
}

/// Events broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobUpdate {
    StateChanged {
        job_id: String,
        from: JobState,
        to: JobState,
    },
    Progress {
        job_id: String,
        progress: DispatchProgress,
    },
}

impl JobUpdate {
    pub fn job_id(&self) -> &str {
        match self {
            JobUpdate::StateChanged { job_id, .. } | JobUpdate::Progress { job_id, .. } => job_id,
        }
    }
}

/// A scheduled job as persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub job_id: String,
    pub items: Vec<DistributionItem>,
    pub template: MessageTemplate,
    pub scheduled_at: DateTime<Utc>,
}

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Rejected before anything changed.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// Operation not allowed in the current job state.
    #[error("cannot {operation} while job is {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: JobState,
    },

    /// No registered artifact with this id.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("registry error: {0}")]
    Registry(#[from] crate::registry::RegistryError),

    #[error("service error: {0}")]
    Service(#[from] crate::services::ServiceError),
}

impl From<crate::protection::ProtectionError> for OrchestratorError {
    fn from(err: crate::protection::ProtectionError) -> Self {
        OrchestratorError::InputInvalid(err.to_string())
    }
}

impl From<crate::scheduler::SchedulerError> for OrchestratorError {
    fn from(err: crate::scheduler::SchedulerError) -> Self {
        match err {
            crate::scheduler::SchedulerError::InputInvalid(msg) => {
                OrchestratorError::InputInvalid(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_new_job() {
        assert!(JobState::Idle.accepts_new_job());
        assert!(JobState::Completed.accepts_new_job());
        assert!(JobState::PartiallyFailed.accepts_new_job());
        assert!(JobState::Cancelled.accepts_new_job());
        assert!(!JobState::Scheduled.accepts_new_job());
        assert!(!JobState::Processing.accepts_new_job());
    }

    #[test]
    fn test_snapshot_default_is_idle() {
        let snapshot = JobSnapshot::default();
        assert_eq!(snapshot.state, JobState::Idle);
        assert!(snapshot.job_id.is_none());
        assert!(snapshot.outcome.is_none());
    }

    #[test]
    fn test_scheduled_job_roundtrip() {
        let job = ScheduledJob {
            job_id: "job-1".to_string(),
            items: vec![DistributionItem::local("EMP001", vec![1, 2])],
            template: MessageTemplate::default(),
            scheduled_at: Utc::now(),
        };

        let json = serde_json::to_string(&job).unwrap();
        let parsed: ScheduledJob = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, job);
    }

    #[test]
    fn test_update_serialization() {
        let update = JobUpdate::StateChanged {
            job_id: "job-1".to_string(),
            from: JobState::Scheduled,
            to: JobState::Cancelled,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["to"], "cancelled");
        assert_eq!(update.job_id(), "job-1");
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::InvalidStateTransition {
            operation: "schedule",
            state: JobState::Processing,
        };
        assert_eq!(err.to_string(), "cannot schedule while job is processing");

        let err = OrchestratorError::InputInvalid("no items".to_string());
        assert_eq!(err.to_string(), "invalid input: no items");
    }
}
