//! Stage domain types

use serde::{Deserialize, Serialize};

use crate::domain::task::TaskStatus;

/// Ordered phase of a pipeline, scoped to one deployment environment.
///
/// Stage positions are assigned by the store and are unique and contiguous
/// within a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: i32,
    pub creator_id: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updater_id: i32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub pipeline_id: i32,
    pub environment: String,
    pub name: String,
    pub position: i32,
    pub status: StageStatus,
}

/// Stage lifecycle status, derived from the stage's task statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Open,
    Done,
    Canceled,
}

impl StageStatus {
    /// Status every stage is created with.
    pub const INITIAL: StageStatus = StageStatus::Open;

    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Open => "OPEN",
            StageStatus::Done => "DONE",
            StageStatus::Canceled => "CANCELED",
        }
    }

    /// Parse a stored status string, falling back to the initial status for
    /// values this system never writes.
    pub fn from_str_or_initial(s: &str) -> StageStatus {
        match s {
            "OPEN" => StageStatus::Open,
            "DONE" => StageStatus::Done,
            "CANCELED" => StageStatus::Canceled,
            _ => StageStatus::INITIAL,
        }
    }

    /// Whether the lifecycle defines an edge from `self` to `next`.
    pub fn can_transition_to(self, next: StageStatus) -> bool {
        matches!(
            (self, next),
            (StageStatus::Open, StageStatus::Done)
                | (StageStatus::Open, StageStatus::Canceled)
        )
    }

    /// Aggregate a stage status from its tasks' statuses.
    ///
    /// A stage stays OPEN while any task can still make progress. A FAILED
    /// task also leaves the stage OPEN, since failed work can be retried.
    /// Only a fully terminal task set closes the stage: all DONE -> DONE,
    /// otherwise (some CANCELED, none FAILED) -> CANCELED.
    pub fn aggregate(tasks: &[TaskStatus]) -> StageStatus {
        if tasks.is_empty() {
            return StageStatus::Open;
        }
        if tasks.iter().any(|t| !t.is_terminal()) {
            return StageStatus::Open;
        }
        if tasks.iter().any(|t| *t == TaskStatus::Failed) {
            return StageStatus::Open;
        }
        if tasks.iter().all(|t| *t == TaskStatus::Done) {
            StageStatus::Done
        } else {
            StageStatus::Canceled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_empty_is_open() {
        assert_eq!(StageStatus::aggregate(&[]), StageStatus::Open);
    }

    #[test]
    fn test_aggregate_in_progress_is_open() {
        assert_eq!(
            StageStatus::aggregate(&[TaskStatus::Done, TaskStatus::Running]),
            StageStatus::Open
        );
        assert_eq!(
            StageStatus::aggregate(&[TaskStatus::Pending]),
            StageStatus::Open
        );
    }

    #[test]
    fn test_aggregate_all_done() {
        assert_eq!(
            StageStatus::aggregate(&[TaskStatus::Done, TaskStatus::Done]),
            StageStatus::Done
        );
    }

    #[test]
    fn test_aggregate_failed_leaves_stage_open() {
        assert_eq!(
            StageStatus::aggregate(&[TaskStatus::Done, TaskStatus::Failed]),
            StageStatus::Open
        );
    }

    #[test]
    fn test_aggregate_canceled() {
        assert_eq!(
            StageStatus::aggregate(&[TaskStatus::Done, TaskStatus::Canceled]),
            StageStatus::Canceled
        );
    }
}
