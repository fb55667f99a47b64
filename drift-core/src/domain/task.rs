//! Task domain types

use serde::{Deserialize, Serialize};

/// Smallest unit of work: one schema change applied to one target database.
///
/// Structure shared between the store (persists) and the task executor
/// (updates status and result as the change runs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    pub creator_id: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updater_id: i32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub pipeline_id: i32,
    pub stage_id: i32,
    pub database_id: i32,
    pub name: String,
    pub statement: String,
    pub status: TaskStatus,
    pub result: Option<TaskResult>,
}

/// Task execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// Status every task is created with.
    pub const INITIAL: TaskStatus = TaskStatus::Pending;

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Done => "DONE",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Canceled => "CANCELED",
        }
    }

    /// Parse a stored status string, falling back to the initial status for
    /// values this system never writes.
    pub fn from_str_or_initial(s: &str) -> TaskStatus {
        match s {
            "PENDING" => TaskStatus::Pending,
            "RUNNING" => TaskStatus::Running,
            "DONE" => TaskStatus::Done,
            "FAILED" => TaskStatus::Failed,
            "CANCELED" => TaskStatus::Canceled,
            _ => TaskStatus::INITIAL,
        }
    }

    /// Whether the lifecycle defines an edge from `self` to `next`.
    ///
    /// PENDING -> RUNNING, RUNNING -> DONE, RUNNING -> FAILED, and
    /// {PENDING, RUNNING} -> CANCELED; DONE, FAILED, and CANCELED are
    /// terminal.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Done)
                | (TaskStatus::Running, TaskStatus::Failed)
                | (TaskStatus::Pending, TaskStatus::Canceled)
                | (TaskStatus::Running, TaskStatus::Canceled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Done | TaskStatus::Failed | TaskStatus::Canceled
        )
    }
}

/// Result of a task execution, recorded when the task leaves RUNNING.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub detail: String,
    pub migration_version: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_edges() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Running));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Done));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn test_cancel_edges() {
        assert!(TaskStatus::Pending.can_transition_to(TaskStatus::Canceled));
        assert!(TaskStatus::Running.can_transition_to(TaskStatus::Canceled));
        assert!(!TaskStatus::Done.can_transition_to(TaskStatus::Canceled));
    }

    #[test]
    fn test_no_skipping_pending() {
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Done));
        assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        for from in [TaskStatus::Done, TaskStatus::Failed, TaskStatus::Canceled] {
            assert!(from.is_terminal());
            for to in [
                TaskStatus::Pending,
                TaskStatus::Running,
                TaskStatus::Done,
                TaskStatus::Failed,
                TaskStatus::Canceled,
            ] {
                assert!(!from.can_transition_to(to));
            }
        }
    }
}
