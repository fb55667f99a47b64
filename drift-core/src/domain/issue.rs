//! Issue domain types

use serde::{Deserialize, Serialize};

/// Human-facing record of a schema-change request, optionally linked to the
/// pipeline carrying it out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: i32,
    pub creator_id: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updater_id: i32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub pipeline_id: Option<i32>,
    pub assignee_id: Option<i32>,
    pub name: String,
    pub description: String,
    pub status: IssueStatus,
}

/// Issue lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Open,
    Done,
    Canceled,
}

impl IssueStatus {
    /// Status every issue is created with.
    pub const INITIAL: IssueStatus = IssueStatus::Open;

    pub fn as_str(self) -> &'static str {
        match self {
            IssueStatus::Open => "OPEN",
            IssueStatus::Done => "DONE",
            IssueStatus::Canceled => "CANCELED",
        }
    }

    /// Parse a stored status string, falling back to the initial status for
    /// values this system never writes.
    pub fn from_str_or_initial(s: &str) -> IssueStatus {
        match s {
            "OPEN" => IssueStatus::Open,
            "DONE" => IssueStatus::Done,
            "CANCELED" => IssueStatus::Canceled,
            _ => IssueStatus::INITIAL,
        }
    }

    /// Whether the lifecycle defines an edge from `self` to `next`.
    pub fn can_transition_to(self, next: IssueStatus) -> bool {
        matches!(
            (self, next),
            (IssueStatus::Open, IssueStatus::Done)
                | (IssueStatus::Open, IssueStatus::Canceled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_have_no_edges() {
        for from in [IssueStatus::Done, IssueStatus::Canceled] {
            for to in [IssueStatus::Open, IssueStatus::Done, IssueStatus::Canceled] {
                assert!(!from.can_transition_to(to));
            }
        }
    }
}
