//! Pipeline domain types

use serde::{Deserialize, Serialize};

/// Top-level orchestration unit representing one migration run.
///
/// Structure shared between the store (persists) and the task executor
/// (drives stages and tasks through their lifecycles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: i32,
    pub creator_id: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updater_id: i32,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub name: String,
    pub status: PipelineStatus,
}

/// Pipeline lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    Open,
    Done,
    Canceled,
}

impl PipelineStatus {
    /// Status every pipeline is created with.
    pub const INITIAL: PipelineStatus = PipelineStatus::Open;

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Open => "OPEN",
            PipelineStatus::Done => "DONE",
            PipelineStatus::Canceled => "CANCELED",
        }
    }

    /// Parse a stored status string, falling back to the initial status for
    /// values this system never writes.
    pub fn from_str_or_initial(s: &str) -> PipelineStatus {
        match s {
            "OPEN" => PipelineStatus::Open,
            "DONE" => PipelineStatus::Done,
            "CANCELED" => PipelineStatus::Canceled,
            _ => PipelineStatus::INITIAL,
        }
    }

    /// Whether the lifecycle defines an edge from `self` to `next`.
    ///
    /// The only legal edges are OPEN -> DONE and OPEN -> CANCELED; DONE and
    /// CANCELED are terminal.
    pub fn can_transition_to(self, next: PipelineStatus) -> bool {
        matches!(
            (self, next),
            (PipelineStatus::Open, PipelineStatus::Done)
                | (PipelineStatus::Open, PipelineStatus::Canceled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_edges() {
        assert!(PipelineStatus::Open.can_transition_to(PipelineStatus::Done));
        assert!(PipelineStatus::Open.can_transition_to(PipelineStatus::Canceled));
        assert!(!PipelineStatus::Open.can_transition_to(PipelineStatus::Open));
    }

    #[test]
    fn test_terminal_states_have_no_edges() {
        for from in [PipelineStatus::Done, PipelineStatus::Canceled] {
            for to in [
                PipelineStatus::Open,
                PipelineStatus::Done,
                PipelineStatus::Canceled,
            ] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_unknown_stored_status_falls_back_to_initial() {
        assert_eq!(
            PipelineStatus::from_str_or_initial("PAUSED"),
            PipelineStatus::Open
        );
    }
}
