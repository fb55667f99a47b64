//! Store error taxonomy
//!
//! One error type shared by every entity service. All variants propagate
//! unchanged to the caller; transaction rollback is the only local recovery.
//! A zero-row find is `Ok(None)`, never an error.

use std::fmt;

use thiserror::Error;

/// Entity kinds persisted by this crate; used for cache keys and error
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Pipeline,
    Stage,
    Task,
    Issue,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Pipeline => "pipeline",
            EntityKind::Stage => "stage",
            EntityKind::Task => "task",
            EntityKind::Issue => "issue",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    /// A patch (or a must-exist lookup) targeted an ID with no matching row.
    #[error("{kind} ID not found: {id}")]
    NotFound { kind: EntityKind, id: i32 },

    /// A single-entity find matched more than one row.
    #[error("found {actual} {kind} rows matching filter, expect 1")]
    Conflict { kind: EntityKind, actual: usize },

    /// A patch requested a lifecycle edge the state machine does not define.
    #[error("invalid {kind} status transition: {from} -> {to}")]
    InvalidTransition {
        kind: EntityKind,
        from: &'static str,
        to: &'static str,
    },

    /// Failure from the relational store; the cause is surfaced unmodified
    /// and never retried here.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Cache snapshot (de)serialization failure.
    #[error("cache codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_kind_and_id() {
        let err = StoreError::NotFound {
            kind: EntityKind::Pipeline,
            id: 42,
        };
        assert_eq!(err.to_string(), "pipeline ID not found: 42");
    }

    #[test]
    fn test_conflict_names_actual_count() {
        let err = StoreError::Conflict {
            kind: EntityKind::Task,
            actual: 2,
        };
        assert_eq!(err.to_string(), "found 2 task rows matching filter, expect 1");
    }

    #[test]
    fn test_invalid_transition_names_edge() {
        let err = StoreError::InvalidTransition {
            kind: EntityKind::Pipeline,
            from: "DONE",
            to: "OPEN",
        };
        assert_eq!(
            err.to_string(),
            "invalid pipeline status transition: DONE -> OPEN"
        );
    }
}
