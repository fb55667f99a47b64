//! Domain types
//!
//! Entities persisted by the store, plus their lifecycle status enums.
//! Relationships are expressed through ID references (Pipeline 1-N Stage
//! 1-N Task), never in-memory back-pointers.

pub mod issue;
pub mod pipeline;
pub mod stage;
pub mod task;

pub use issue::{Issue, IssueStatus};
pub use pipeline::{Pipeline, PipelineStatus};
pub use stage::{Stage, StageStatus};
pub use task::{Task, TaskResult, TaskStatus};
