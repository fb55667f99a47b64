//! Issue request types

use serde::{Deserialize, Serialize};

use crate::domain::issue::IssueStatus;

/// Request to create a new issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCreate {
    pub creator_id: i32,
    pub pipeline_id: Option<i32>,
    pub assignee_id: Option<i32>,
    pub name: String,
    pub description: String,
}

/// Filter for issue lookups; provided fields conjoin, an empty filter
/// matches every row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFind {
    pub id: Option<i32>,
    pub pipeline_id: Option<i32>,
    pub assignee_id: Option<i32>,
    pub status: Option<IssueStatus>,
}

/// Partial update of an issue by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuePatch {
    pub id: i32,
    pub updater_id: i32,
    pub name: Option<String>,
    pub description: Option<String>,
    pub assignee_id: Option<i32>,
    pub status: Option<IssueStatus>,
}
