//! Task request types

use serde::{Deserialize, Serialize};

use crate::domain::task::{TaskResult, TaskStatus};

/// Request to create a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCreate {
    pub creator_id: i32,
    pub pipeline_id: i32,
    pub stage_id: i32,
    pub database_id: i32,
    pub name: String,
    pub statement: String,
}

/// Filter for task lookups; provided fields conjoin, an empty filter
/// matches every row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFind {
    pub id: Option<i32>,
    pub pipeline_id: Option<i32>,
    pub stage_id: Option<i32>,
    pub status: Option<TaskStatus>,
}

/// Partial update of a task by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPatch {
    pub id: i32,
    pub updater_id: i32,
    pub statement: Option<String>,
    pub status: Option<TaskStatus>,
    pub result: Option<TaskResult>,
}
