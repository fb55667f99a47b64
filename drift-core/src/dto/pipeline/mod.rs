//! Pipeline request types

use serde::{Deserialize, Serialize};

use crate::domain::pipeline::PipelineStatus;

/// Request to create a new pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineCreate {
    pub creator_id: i32,
    pub name: String,
}

/// Filter for pipeline lookups; provided fields conjoin, an empty filter
/// matches every row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineFind {
    pub id: Option<i32>,
    pub status: Option<PipelineStatus>,
}

/// Partial update of a pipeline by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelinePatch {
    pub id: i32,
    pub updater_id: i32,
    pub name: Option<String>,
    pub status: Option<PipelineStatus>,
}
