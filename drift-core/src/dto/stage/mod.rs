//! Stage request types

use serde::{Deserialize, Serialize};

use crate::domain::stage::StageStatus;

/// Request to create a new stage.
///
/// The position within the pipeline is assigned by the store (next free
/// ordinal), keeping positions unique and contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCreate {
    pub creator_id: i32,
    pub pipeline_id: i32,
    pub environment: String,
    pub name: String,
}

/// Filter for stage lookups; provided fields conjoin, an empty filter
/// matches every row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageFind {
    pub id: Option<i32>,
    pub pipeline_id: Option<i32>,
    pub status: Option<StageStatus>,
}

/// Partial update of a stage by ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagePatch {
    pub id: i32,
    pub updater_id: i32,
    pub name: Option<String>,
    pub status: Option<StageStatus>,
}
