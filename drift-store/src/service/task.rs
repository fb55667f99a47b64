//! Task Service
//!
//! Store operations and lifecycle enforcement for tasks, the unit of work a
//! task executor drives through PENDING -> RUNNING -> {DONE, FAILED}.

use chrono::Utc;
use drift_core::domain::pipeline::PipelineStatus;
use drift_core::domain::stage::{Stage, StageStatus};
use drift_core::domain::task::{Task, TaskResult, TaskStatus};
use drift_core::dto::task::{TaskCreate, TaskFind, TaskPatch};
use sqlx::PgPool;

use crate::cache::Cache;
use crate::error::{EntityKind, StoreError};
use crate::repository::{EntityStore, ListFilter, Record};
use crate::service::pipeline::PipelineRow;
use crate::service::stage::StageRow;
use crate::sql::{Assignment, Predicate, SqlValue};

/// Service for task metadata and lifecycle state.
pub struct TaskService {
    store: EntityStore<TaskRow>,
    stages: EntityStore<StageRow>,
    pipelines: EntityStore<PipelineRow>,
}

impl TaskService {
    pub fn new(pool: PgPool, cache: Cache) -> TaskService {
        TaskService {
            store: EntityStore::new(pool.clone(), cache.clone()),
            stages: EntityStore::new(pool.clone(), cache.clone()),
            pipelines: EntityStore::new(pool, cache),
        }
    }

    /// Create a new task. Every task starts PENDING.
    pub async fn create(&self, req: TaskCreate) -> Result<Task, StoreError> {
        // Verify the stage exists and belongs to the named pipeline
        let stage = self
            .stages
            .find(ListFilter {
                id: Some(req.stage_id),
                ..Default::default()
            })
            .await?
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Stage,
                id: req.stage_id,
            })?;
        ensure_stage_in_pipeline(&stage, req.pipeline_id)?;

        let task = self
            .store
            .create(vec![
                Assignment::new("creator_id", SqlValue::Int(req.creator_id)),
                Assignment::new("updater_id", SqlValue::Int(req.creator_id)),
                Assignment::new("pipeline_id", SqlValue::Int(req.pipeline_id)),
                Assignment::new("stage_id", SqlValue::Int(req.stage_id)),
                Assignment::new("database_id", SqlValue::Int(req.database_id)),
                Assignment::new("name", SqlValue::Text(req.name)),
                Assignment::new("statement", SqlValue::Text(req.statement)),
                Assignment::new(
                    "status",
                    SqlValue::Text(TaskStatus::INITIAL.as_str().to_string()),
                ),
            ])
            .await?;

        tracing::info!(
            "Task created: {} ({}) in stage {}",
            task.name,
            task.id,
            task.stage_id
        );

        Ok(task)
    }

    /// Single-task lookup; `Ok(None)` when nothing matches.
    pub async fn find(&self, find: &TaskFind) -> Result<Option<Task>, StoreError> {
        self.store.find(filter_from(find)).await
    }

    /// List tasks matching the filter.
    pub async fn find_list(&self, find: &TaskFind) -> Result<Vec<Task>, StoreError> {
        self.store.find_list(filter_from(find)).await
    }

    /// Patch a task by ID.
    ///
    /// Status changes must follow the task lifecycle, and a task may enter
    /// RUNNING only while its owning stage and pipeline are OPEN. Both
    /// checks happen before any UPDATE is issued.
    pub async fn patch(&self, patch: TaskPatch) -> Result<Task, StoreError> {
        if let Some(next) = patch.status {
            let current = self
                .find(&TaskFind {
                    id: Some(patch.id),
                    ..Default::default()
                })
                .await?
                .ok_or(StoreError::NotFound {
                    kind: EntityKind::Task,
                    id: patch.id,
                })?;
            validate_transition(current.status, next)?;
            if next == TaskStatus::Running {
                self.ensure_parents_open(&current).await?;
            }
        }

        let mut assignments = vec![
            Assignment::new("updater_id", SqlValue::Int(patch.updater_id)),
            Assignment::new("updated_at", SqlValue::Timestamp(Utc::now())),
        ];
        if let Some(statement) = patch.statement {
            assignments.push(Assignment::new("statement", SqlValue::Text(statement)));
        }
        if let Some(status) = patch.status {
            assignments.push(Assignment::new(
                "status",
                SqlValue::Text(status.as_str().to_string()),
            ));
        }
        if let Some(result) = patch.result {
            assignments.push(Assignment::new(
                "result",
                SqlValue::Json(serde_json::to_value(&result)?),
            ));
        }

        let task = self.store.patch(patch.id, assignments).await?;

        tracing::info!("Task {} patched, status: {:?}", task.id, task.status);

        Ok(task)
    }

    /// A task may run only inside an open stage of an open pipeline.
    async fn ensure_parents_open(&self, task: &Task) -> Result<(), StoreError> {
        let stage = self
            .stages
            .find(ListFilter {
                id: Some(task.stage_id),
                ..Default::default()
            })
            .await?
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Stage,
                id: task.stage_id,
            })?;
        let pipeline = self
            .pipelines
            .find(ListFilter {
                id: Some(task.pipeline_id),
                ..Default::default()
            })
            .await?
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Pipeline,
                id: task.pipeline_id,
            })?;

        if stage.status != StageStatus::Open || pipeline.status != PipelineStatus::Open {
            tracing::warn!(
                "Task {} cannot start: stage {} is {:?}, pipeline {} is {:?}",
                task.id,
                stage.id,
                stage.status,
                pipeline.id,
                pipeline.status
            );
            return Err(StoreError::InvalidTransition {
                kind: EntityKind::Task,
                from: task.status.as_str(),
                to: TaskStatus::Running.as_str(),
            });
        }
        Ok(())
    }
}

/// A task is created against a stage, and the stage must belong to the
/// pipeline named in the request. A stage that exists under a different
/// pipeline is not found from this request's point of view.
fn ensure_stage_in_pipeline(stage: &Stage, pipeline_id: i32) -> Result<(), StoreError> {
    if stage.pipeline_id != pipeline_id {
        tracing::warn!(
            "Stage {} belongs to pipeline {}, not pipeline {}",
            stage.id,
            stage.pipeline_id,
            pipeline_id
        );
        return Err(StoreError::NotFound {
            kind: EntityKind::Stage,
            id: stage.id,
        });
    }
    Ok(())
}

fn filter_from(find: &TaskFind) -> ListFilter {
    let mut predicates = Vec::new();
    if let Some(pipeline_id) = find.pipeline_id {
        predicates.push(Predicate::new("pipeline_id", SqlValue::Int(pipeline_id)));
    }
    if let Some(stage_id) = find.stage_id {
        predicates.push(Predicate::new("stage_id", SqlValue::Int(stage_id)));
    }
    if let Some(status) = find.status {
        predicates.push(Predicate::new(
            "status",
            SqlValue::Text(status.as_str().to_string()),
        ));
    }
    ListFilter {
        id: find.id,
        predicates,
        order_by: Some("id ASC"),
    }
}

fn validate_transition(from: TaskStatus, to: TaskStatus) -> Result<(), StoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            kind: EntityKind::Task,
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
pub(crate) struct TaskRow {
    id: i32,
    creator_id: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updater_id: i32,
    updated_at: chrono::DateTime<chrono::Utc>,
    pipeline_id: i32,
    stage_id: i32,
    database_id: i32,
    name: String,
    statement: String,
    status: String,
    result: Option<serde_json::Value>,
}

impl Record for TaskRow {
    type Entity = Task;

    const KIND: EntityKind = EntityKind::Task;
    const TABLE: &'static str = "task";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "creator_id",
        "created_at",
        "updater_id",
        "updated_at",
        "pipeline_id",
        "stage_id",
        "database_id",
        "name",
        "statement",
        "status",
        "result",
    ];

    fn id(&self) -> i32 {
        self.id
    }
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        let result = row
            .result
            .and_then(|value| serde_json::from_value::<TaskResult>(value).ok());

        Task {
            id: row.id,
            creator_id: row.creator_id,
            created_at: row.created_at,
            updater_id: row.updater_id,
            updated_at: row.updated_at,
            pipeline_id: row.pipeline_id,
            stage_id: row.stage_id,
            database_id: row.database_id,
            name: row.name,
            statement: row.statement,
            status: TaskStatus::from_str_or_initial(&row.status),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage_in_pipeline(id: i32, pipeline_id: i32) -> Stage {
        Stage {
            id,
            creator_id: 1,
            created_at: Utc::now(),
            updater_id: 1,
            updated_at: Utc::now(),
            pipeline_id,
            environment: "staging".to_string(),
            name: "Staging".to_string(),
            position: 0,
            status: StageStatus::Open,
        }
    }

    #[test]
    fn test_stage_in_named_pipeline_is_accepted() {
        let stage = stage_in_pipeline(3, 9);
        assert!(ensure_stage_in_pipeline(&stage, 9).is_ok());
    }

    #[test]
    fn test_stage_under_other_pipeline_is_rejected() {
        let stage = stage_in_pipeline(3, 9);
        let result = ensure_stage_in_pipeline(&stage, 8);
        assert!(matches!(
            result,
            Err(StoreError::NotFound {
                kind: EntityKind::Stage,
                id: 3,
            })
        ));
    }

    #[test]
    fn test_validate_transition_pending_to_running() {
        assert!(validate_transition(TaskStatus::Pending, TaskStatus::Running).is_ok());
    }

    #[test]
    fn test_validate_transition_rejects_done_to_running() {
        let result = validate_transition(TaskStatus::Done, TaskStatus::Running);
        assert!(matches!(
            result,
            Err(StoreError::InvalidTransition {
                kind: EntityKind::Task,
                from: "DONE",
                to: "RUNNING",
            })
        ));
    }

    #[test]
    fn test_filter_from_conjoins_all_fields() {
        let filter = filter_from(&TaskFind {
            id: Some(1),
            pipeline_id: Some(2),
            stage_id: Some(3),
            status: Some(TaskStatus::Pending),
        });
        assert_eq!(filter.id, Some(1));
        let columns: Vec<&str> = filter.predicates.iter().map(|p| p.column).collect();
        assert_eq!(columns, vec!["pipeline_id", "stage_id", "status"]);
    }
}
