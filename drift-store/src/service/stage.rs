//! Stage Service
//!
//! Store operations for stages. Stage positions are assigned by the store
//! (next free ordinal per pipeline) and stage status is derived from task
//! statuses once execution has begun.

use chrono::Utc;
use drift_core::domain::stage::{Stage, StageStatus};
use drift_core::domain::task::TaskStatus;
use drift_core::dto::stage::{StageCreate, StageFind, StagePatch};
use sqlx::PgPool;

use crate::cache::Cache;
use crate::error::{EntityKind, StoreError};
use crate::repository::{EntityStore, ListFilter, Record};
use crate::service::pipeline::PipelineRow;
use crate::service::task::TaskRow;
use crate::sql::{Assignment, Predicate, SqlValue};

/// Service for stage metadata and derived lifecycle state.
pub struct StageService {
    store: EntityStore<StageRow>,
    pipelines: EntityStore<PipelineRow>,
    tasks: EntityStore<TaskRow>,
}

impl StageService {
    pub fn new(pool: PgPool, cache: Cache) -> StageService {
        StageService {
            store: EntityStore::new(pool.clone(), cache.clone()),
            pipelines: EntityStore::new(pool.clone(), cache.clone()),
            tasks: EntityStore::new(pool, cache),
        }
    }

    /// Create a new stage at the end of its pipeline.
    ///
    /// The position is the current stage count of the pipeline, which keeps
    /// ordinals unique and contiguous; a concurrent create racing for the
    /// same ordinal loses to the unique constraint.
    pub async fn create(&self, req: StageCreate) -> Result<Stage, StoreError> {
        // Verify pipeline exists
        self.pipelines
            .find(ListFilter {
                id: Some(req.pipeline_id),
                ..Default::default()
            })
            .await?
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Pipeline,
                id: req.pipeline_id,
            })?;

        let siblings = self
            .store
            .find_list(ListFilter {
                predicates: vec![Predicate::new(
                    "pipeline_id",
                    SqlValue::Int(req.pipeline_id),
                )],
                order_by: Some("position ASC"),
                ..Default::default()
            })
            .await?;
        let position = siblings.len() as i32;

        let stage = self
            .store
            .create(vec![
                Assignment::new("creator_id", SqlValue::Int(req.creator_id)),
                Assignment::new("updater_id", SqlValue::Int(req.creator_id)),
                Assignment::new("pipeline_id", SqlValue::Int(req.pipeline_id)),
                Assignment::new("environment", SqlValue::Text(req.environment)),
                Assignment::new("name", SqlValue::Text(req.name)),
                Assignment::new("position", SqlValue::Int(position)),
                Assignment::new(
                    "status",
                    SqlValue::Text(StageStatus::INITIAL.as_str().to_string()),
                ),
            ])
            .await?;

        tracing::info!(
            "Stage created: {} ({}) at position {} in pipeline {}",
            stage.name,
            stage.id,
            stage.position,
            stage.pipeline_id
        );

        Ok(stage)
    }

    /// Single-stage lookup; `Ok(None)` when nothing matches.
    pub async fn find(&self, find: &StageFind) -> Result<Option<Stage>, StoreError> {
        self.store.find(filter_from(find)).await
    }

    /// List stages matching the filter, in pipeline order.
    pub async fn find_list(&self, find: &StageFind) -> Result<Vec<Stage>, StoreError> {
        self.store.find_list(filter_from(find)).await
    }

    /// Patch a stage by ID.
    ///
    /// An explicit status change is only accepted while every task of the
    /// stage is still PENDING; after that the status is derived from the
    /// tasks via [`StageService::refresh_status`].
    pub async fn patch(&self, patch: StagePatch) -> Result<Stage, StoreError> {
        if let Some(next) = patch.status {
            let current = self
                .find(&StageFind {
                    id: Some(patch.id),
                    ..Default::default()
                })
                .await?
                .ok_or(StoreError::NotFound {
                    kind: EntityKind::Stage,
                    id: patch.id,
                })?;

            let task_statuses = self.task_statuses(patch.id).await?;
            if task_statuses.iter().any(|t| *t != TaskStatus::Pending) {
                tracing::warn!(
                    "Rejecting explicit status change for stage {}: tasks have started",
                    patch.id
                );
                return Err(StoreError::InvalidTransition {
                    kind: EntityKind::Stage,
                    from: current.status.as_str(),
                    to: next.as_str(),
                });
            }
            validate_transition(current.status, next)?;
        }

        let mut assignments = vec![
            Assignment::new("updater_id", SqlValue::Int(patch.updater_id)),
            Assignment::new("updated_at", SqlValue::Timestamp(Utc::now())),
        ];
        if let Some(name) = patch.name {
            assignments.push(Assignment::new("name", SqlValue::Text(name)));
        }
        if let Some(status) = patch.status {
            assignments.push(Assignment::new(
                "status",
                SqlValue::Text(status.as_str().to_string()),
            ));
        }

        self.store.patch(patch.id, assignments).await
    }

    /// Recompute a stage's status from its tasks and persist it if changed.
    ///
    /// This is the write path the task executor drives after each task
    /// status change.
    pub async fn refresh_status(&self, stage_id: i32, updater_id: i32) -> Result<Stage, StoreError> {
        let stage = self
            .find(&StageFind {
                id: Some(stage_id),
                ..Default::default()
            })
            .await?
            .ok_or(StoreError::NotFound {
                kind: EntityKind::Stage,
                id: stage_id,
            })?;

        let task_statuses = self.task_statuses(stage_id).await?;
        let derived = StageStatus::aggregate(&task_statuses);
        if derived == stage.status {
            return Ok(stage);
        }

        let stage = self
            .store
            .patch(
                stage_id,
                vec![
                    Assignment::new("updater_id", SqlValue::Int(updater_id)),
                    Assignment::new("updated_at", SqlValue::Timestamp(Utc::now())),
                    Assignment::new("status", SqlValue::Text(derived.as_str().to_string())),
                ],
            )
            .await?;

        tracing::info!("Stage {} status refreshed to {:?}", stage.id, stage.status);

        Ok(stage)
    }

    async fn task_statuses(&self, stage_id: i32) -> Result<Vec<TaskStatus>, StoreError> {
        let tasks = self
            .tasks
            .find_list(ListFilter {
                predicates: vec![Predicate::new("stage_id", SqlValue::Int(stage_id))],
                order_by: Some("id ASC"),
                ..Default::default()
            })
            .await?;
        Ok(tasks.into_iter().map(|t| t.status).collect())
    }
}

fn filter_from(find: &StageFind) -> ListFilter {
    let mut predicates = Vec::new();
    if let Some(pipeline_id) = find.pipeline_id {
        predicates.push(Predicate::new("pipeline_id", SqlValue::Int(pipeline_id)));
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
        order_by: Some("position ASC"),
    }
}

fn validate_transition(from: StageStatus, to: StageStatus) -> Result<(), StoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            kind: EntityKind::Stage,
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
pub(crate) struct StageRow {
    id: i32,
    creator_id: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updater_id: i32,
    updated_at: chrono::DateTime<chrono::Utc>,
    pipeline_id: i32,
    environment: String,
    name: String,
    position: i32,
    status: String,
}

impl Record for StageRow {
    type Entity = Stage;

    const KIND: EntityKind = EntityKind::Stage;
    const TABLE: &'static str = "stage";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "creator_id",
        "created_at",
        "updater_id",
        "updated_at",
        "pipeline_id",
        "environment",
        "name",
        "position",
        "status",
    ];

    fn id(&self) -> i32 {
        self.id
    }
}

impl From<StageRow> for Stage {
    fn from(row: StageRow) -> Self {
        Stage {
            id: row.id,
            creator_id: row.creator_id,
            created_at: row.created_at,
            updater_id: row.updater_id,
            updated_at: row.updated_at,
            pipeline_id: row.pipeline_id,
            environment: row.environment,
            name: row.name,
            position: row.position,
            status: StageStatus::from_str_or_initial(&row.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_transition_terminal() {
        assert!(validate_transition(StageStatus::Open, StageStatus::Done).is_ok());
        assert!(validate_transition(StageStatus::Canceled, StageStatus::Open).is_err());
    }

    #[test]
    fn test_filter_from_conjoins_fields() {
        let filter = filter_from(&StageFind {
            id: None,
            pipeline_id: Some(7),
            status: Some(StageStatus::Open),
        });
        assert_eq!(filter.predicates.len(), 2);
        assert_eq!(filter.predicates[0].column, "pipeline_id");
        assert_eq!(filter.predicates[1].column, "status");
    }
}
