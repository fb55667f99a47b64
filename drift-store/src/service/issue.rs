//! Issue Service
//!
//! Store operations and lifecycle enforcement for issues.

use chrono::Utc;
use drift_core::domain::issue::{Issue, IssueStatus};
use drift_core::dto::issue::{IssueCreate, IssueFind, IssuePatch};
use sqlx::PgPool;

use crate::cache::Cache;
use crate::error::{EntityKind, StoreError};
use crate::repository::{EntityStore, ListFilter, Record};
use crate::service::pipeline::PipelineRow;
use crate::sql::{Assignment, Predicate, SqlValue};

/// Service for issue metadata and lifecycle state.
pub struct IssueService {
    store: EntityStore<IssueRow>,
    pipelines: EntityStore<PipelineRow>,
}

impl IssueService {
    pub fn new(pool: PgPool, cache: Cache) -> IssueService {
        IssueService {
            store: EntityStore::new(pool.clone(), cache.clone()),
            pipelines: EntityStore::new(pool, cache),
        }
    }

    /// Create a new issue. Every issue starts OPEN.
    pub async fn create(&self, req: IssueCreate) -> Result<Issue, StoreError> {
        // Verify linked pipeline exists
        if let Some(pipeline_id) = req.pipeline_id {
            self.pipelines
                .find(ListFilter {
                    id: Some(pipeline_id),
                    ..Default::default()
                })
                .await?
                .ok_or(StoreError::NotFound {
                    kind: EntityKind::Pipeline,
                    id: pipeline_id,
                })?;
        }

        let issue = self
            .store
            .create(vec![
                Assignment::new("creator_id", SqlValue::Int(req.creator_id)),
                Assignment::new("updater_id", SqlValue::Int(req.creator_id)),
                Assignment::new("pipeline_id", SqlValue::NullableInt(req.pipeline_id)),
                Assignment::new("assignee_id", SqlValue::NullableInt(req.assignee_id)),
                Assignment::new("name", SqlValue::Text(req.name)),
                Assignment::new("description", SqlValue::Text(req.description)),
                Assignment::new(
                    "status",
                    SqlValue::Text(IssueStatus::INITIAL.as_str().to_string()),
                ),
            ])
            .await?;

        tracing::info!("Issue created: {} ({})", issue.name, issue.id);

        Ok(issue)
    }

    /// Single-issue lookup; `Ok(None)` when nothing matches.
    pub async fn find(&self, find: &IssueFind) -> Result<Option<Issue>, StoreError> {
        self.store.find(filter_from(find)).await
    }

    /// List issues matching the filter.
    pub async fn find_list(&self, find: &IssueFind) -> Result<Vec<Issue>, StoreError> {
        self.store.find_list(filter_from(find)).await
    }

    /// Patch an issue by ID.
    ///
    /// Status changes must follow the lifecycle (OPEN -> DONE, OPEN ->
    /// CANCELED); the edge is checked before any UPDATE is issued.
    pub async fn patch(&self, patch: IssuePatch) -> Result<Issue, StoreError> {
        if let Some(next) = patch.status {
            let current = self
                .find(&IssueFind {
                    id: Some(patch.id),
                    ..Default::default()
                })
                .await?
                .ok_or(StoreError::NotFound {
                    kind: EntityKind::Issue,
                    id: patch.id,
                })?;
            validate_transition(current.status, next)?;
        }

        let mut assignments = vec![
            Assignment::new("updater_id", SqlValue::Int(patch.updater_id)),
            Assignment::new("updated_at", SqlValue::Timestamp(Utc::now())),
        ];
        if let Some(name) = patch.name {
            assignments.push(Assignment::new("name", SqlValue::Text(name)));
        }
        if let Some(description) = patch.description {
            assignments.push(Assignment::new("description", SqlValue::Text(description)));
        }
        if let Some(assignee_id) = patch.assignee_id {
            assignments.push(Assignment::new("assignee_id", SqlValue::Int(assignee_id)));
        }
        if let Some(status) = patch.status {
            assignments.push(Assignment::new(
                "status",
                SqlValue::Text(status.as_str().to_string()),
            ));
        }

        let issue = self.store.patch(patch.id, assignments).await?;

        tracing::info!("Issue {} patched, status: {:?}", issue.id, issue.status);

        Ok(issue)
    }
}

fn filter_from(find: &IssueFind) -> ListFilter {
    let mut predicates = Vec::new();
    if let Some(pipeline_id) = find.pipeline_id {
        predicates.push(Predicate::new("pipeline_id", SqlValue::Int(pipeline_id)));
    }
    if let Some(assignee_id) = find.assignee_id {
        predicates.push(Predicate::new("assignee_id", SqlValue::Int(assignee_id)));
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

fn validate_transition(from: IssueStatus, to: IssueStatus) -> Result<(), StoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition {
            kind: EntityKind::Issue,
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
pub(crate) struct IssueRow {
    id: i32,
    creator_id: i32,
    created_at: chrono::DateTime<chrono::Utc>,
    updater_id: i32,
    updated_at: chrono::DateTime<chrono::Utc>,
    pipeline_id: Option<i32>,
    assignee_id: Option<i32>,
    name: String,
    description: String,
    status: String,
}

impl Record for IssueRow {
    type Entity = Issue;

    const KIND: EntityKind = EntityKind::Issue;
    const TABLE: &'static str = "issue";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "creator_id",
        "created_at",
        "updater_id",
        "updated_at",
        "pipeline_id",
        "assignee_id",
        "name",
        "description",
        "status",
    ];

    fn id(&self) -> i32 {
        self.id
    }
}

impl From<IssueRow> for Issue {
    fn from(row: IssueRow) -> Self {
        Issue {
            id: row.id,
            creator_id: row.creator_id,
            created_at: row.created_at,
            updater_id: row.updater_id,
            updated_at: row.updated_at,
            pipeline_id: row.pipeline_id,
            assignee_id: row.assignee_id,
            name: row.name,
            description: row.description,
            status: IssueStatus::from_str_or_initial(&row.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_transition_open_edges() {
        assert!(validate_transition(IssueStatus::Open, IssueStatus::Done).is_ok());
        assert!(validate_transition(IssueStatus::Open, IssueStatus::Canceled).is_ok());
    }

    #[test]
    fn test_validate_transition_out_of_terminal() {
        assert!(validate_transition(IssueStatus::Done, IssueStatus::Open).is_err());
        assert!(validate_transition(IssueStatus::Canceled, IssueStatus::Done).is_err());
    }

    #[test]
    fn test_filter_from_maps_all_fields() {
        let filter = filter_from(&IssueFind {
            id: Some(1),
            pipeline_id: Some(2),
            assignee_id: Some(3),
            status: Some(IssueStatus::Open),
        });
        assert_eq!(filter.id, Some(1));
        let columns: Vec<&str> = filter.predicates.iter().map(|p| p.column).collect();
        assert_eq!(columns, vec!["pipeline_id", "assignee_id", "status"]);
    }
}
