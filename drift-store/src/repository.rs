//! Generic transactional CRUD with write-through caching
//!
//! One parameterized component implements the create/find/find_list/patch
//! shape shared by every entity kind. Per-entity services supply the schema
//! through [`Record`] and layer their lifecycle rules on top.
//!
//! Every operation opens its own transaction. `sqlx` transactions roll back
//! on drop, so each exit path — success, store error, scan error, or the
//! caller dropping the future — releases the transaction; an explicit commit
//! makes the drop-path rollback a no-op. Cache writes happen strictly after
//! commit: a crash between commit and cache write only costs a cold read on
//! the next access, never a stale-ahead read.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use sqlx::postgres::PgRow;

use crate::cache::Cache;
use crate::error::{EntityKind, StoreError};
use crate::sql::{self, Assignment, Predicate, SqlValue};

/// Per-entity schema: backing table, column list, row type, and conversion
/// into the cached domain entity.
pub trait Record: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin + Sized {
    /// Domain entity produced from this row and held in the cache.
    type Entity: From<Self> + Serialize + DeserializeOwned + Clone + Send + Sync;

    /// Cache and error namespace for the entity kind.
    const KIND: EntityKind;
    /// Backing table name.
    const TABLE: &'static str;
    /// Columns selected and returned by every statement, in row-scan order.
    const COLUMNS: &'static [&'static str];

    /// Store-assigned row ID.
    fn id(&self) -> i32;
}

/// Filter for list queries: an optional ID plus equality predicates, all
/// conjoined; an empty filter matches every row.
#[derive(Debug, Default)]
pub struct ListFilter {
    pub id: Option<i32>,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<&'static str>,
}

/// Transactional store for one entity kind, sharing the process-wide pool
/// and cache.
pub struct EntityStore<R> {
    pool: PgPool,
    cache: Cache,
    _record: PhantomData<R>,
}

impl<R: Record> EntityStore<R> {
    pub fn new(pool: PgPool, cache: Cache) -> EntityStore<R> {
        EntityStore {
            pool,
            cache,
            _record: PhantomData,
        }
    }

    /// Inserts one row and returns the committed entity, cache refreshed
    /// after commit. Constraint violations surface as database errors.
    pub async fn create(&self, fields: Vec<Assignment>) -> Result<R::Entity, StoreError> {
        let (query, params) = sql::build_insert(R::TABLE, R::COLUMNS, &fields);
        let mut tx = self.pool.begin().await?;
        let row: R = sql::bind_values(sqlx::query_as(&query), params)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        let id = row.id();
        let entity: R::Entity = row.into();
        self.cache.upsert(R::KIND, id, &entity)?;
        Ok(entity)
    }

    /// Single-entity lookup.
    ///
    /// ID lookups are served from the cache when warm, without opening a
    /// transaction. Absence is `Ok(None)`; more than one matching row is a
    /// conflict so callers never silently get an arbitrary row from an
    /// ambiguous filter.
    pub async fn find(&self, filter: ListFilter) -> Result<Option<R::Entity>, StoreError> {
        if let Some(id) = filter.id {
            if let Some(entity) = self.cache.find::<R::Entity>(R::KIND, id)? {
                return Ok(Some(entity));
            }
        }

        let list = self.find_list(filter).await?;
        resolve_single(list, R::KIND)
    }

    /// Filtered list in store-native order. Never served from the cache, but
    /// every returned entity is written into it so point lookups stay warm.
    pub async fn find_list(&self, filter: ListFilter) -> Result<Vec<R::Entity>, StoreError> {
        let mut predicates = Vec::with_capacity(filter.predicates.len() + 1);
        if let Some(id) = filter.id {
            predicates.push(Predicate::new("id", SqlValue::Int(id)));
        }
        predicates.extend(filter.predicates);

        let (query, params) = sql::build_select(R::TABLE, R::COLUMNS, &predicates, filter.order_by);
        let mut tx = self.pool.begin().await?;
        let rows: Vec<R> = sql::bind_values(sqlx::query_as(&query), params)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id();
            let entity: R::Entity = row.into();
            self.cache.upsert(R::KIND, id, &entity)?;
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Updates one row by ID and returns the committed entity, cache
    /// refreshed after commit. Zero matching rows is a not-found error and
    /// leaves the cache untouched.
    ///
    /// No optimistic-concurrency token guards this path: two callers
    /// patching from stale reads both succeed and the later commit wins,
    /// for the row and for the cache alike.
    pub async fn patch(
        &self,
        id: i32,
        assignments: Vec<Assignment>,
    ) -> Result<R::Entity, StoreError> {
        let (query, params) = sql::build_update(R::TABLE, R::COLUMNS, &assignments, id);
        let mut tx = self.pool.begin().await?;
        let row: Option<R> = sql::bind_values(sqlx::query_as(&query), params)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Err(StoreError::NotFound { kind: R::KIND, id });
        };
        tx.commit().await?;

        let entity: R::Entity = row.into();
        self.cache.upsert(R::KIND, id, &entity)?;
        Ok(entity)
    }
}

/// Collapses a filtered result set into the single-entity contract: no rows
/// is `Ok(None)`, one row is the match, anything more is a conflict naming
/// the actual count.
fn resolve_single<T>(mut list: Vec<T>, kind: EntityKind) -> Result<Option<T>, StoreError> {
    match list.len() {
        0 => Ok(None),
        1 => Ok(Some(list.remove(0))),
        actual => Err(StoreError::Conflict { kind, actual }),
    }
}

// =====================================================================
// Tests
// =====================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_single_absence_is_none() {
        let resolved = resolve_single(Vec::<i32>::new(), EntityKind::Pipeline).unwrap();
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_resolve_single_one_row_is_the_match() {
        let resolved = resolve_single(vec![7], EntityKind::Task).unwrap();
        assert_eq!(resolved, Some(7));
    }

    #[test]
    fn test_resolve_single_multiple_rows_is_a_conflict() {
        let err = resolve_single(vec![1, 2, 3], EntityKind::Issue).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                kind: EntityKind::Issue,
                actual: 3,
            }
        ));
    }
}
