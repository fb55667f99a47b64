//! In-process entity cache
//!
//! Pure performance optimization over the relational store: holds a snapshot
//! of each entity at its last known-committed state, keyed by
//! `(EntityKind, id)`. Serves exact single-ID lookups only; list queries
//! always round-trip to the store. Entries are refreshed by write-through
//! population, never expired by the cache itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{EntityKind, StoreError};

/// Cache traffic counters, cumulative since construction. `puts` counts
/// snapshot writes, so a caller can observe that a rejected operation wrote
/// nothing back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
}

/// Shared snapshot cache.
///
/// Cloning is cheap and every clone sees the same entries; one cache instance
/// is constructed per process and injected into each entity service.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<RwLock<HashMap<(EntityKind, i32), serde_json::Value>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    puts: Arc<AtomicU64>,
}

impl Cache {
    pub fn new() -> Cache {
        Cache::default()
    }

    /// Stores the committed snapshot for `(kind, id)`, replacing any
    /// previous one.
    pub fn upsert<T: Serialize>(
        &self,
        kind: EntityKind,
        id: i32,
        entity: &T,
    ) -> Result<(), StoreError> {
        let snapshot = serde_json::to_value(entity)?;
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert((kind, id), snapshot);
        self.puts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the cached snapshot for `(kind, id)`, if any.
    pub fn find<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        id: i32,
    ) -> Result<Option<T>, StoreError> {
        let snapshot = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.get(&(kind, id)).cloned()
        };
        match snapshot {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(serde_json::from_value(value)?))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        id: i32,
        name: String,
    }

    #[test]
    fn test_upsert_then_find() {
        let cache = Cache::new();
        let entity = Snapshot {
            id: 1,
            name: "release-42".to_string(),
        };
        cache.upsert(EntityKind::Pipeline, 1, &entity).unwrap();

        let found: Option<Snapshot> = cache.find(EntityKind::Pipeline, 1).unwrap();
        assert_eq!(found, Some(entity));
    }

    #[test]
    fn test_miss_on_unknown_id_and_kind() {
        let cache = Cache::new();
        let entity = Snapshot {
            id: 1,
            name: "a".to_string(),
        };
        cache.upsert(EntityKind::Pipeline, 1, &entity).unwrap();

        let by_id: Option<Snapshot> = cache.find(EntityKind::Pipeline, 2).unwrap();
        assert!(by_id.is_none());
        // Same ID under a different kind is a different key.
        let by_kind: Option<Snapshot> = cache.find(EntityKind::Stage, 1).unwrap();
        assert!(by_kind.is_none());
    }

    #[test]
    fn test_upsert_overwrites_previous_snapshot() {
        let cache = Cache::new();
        let first = Snapshot {
            id: 1,
            name: "first".to_string(),
        };
        let second = Snapshot {
            id: 1,
            name: "second".to_string(),
        };
        cache.upsert(EntityKind::Task, 1, &first).unwrap();
        cache.upsert(EntityKind::Task, 1, &second).unwrap();

        let found: Option<Snapshot> = cache.find(EntityKind::Task, 1).unwrap();
        assert_eq!(found, Some(second));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = Cache::new();
        let clone = cache.clone();
        let entity = Snapshot {
            id: 5,
            name: "shared".to_string(),
        };
        cache.upsert(EntityKind::Issue, 5, &entity).unwrap();

        let found: Option<Snapshot> = clone.find(EntityKind::Issue, 5).unwrap();
        assert_eq!(found, Some(entity));
    }

    #[test]
    fn test_stats_count_hits_and_misses() {
        let cache = Cache::new();
        let entity = Snapshot {
            id: 1,
            name: "a".to_string(),
        };
        cache.upsert(EntityKind::Pipeline, 1, &entity).unwrap();

        let _: Option<Snapshot> = cache.find(EntityKind::Pipeline, 1).unwrap();
        let _: Option<Snapshot> = cache.find(EntityKind::Pipeline, 9).unwrap();

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                puts: 1,
            }
        );
    }

    #[test]
    fn test_concurrent_get_put() {
        let cache = Cache::new();
        let mut handles = Vec::new();
        for worker in 0..8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let entity = Snapshot {
                        id: i,
                        name: format!("w{worker}-{i}"),
                    };
                    cache.upsert(EntityKind::Task, i, &entity).unwrap();
                    let _: Option<Snapshot> = cache.find(EntityKind::Task, i).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        // Every key holds the snapshot of whichever worker wrote last.
        for i in 0..100 {
            let found: Option<Snapshot> = cache.find(EntityKind::Task, i).unwrap();
            assert_eq!(found.unwrap().id, i);
        }
    }
}
