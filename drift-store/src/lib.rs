//! Drift Store
//!
//! Transactionally-consistent, cache-accelerated entity store for the Drift
//! schema-change orchestration system.
//!
//! Single-ID reads consult an in-process cache and fall back to the database;
//! writes commit first and refresh the cache strictly after, so a cached read
//! never observes state that disagrees with the last committed write. List
//! queries always round-trip to the database.

pub mod cache;
pub mod db;
pub mod error;
pub mod repository;
pub mod service;
pub mod sql;

pub use cache::Cache;
pub use error::{EntityKind, StoreError};
pub use service::{IssueService, PipelineService, StageService, TaskService};
