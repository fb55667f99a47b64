//! Drift Core
//!
//! Core types for the Drift schema-change orchestration system.
//!
//! This crate contains:
//! - Domain types: Core business entities (Pipeline, Stage, Task, Issue)
//!   and their lifecycle state machines
//! - DTOs: Request types consumed by the entity store

pub mod domain;
pub mod dto;
