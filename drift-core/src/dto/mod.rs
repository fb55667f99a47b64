//! DTOs
//!
//! Request types consumed by the entity store. Each entity kind has the same
//! trio: a create request, a conjunctive filter, and a partial patch where
//! `None` fields mean "no change".

pub mod issue;
pub mod pipeline;
pub mod stage;
pub mod task;
