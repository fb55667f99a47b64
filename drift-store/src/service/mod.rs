//! Service Module
//!
//! Entity services instantiating the generic store. Each service owns its
//! entity's customization points: initial status, transition table, parent
//! checks, and request-to-descriptor mapping.

pub mod issue;
pub mod pipeline;
pub mod stage;
pub mod task;

pub use issue::IssueService;
pub use pipeline::PipelineService;
pub use stage::StageService;
pub use task::TaskService;
