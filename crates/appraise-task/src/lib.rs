//! Task contracts for appraise.
//!
//! This crate defines the values that flow between the coordinator and the
//! providers ("agents") that do the actual work:
//! - [`Task`]: one unit of requested work, addressed by its task type
//! - [`TaskResult`]: the outcome of one task
//! - [`Provider`]: the capability-bearing executor the coordinator dispatches to

mod error;
mod provider;
mod result;
mod task;

pub use appraise_config::Priority;
pub use error::ProviderError;
pub use provider::Provider;
pub use result::{TaskResult, TaskStatus};
pub use task::Task;
