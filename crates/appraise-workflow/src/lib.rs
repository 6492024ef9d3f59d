//! Appraise Workflow
//!
//! This crate provides the validated workflow representation for appraise.
//! A workflow is an ordered list of task templates whose dependencies refer to
//! other tasks by index.
//!
//! Key differences from `appraise-config`:
//! - Dependency indices are checked (in range, no self edges, no cycles)
//! - Fallbacks are typed (`substitute` always carries its template)
//! - Workflow and context ids are always present
//! - Ready to be handed to the coordinator for scheduling

mod error;
mod graph;
mod resolve;
mod task;
mod workflow;

pub use error::WorkflowError;
pub use graph::Graph;
pub use resolve::resolve;
pub use task::{Fallback, TaskTemplate, WorkflowTask};
pub use workflow::Workflow;
