//! Appraise Workflow Coordinator
//!
//! This crate dispatches typed tasks to capability providers, schedules
//! workflow task graphs in concurrent rounds and applies per-task fallback
//! policies to produce a workflow-level outcome.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Coordinator                          │
//! │  - start_workflow(workflow) → workflow id (spawned)         │
//! │  - get_workflow_status(id) → snapshot / final result        │
//! │  - execute_task(task) → TaskResult                          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Scheduler                            │
//! │  - pending / ready / completed / failed sets                │
//! │  - one round per batch of ready tasks, joined as a barrier  │
//! │  - optional / skip / retry / substitute outcome policy      │
//! │  - finalization: status law, exactly-once emission          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Dispatcher                           │
//! │  - picks the first capable provider from the registry       │
//! │  - times the call, turns errors and panics into results     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use appraise_engine::{Coordinator, EngineConfig};
//! use appraise_registry::SharedRegistry;
//!
//! let registry = SharedRegistry::default();
//! registry.register(Arc::new(MyExtractor::new()));
//!
//! let coordinator = Coordinator::new(registry, EngineConfig::default());
//! let workflow_id = coordinator.start_workflow(workflow)?;
//!
//! // Later
//! let status = coordinator.get_workflow_status(&workflow_id);
//! ```

mod coordinator;
mod dispatcher;
mod error;
mod events;
mod finalize;
mod scheduler;
mod state;
mod store;

pub use appraise_config::EngineConfig;
pub use coordinator::Coordinator;
pub use dispatcher::{Dispatcher, SCHEDULER_ID};
pub use error::CoordinatorError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use finalize::{WorkflowResult, WorkflowStatus};
pub use scheduler::Scheduler;
pub use state::WorkflowState;
pub use store::WorkflowStore;
