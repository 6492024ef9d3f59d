//! Appraise Config
//!
//! This crate contains the serializable configuration types for appraise.
//! These types represent workflow definitions and coordinator settings before
//! they are validated and resolved into runtime structures.
//!
//! Configuration is loaded from JSON:
//! - workflow files (via CLI with `appraise run workflow workflow.json`)
//! - the settings file listing providers and engine limits
//!
//! The workflow crate takes a [`WorkflowDef`], checks its dependency graph and
//! resolves it into a locked `Workflow` ready for scheduling.

mod engine;
mod enums;
mod provider;
mod settings;
mod task;
mod workflow;

pub use engine::EngineConfig;
pub use enums::{FallbackStrategy, Priority};
pub use provider::ProviderDef;
pub use settings::{Settings, SettingsError};
pub use task::{FallbackDef, TaskDef, TemplateDef};
pub use workflow::WorkflowDef;
