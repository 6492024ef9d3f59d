use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{FallbackStrategy, Priority};

/// The shape of a task before it is bound to a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDef {
  /// Capability name used to pick a provider, e.g. "extract".
  pub task_type: String,
  #[serde(default)]
  pub priority: Priority,
  #[serde(default)]
  pub payload: serde_json::Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deadline: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub metadata: HashMap<String, serde_json::Value>,
}

/// A task entry in a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDef {
  #[serde(flatten)]
  pub template: TemplateDef,
  /// Indices of the tasks (in the same workflow) this task waits for.
  #[serde(default)]
  pub depends_on: Vec<usize>,
  #[serde(default)]
  pub optional: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fallback: Option<FallbackDef>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_retry_attempts: Option<u32>,
}

/// Fallback declaration for a task.
///
/// `task` is only meaningful for the `substitute` strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackDef {
  pub strategy: FallbackStrategy,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub task: Option<TemplateDef>,
}
