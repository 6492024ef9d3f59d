use serde::{Deserialize, Serialize};

/// Scheduling priority carried on every task.
///
/// Priority is informational for providers; the coordinator does not reorder
/// work by it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
  Low,
  #[default]
  Medium,
  High,
  Critical,
}

/// Policy applied when a required task does not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
  Skip,
  Retry,
  Substitute,
}
