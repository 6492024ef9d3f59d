use serde::{Deserialize, Serialize};

/// Limits and identities used by the workflow coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
  /// Upper bound on re-runs for tasks with the `retry` fallback.
  /// `None` retries until the task completes.
  #[serde(default = "default_max_retry_attempts")]
  pub max_retry_attempts: Option<u32>,
  /// Number of finished workflow results kept for status queries.
  #[serde(default = "default_history_limit")]
  pub history_limit: usize,
  /// Requester identity stamped on tasks derived from workflows.
  #[serde(default = "default_requester")]
  pub requester: String,
}

fn default_max_retry_attempts() -> Option<u32> {
  Some(3)
}

fn default_history_limit() -> usize {
  64
}

fn default_requester() -> String {
  "workflow-coordinator".to_string()
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      max_retry_attempts: default_max_retry_attempts(),
      history_limit: default_history_limit(),
      requester: default_requester(),
    }
  }
}
