//! Task results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Outcome status of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  Completed,
  Failed,
  Partial,
}

/// Result of a task execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
  /// Task this result answers.
  pub task_id: String,
  /// Provider that produced the result.
  pub provider_id: String,
  pub status: TaskStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Provider confidence in `[0, 1]`.
  pub confidence: f64,
  /// Wall-clock duration as measured by the dispatcher.
  pub elapsed_ms: u64,
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub metadata: HashMap<String, serde_json::Value>,
}

impl TaskResult {
  /// A completed result with full confidence.
  pub fn completed(
    task_id: impl Into<String>,
    provider_id: impl Into<String>,
    output: serde_json::Value,
  ) -> Self {
    Self {
      task_id: task_id.into(),
      provider_id: provider_id.into(),
      status: TaskStatus::Completed,
      output: Some(output),
      error: None,
      confidence: 1.0,
      elapsed_ms: 0,
      metadata: HashMap::new(),
    }
  }

  /// A failed result with zero confidence.
  pub fn failed(
    task_id: impl Into<String>,
    provider_id: impl Into<String>,
    error: impl Into<String>,
  ) -> Self {
    Self {
      task_id: task_id.into(),
      provider_id: provider_id.into(),
      status: TaskStatus::Failed,
      output: None,
      error: Some(error.into()),
      confidence: 0.0,
      elapsed_ms: 0,
      metadata: HashMap::new(),
    }
  }

  /// A partial result: some output, reduced confidence.
  pub fn partial(
    task_id: impl Into<String>,
    provider_id: impl Into<String>,
    output: serde_json::Value,
    confidence: f64,
  ) -> Self {
    Self {
      status: TaskStatus::Partial,
      ..Self::completed(task_id, provider_id, output)
    }
    .confidence(confidence)
  }

  /// Set the confidence, clamped to `[0, 1]`.
  pub fn confidence(mut self, confidence: f64) -> Self {
    self.confidence = if confidence.is_nan() {
      0.0
    } else {
      confidence.clamp(0.0, 1.0)
    };
    self
  }

  pub fn metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
    self.metadata = metadata;
    self
  }

  pub fn is_completed(&self) -> bool {
    self.status == TaskStatus::Completed
  }
}
