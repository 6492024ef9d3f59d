use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Priority;

/// One unit of requested work.
///
/// Tasks are immutable once built; the builder methods consume and return
/// the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
  pub id: String,
  pub task_type: String,
  pub priority: Priority,
  pub payload: serde_json::Value,
  pub requester: String,
  /// Advisory only. The coordinator does not enforce deadlines.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deadline: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub context_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub parent_task_id: Option<String>,
  #[serde(default, skip_serializing_if = "HashMap::is_empty")]
  pub metadata: HashMap<String, serde_json::Value>,
}

impl Task {
  /// Create a task with a fresh id and default priority.
  pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
    Self::with_id(uuid::Uuid::new_v4().to_string(), task_type, payload)
  }

  /// Create a task with a caller-chosen id.
  pub fn with_id(
    id: impl Into<String>,
    task_type: impl Into<String>,
    payload: serde_json::Value,
  ) -> Self {
    Self {
      id: id.into(),
      task_type: task_type.into(),
      priority: Priority::default(),
      payload,
      requester: "direct".to_string(),
      deadline: None,
      context_id: None,
      parent_task_id: None,
      metadata: HashMap::new(),
    }
  }

  pub fn priority(mut self, priority: Priority) -> Self {
    self.priority = priority;
    self
  }

  pub fn requester(mut self, requester: impl Into<String>) -> Self {
    self.requester = requester.into();
    self
  }

  pub fn deadline(mut self, deadline: Option<DateTime<Utc>>) -> Self {
    self.deadline = deadline;
    self
  }

  pub fn context(mut self, context_id: impl Into<String>) -> Self {
    self.context_id = Some(context_id.into());
    self
  }

  pub fn parent(mut self, parent_task_id: impl Into<String>) -> Self {
    self.parent_task_id = Some(parent_task_id.into());
    self
  }

  pub fn metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
    self.metadata = metadata;
    self
  }
}
