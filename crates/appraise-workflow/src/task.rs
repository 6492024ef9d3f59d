use std::collections::HashMap;

use appraise_config::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The parts of a task that are fixed before a workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
  pub task_type: String,
  pub priority: Priority,
  pub payload: serde_json::Value,
  pub deadline: Option<DateTime<Utc>>,
  pub metadata: HashMap<String, serde_json::Value>,
}

impl TaskTemplate {
  pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
    Self {
      task_type: task_type.into(),
      priority: Priority::default(),
      payload,
      deadline: None,
      metadata: HashMap::new(),
    }
  }

  pub fn priority(mut self, priority: Priority) -> Self {
    self.priority = priority;
    self
  }

  pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
    self.deadline = Some(deadline);
    self
  }

  pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
    self.metadata.insert(key.into(), value);
    self
  }
}

/// What the scheduler does when a required task does not complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "task", rename_all = "snake_case")]
pub enum Fallback {
  /// Treat the task as satisfied so dependents can run.
  Skip,
  /// Run the task again in the next round.
  Retry,
  /// Run a different task in its place.
  Substitute(TaskTemplate),
}

/// A task in a workflow: a template plus its place in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
  pub template: TaskTemplate,
  /// Indices of tasks in the same workflow that must complete first.
  pub depends_on: Vec<usize>,
  /// Failures of optional tasks never block dependents.
  pub optional: bool,
  pub fallback: Option<Fallback>,
  /// Overrides the engine-wide retry limit for this task.
  pub max_retry_attempts: Option<u32>,
}

impl WorkflowTask {
  pub fn new(template: TaskTemplate) -> Self {
    Self {
      template,
      depends_on: Vec::new(),
      optional: false,
      fallback: None,
      max_retry_attempts: None,
    }
  }

  pub fn depends_on(mut self, deps: impl IntoIterator<Item = usize>) -> Self {
    self.depends_on = deps.into_iter().collect();
    self
  }

  pub fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  pub fn fallback(mut self, fallback: Fallback) -> Self {
    self.fallback = Some(fallback);
    self
  }

  pub fn max_retry_attempts(mut self, attempts: u32) -> Self {
    self.max_retry_attempts = Some(attempts);
    self
  }
}
