//! Shared helpers for coordinator integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use appraise_task::{Provider, ProviderError, Task, TaskResult};
use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Barrier;

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Step {
  Complete,
  Fail,
  Partial,
  Error(&'static str),
}

/// A provider whose answers are scripted per task type.
///
/// Unscripted calls complete. Every call is recorded in order, and
/// capabilities can be gated on a barrier to prove tasks run concurrently.
pub struct ScriptedProvider {
  id: String,
  capabilities: Vec<String>,
  script: Mutex<HashMap<String, VecDeque<Step>>>,
  barriers: HashMap<String, Arc<Barrier>>,
  calls: Mutex<Vec<Task>>,
}

impl ScriptedProvider {
  pub fn new(id: &str, capabilities: &[&str]) -> Self {
    Self {
      id: id.to_string(),
      capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
      script: Mutex::new(HashMap::new()),
      barriers: HashMap::new(),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Answer calls for `task_type` with `steps`, in order.
  pub fn script(self, task_type: &str, steps: &[Step]) -> Self {
    self
      .script
      .lock()
      .unwrap()
      .insert(task_type.to_string(), steps.iter().cloned().collect());
    self
  }

  /// Make calls for `task_type` wait until `parties` of them are in flight.
  pub fn gate(mut self, task_type: &str, parties: usize) -> Self {
    self
      .barriers
      .insert(task_type.to_string(), Arc::new(Barrier::new(parties)));
    self
  }

  pub fn shared(self) -> Arc<Self> {
    Arc::new(self)
  }

  /// Every task received, in call order.
  pub fn calls(&self) -> Vec<Task> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_ids(&self) -> Vec<String> {
    self.calls().into_iter().map(|t| t.id).collect()
  }

  pub fn call_count(&self, task_id: &str) -> usize {
    self.calls().iter().filter(|t| t.id == task_id).count()
  }
}

#[async_trait]
impl Provider for ScriptedProvider {
  fn id(&self) -> &str {
    &self.id
  }

  fn capabilities(&self) -> &[String] {
    &self.capabilities
  }

  async fn process(&self, task: &Task) -> Result<TaskResult, ProviderError> {
    if let Some(barrier) = self.barriers.get(&task.task_type) {
      barrier.wait().await;
    }

    self.calls.lock().unwrap().push(task.clone());
    let step = self
      .script
      .lock()
      .unwrap()
      .get_mut(&task.task_type)
      .and_then(|steps| steps.pop_front())
      .unwrap_or(Step::Complete);

    match step {
      Step::Complete => Ok(TaskResult::completed(
        &task.id,
        &self.id,
        json!({ "task_type": task.task_type }),
      )),
      Step::Fail => Ok(TaskResult::failed(&task.id, &self.id, "scripted failure")),
      Step::Partial => Ok(TaskResult::partial(&task.id, &self.id, json!({}), 0.5)),
      Step::Error(message) => Err(ProviderError::failed(message)),
    }
  }
}
