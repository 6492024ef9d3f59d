//! Per-workflow scheduling state.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use appraise_task::TaskResult;
use appraise_workflow::{Graph, Workflow, WorkflowTask};

use crate::finalize::{WorkflowResult, WorkflowStatus};

/// Mutable state of one workflow run.
///
/// Owned by the scheduler driving the workflow. Between rounds every derived
/// task id is in exactly one of `pending`, `ready`, `completed` or `failed`;
/// while a round is in flight its batch is in none of them. Once an id is
/// settled in `completed` or `failed` it never moves again.
#[derive(Debug)]
pub struct WorkflowState {
  workflow: Workflow,
  graph: Graph,
  task_ids: Vec<String>,
  indices: HashMap<String, usize>,
  results: HashMap<String, TaskResult>,
  pending: HashSet<String>,
  ready: HashSet<String>,
  completed: HashSet<String>,
  failed: HashSet<String>,
  retries: HashMap<String, u32>,
  rounds: u32,
}

impl WorkflowState {
  /// Derive task ids and seed the ready set with dependency-free tasks.
  pub fn new(workflow: Workflow) -> Self {
    let task_ids: Vec<String> = (0..workflow.tasks.len())
      .map(|index| workflow.task_id(index))
      .collect();
    let indices = task_ids
      .iter()
      .enumerate()
      .map(|(index, id)| (id.clone(), index))
      .collect();

    let graph = workflow.graph();
    let ready: HashSet<String> = graph
      .entry_points()
      .iter()
      .map(|index| task_ids[*index].clone())
      .collect();
    let pending = task_ids
      .iter()
      .filter(|id| !ready.contains(*id))
      .cloned()
      .collect();

    Self {
      workflow,
      graph,
      task_ids,
      indices,
      results: HashMap::new(),
      pending,
      ready,
      completed: HashSet::new(),
      failed: HashSet::new(),
      retries: HashMap::new(),
      rounds: 0,
    }
  }

  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }

  /// The definition a derived task id was built from.
  pub fn definition(&self, task_id: &str) -> Option<&WorkflowTask> {
    self
      .indices
      .get(task_id)
      .and_then(|index| self.workflow.tasks.get(*index))
  }

  /// Move the whole ready set into a new batch, in definition order.
  pub fn take_ready(&mut self) -> Vec<String> {
    let mut batch: Vec<String> = self.ready.drain().collect();
    batch.sort_by_key(|id| self.indices.get(id).copied().unwrap_or(usize::MAX));
    if !batch.is_empty() {
      self.rounds += 1;
    }
    batch
  }

  /// Store a result under a task id, replacing any earlier attempt.
  pub fn record(&mut self, task_id: &str, result: TaskResult) {
    self.results.insert(task_id.to_string(), result);
  }

  /// Settle a task in the completed set. Returns `false` if it was already
  /// settled.
  pub fn complete(&mut self, task_id: &str) -> bool {
    if self.is_settled(task_id) {
      return false;
    }
    self.unqueue(task_id);
    self.completed.insert(task_id.to_string())
  }

  /// Settle a task in the failed set. Returns `false` if it was already
  /// settled.
  pub fn fail(&mut self, task_id: &str) -> bool {
    if self.is_settled(task_id) {
      return false;
    }
    self.unqueue(task_id);
    self.failed.insert(task_id.to_string())
  }

  /// Put an unsettled task back into the ready set and count the retry.
  /// Returns the retry number, or `None` if the task was already settled.
  pub fn requeue(&mut self, task_id: &str) -> Option<u32> {
    if self.is_settled(task_id) {
      return None;
    }
    self.pending.remove(task_id);
    self.ready.insert(task_id.to_string());
    let retries = self.retries.entry(task_id.to_string()).or_insert(0);
    *retries += 1;
    Some(*retries)
  }

  /// Retries already spent on a task.
  pub fn retries(&self, task_id: &str) -> u32 {
    self.retries.get(task_id).copied().unwrap_or(0)
  }

  /// Move pending tasks whose dependencies all completed into the ready set.
  /// Returns the promoted ids in definition order.
  pub fn promote(&mut self) -> Vec<String> {
    let mut promoted: Vec<String> = self
      .pending
      .iter()
      .filter(|id| {
        self.indices.get(*id).is_some_and(|index| {
          self
            .graph
            .upstream(*index)
            .iter()
            .all(|dep| self.completed.contains(&self.task_ids[*dep]))
        })
      })
      .cloned()
      .collect();
    promoted.sort_by_key(|id| self.indices.get(id).copied().unwrap_or(usize::MAX));

    for id in &promoted {
      self.pending.remove(id);
      self.ready.insert(id.clone());
    }
    promoted
  }

  /// Nothing is ready but some tasks still wait on dependencies that will
  /// never complete.
  pub fn is_blocked(&self) -> bool {
    self.ready.is_empty() && !self.pending.is_empty()
  }

  pub fn pending(&self) -> &HashSet<String> {
    &self.pending
  }

  pub fn ready(&self) -> &HashSet<String> {
    &self.ready
  }

  pub fn completed(&self) -> &HashSet<String> {
    &self.completed
  }

  pub fn failed(&self) -> &HashSet<String> {
    &self.failed
  }

  pub fn results(&self) -> &HashMap<String, TaskResult> {
    &self.results
  }

  pub fn rounds(&self) -> u32 {
    self.rounds
  }

  /// Progress view for status queries. Always reported as `partial`.
  pub fn snapshot(&self, elapsed: Duration) -> WorkflowResult {
    WorkflowResult {
      workflow_id: self.workflow.workflow_id.clone(),
      status: WorkflowStatus::Partial,
      results: self.results.clone(),
      elapsed_ms: elapsed_ms(elapsed),
      rounds: self.rounds,
      blocked: Vec::new(),
      metadata: self.progress_metadata(),
    }
  }

  /// Ids still pending, in definition order.
  pub(crate) fn pending_in_order(&self) -> Vec<String> {
    let mut pending: Vec<String> = self.pending.iter().cloned().collect();
    pending.sort_by_key(|id| self.indices.get(id).copied().unwrap_or(usize::MAX));
    pending
  }

  pub(crate) fn progress_metadata(&self) -> HashMap<String, serde_json::Value> {
    HashMap::from([
      ("name".to_string(), self.workflow.name.clone().into()),
      ("total".to_string(), self.task_ids.len().into()),
      ("pending".to_string(), self.pending.len().into()),
      ("ready".to_string(), self.ready.len().into()),
      ("completed".to_string(), self.completed.len().into()),
      ("failed".to_string(), self.failed.len().into()),
    ])
  }

  pub(crate) fn into_results(self) -> HashMap<String, TaskResult> {
    self.results
  }

  fn is_settled(&self, task_id: &str) -> bool {
    self.completed.contains(task_id) || self.failed.contains(task_id)
  }

  fn unqueue(&mut self, task_id: &str) {
    self.pending.remove(task_id);
    self.ready.remove(task_id);
  }
}

pub(crate) fn elapsed_ms(elapsed: Duration) -> u64 {
  u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
