//! Workflow finalization.

use std::collections::HashMap;
use std::time::Duration;

use appraise_task::TaskResult;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::state::{WorkflowState, elapsed_ms};
use crate::store::WorkflowStore;

/// Terminal status of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
  Completed,
  Partial,
  Failed,
}

impl WorkflowStatus {
  /// Status law over the sizes of the completed and failed sets.
  ///
  /// No failures is `completed` (including an empty workflow), failures next
  /// to completions is `partial`, and failures alone is `failed`.
  pub fn from_counts(completed: usize, failed: usize) -> Self {
    match (completed, failed) {
      (_, 0) => Self::Completed,
      (0, _) => Self::Failed,
      _ => Self::Partial,
    }
  }
}

/// Outcome of a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
  pub workflow_id: String,
  pub status: WorkflowStatus,
  /// Results keyed by derived task id. A substituted task's entry holds the
  /// substitute's result.
  pub results: HashMap<String, TaskResult>,
  pub elapsed_ms: u64,
  /// Number of rounds executed.
  pub rounds: u32,
  /// Tasks left pending because a dependency never completed.
  #[serde(default)]
  pub blocked: Vec<String>,
  #[serde(default)]
  pub metadata: HashMap<String, serde_json::Value>,
}

impl WorkflowResult {
  /// Results that did not complete, keyed by task id.
  pub fn failures(&self) -> impl Iterator<Item = (&String, &TaskResult)> {
    self.results.iter().filter(|(_, r)| !r.is_completed())
  }
}

/// Compute the terminal result of a drained (or blocked) workflow.
pub fn finalize(state: WorkflowState, elapsed: Duration) -> WorkflowResult {
  let status = WorkflowStatus::from_counts(state.completed().len(), state.failed().len());
  let blocked = state.pending_in_order();
  let metadata = state.progress_metadata();
  let workflow_id = state.workflow().workflow_id.clone();
  let rounds = state.rounds();

  WorkflowResult {
    workflow_id,
    status,
    results: state.into_results(),
    elapsed_ms: elapsed_ms(elapsed),
    rounds,
    blocked,
    metadata,
  }
}

/// Finalize a workflow, retire it from the active table and emit the result.
///
/// Consumes the state so it cannot be mutated afterwards; this is the only
/// place a `WorkflowFinished` event is produced.
pub(crate) fn finish<N: ExecutionNotifier + ?Sized>(
  state: WorkflowState,
  elapsed: Duration,
  store: &WorkflowStore,
  notifier: &N,
) -> WorkflowResult {
  let result = finalize(state, elapsed);

  store.finish(result.clone());

  info!(
    workflow_id = %result.workflow_id,
    status = ?result.status,
    rounds = result.rounds,
    tasks = result.results.len(),
    blocked = result.blocked.len(),
    elapsed_ms = result.elapsed_ms,
    "workflow_finished"
  );

  notifier.notify(ExecutionEvent::WorkflowFinished {
    result: result.clone(),
  });

  result
}
