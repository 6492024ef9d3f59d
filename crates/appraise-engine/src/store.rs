//! Workflow state store.
//!
//! The scheduler owns each workflow's [`crate::WorkflowState`] outright and
//! only publishes read-only snapshots here, so status queries never touch
//! live state. Entries are created on submission and retired on
//! finalization; a bounded history of finished results stays queryable.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use crate::error::CoordinatorError;
use crate::finalize::WorkflowResult;

#[derive(Debug, Default)]
struct Tables {
  active: HashMap<String, WorkflowResult>,
  finished: HashMap<String, WorkflowResult>,
  finished_order: VecDeque<String>,
}

/// Table of active workflows plus recently finished results.
#[derive(Debug)]
pub struct WorkflowStore {
  tables: RwLock<Tables>,
  history_limit: usize,
}

impl WorkflowStore {
  /// Create a store keeping up to `history_limit` finished results.
  pub fn new(history_limit: usize) -> Self {
    Self {
      tables: RwLock::new(Tables::default()),
      history_limit,
    }
  }

  /// Register a newly submitted workflow with its initial snapshot.
  pub fn begin(&self, snapshot: WorkflowResult) -> Result<(), CoordinatorError> {
    let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
    if tables.active.contains_key(&snapshot.workflow_id) {
      return Err(CoordinatorError::AlreadyActive {
        workflow_id: snapshot.workflow_id,
      });
    }
    tables.active.insert(snapshot.workflow_id.clone(), snapshot);
    Ok(())
  }

  /// Replace the snapshot of an active workflow.
  ///
  /// Ignored once the workflow has been retired.
  pub fn publish(&self, snapshot: WorkflowResult) {
    let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
    if let Some(entry) = tables.active.get_mut(&snapshot.workflow_id) {
      *entry = snapshot;
    }
  }

  /// Retire an active workflow and keep its final result in the history.
  pub fn finish(&self, result: WorkflowResult) {
    let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
    tables.active.remove(&result.workflow_id);

    if self.history_limit == 0 {
      return;
    }

    let workflow_id = result.workflow_id.clone();
    if tables.finished.insert(workflow_id.clone(), result).is_some() {
      tables.finished_order.retain(|id| id != &workflow_id);
    }
    tables.finished_order.push_back(workflow_id);

    while tables.finished_order.len() > self.history_limit {
      if let Some(oldest) = tables.finished_order.pop_front() {
        tables.finished.remove(&oldest);
      }
    }
  }

  /// Snapshot of an active workflow, or the final result of a finished one.
  pub fn get(&self, workflow_id: &str) -> Option<WorkflowResult> {
    let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
    tables
      .active
      .get(workflow_id)
      .or_else(|| tables.finished.get(workflow_id))
      .cloned()
  }

  /// Drop an active workflow that will never finish, without keeping a
  /// result. Returns `false` if it was not active.
  pub fn abandon(&self, workflow_id: &str) -> bool {
    let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
    tables.active.remove(workflow_id).is_some()
  }

  /// Ids of workflows still running, sorted.
  pub fn active_ids(&self) -> Vec<String> {
    let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
    let mut ids: Vec<String> = tables.active.keys().cloned().collect();
    ids.sort();
    ids
  }
}

impl Default for WorkflowStore {
  fn default() -> Self {
    Self::new(64)
  }
}
