//! Workflow submission and status API.

use std::sync::Arc;
use std::time::Duration;

use appraise_config::EngineConfig;
use appraise_registry::SharedRegistry;
use appraise_task::{Provider, Task, TaskResult};
use appraise_workflow::Workflow;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::CoordinatorError;
use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::finalize::WorkflowResult;
use crate::scheduler::Scheduler;
use crate::state::WorkflowState;
use crate::store::WorkflowStore;

struct Inner<N> {
  dispatcher: Dispatcher,
  store: WorkflowStore,
  config: EngineConfig,
  notifier: N,
}

impl<N: ExecutionNotifier> Inner<N> {
  async fn process(&self, workflow: Workflow) -> WorkflowResult {
    let guard = RunGuard {
      store: &self.store,
      workflow_id: workflow.workflow_id.clone(),
      finished: false,
    };

    let result = Scheduler::new(&self.dispatcher, &self.config, &self.store, &self.notifier)
      .run(workflow)
      .await;

    guard.finish();
    result
  }
}

/// Retires the active entry of a run that was dropped before finalizing,
/// e.g. when the caller of `run_workflow` times out.
struct RunGuard<'a> {
  store: &'a WorkflowStore,
  workflow_id: String,
  finished: bool,
}

impl RunGuard<'_> {
  fn finish(mut self) {
    self.finished = true;
  }
}

impl Drop for RunGuard<'_> {
  fn drop(&mut self) {
    if !self.finished && self.store.abandon(&self.workflow_id) {
      warn!(workflow_id = %self.workflow_id, "workflow abandoned before finishing");
    }
  }
}

/// Entry point for running workflows and single tasks.
///
/// Generic over `N: ExecutionNotifier` to allow different notification
/// strategies. Use `Coordinator::new()` for a coordinator with no-op
/// notifications, or `Coordinator::with_notifier()` to observe events.
///
/// Cloning is cheap; clones share the registry, the workflow store and the
/// notifier. Independent workflows run concurrently and share nothing but the
/// registry.
pub struct Coordinator<N: ExecutionNotifier = NoopNotifier> {
  inner: Arc<Inner<N>>,
}

impl<N: ExecutionNotifier> Clone for Coordinator<N> {
  fn clone(&self) -> Self {
    Self {
      inner: self.inner.clone(),
    }
  }
}

impl Coordinator<NoopNotifier> {
  /// Create a coordinator that discards execution events.
  pub fn new(registry: SharedRegistry, config: EngineConfig) -> Self {
    Self::with_notifier(registry, config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier + 'static> Coordinator<N> {
  /// Create a coordinator with a custom notifier.
  pub fn with_notifier(registry: SharedRegistry, config: EngineConfig, notifier: N) -> Self {
    let store = WorkflowStore::new(config.history_limit);
    Self {
      inner: Arc::new(Inner {
        dispatcher: Dispatcher::new(registry),
        store,
        config,
        notifier,
      }),
    }
  }

  /// Register a provider under each of its capabilities.
  pub fn register(&self, provider: Arc<dyn Provider>) {
    self.inner.dispatcher.registry().register(provider);
  }

  pub fn registry(&self) -> &SharedRegistry {
    self.inner.dispatcher.registry()
  }

  pub fn config(&self) -> &EngineConfig {
    &self.inner.config
  }

  /// Submit a workflow and return its id immediately.
  ///
  /// Processing runs on a spawned tokio task; observe it through
  /// [`get_workflow_status`](Self::get_workflow_status) or the notifier's
  /// `WorkflowFinished` event. Must be called from within a tokio runtime.
  ///
  /// # Errors
  /// Returns an error if the workflow is invalid or a workflow with the same
  /// id is still active. Task failures are never reported here.
  pub fn start_workflow(&self, workflow: Workflow) -> Result<String, CoordinatorError> {
    self.admit(&workflow)?;

    let workflow_id = workflow.workflow_id.clone();
    let inner = self.inner.clone();
    tokio::spawn(async move {
      inner.process(workflow).await;
    });

    Ok(workflow_id)
  }

  /// Submit a workflow and wait for its final result.
  ///
  /// Dropping the returned future before it resolves abandons the workflow:
  /// it leaves the active table without a result, so the id can be
  /// submitted again. Provider calls already in flight are not cancelled.
  ///
  /// # Errors
  /// Same admission errors as [`start_workflow`](Self::start_workflow).
  pub async fn run_workflow(&self, workflow: Workflow) -> Result<WorkflowResult, CoordinatorError> {
    self.admit(&workflow)?;
    Ok(self.inner.process(workflow).await)
  }

  /// Non-blocking status lookup.
  ///
  /// Active workflows are always reported as `partial` with the results
  /// recorded so far. Finished workflows are served from the bounded history
  /// (see `EngineConfig::history_limit`). Unknown ids return `None`.
  pub fn get_workflow_status(&self, workflow_id: &str) -> Option<WorkflowResult> {
    self.inner.store.get(workflow_id)
  }

  /// Ids of workflows still running.
  pub fn active_workflows(&self) -> Vec<String> {
    self.inner.store.active_ids()
  }

  /// Dispatch a single task outside any workflow.
  pub async fn execute_task(&self, task: Task) -> TaskResult {
    self.inner.dispatcher.execute(&task).await
  }

  /// Validate a workflow and register it as active.
  fn admit(&self, workflow: &Workflow) -> Result<(), CoordinatorError> {
    workflow.validate()?;

    let initial = WorkflowState::new(workflow.clone()).snapshot(Duration::ZERO);
    self.inner.store.begin(initial)?;

    info!(
      workflow_id = %workflow.workflow_id,
      name = %workflow.name,
      tasks = workflow.tasks.len(),
      "workflow admitted"
    );
    Ok(())
  }
}
