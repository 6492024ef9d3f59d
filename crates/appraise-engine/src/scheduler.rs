//! Round-based workflow scheduling.

use std::time::Instant;

use appraise_config::EngineConfig;
use appraise_task::{Task, TaskResult, TaskStatus};
use appraise_workflow::{Fallback, TaskTemplate, Workflow};
use tracing::{error, info, instrument, warn};

use crate::dispatcher::{Dispatcher, SCHEDULER_ID};
use crate::events::{ExecutionEvent, ExecutionNotifier};
use crate::finalize::{WorkflowResult, finish};
use crate::state::WorkflowState;
use crate::store::WorkflowStore;

/// What a single batch member produced.
struct TaskOutcome {
  task_id: String,
  result: TaskResult,
  /// Set when the result came from the substitute task.
  substitute_id: Option<String>,
}

/// Drives one workflow from its initial ready set to finalization.
///
/// Each round drains the ready set, dispatches every member concurrently and
/// waits for all of them before settling outcomes and promoting dependents.
/// The state is owned by the scheduler for the whole run; status readers see
/// snapshots published to the [`WorkflowStore`] after every round.
pub struct Scheduler<'a, N: ExecutionNotifier + ?Sized> {
  dispatcher: &'a Dispatcher,
  config: &'a EngineConfig,
  store: &'a WorkflowStore,
  notifier: &'a N,
}

impl<'a, N: ExecutionNotifier + ?Sized> Scheduler<'a, N> {
  pub fn new(
    dispatcher: &'a Dispatcher,
    config: &'a EngineConfig,
    store: &'a WorkflowStore,
    notifier: &'a N,
  ) -> Self {
    Self {
      dispatcher,
      config,
      store,
      notifier,
    }
  }

  /// Run the workflow to completion and return its final result.
  ///
  /// The workflow must already be registered with the store.
  #[instrument(
    name = "workflow_run",
    skip(self, workflow),
    fields(workflow_id = %workflow.workflow_id)
  )]
  pub async fn run(&self, workflow: Workflow) -> WorkflowResult {
    let started = Instant::now();
    let workflow_id = workflow.workflow_id.clone();

    info!(
      workflow_id = %workflow_id,
      name = %workflow.name,
      tasks = workflow.tasks.len(),
      "workflow_started"
    );
    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      workflow_id: workflow_id.clone(),
      name: workflow.name.clone(),
      tasks: workflow.tasks.len(),
    });

    let mut state = WorkflowState::new(workflow);

    loop {
      let batch = state.take_ready();
      if batch.is_empty() {
        break;
      }

      info!(
        workflow_id = %workflow_id,
        round = state.rounds(),
        ready_tasks = ?batch,
        "round_started"
      );
      self.notifier.notify(ExecutionEvent::RoundStarted {
        workflow_id: workflow_id.clone(),
        round: state.rounds(),
        task_ids: batch.clone(),
      });

      for outcome in self.execute_batch(&state, &batch).await {
        self.apply_outcome(&mut state, outcome);
      }

      state.promote();
      self.store.publish(state.snapshot(started.elapsed()));
    }

    if state.is_blocked() {
      let blocked = state.pending().len();
      warn!(
        workflow_id = %workflow_id,
        blocked,
        "workflow_blocked: pending tasks depend on tasks that did not complete"
      );
      self.notifier.notify(ExecutionEvent::WorkflowBlocked {
        workflow_id: workflow_id.clone(),
        task_ids: state.pending_in_order(),
      });
    }

    finish(state, started.elapsed(), self.store, self.notifier)
  }

  /// Dispatch every batch member concurrently and wait for all of them.
  async fn execute_batch(&self, state: &WorkflowState, batch: &[String]) -> Vec<TaskOutcome> {
    let workflow = state.workflow();
    let mut handles = Vec::with_capacity(batch.len());
    let mut unknown = Vec::new();

    for task_id in batch {
      let Some(definition) = state.definition(task_id) else {
        error!(task_id = %task_id, "no definition for task");
        unknown.push(TaskOutcome {
          result: TaskResult::failed(task_id, SCHEDULER_ID, "no definition for task"),
          task_id: task_id.clone(),
          substitute_id: None,
        });
        continue;
      };

      let task = self.build_task(workflow, task_id, &definition.template);
      // Optional tasks are satisfied on failure, so their substitute never runs.
      let substitute = match &definition.fallback {
        Some(Fallback::Substitute(template)) if !definition.optional => {
          let substitute_id = format!("{}-fallback", task_id);
          Some(
            self
              .build_task(workflow, &substitute_id, template)
              .parent(task_id.clone()),
          )
        }
        _ => None,
      };

      let dispatcher = self.dispatcher.clone();
      let task_id = task_id.clone();
      let handle = tokio::spawn(run_task(dispatcher, task, substitute));
      handles.push((task_id, handle));
    }

    let (task_ids, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
    let joined = futures::future::join_all(handles).await;

    task_ids
      .into_iter()
      .zip(joined)
      .map(|(task_id, joined)| match joined {
        Ok(outcome) => outcome,
        Err(e) => {
          error!(task_id = %task_id, error = %e, "task join error");
          TaskOutcome {
            result: TaskResult::failed(&task_id, SCHEDULER_ID, format!("task join error: {}", e)),
            task_id,
            substitute_id: None,
          }
        }
      })
      .chain(unknown)
      .collect()
  }

  /// Build the task dispatched for a workflow entry.
  fn build_task(&self, workflow: &Workflow, task_id: &str, template: &TaskTemplate) -> Task {
    Task::with_id(task_id, &template.task_type, template.payload.clone())
      .priority(template.priority)
      .requester(&self.config.requester)
      .deadline(template.deadline)
      .context(&workflow.context_id)
      .metadata(template.metadata.clone())
  }

  /// Store a batch member's result and move it to the set its outcome
  /// dictates.
  fn apply_outcome(&self, state: &mut WorkflowState, outcome: TaskOutcome) {
    let TaskOutcome {
      task_id,
      result,
      substitute_id,
    } = outcome;
    let workflow_id = state.workflow().workflow_id.clone();
    let status = result.status;
    let error = result.error.clone();
    state.record(&task_id, result);

    if let Some(substitute_id) = substitute_id {
      let completed = status == TaskStatus::Completed;
      info!(
        workflow_id = %workflow_id,
        task_id = %task_id,
        substitute_id = %substitute_id,
        completed,
        "task_substituted"
      );
      self.notifier.notify(ExecutionEvent::TaskSubstituted {
        workflow_id: workflow_id.clone(),
        task_id: task_id.clone(),
        substitute_id,
        completed,
      });
      if completed {
        self.settle_completed(state, &workflow_id, &task_id, status);
      } else {
        self.settle_failed(state, &workflow_id, &task_id, error);
      }
      return;
    }

    if status == TaskStatus::Completed {
      self.settle_completed(state, &workflow_id, &task_id, status);
      return;
    }

    let policy = state.definition(&task_id).map(|definition| {
      (
        definition.optional,
        definition.fallback.clone(),
        definition.max_retry_attempts,
      )
    });
    let Some((optional, fallback, retry_override)) = policy else {
      self.settle_failed(state, &workflow_id, &task_id, error);
      return;
    };
    let retry_limit = retry_override.or(self.config.max_retry_attempts);

    if optional {
      info!(workflow_id = %workflow_id, task_id = %task_id, status = ?status, "optional task did not complete");
      self.settle_completed(state, &workflow_id, &task_id, status);
      return;
    }

    match fallback {
      Some(Fallback::Skip) => {
        info!(workflow_id = %workflow_id, task_id = %task_id, status = ?status, "task skipped");
        self.settle_completed(state, &workflow_id, &task_id, status);
      }
      Some(Fallback::Retry) if retry_limit.is_none_or(|max| state.retries(&task_id) < max) => {
        if let Some(attempt) = state.requeue(&task_id) {
          warn!(
            workflow_id = %workflow_id,
            task_id = %task_id,
            attempt,
            error = ?error,
            "task_retried"
          );
          self.notifier.notify(ExecutionEvent::TaskRetried {
            workflow_id,
            task_id,
            attempt,
          });
        }
      }
      Some(Fallback::Retry) => {
        warn!(
          workflow_id = %workflow_id,
          task_id = %task_id,
          retries = state.retries(&task_id),
          "retry limit reached"
        );
        self.settle_failed(state, &workflow_id, &task_id, error);
      }
      // The substitute already ran inside the batch; reaching here means it
      // could not be built.
      Some(Fallback::Substitute(_)) | None => {
        self.settle_failed(state, &workflow_id, &task_id, error);
      }
    }
  }

  fn settle_completed(
    &self,
    state: &mut WorkflowState,
    workflow_id: &str,
    task_id: &str,
    status: TaskStatus,
  ) {
    if state.complete(task_id) {
      info!(workflow_id = %workflow_id, task_id = %task_id, status = ?status, "task_completed");
      self.notifier.notify(ExecutionEvent::TaskCompleted {
        workflow_id: workflow_id.to_string(),
        task_id: task_id.to_string(),
        status,
      });
    }
  }

  fn settle_failed(
    &self,
    state: &mut WorkflowState,
    workflow_id: &str,
    task_id: &str,
    error: Option<String>,
  ) {
    if state.fail(task_id) {
      error!(workflow_id = %workflow_id, task_id = %task_id, error = ?error, "task_failed");
      self.notifier.notify(ExecutionEvent::TaskFailed {
        workflow_id: workflow_id.to_string(),
        task_id: task_id.to_string(),
        error,
      });
    }
  }
}

/// Execute one batch member, falling through to its substitute on failure.
async fn run_task(dispatcher: Dispatcher, task: Task, substitute: Option<Task>) -> TaskOutcome {
  let result = dispatcher.execute(&task).await;

  match substitute {
    Some(substitute) if !result.is_completed() => {
      info!(
        task_id = %task.id,
        substitute_id = %substitute.id,
        error = ?result.error,
        "dispatching substitute"
      );
      let substitute_result = dispatcher.execute(&substitute).await;
      TaskOutcome {
        task_id: task.id,
        result: substitute_result,
        substitute_id: Some(substitute.id),
      }
    }
    _ => TaskOutcome {
      task_id: task.id,
      result,
      substitute_id: None,
    },
  }
}

#[cfg(test)]
mod tests {
  use appraise_registry::SharedRegistry;
  use appraise_workflow::WorkflowTask;
  use serde_json::json;

  use super::*;
  use crate::events::NoopNotifier;

  #[tokio::test]
  async fn test_task_without_definition_settles_as_failed() {
    let workflow = Workflow::new(
      "appraisal",
      vec![WorkflowTask::new(TaskTemplate::new("extract", json!({})))],
    );
    let mut state = WorkflowState::new(workflow);
    let dispatcher = Dispatcher::new(SharedRegistry::default());
    let config = EngineConfig::default();
    let store = WorkflowStore::default();
    let scheduler = Scheduler::new(&dispatcher, &config, &store, &NoopNotifier);

    let batch = vec!["unknown-task".to_string()];
    for outcome in scheduler.execute_batch(&state, &batch).await {
      scheduler.apply_outcome(&mut state, outcome);
    }

    assert!(state.failed().contains("unknown-task"));
    let result = &state.results()["unknown-task"];
    assert_eq!(result.provider_id, SCHEDULER_ID);
    assert_eq!(result.status, TaskStatus::Failed);
  }
}
