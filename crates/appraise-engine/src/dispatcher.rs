//! Capability-based task dispatch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use appraise_registry::SharedRegistry;
use appraise_task::{ProviderError, Task, TaskResult};
use futures::FutureExt;
use tracing::{error, info, instrument, warn};

/// Provider id reported on results the coordinator produces itself.
pub const SCHEDULER_ID: &str = "scheduler";

/// Executes single tasks against the first capable provider.
///
/// The dispatcher is the only place where provider errors become data:
/// every call returns a [`TaskResult`], never an error.
#[derive(Debug, Clone)]
pub struct Dispatcher {
  registry: SharedRegistry,
}

impl Dispatcher {
  pub fn new(registry: SharedRegistry) -> Self {
    Self { registry }
  }

  pub fn registry(&self) -> &SharedRegistry {
    &self.registry
  }

  /// Execute a task.
  ///
  /// Picks the first provider registered for the task type. Errors and panics
  /// raised by the provider produce a failed result with zero confidence.
  /// The returned `elapsed_ms` is always the dispatcher's own measurement.
  #[instrument(
    name = "task_dispatch",
    skip(self, task),
    fields(task_id = %task.id, task_type = %task.task_type)
  )]
  pub async fn execute(&self, task: &Task) -> TaskResult {
    let Some(provider) = self.registry.find(&task.task_type).into_iter().next() else {
      warn!("no capable provider");
      return TaskResult::failed(
        &task.id,
        SCHEDULER_ID,
        format!("no capable provider for task type {}", task.task_type),
      );
    };

    let started = Instant::now();
    let outcome = AssertUnwindSafe(provider.process(task))
      .catch_unwind()
      .await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let mut result = match outcome {
      Ok(Ok(result)) => result,
      Ok(Err(e)) => {
        error!(provider_id = %provider.id(), error = %e, "provider failed");
        TaskResult::failed(&task.id, provider.id(), e.to_string())
      }
      Err(panic) => {
        let e = ProviderError::Panicked {
          message: panic_message(panic.as_ref()),
        };
        error!(provider_id = %provider.id(), error = %e, "provider panicked");
        TaskResult::failed(&task.id, provider.id(), e.to_string())
      }
    };

    result.task_id = task.id.clone();
    result.elapsed_ms = elapsed_ms;

    info!(
      provider_id = %result.provider_id,
      status = ?result.status,
      elapsed_ms,
      "task dispatched"
    );

    result
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(message) = panic.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = panic.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic".to_string()
  }
}
