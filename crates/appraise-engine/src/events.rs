//! Execution events and notifiers for observability.
//!
//! Events are emitted while workflows run so that consumers can observe
//! progress, persist results, stream to UIs, etc.

use appraise_task::TaskStatus;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::finalize::WorkflowResult;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// A workflow was admitted and its first round is about to run.
  WorkflowStarted {
    workflow_id: String,
    name: String,
    tasks: usize,
  },

  /// A batch of ready tasks is being dispatched.
  RoundStarted {
    workflow_id: String,
    round: u32,
    task_ids: Vec<String>,
  },

  /// A task entered the completed set.
  ///
  /// `status` is the status of the stored result, which is not `completed`
  /// when an optional or skipped task failed.
  TaskCompleted {
    workflow_id: String,
    task_id: String,
    status: TaskStatus,
  },

  /// A task entered the failed set.
  TaskFailed {
    workflow_id: String,
    task_id: String,
    error: Option<String>,
  },

  /// A task with the retry fallback was put back into the ready set.
  TaskRetried {
    workflow_id: String,
    task_id: String,
    attempt: u32,
  },

  /// A failed task was replaced by its substitute.
  TaskSubstituted {
    workflow_id: String,
    task_id: String,
    substitute_id: String,
    completed: bool,
  },

  /// No task is ready but some are still waiting on dependencies.
  WorkflowBlocked {
    workflow_id: String,
    task_ids: Vec<String>,
  },

  /// The workflow was finalized. Emitted exactly once per workflow run.
  WorkflowFinished { result: WorkflowResult },
}

/// Trait for receiving execution events.
///
/// The scheduler calls `notify` for each event; implementations decide what
/// to do with them (persist, broadcast, log, ignore, etc.).
pub trait ExecutionNotifier: Send + Sync {
  /// Called when an execution event occurs.
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a round. Volume is a handful of
  // events per task.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with its receiving end.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

impl<N: ExecutionNotifier + ?Sized> ExecutionNotifier for std::sync::Arc<N> {
  fn notify(&self, event: ExecutionEvent) {
    (**self).notify(event);
  }
}
