//! Coordinator errors.

use appraise_workflow::WorkflowError;

/// Errors returned when submitting a workflow.
///
/// Task failures are never reported here; they surface through the
/// workflow result's status and per-task results.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
  /// The workflow failed validation.
  #[error("invalid workflow: {0}")]
  InvalidWorkflow(#[from] WorkflowError),

  /// A workflow with the same id is still running.
  #[error("workflow '{workflow_id}' is already active")]
  AlreadyActive { workflow_id: String },
}
