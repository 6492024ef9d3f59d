//! Resolution of workflow definitions into validated workflows.

use appraise_config::{FallbackDef, FallbackStrategy, TaskDef, TemplateDef, WorkflowDef};

use crate::error::WorkflowError;
use crate::task::{Fallback, TaskTemplate, WorkflowTask};
use crate::workflow::Workflow;

/// Resolve a [`WorkflowDef`] into a validated [`Workflow`].
///
/// Missing workflow and context ids are generated.
pub fn resolve(def: WorkflowDef) -> Result<Workflow, WorkflowError> {
  let tasks = def
    .tasks
    .into_iter()
    .enumerate()
    .map(|(index, task)| resolve_task(index, task))
    .collect::<Result<Vec<_>, _>>()?;

  let workflow = Workflow {
    workflow_id: def
      .workflow_id
      .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    name: def.name,
    description: def.description,
    context_id: def
      .context_id
      .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
    tasks,
  };

  workflow.validate()?;
  Ok(workflow)
}

fn resolve_task(index: usize, def: TaskDef) -> Result<WorkflowTask, WorkflowError> {
  let fallback = def
    .fallback
    .map(|fallback| resolve_fallback(index, fallback))
    .transpose()?;

  Ok(WorkflowTask {
    template: resolve_template(def.template),
    depends_on: def.depends_on,
    optional: def.optional,
    fallback,
    max_retry_attempts: def.max_retry_attempts,
  })
}

fn resolve_fallback(index: usize, def: FallbackDef) -> Result<Fallback, WorkflowError> {
  match def.strategy {
    FallbackStrategy::Skip => Ok(Fallback::Skip),
    FallbackStrategy::Retry => Ok(Fallback::Retry),
    FallbackStrategy::Substitute => def
      .task
      .map(|template| Fallback::Substitute(resolve_template(template)))
      .ok_or(WorkflowError::MissingSubstitute { index }),
  }
}

fn resolve_template(def: TemplateDef) -> TaskTemplate {
  TaskTemplate {
    task_type: def.task_type,
    priority: def.priority,
    payload: def.payload,
    deadline: def.deadline,
    metadata: def.metadata,
  }
}
