use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::task::{Fallback, WorkflowTask};

/// A workflow ready for scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub workflow_id: String,
  pub name: String,
  pub description: String,
  /// Context id stamped on every task derived from this workflow.
  pub context_id: String,
  pub tasks: Vec<WorkflowTask>,
}

impl Workflow {
  /// Create a workflow with fresh workflow and context ids.
  pub fn new(name: impl Into<String>, tasks: Vec<WorkflowTask>) -> Self {
    Self {
      workflow_id: uuid::Uuid::new_v4().to_string(),
      name: name.into(),
      description: String::new(),
      context_id: uuid::Uuid::new_v4().to_string(),
      tasks,
    }
  }

  /// Build the dependency graph.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.tasks)
  }

  /// Id of the task derived from the definition at `index`.
  pub fn task_id(&self, index: usize) -> String {
    format!("{}-task-{}", self.workflow_id, index)
  }

  /// Check dependency references and reject cycles.
  pub fn validate(&self) -> Result<(), WorkflowError> {
    for (index, task) in self.tasks.iter().enumerate() {
      if task.template.task_type.trim().is_empty() {
        return Err(WorkflowError::EmptyTaskType { index });
      }
      if let Some(Fallback::Substitute(template)) = &task.fallback
        && template.task_type.trim().is_empty()
      {
        return Err(WorkflowError::EmptyTaskType { index });
      }
      for &dependency in &task.depends_on {
        if dependency == index {
          return Err(WorkflowError::SelfDependency { index });
        }
        if dependency >= self.tasks.len() {
          return Err(WorkflowError::InvalidDependency { index, dependency });
        }
      }
    }

    self.graph().layers().map(|_| ())
  }
}
