use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
  #[error("task {index} has an empty task type")]
  EmptyTaskType { index: usize },

  #[error("task {index} depends on unknown task {dependency}")]
  InvalidDependency { index: usize, dependency: usize },

  #[error("task {index} depends on itself")]
  SelfDependency { index: usize },

  #[error("dependency cycle among tasks {tasks:?}")]
  Cycle { tasks: Vec<usize> },

  #[error("task {index} declares a substitute fallback without a task")]
  MissingSubstitute { index: usize },
}
