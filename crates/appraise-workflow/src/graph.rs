use std::collections::BTreeSet;

use crate::error::WorkflowError;
use crate::task::WorkflowTask;

/// Dependency graph over task indices.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Forward edges: index -> tasks that depend on it.
  downstream: Vec<Vec<usize>>,
  /// Reverse edges: index -> tasks it depends on.
  upstream: Vec<Vec<usize>>,
  /// Tasks with no dependencies.
  entry_points: Vec<usize>,
}

impl Graph {
  /// Build a graph from workflow tasks.
  ///
  /// Out-of-range dependencies are ignored here; [`crate::Workflow::validate`]
  /// reports them.
  pub fn new(tasks: &[WorkflowTask]) -> Self {
    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];
    let mut upstream: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];

    for (index, task) in tasks.iter().enumerate() {
      let deps: BTreeSet<usize> = task
        .depends_on
        .iter()
        .copied()
        .filter(|d| *d < tasks.len())
        .collect();
      for dep in deps {
        downstream[dep].push(index);
        upstream[index].push(dep);
      }
    }

    let entry_points = upstream
      .iter()
      .enumerate()
      .filter(|(_, deps)| deps.is_empty())
      .map(|(index, _)| index)
      .collect();

    Self {
      downstream,
      upstream,
      entry_points,
    }
  }

  /// Tasks with no dependencies.
  pub fn entry_points(&self) -> &[usize] {
    &self.entry_points
  }

  /// Tasks that depend on `index`.
  pub fn downstream(&self, index: usize) -> &[usize] {
    self.downstream.get(index).map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Tasks `index` depends on.
  pub fn upstream(&self, index: usize) -> &[usize] {
    self.upstream.get(index).map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Group tasks into layers where every task only depends on earlier layers.
  ///
  /// When every task completes on its first attempt, the scheduler runs one
  /// round per layer.
  pub fn layers(&self) -> Result<Vec<Vec<usize>>, WorkflowError> {
    let mut remaining: Vec<usize> = self.upstream.iter().map(|deps| deps.len()).collect();
    let mut current: Vec<usize> = self.entry_points.clone();
    let mut layers = Vec::new();
    let mut placed = 0;

    while !current.is_empty() {
      placed += current.len();
      let mut next = Vec::new();
      for &index in &current {
        for &child in self.downstream(index) {
          remaining[child] -= 1;
          if remaining[child] == 0 {
            next.push(child);
          }
        }
      }
      next.sort_unstable();
      layers.push(current);
      current = next;
    }

    if placed != remaining.len() {
      let tasks = remaining
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(index, _)| index)
        .collect();
      return Err(WorkflowError::Cycle { tasks });
    }

    Ok(layers)
  }
}
