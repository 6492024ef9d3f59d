use serde::{Deserialize, Serialize};

use crate::task::TaskDef;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  /// Generated at resolution time when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub workflow_id: Option<String>,
  pub name: String,
  #[serde(default)]
  pub description: String,
  /// Context shared by every task of the run. Generated when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub context_id: Option<String>,
  pub tasks: Vec<TaskDef>,
}
