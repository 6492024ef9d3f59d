use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An external command registered as a provider.
///
/// The command receives the task as JSON on stdin and answers with a JSON
/// result on stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDef {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub capabilities: Vec<String>,
  pub command: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default)]
  pub env: HashMap<String, String>,
}
