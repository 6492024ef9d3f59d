//! Providers backed by external commands.

use std::process::Stdio;

use appraise_config::ProviderDef;
use appraise_task::{Provider, ProviderError, Task, TaskResult, TaskStatus};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// What a provider command prints on stdout.
#[derive(Debug, Deserialize)]
struct CommandResponse {
  status: TaskStatus,
  #[serde(default)]
  output: Option<serde_json::Value>,
  #[serde(default)]
  error: Option<String>,
  #[serde(default)]
  confidence: Option<f64>,
}

/// Runs one command per task.
///
/// The task is written to the command's stdin as JSON. The command answers
/// with a single JSON object on stdout:
///
/// ```json
/// { "status": "completed", "output": { "value": 412000 }, "confidence": 0.8 }
/// ```
///
/// A non-zero exit or unparseable stdout is a provider error; the dispatcher
/// turns it into a failed result.
pub struct CommandProvider {
  def: ProviderDef,
}

impl CommandProvider {
  pub fn new(def: ProviderDef) -> Self {
    Self { def }
  }
}

#[async_trait]
impl Provider for CommandProvider {
  fn id(&self) -> &str {
    &self.def.id
  }

  fn name(&self) -> &str {
    if self.def.name.is_empty() {
      &self.def.id
    } else {
      &self.def.name
    }
  }

  fn description(&self) -> &str {
    &self.def.description
  }

  fn capabilities(&self) -> &[String] {
    &self.def.capabilities
  }

  async fn process(&self, task: &Task) -> Result<TaskResult, ProviderError> {
    let input = serde_json::to_vec(task).map_err(|e| ProviderError::invalid_payload(e.to_string()))?;

    debug!(provider = %self.def.id, command = %self.def.command, task_id = %task.id, "spawning provider command");

    let mut child = Command::new(&self.def.command)
      .args(&self.def.args)
      .envs(&self.def.env)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true)
      .spawn()?;

    // Feed stdin while stdout is drained so a chatty command cannot fill its
    // pipe and stall before reading all of its input.
    let stdin = child.stdin.take();
    let write_input = async move {
      if let Some(mut stdin) = stdin {
        match stdin.write_all(&input).await {
          // Commands that ignore their input may exit before reading it.
          Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
          _ => {}
        }
      }
      Ok(())
    };

    let (written, output) = tokio::join!(write_input, child.wait_with_output());
    written?;
    let output = output?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ProviderError::failed(format!(
        "command '{}' exited with {}: {}",
        self.def.command,
        output.status,
        stderr.trim()
      )));
    }

    let response: CommandResponse = serde_json::from_slice(&output.stdout).map_err(|e| {
      ProviderError::failed(format!(
        "command '{}' produced invalid output: {}",
        self.def.command, e
      ))
    })?;

    let default_confidence = match response.status {
      TaskStatus::Completed => 1.0,
      TaskStatus::Partial => 0.5,
      TaskStatus::Failed => 0.0,
    };

    Ok(
      TaskResult {
        task_id: task.id.clone(),
        provider_id: self.def.id.clone(),
        status: response.status,
        output: response.output,
        error: response.error,
        confidence: 0.0,
        elapsed_ms: 0,
        metadata: Default::default(),
      }
      .confidence(response.confidence.unwrap_or(default_confidence)),
    )
  }
}
