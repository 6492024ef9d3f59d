use async_trait::async_trait;

use crate::error::ProviderError;
use crate::result::TaskResult;
use crate::task::Task;

/// A capability-bearing executor ("agent").
///
/// Providers declare the task types they handle through
/// [`capabilities`](Provider::capabilities) and are registered once with the
/// capability registry. The coordinator never inspects how a provider
/// computes its result.
///
/// `process` may fail; the dispatcher turns any error (or panic) into a
/// failed [`TaskResult`]. Any `elapsed_ms` reported by the provider is
/// replaced with the dispatcher's own measurement.
#[async_trait]
pub trait Provider: Send + Sync {
  fn id(&self) -> &str;

  fn name(&self) -> &str {
    self.id()
  }

  fn description(&self) -> &str {
    ""
  }

  /// Task types this provider can handle.
  fn capabilities(&self) -> &[String];

  fn can_handle(&self, task: &Task) -> bool {
    self.capabilities().iter().any(|c| c == &task.task_type)
  }

  async fn process(&self, task: &Task) -> Result<TaskResult, ProviderError>;
}
