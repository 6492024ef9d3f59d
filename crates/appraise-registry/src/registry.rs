use std::collections::HashMap;
use std::sync::Arc;

use appraise_task::Provider;
use tracing::debug;

/// Maps task types to the providers able to handle them.
///
/// Providers are returned in registration order, so the first provider
/// registered for a capability is the one the dispatcher picks. Registering
/// the same provider twice yields duplicate entries; callers are expected not
/// to do that.
#[derive(Default)]
pub struct CapabilityRegistry {
  by_capability: HashMap<String, Vec<Arc<dyn Provider>>>,
  providers: Vec<Arc<dyn Provider>>,
}

impl CapabilityRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a provider under each of its declared capabilities.
  pub fn register(&mut self, provider: Arc<dyn Provider>) {
    debug!(
      provider_id = %provider.id(),
      capabilities = ?provider.capabilities(),
      "registering provider"
    );

    for capability in provider.capabilities() {
      self
        .by_capability
        .entry(capability.clone())
        .or_default()
        .push(provider.clone());
    }
    self.providers.push(provider);
  }

  /// Providers able to handle `task_type`, in registration order.
  pub fn find(&self, task_type: &str) -> Vec<Arc<dyn Provider>> {
    self
      .by_capability
      .get(task_type)
      .cloned()
      .unwrap_or_default()
  }

  /// Every registered provider, in registration order.
  pub fn providers(&self) -> &[Arc<dyn Provider>] {
    &self.providers
  }

  /// Known task types, sorted.
  pub fn capabilities(&self) -> Vec<String> {
    let mut capabilities: Vec<String> = self.by_capability.keys().cloned().collect();
    capabilities.sort();
    capabilities
  }

  pub fn len(&self) -> usize {
    self.providers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.providers.is_empty()
  }
}

impl std::fmt::Debug for CapabilityRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let ids: Vec<&str> = self.providers.iter().map(|p| p.id()).collect();
    f.debug_struct("CapabilityRegistry")
      .field("providers", &ids)
      .field("capabilities", &self.capabilities())
      .finish()
  }
}
