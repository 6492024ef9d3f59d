//! Thread-safe registry handle.
//!
//! The registry is read on every dispatch and written only when providers are
//! registered, so lookups take a read lock and registration a write lock.

use std::sync::{Arc, RwLock};

use appraise_task::Provider;

use crate::registry::CapabilityRegistry;

/// Cloneable, lock-protected [`CapabilityRegistry`].
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
  inner: Arc<RwLock<CapabilityRegistry>>,
}

impl SharedRegistry {
  pub fn new(registry: CapabilityRegistry) -> Self {
    Self {
      inner: Arc::new(RwLock::new(registry)),
    }
  }

  pub fn register(&self, provider: Arc<dyn Provider>) {
    let mut registry = self.inner.write().unwrap_or_else(|e| e.into_inner());
    registry.register(provider);
  }

  pub fn find(&self, task_type: &str) -> Vec<Arc<dyn Provider>> {
    let registry = self.inner.read().unwrap_or_else(|e| e.into_inner());
    registry.find(task_type)
  }

  /// Every registered provider, in registration order.
  pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
    let registry = self.inner.read().unwrap_or_else(|e| e.into_inner());
    registry.providers().to_vec()
  }

  pub fn capabilities(&self) -> Vec<String> {
    let registry = self.inner.read().unwrap_or_else(|e| e.into_inner());
    registry.capabilities()
  }
}

impl From<CapabilityRegistry> for SharedRegistry {
  fn from(registry: CapabilityRegistry) -> Self {
    Self::new(registry)
  }
}
