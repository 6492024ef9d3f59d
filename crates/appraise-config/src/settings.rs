use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::provider::ProviderDef;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
  #[error("failed to read settings: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse settings: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub engine: EngineConfig,
  #[serde(default)]
  pub providers: Vec<ProviderDef>,
}

impl Settings {
  /// Load settings from a JSON file.
  pub fn load(path: &Path) -> Result<Self, SettingsError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Load settings if the file exists, otherwise fall back to defaults.
  pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
    if path.exists() {
      Self::load(path)
    } else {
      Ok(Self::default())
    }
  }
}
