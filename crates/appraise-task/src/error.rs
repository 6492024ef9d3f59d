//! Provider errors.

/// Errors a provider may return from [`crate::Provider::process`].
///
/// The dispatcher converts every variant into a failed [`crate::TaskResult`];
/// none of them reach the workflow scheduler as errors.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
  /// The provider tried and could not produce a result.
  #[error("{message}")]
  Failed { message: String },

  /// The task payload did not have the shape the provider expects.
  #[error("invalid payload: {message}")]
  InvalidPayload { message: String },

  /// I/O failure while talking to an external collaborator.
  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  /// The provider panicked while processing.
  #[error("provider panicked: {message}")]
  Panicked { message: String },
}

impl ProviderError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }

  pub fn invalid_payload(message: impl Into<String>) -> Self {
    Self::InvalidPayload {
      message: message.into(),
    }
  }
}
