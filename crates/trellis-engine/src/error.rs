use thiserror::Error;
use trellis_compiler::ConstructionError;
use trellis_spec::{ConfigurationError, ExecutionError};

/// Errors surfaced by the [`Engine`](crate::Engine).
#[derive(Debug, Error)]
pub enum EngineError {
  /// A provider or type could not be registered.
  #[error("configuration error: {0}")]
  Configuration(#[from] ConfigurationError),

  /// A process could not be compiled or loaded.
  #[error("construction error: {0}")]
  Construction(#[from] ConstructionError),

  #[error("execution error: {0}")]
  Execution(#[from] ExecutionError),

  /// The engine configuration document is malformed.
  #[error("invalid engine config: {message}")]
  InvalidConfig { message: String },
}
