use serde::{Deserialize, Serialize};
use trellis_process::CompilationStrategy;
use trellis_runtime::ExecutorConfig;

use crate::error::EngineError;

/// Engine settings. Every field has a default, so `{}` is a valid document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
  #[serde(default)]
  pub executor: ExecutorConfig,

  #[serde(default)]
  pub strategy: CompilationStrategy,
}

impl EngineConfig {
  pub fn from_json(text: &str) -> Result<Self, EngineError> {
    serde_json::from_str(text).map_err(|e| EngineError::InvalidConfig {
      message: e.to_string(),
    })
  }
}
