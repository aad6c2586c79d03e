use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trellis_compiler::{CompiledUnit, ConstructionError};
use trellis_runtime::ActionExecutor;
use trellis_spec::Specification;

use crate::events::{ExecutionNotifier, NoopNotifier};
use crate::interpreter::InterpreterBackend;
use crate::process::Process;

/// How a compiled unit is turned into an invocable process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilationStrategy {
  /// Walk the compiled tree at invocation time.
  #[default]
  Interpreted,
  /// Emit and build native code per process.
  Native,
}

impl fmt::Display for CompilationStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CompilationStrategy::Interpreted => f.write_str("interpreted"),
      CompilationStrategy::Native => f.write_str("native"),
    }
  }
}

/// What a loaded process needs at invocation time.
#[derive(Clone)]
pub struct Dependencies {
  pub spec: Arc<Specification>,
  pub executor: Arc<ActionExecutor>,
  pub notifier: Arc<dyn ExecutionNotifier>,
}

impl Dependencies {
  pub fn new(spec: Arc<Specification>, executor: Arc<ActionExecutor>) -> Self {
    Self {
      spec,
      executor,
      notifier: Arc::new(NoopNotifier),
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }
}

/// Loads compiled units for one strategy.
pub trait Backend: Send + Sync {
  fn strategy(&self) -> CompilationStrategy;

  fn load(
    &self,
    unit: CompiledUnit,
    deps: Dependencies,
  ) -> Result<Arc<dyn Process>, ConstructionError>;
}

/// Backends by strategy. Asking for an unregistered strategy is an error,
/// never a fallback to another one.
#[derive(Clone, Default)]
pub struct BackendRegistry {
  backends: HashMap<CompilationStrategy, Arc<dyn Backend>>,
}

impl BackendRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with every backend this crate ships.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();
    registry.register(Arc::new(InterpreterBackend));
    registry
  }

  pub fn register(&mut self, backend: Arc<dyn Backend>) {
    self.backends.insert(backend.strategy(), backend);
  }

  pub fn get(&self, strategy: CompilationStrategy) -> Result<Arc<dyn Backend>, ConstructionError> {
    self
      .backends
      .get(&strategy)
      .cloned()
      .ok_or_else(|| ConstructionError::UnsupportedStrategy {
        strategy: strategy.to_string(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_backend_is_an_error() {
    let registry = BackendRegistry::with_defaults();
    assert!(registry.get(CompilationStrategy::Interpreted).is_ok());
    assert!(matches!(
      registry.get(CompilationStrategy::Native),
      Err(ConstructionError::UnsupportedStrategy { strategy }) if strategy == "native"
    ));
  }

  #[test]
  fn test_strategy_wire_names() {
    let parsed: CompilationStrategy = serde_json::from_str("\"interpreted\"").unwrap();
    assert_eq!(parsed, CompilationStrategy::Interpreted);
  }
}
