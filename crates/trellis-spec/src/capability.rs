//! Capabilities the runtime injects into callable bodies.

use async_trait::async_trait;
use trellis_coordinate::Coordinates;

use crate::error::ExecutionError;
use crate::value::Value;

/// Read access to one execution's variables and outputs.
pub trait ReadOnlyContext: Send + Sync {
  /// Identifier of the execution this context belongs to.
  fn execution_id(&self) -> &str;

  fn variable(&self, name: &str) -> Option<Value>;

  fn contains_variable(&self, name: &str) -> bool;

  /// The value recorded at `coordinates`, if that node completed with one.
  fn output(&self, coordinates: &Coordinates) -> Option<Value>;

  /// Whether the node at `coordinates` has finished, with or without a value.
  fn is_completed(&self, coordinates: &Coordinates) -> bool;

  /// Resolve `path` below the value at `coordinates`.
  ///
  /// `Ok(None)` when the value or any intermediate property is unset.
  fn resolve(
    &self,
    coordinates: &Coordinates,
    path: &[String],
  ) -> Result<Option<Value>, ExecutionError>;
}

/// Read and write access to one execution's named variables.
pub trait MutableContext: ReadOnlyContext {
  fn set_variable(&self, name: &str, value: Value);

  fn delete_variable(&self, name: &str) -> Option<Value>;
}

/// The compiled child block of the action being invoked.
#[async_trait]
pub trait ChildActions: Send + Sync {
  /// Run every child once, returning the first failure.
  async fn run(&self) -> Result<(), ExecutionError>;

  /// Number of executables in the child block.
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
