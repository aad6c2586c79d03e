//! Error types for registration, values and execution.

use thiserror::Error;
use trellis_coordinate::Coordinates;

use crate::operation::{Capability, Marker};
use crate::types::TypeKey;

/// A provider or its types could not be registered.
///
/// Raised while building a [`Specification`](crate::Specification); any of
/// these aborts construction of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
  /// An operation carries more than one of action/function/converter.
  #[error("operation '{operation}' of provider '{provider}' is marked as {markers}")]
  ConflictingMarkers {
    provider: String,
    operation: String,
    markers: String,
  },

  /// Registered names must not be empty.
  #[error("operation of provider '{provider}' has an empty name")]
  EmptyName { provider: String },

  /// Two inputs of one operation share a name.
  #[error("operation '{operation}' of provider '{provider}' declares input '{input}' twice")]
  DuplicateInput {
    provider: String,
    operation: String,
    input: String,
  },

  /// Functions must produce a value.
  #[error("function '{operation}' of provider '{provider}' has no return value")]
  VoidFunction { provider: String, operation: String },

  /// Converter shape violation.
  #[error("converter '{operation}' of provider '{provider}' is invalid: {reason}")]
  InvalidConverter {
    provider: String,
    operation: String,
    reason: String,
  },

  /// A capability injected into a kind of callable that may not receive it.
  #[error("{marker} '{operation}' of provider '{provider}' cannot receive {capability}")]
  IllegalInjection {
    provider: String,
    operation: String,
    marker: Marker,
    capability: Capability,
  },

  /// Only actions may complete asynchronously.
  #[error("{marker} '{operation}' of provider '{provider}' must have an immediate body")]
  DeferredBody {
    provider: String,
    operation: String,
    marker: Marker,
  },

  /// A referenced type was never registered.
  #[error("unknown type '{type_key}' referenced by {referenced_by}")]
  UnknownType {
    type_key: TypeKey,
    referenced_by: String,
  },

  /// A type descriptor is internally inconsistent.
  #[error("type '{type_key}' is malformed: {reason}")]
  MalformedType { type_key: TypeKey, reason: String },

  /// Inheritance edges form a cycle.
  #[error("type '{type_key}' inherits from itself")]
  InheritanceCycle { type_key: TypeKey },
}

/// A literal or JSON value does not fit its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
  #[error("'{text}' is not a valid {type_key} literal: {reason}")]
  Malformed {
    type_key: TypeKey,
    text: String,
    reason: String,
  },

  #[error("'{literal}' is not a literal of enumeration '{type_key}'")]
  UnknownLiteral { type_key: TypeKey, literal: String },

  #[error("type '{type_key}' has no literal encoding")]
  NotLiteral { type_key: TypeKey },

  #[error("unknown type '{type_key}'")]
  UnknownType { type_key: TypeKey },

  #[error("expected {expected}, found {found}")]
  Mismatch { expected: String, found: String },
}

/// Classification of [`ExecutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionErrorKind {
  MissingVariable,
  UnexpectedVariableType,
  InvalidArguments,
  FunctionFailure,
  ConversionFailure,
  ActionFailure,
  Timeout,
  IllegalState,
  Interrupted,
}

/// Failure while running a compiled process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
  /// A reference without fallback resolved to nothing.
  #[error("no value at {coordinates}{}", render_path(.path))]
  MissingVariable {
    coordinates: Coordinates,
    path: Vec<String>,
  },

  /// A named variable was read before being set.
  #[error("variable '{name}' is not set")]
  MissingNamedVariable { name: String },

  /// A stored value does not have the shape its reference expects.
  #[error("value at {coordinates} is a {actual}, expected {expected}")]
  UnexpectedVariableType {
    coordinates: Coordinates,
    expected: String,
    actual: String,
  },

  /// Nested resolution asked for a property the type does not declare.
  #[error("type '{type_key}' declares no property '{property}'")]
  UndeclaredProperty { type_key: TypeKey, property: String },

  /// Process arguments do not match the contract.
  #[error("invalid arguments: {message}")]
  InvalidArguments { message: String },

  #[error("function '{function}' failed: {message}")]
  FunctionFailed { function: String, message: String },

  #[error("converter '{converter}' failed: {message}")]
  ConversionFailed { converter: String, message: String },

  #[error("action '{action}' at {coordinates} failed: {message}")]
  ActionFailed {
    action: String,
    coordinates: Coordinates,
    message: String,
  },

  #[error("action '{action}' at {coordinates} timed out after {timeout_ms}ms")]
  Timeout {
    action: String,
    coordinates: Coordinates,
    timeout_ms: u64,
  },

  /// An operation was attempted in a state that forbids it.
  #[error("cannot {operation} while {state}")]
  IllegalState { operation: String, state: String },

  /// Work was abandoned or aborted before it completed.
  #[error("interrupted: {message}")]
  Interrupted { message: String },
}

impl ExecutionError {
  pub fn kind(&self) -> ExecutionErrorKind {
    match self {
      ExecutionError::MissingVariable { .. } | ExecutionError::MissingNamedVariable { .. } => {
        ExecutionErrorKind::MissingVariable
      }
      ExecutionError::UnexpectedVariableType { .. } | ExecutionError::UndeclaredProperty { .. } => {
        ExecutionErrorKind::UnexpectedVariableType
      }
      ExecutionError::InvalidArguments { .. } => ExecutionErrorKind::InvalidArguments,
      ExecutionError::FunctionFailed { .. } => ExecutionErrorKind::FunctionFailure,
      ExecutionError::ConversionFailed { .. } => ExecutionErrorKind::ConversionFailure,
      ExecutionError::ActionFailed { .. } => ExecutionErrorKind::ActionFailure,
      ExecutionError::Timeout { .. } => ExecutionErrorKind::Timeout,
      ExecutionError::IllegalState { .. } => ExecutionErrorKind::IllegalState,
      ExecutionError::Interrupted { .. } => ExecutionErrorKind::Interrupted,
    }
  }

  pub fn illegal_state(operation: impl Into<String>, state: impl ToString) -> Self {
    ExecutionError::IllegalState {
      operation: operation.into(),
      state: state.to_string(),
    }
  }
}

fn render_path(path: &[String]) -> String {
  path.iter().map(|p| format!(".{}", p)).collect()
}

/// Error returned by a callable body.
///
/// Bodies either fail with a message or propagate an execution error from
/// work they drove themselves (for example child actions), which is then
/// reported unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
  #[error("{message}")]
  Failed { message: String },

  #[error(transparent)]
  Execution(Box<ExecutionError>),
}

impl CallError {
  pub fn failed(message: impl Into<String>) -> Self {
    CallError::Failed {
      message: message.into(),
    }
  }
}

impl From<ExecutionError> for CallError {
  fn from(err: ExecutionError) -> Self {
    CallError::Execution(Box::new(err))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use trellis_coordinate::CoordinateTable;

  #[test]
  fn test_missing_variable_message_includes_path() {
    let table = CoordinateTable::new();
    let err = ExecutionError::MissingVariable {
      coordinates: table.intern(&[0]),
      path: vec!["inner".to_string(), "text".to_string()],
    };
    assert_eq!(err.to_string(), "no value at [0].inner.text");
    assert_eq!(err.kind(), ExecutionErrorKind::MissingVariable);
  }

  #[test]
  fn test_call_error_wraps_execution_error() {
    let err: CallError = ExecutionError::Interrupted {
      message: "shutdown".to_string(),
    }
    .into();
    assert_eq!(err.to_string(), "interrupted: shutdown");
  }
}
