//! Construction errors.

use thiserror::Error;
use trellis_coordinate::{CoordinateError, Coordinates};
use trellis_spec::{TypeKey, ValueError};

/// A process configuration could not be turned into a process.
///
/// Every variant raised while walking the tree names the coordinates of the
/// executable being compiled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
  #[error("{coordinates}: unknown action '{name}'")]
  UnknownAction { coordinates: Coordinates, name: String },

  #[error("{coordinates}: unknown function '{name}'")]
  UnknownFunction { coordinates: Coordinates, name: String },

  #[error("{coordinates}: '{callable}' has no input named '{argument}'")]
  UnknownArgument {
    coordinates: Coordinates,
    callable: String,
    argument: String,
  },

  #[error("{coordinates}: unknown type '{type_key}'")]
  UnknownType {
    coordinates: Coordinates,
    type_key: TypeKey,
  },

  #[error("{coordinates}: invalid literal")]
  InvalidLiteral {
    coordinates: Coordinates,
    #[source]
    source: ValueError,
  },

  #[error("{coordinates}: input '{input}' of '{callable}' expects {expected}, got {found}")]
  MultiplicityMismatch {
    coordinates: Coordinates,
    callable: String,
    input: String,
    expected: String,
    found: String,
  },

  #[error("{coordinates}: cannot use {found} where {expected} is required")]
  TypeMismatch {
    coordinates: Coordinates,
    expected: String,
    found: String,
  },

  #[error("{coordinates}: reference to {target} does not name a value")]
  UnknownReference {
    coordinates: Coordinates,
    target: String,
  },

  #[error("{coordinates}: type '{type_key}' has no property '{property}'")]
  UndeclaredProperty {
    coordinates: Coordinates,
    type_key: TypeKey,
    property: String,
  },

  #[error("{coordinates}: action '{action}' does not accept child actions")]
  ChildrenNotAccepted { coordinates: Coordinates, action: String },

  #[error("{coordinates}: concurrent block steps reference each other in a cycle")]
  ReferenceCycle { coordinates: Coordinates },

  #[error("process '{process_id}' declares an output but has no return expression")]
  MissingReturn { process_id: String },

  #[error("process '{process_id}' is void but has a return expression")]
  UnexpectedReturn { process_id: String },

  #[error("no backend registered for strategy '{strategy}'")]
  UnsupportedStrategy { strategy: String },

  #[error(transparent)]
  Coordinate(#[from] CoordinateError),
}

impl ConstructionError {
  /// The offending coordinate, when the error arose inside the tree.
  pub fn coordinates(&self) -> Option<&Coordinates> {
    match self {
      ConstructionError::UnknownAction { coordinates, .. }
      | ConstructionError::UnknownFunction { coordinates, .. }
      | ConstructionError::UnknownArgument { coordinates, .. }
      | ConstructionError::UnknownType { coordinates, .. }
      | ConstructionError::InvalidLiteral { coordinates, .. }
      | ConstructionError::MultiplicityMismatch { coordinates, .. }
      | ConstructionError::TypeMismatch { coordinates, .. }
      | ConstructionError::UnknownReference { coordinates, .. }
      | ConstructionError::UndeclaredProperty { coordinates, .. }
      | ConstructionError::ChildrenNotAccepted { coordinates, .. }
      | ConstructionError::ReferenceCycle { coordinates } => Some(coordinates),
      _ => None,
    }
  }
}
