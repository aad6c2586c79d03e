use thiserror::Error;

use crate::Coordinates;

/// Errors raised when deriving coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateError {
  /// The root block has no parent.
  #[error("the root coordinate has no parent")]
  RootHasNoParent,

  /// The root block has no depth-first predecessor.
  #[error("the root coordinate has no predecessor")]
  RootHasNoPredecessor,

  /// The root block has no siblings.
  #[error("the root coordinate has no siblings")]
  RootHasNoSiblings,

  /// Child and sibling indices are tree positions and must be non-negative.
  #[error("negative tree index {index}")]
  NegativeIndex { index: i32 },

  /// Initial variable coordinates are not tree positions.
  #[error("{coordinates} addresses an initial variable, not a tree position")]
  InitialVariable { coordinates: Coordinates },
}
