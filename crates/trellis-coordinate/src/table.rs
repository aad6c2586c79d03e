//! Canonicalization table for coordinates.
//!
//! Every distinct integer sequence is allocated once. Lookups take a read
//! lock; only the first request for a new sequence takes the write lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::coordinates::Coordinates;
use crate::error::CoordinateError;

/// Owned interning arena mapping integer sequences to canonical handles.
pub struct CoordinateTable {
  entries: RwLock<HashMap<Arc<[i32]>, Coordinates>>,
  root: Coordinates,
}

impl CoordinateTable {
  pub fn new() -> Self {
    let root_path: Arc<[i32]> = Arc::from(Vec::new());
    let root = Coordinates::from_shared(root_path.clone());
    let mut entries = HashMap::new();
    entries.insert(root_path, root.clone());

    Self {
      entries: RwLock::new(entries),
      root,
    }
  }

  /// Return the canonical handle for `path`.
  pub fn intern(&self, path: &[i32]) -> Coordinates {
    {
      let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
      if let Some(existing) = entries.get(path) {
        return existing.clone();
      }
    }

    let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
    // Another writer may have interned the same path between the two locks.
    if let Some(existing) = entries.get(path) {
      return existing.clone();
    }
    let shared: Arc<[i32]> = Arc::from(path);
    let coordinates = Coordinates::from_shared(shared.clone());
    entries.insert(shared, coordinates.clone());
    coordinates
  }

  /// The root block, `[]`.
  pub fn root(&self) -> Coordinates {
    self.root.clone()
  }

  /// Coordinates of the initial variable at parameter `index` (0 -> `[-1]`).
  pub fn initial(&self, index: usize) -> Coordinates {
    let encoded = -(index as i64) - 1;
    self.intern(&[encoded as i32])
  }

  pub fn parent(&self, coordinates: &Coordinates) -> Result<Coordinates, CoordinateError> {
    match coordinates.as_slice().split_last() {
      Some((_, rest)) => Ok(self.intern(rest)),
      None => Err(CoordinateError::RootHasNoParent),
    }
  }

  /// The `index`-th child of `coordinates`.
  pub fn child(&self, coordinates: &Coordinates, index: i32) -> Result<Coordinates, CoordinateError> {
    if index < 0 {
      return Err(CoordinateError::NegativeIndex { index });
    }
    if coordinates.is_initial() {
      return Err(CoordinateError::InitialVariable {
        coordinates: coordinates.clone(),
      });
    }
    let mut path = Vec::with_capacity(coordinates.depth() + 1);
    path.extend_from_slice(coordinates.as_slice());
    path.push(index);
    Ok(self.intern(&path))
  }

  /// Replace the last index of `coordinates` with `index`.
  pub fn sibling(&self, coordinates: &Coordinates, index: i32) -> Result<Coordinates, CoordinateError> {
    if index < 0 {
      return Err(CoordinateError::NegativeIndex { index });
    }
    if coordinates.is_initial() {
      return Err(CoordinateError::InitialVariable {
        coordinates: coordinates.clone(),
      });
    }
    match coordinates.as_slice().split_last() {
      Some((_, rest)) => {
        let mut path = rest.to_vec();
        path.push(index);
        Ok(self.intern(&path))
      }
      None => Err(CoordinateError::RootHasNoSiblings),
    }
  }

  /// Depth-first predecessor: the previous sibling when one exists,
  /// otherwise the parent.
  pub fn predecessor(&self, coordinates: &Coordinates) -> Result<Coordinates, CoordinateError> {
    if coordinates.is_initial() {
      return Err(CoordinateError::InitialVariable {
        coordinates: coordinates.clone(),
      });
    }
    match coordinates.as_slice().split_last() {
      Some((&last, rest)) if last > 0 => {
        let mut path = rest.to_vec();
        path.push(last - 1);
        Ok(self.intern(&path))
      }
      Some((_, rest)) => Ok(self.intern(rest)),
      None => Err(CoordinateError::RootHasNoPredecessor),
    }
  }

  /// Number of canonical handles allocated so far (the root included).
  pub fn interned(&self) -> usize {
    self
      .entries
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .len()
  }
}

impl Default for CoordinateTable {
  fn default() -> Self {
    Self::new()
  }
}
