use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// A canonical handle to a tree position.
///
/// Handles are only produced by a [`CoordinateTable`](crate::CoordinateTable),
/// which guarantees that two handles for the same sequence share storage.
/// Equality still falls back to comparing the sequence so that handles from
/// different tables compare sensibly.
#[derive(Clone)]
pub struct Coordinates {
  path: Arc<[i32]>,
}

impl Coordinates {
  pub(crate) fn from_shared(path: Arc<[i32]>) -> Self {
    Self { path }
  }

  /// The integer sequence.
  pub fn as_slice(&self) -> &[i32] {
    &self.path
  }

  /// Number of levels below the root.
  pub fn depth(&self) -> usize {
    self.path.len()
  }

  pub fn is_root(&self) -> bool {
    self.path.is_empty()
  }

  /// Whether this names an externally injected initial variable.
  pub fn is_initial(&self) -> bool {
    matches!(*self.path, [index] if index < 0)
  }

  /// Zero-based parameter index for initial variable coordinates.
  pub fn initial_index(&self) -> Option<usize> {
    match *self.path {
      [index] if index < 0 => Some((-(index as i64) - 1) as usize),
      _ => None,
    }
  }

  /// The last index of the sequence, `None` for the root.
  pub fn last(&self) -> Option<i32> {
    self.path.last().copied()
  }

  /// Whether `self` lies inside the subtree rooted at `ancestor` (or is it).
  pub fn is_within(&self, ancestor: &Coordinates) -> bool {
    self.path.starts_with(&ancestor.path)
  }

  /// Identity comparison: true when both handles share one canonical allocation.
  pub fn ptr_eq(a: &Coordinates, b: &Coordinates) -> bool {
    Arc::ptr_eq(&a.path, &b.path)
  }
}

impl PartialEq for Coordinates {
  fn eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.path, &other.path) || self.path == other.path
  }
}

impl Eq for Coordinates {}

impl Hash for Coordinates {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.path.hash(state);
  }
}

impl PartialOrd for Coordinates {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Coordinates {
  fn cmp(&self, other: &Self) -> Ordering {
    self.path.cmp(&other.path)
  }
}

impl fmt::Debug for Coordinates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(self, f)
  }
}

impl fmt::Display for Coordinates {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[")?;
    for (i, index) in self.path.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{}", index)?;
    }
    f.write_str("]")
  }
}

impl Serialize for Coordinates {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.path.as_ref().serialize(serializer)
  }
}

#[cfg(test)]
mod tests {
  use crate::CoordinateTable;

  #[test]
  fn test_display() {
    let table = CoordinateTable::new();
    assert_eq!(table.intern(&[1, 0, 2]).to_string(), "[1, 0, 2]");
    assert_eq!(table.root().to_string(), "[]");
  }

  #[test]
  fn test_initial_index() {
    let table = CoordinateTable::new();
    assert_eq!(table.initial(0).initial_index(), Some(0));
    assert_eq!(table.initial(3).as_slice(), &[-4]);
    assert_eq!(table.intern(&[2]).initial_index(), None);
    assert!(!table.intern(&[-1, 0]).is_initial());
  }

  #[test]
  fn test_is_within() {
    let table = CoordinateTable::new();
    let block = table.intern(&[1, 0]);
    assert!(table.intern(&[1, 0, 3]).is_within(&block));
    assert!(block.is_within(&block));
    assert!(!table.intern(&[1, 1, 0]).is_within(&block));
    assert!(block.is_within(&table.root()));
  }

  #[test]
  fn test_serializes_as_integer_array() {
    let table = CoordinateTable::new();
    let json = serde_json::to_string(&table.intern(&[3, -1])).unwrap();
    assert_eq!(json, "[3,-1]");
  }
}
