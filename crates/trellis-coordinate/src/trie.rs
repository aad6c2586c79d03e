//! Coordinate-keyed trie.
//!
//! Each trie level corresponds to one index of the coordinate sequence.
//! Children are kept in a `BTreeMap` so that every listing comes out in
//! pre-order with siblings ordered by their integer key.

use std::collections::BTreeMap;

use crate::coordinates::Coordinates;

struct TrieNode<V> {
  entry: Option<(Coordinates, V)>,
  children: BTreeMap<i32, TrieNode<V>>,
}

impl<V> TrieNode<V> {
  fn new() -> Self {
    Self {
      entry: None,
      children: BTreeMap::new(),
    }
  }

  fn is_vacant(&self) -> bool {
    self.entry.is_none() && self.children.is_empty()
  }

  fn collect<'a>(&'a self, out: &mut Vec<(&'a Coordinates, &'a V)>) {
    if let Some((coordinates, value)) = &self.entry {
      out.push((coordinates, value));
    }
    for child in self.children.values() {
      child.collect(out);
    }
  }

  /// Remove the entry at `path`, pruning branches left empty.
  fn remove(&mut self, path: &[i32]) -> Option<V> {
    match path.split_first() {
      None => self.entry.take().map(|(_, value)| value),
      Some((head, rest)) => {
        let child = self.children.get_mut(head)?;
        let removed = child.remove(rest);
        if child.is_vacant() {
          self.children.remove(head);
        }
        removed
      }
    }
  }
}

/// Maps [`Coordinates`] to values with ordered subtree traversal.
pub struct CoordinateTrie<V> {
  root: TrieNode<V>,
  len: usize,
}

impl<V> CoordinateTrie<V> {
  pub fn new() -> Self {
    Self {
      root: TrieNode::new(),
      len: 0,
    }
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Insert or replace the value at `coordinates`, returning the old value.
  pub fn insert(&mut self, coordinates: &Coordinates, value: V) -> Option<V> {
    let mut node = &mut self.root;
    for index in coordinates.as_slice() {
      node = node.children.entry(*index).or_insert_with(TrieNode::new);
    }
    let previous = node.entry.replace((coordinates.clone(), value));
    match previous {
      Some((_, old)) => Some(old),
      None => {
        self.len += 1;
        None
      }
    }
  }

  pub fn get(&self, coordinates: &Coordinates) -> Option<&V> {
    self
      .node(coordinates)
      .and_then(|node| node.entry.as_ref())
      .map(|(_, value)| value)
  }

  pub fn get_mut(&mut self, coordinates: &Coordinates) -> Option<&mut V> {
    let mut node = &mut self.root;
    for index in coordinates.as_slice() {
      node = node.children.get_mut(index)?;
    }
    node.entry.as_mut().map(|(_, value)| value)
  }

  pub fn contains(&self, coordinates: &Coordinates) -> bool {
    self.get(coordinates).is_some()
  }

  pub fn remove(&mut self, coordinates: &Coordinates) -> Option<V> {
    let removed = self.root.remove(coordinates.as_slice());
    if removed.is_some() {
      self.len -= 1;
    }
    removed
  }

  pub fn clear(&mut self) {
    self.root = TrieNode::new();
    self.len = 0;
  }

  /// All entries in pre-order.
  pub fn entries(&self) -> Vec<(&Coordinates, &V)> {
    let mut out = Vec::with_capacity(self.len);
    self.root.collect(&mut out);
    out
  }

  /// All values in pre-order.
  pub fn values(&self) -> Vec<&V> {
    self.entries().into_iter().map(|(_, value)| value).collect()
  }

  /// Entries strictly below `coordinates`, in pre-order.
  pub fn descendants(&self, coordinates: &Coordinates) -> Vec<(&Coordinates, &V)> {
    let mut out = Vec::new();
    if let Some(node) = self.node(coordinates) {
      for child in node.children.values() {
        child.collect(&mut out);
      }
    }
    out
  }

  /// Entries exactly one level below `coordinates`, ordered by key.
  pub fn children(&self, coordinates: &Coordinates) -> Vec<(&Coordinates, &V)> {
    self
      .node(coordinates)
      .map(|node| {
        node
          .children
          .values()
          .filter_map(|child| child.entry.as_ref().map(|(c, v)| (c, v)))
          .collect()
      })
      .unwrap_or_default()
  }

  fn node(&self, coordinates: &Coordinates) -> Option<&TrieNode<V>> {
    let mut node = &self.root;
    for index in coordinates.as_slice() {
      node = node.children.get(index)?;
    }
    Some(node)
  }
}

impl<V> Default for CoordinateTrie<V> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::CoordinateTable;

  fn sample() -> (CoordinateTable, CoordinateTrie<&'static str>) {
    let table = CoordinateTable::new();
    let mut trie = CoordinateTrie::new();
    trie.insert(&table.intern(&[1]), "b");
    trie.insert(&table.intern(&[0]), "a");
    trie.insert(&table.intern(&[1, 0, 1]), "b01");
    trie.insert(&table.intern(&[1, 0, 0]), "b00");
    trie.insert(&table.intern(&[1, 1]), "b1");
    trie.insert(&table.intern(&[-1]), "initial");
    (table, trie)
  }

  #[test]
  fn test_point_operations() {
    let (table, mut trie) = sample();
    assert_eq!(trie.len(), 6);
    assert_eq!(trie.get(&table.intern(&[1, 0, 1])), Some(&"b01"));
    assert_eq!(trie.get(&table.intern(&[1, 0])), None);

    assert_eq!(trie.insert(&table.intern(&[0]), "a2"), Some("a"));
    assert_eq!(trie.len(), 6);

    *trie.get_mut(&table.intern(&[1, 1])).unwrap() = "changed";
    assert_eq!(trie.get(&table.intern(&[1, 1])), Some(&"changed"));
  }

  #[test]
  fn test_values_in_pre_order() {
    let (_, trie) = sample();
    assert_eq!(
      trie.values(),
      vec![&"initial", &"a", &"b", &"b00", &"b01", &"b1"]
    );
  }

  #[test]
  fn test_descendants_exclude_self() {
    let (table, trie) = sample();
    let descendants: Vec<_> = trie
      .descendants(&table.intern(&[1]))
      .into_iter()
      .map(|(c, v)| (c.as_slice().to_vec(), *v))
      .collect();
    assert_eq!(
      descendants,
      vec![
        (vec![1, 0, 0], "b00"),
        (vec![1, 0, 1], "b01"),
        (vec![1, 1], "b1"),
      ]
    );
  }

  #[test]
  fn test_children_are_immediate_only() {
    let (table, trie) = sample();
    let children: Vec<_> = trie
      .children(&table.intern(&[1]))
      .into_iter()
      .map(|(_, v)| *v)
      .collect();
    assert_eq!(children, vec!["b1"]);

    let top: Vec<_> = trie
      .children(&table.root())
      .into_iter()
      .map(|(_, v)| *v)
      .collect();
    assert_eq!(top, vec!["initial", "a", "b"]);
  }

  #[test]
  fn test_remove_prunes_and_keeps_siblings() {
    let (table, mut trie) = sample();
    assert_eq!(trie.remove(&table.intern(&[1, 0, 0])), Some("b00"));
    assert_eq!(trie.remove(&table.intern(&[1, 0, 0])), None);
    assert_eq!(trie.len(), 5);
    assert_eq!(trie.get(&table.intern(&[1, 0, 1])), Some(&"b01"));

    trie.remove(&table.intern(&[1, 0, 1]));
    assert!(trie.descendants(&table.intern(&[1, 0])).is_empty());
    assert!(trie.contains(&table.intern(&[1])));
  }

  #[test]
  fn test_lookup_of_unknown_subtree_is_empty() {
    let (table, trie) = sample();
    assert!(trie.descendants(&table.intern(&[9, 9])).is_empty());
    assert!(trie.children(&table.intern(&[9])).is_empty());
  }
}
