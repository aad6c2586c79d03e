//! Trellis Coordinates
//!
//! Every node of a process tree is addressed by a [`Coordinates`] value: an
//! ordered, immutable sequence of integers. `[]` is the root block, `[1, 0, 2]`
//! is the third executable of the first child block of the second root-level
//! node. A single negative integer (`[-1]`, `[-2]`, ...) names an externally
//! injected initial variable rather than a tree position.
//!
//! Coordinates are canonicalized through a [`CoordinateTable`]: equal integer
//! sequences always resolve to the same shared allocation, so equality checks
//! and trie keying are cheap. The table is an explicit owned value, scoped to
//! whoever builds processes, rather than hidden global state.
//!
//! [`CoordinateTrie`] maps coordinates to values and supports subtree
//! traversal in pre-order.

mod coordinates;
mod error;
mod table;
mod trie;

pub use coordinates::Coordinates;
pub use error::CoordinateError;
pub use table::CoordinateTable;
pub use trie::CoordinateTrie;
