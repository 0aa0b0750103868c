//! # treedex
//!
//! In-memory ordered-tree indexes over totally-ordered, unique scalar keys.
//!
//! Two independent structures, each a plain single-threaded container:
//!
//! - [`BTree`]: a multiway search tree that splits full nodes proactively on
//!   the way down, so inserts never propagate splits back upward. Supports
//!   exact lookup, nearest-at-or-above / nearest-at-or-below bound queries,
//!   and a destructive below-bound trim.
//! - [`Treap`]: a binary search tree on key order that simultaneously keeps a
//!   heap order on an independent priority, restored with local rotations
//!   after each insert. Supports a priority-thresholded nearest-key query
//!   that prunes whole subtrees through the heap invariant.
//!
//! Neither structure stores duplicate keys; inserting an existing key is a
//! no-op. Queries report absence as `None`, never as an error.
//!
//! ## Example
//!
//! ```rust
//! use treedex::{BTree, Treap};
//!
//! let mut tree: BTree<u64> = BTree::new();
//! assert!(tree.insert(30));
//! assert!(tree.insert(11));
//! assert!(!tree.insert(30));
//! assert_eq!(tree.upper_bound(&20), Some(&30));
//!
//! let mut treap = Treap::new(3u64, 10u64);
//! treap.insert(6, 2);
//! assert_eq!(treap.closest_with_min_priority(5, 2), Some(6));
//! ```

#![forbid(unsafe_code)]

pub mod btree;
pub mod treap;

pub use btree::BTree;
pub use treap::{HeapOrder, Treap};

#[cfg(test)]
mod proptests;
