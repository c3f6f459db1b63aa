//! Ordered collections backed by an AVL tree that rebalances using per-node balance factors.
//!
//! The crate is layered. `bst` is a plain, unbalanced binary search tree whose nodes live in a
//! `TypedArena` and link to their parents by handle. `avl_tree` extends it with the rebalancing
//! walks that keep every node's balance factor in `{-1, 0, 1}` after each insertion and removal,
//! and exposes `AvlMap` and `AvlSet`.
//!
//! # Examples
//!
//! ```
//! use avl_bst::avl_tree::AvlMap;
//!
//! let mut map = AvlMap::new();
//! for key in 1..=7 {
//!     map.insert(key, key * 10);
//! }
//! assert_eq!(map.height(), 3);
//!
//! map.remove(&1);
//! map.remove(&2);
//! assert_eq!(map.len(), 5);
//! assert_eq!(map.get(&4), Some(&40));
//! map.assert_invariants();
//! ```

mod entry;
mod error;

pub mod arena;
pub mod avl_tree;
pub mod bst;

pub use crate::error::{Error, Result};

/// Number of nodes per arena chunk used by the `new` constructors.
pub const DEFAULT_CHUNK_SIZE: usize = 256;
