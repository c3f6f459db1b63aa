//! Plain binary search tree with parent links, used as the base container for the balanced
//! trees of this crate.
//!
//! Nodes live in a `TypedArena` and refer to each other by `Handle`. The tree performs no
//! rebalancing of its own: it exposes the search, attachment, splicing, and swapping primitives
//! that a balancing layer composes, along with ordered lookups and in-order traversal.

mod node;
mod tree;

pub use self::node::Node;
pub use self::tree::{BinarySearchTree, Handles, IntoIter, Iter, IterMut, Search, Spliced};

/// The side of a parent on which a child hangs.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// The change in `height(right) - height(left)` when the subtree on this side grows by one.
    pub fn delta(self) -> i8 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }
}
