//! Self-balancing binary search tree where the heights of the two child subtrees of any node
//! differ by at most one.
//!
//! Each node stores only its balance factor, the height of its right subtree minus the height of
//! its left. `BalancedTree` keeps those factors in the range `-1..=1` by walking back towards the
//! root after every structural change and rotating where a factor would reach `±2`. `AvlMap` and
//! `AvlSet` are the ordered collections built on top of it.

mod fixup;
mod map;
mod node;
mod set;
mod tree;

pub use self::map::{AvlMap, AvlMapIntoIter, AvlMapIter, AvlMapIterMut};
pub use self::node::Balance;
pub use self::set::{AvlSet, AvlSetIntoIter, AvlSetIter};
pub use self::tree::BalancedTree;
