//! Case selection for the AVL fix-up walks.
//!
//! Everything here is a pure function of balance factors and sides, so the rotation tables can
//! be checked without building a tree. `Side` names the taller (heavy) subtree throughout; the
//! rotation applied at an out-of-balance node always turns toward `heavy.opposite()`.
//!
//! The eight rebalancing cases are {insert, remove} × {single, double} × {left, right}:
//!
//! | walk   | heavy child leans       | shape    |
//! |--------|-------------------------|----------|
//! | insert | toward `heavy`          | `ZigZig` |
//! | insert | away from `heavy`       | `ZigZag` |
//! | remove | toward `heavy` or level | `ZigZig` |
//! | remove | away from `heavy`       | `ZigZag` |

use crate::avl_tree::node::Balance;
use crate::bst::Side;

/// Whether an imbalance is repaired with one rotation or two.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Shape {
    /// The heavy child is heavy on the same side: one rotation at the unbalanced node.
    ZigZig,
    /// The heavy child is heavy on the inner side: rotate the child, then the unbalanced node.
    ZigZag,
}

/// What an insertion walk does at the grandparent of the node it arrived from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertStep {
    /// The grown side was the short one. The grandparent levels out and the walk stops.
    Absorbed,
    /// The grandparent now leans toward the grown side and its subtree is one level taller.
    Propagate(Balance),
    /// The grandparent is two levels heavier on `heavy`.
    Rotate { heavy: Side, shape: Shape },
}

/// What a removal walk does at a node one of whose subtrees just shrank.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RemoveStep {
    /// The node was level. It now leans away from the shrunken side, keeps its height, and the
    /// walk stops.
    Settle(Balance),
    /// The node leaned toward the shrunken side and is now level. Its subtree lost a level.
    Propagate,
    /// The node leaned away from the shrunken side and is now two levels heavier on `heavy`.
    Rotate { heavy: Side },
}

/// A removal rotation and whether the rotated subtree keeps its height.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rotation {
    pub shape: Shape,
    pub preserves_height: bool,
}

/// Balance factors to assign after a rotation. `top` is the node that was out of balance and
/// `child` its former heavy child. After a double rotation the pivot is always level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rebalanced {
    pub top: Balance,
    pub child: Balance,
}

/// `grandparent` is the factor before the update; `grown` is the side of the grandparent whose
/// subtree grew; `node_side` is the side of the grown child that the growth came from.
pub fn insert_step(grandparent: Balance, grown: Side, node_side: Side) -> InsertStep {
    let shifted = grandparent.shifted(grown);
    match shifted.value() {
        0 => InsertStep::Absorbed,
        -1 | 1 => InsertStep::Propagate(shifted),
        _ => InsertStep::Rotate {
            heavy: grown,
            shape: if node_side == grown {
                Shape::ZigZig
            } else {
                Shape::ZigZag
            },
        },
    }
}

pub fn remove_step(balance: Balance, shrunk: Side) -> RemoveStep {
    let heavy = shrunk.opposite();
    match balance.heavy_side() {
        None => RemoveStep::Settle(Balance::leaning(heavy)),
        Some(side) if side == heavy => RemoveStep::Rotate { heavy },
        Some(_) => RemoveStep::Propagate,
    }
}

/// Picks the rotation for a removal imbalance from the factor of the heavy child.
pub fn removal_rotation(heavy: Side, child: Balance) -> Rotation {
    match child.heavy_side() {
        None => Rotation {
            shape: Shape::ZigZig,
            preserves_height: true,
        },
        Some(side) if side == heavy => Rotation {
            shape: Shape::ZigZig,
            preserves_height: false,
        },
        Some(_) => Rotation {
            shape: Shape::ZigZag,
            preserves_height: false,
        },
    }
}

/// Factors after a single rotation, keyed on the heavy child's factor before it.
pub fn single_rotation_balances(heavy: Side, child: Balance) -> Rebalanced {
    debug_assert_ne!(child.heavy_side(), Some(heavy.opposite()));
    if child == Balance::EVEN {
        // Only reachable on removal.
        Rebalanced {
            top: Balance::leaning(heavy),
            child: Balance::leaning(heavy.opposite()),
        }
    } else {
        Rebalanced {
            top: Balance::EVEN,
            child: Balance::EVEN,
        }
    }
}

/// Factors after a double rotation, keyed on the pivot's factor before it. The pivot is the
/// heavy child's inner child; it ends up on top.
pub fn double_rotation_balances(heavy: Side, pivot: Balance) -> Rebalanced {
    match pivot.heavy_side() {
        None => Rebalanced {
            top: Balance::EVEN,
            child: Balance::EVEN,
        },
        Some(side) if side == heavy => Rebalanced {
            top: Balance::leaning(heavy.opposite()),
            child: Balance::EVEN,
        },
        Some(_) => Rebalanced {
            top: Balance::EVEN,
            child: Balance::leaning(heavy),
        },
    }
}
