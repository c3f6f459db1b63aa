use crate::arena::Handle;
use crate::bst::Side;
use crate::entry::Entry;

/// A struct representing a node of a binary search tree, carrying per-node metadata `M` for
/// whatever balancing scheme sits on top.
pub struct Node<T, U, M> {
    pub entry: Entry<T, U>,
    pub meta: M,
    pub parent: Option<Handle>,
    pub left: Option<Handle>,
    pub right: Option<Handle>,
}

impl<T, U, M> Node<T, U, M> {
    pub fn new(key: T, value: U, meta: M, parent: Option<Handle>) -> Self {
        Node {
            entry: Entry { key, value },
            meta,
            parent,
            left: None,
            right: None,
        }
    }

    pub fn child(&self, side: Side) -> Option<Handle> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn child_mut(&mut self, side: Side) -> &mut Option<Handle> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}
