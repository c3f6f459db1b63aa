use crate::arena::{Handle, TypedArena};
use crate::bst::node::Node;
use crate::bst::Side;
use crate::entry::Entry;
use crate::error::Result;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::mem;
use std::vec;

/// The outcome of searching for a key: the node holding it, or the empty slot where a node
/// holding it would be attached.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Search {
    Found(Handle),
    Vacant { parent: Option<Handle>, side: Side },
}

/// What remains of a node after it has been spliced out of the tree.
pub struct Spliced<T, U, M> {
    pub key: T,
    pub value: U,
    pub meta: M,
    /// The former parent of the spliced node, which now holds the promoted child.
    pub parent: Option<Handle>,
    /// The side of `parent` the spliced node hung on. `None` when it was the root.
    pub side: Option<Side>,
}

/// An unbalanced binary search tree whose nodes live in a `TypedArena`.
///
/// Every node records its parent, so the tree can be walked upward from any handle without an
/// auxiliary stack. The tree never reorganizes itself: `insert` attaches new keys as leaves and
/// `remove` splices nodes out, leaving the shape to whatever balancing layer drives it.
///
/// # Examples
///
/// ```
/// use avl_bst::bst::BinarySearchTree;
///
/// let mut tree: BinarySearchTree<u32, &str, ()> = BinarySearchTree::new(16);
/// tree.insert(2, "b").unwrap();
/// tree.insert(1, "a").unwrap();
/// tree.insert(3, "c").unwrap();
///
/// let root = tree.root().unwrap();
/// assert_eq!(tree.key(root), &2);
/// assert_eq!(tree.predecessor(root).map(|h| tree.key(h)), Some(&1));
///
/// assert_eq!(tree.remove(&2), Some((2, "b")));
/// assert_eq!(tree.iter().collect::<Vec<_>>(), vec![(&1, &"a"), (&3, &"c")]);
/// ```
pub struct BinarySearchTree<T, U, M> {
    arena: TypedArena<Node<T, U, M>>,
    root: Option<Handle>,
}

impl<T, U, M> BinarySearchTree<T, U, M> {
    /// Constructs a new, empty tree whose arena stores `chunk_size` nodes per chunk.
    pub fn new(chunk_size: usize) -> Self {
        BinarySearchTree {
            arena: TypedArena::new(chunk_size),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
    }

    pub fn chunk_size(&self) -> usize {
        self.arena.chunk_size()
    }

    #[cfg(test)]
    pub(crate) fn arena_mut(&mut self) -> &mut TypedArena<Node<T, U, M>> {
        &mut self.arena
    }

    pub fn root(&self) -> Option<Handle> {
        self.root
    }

    pub fn node(&self, handle: Handle) -> &Node<T, U, M> {
        &self.arena[handle]
    }

    pub fn key(&self, handle: Handle) -> &T {
        &self.arena[handle].entry.key
    }

    pub fn value(&self, handle: Handle) -> &U {
        &self.arena[handle].entry.value
    }

    pub fn value_mut(&mut self, handle: Handle) -> &mut U {
        &mut self.arena[handle].entry.value
    }

    pub fn meta(&self, handle: Handle) -> &M {
        &self.arena[handle].meta
    }

    pub fn meta_mut(&mut self, handle: Handle) -> &mut M {
        &mut self.arena[handle].meta
    }

    pub fn parent(&self, handle: Handle) -> Option<Handle> {
        self.arena[handle].parent
    }

    pub fn child(&self, handle: Handle, side: Side) -> Option<Handle> {
        self.arena[handle].child(side)
    }

    /// Returns the side of its parent that `handle` hangs on, or `None` for the root.
    pub fn side_of(&self, handle: Handle) -> Option<Side> {
        self.parent(handle).map(|parent| {
            if self.arena[parent].left == Some(handle) {
                Side::Left
            } else {
                debug_assert_eq!(self.arena[parent].right, Some(handle));
                Side::Right
            }
        })
    }

    pub fn set_parent(&mut self, handle: Handle, parent: Option<Handle>) {
        self.arena[handle].parent = parent;
    }

    /// Sets one child slot of `handle`. The child's own parent link is left untouched.
    pub fn set_child(&mut self, handle: Handle, side: Side, child: Option<Handle>) {
        *self.arena[handle].child_mut(side) = child;
    }

    /// Points whichever slot of `parent` holds `old` at `new` instead. A `None` parent stands
    /// for the root slot of the tree. The parent link of `new` is left untouched.
    pub fn replace_child(&mut self, parent: Option<Handle>, old: Handle, new: Option<Handle>) {
        match parent {
            None => {
                debug_assert_eq!(self.root, Some(old));
                self.root = new;
            },
            Some(parent) => {
                let node = &mut self.arena[parent];
                if node.left == Some(old) {
                    node.left = new;
                } else {
                    debug_assert_eq!(node.right, Some(old));
                    node.right = new;
                }
            },
        }
    }

    /// Follows `side` links from `handle` as far as they go.
    pub fn extreme(&self, mut handle: Handle, side: Side) -> Handle {
        while let Some(child) = self.child(handle, side) {
            handle = child;
        }
        handle
    }

    pub fn first(&self) -> Option<Handle> {
        self.root.map(|root| self.extreme(root, Side::Left))
    }

    pub fn last(&self) -> Option<Handle> {
        self.root.map(|root| self.extreme(root, Side::Right))
    }

    /// Returns the in-order neighbour of `handle` on `side`: the predecessor for `Side::Left`
    /// and the successor for `Side::Right`.
    pub fn neighbor(&self, handle: Handle, side: Side) -> Option<Handle> {
        if let Some(child) = self.child(handle, side) {
            return Some(self.extreme(child, side.opposite()));
        }
        let mut curr = handle;
        loop {
            match self.side_of(curr) {
                None => return None,
                Some(curr_side) if curr_side != side => return self.parent(curr),
                Some(_) => curr = self.parent(curr).expect("Expected a parent for a non-root node."),
            }
        }
    }

    pub fn predecessor(&self, handle: Handle) -> Option<Handle> {
        self.neighbor(handle, Side::Left)
    }

    pub fn successor(&self, handle: Handle) -> Option<Handle> {
        self.neighbor(handle, Side::Right)
    }

    /// Returns the number of nodes on the longest root-to-leaf path. Empty trees have height 0.
    pub fn height(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = Vec::new();
        if let Some(root) = self.root {
            stack.push((root, 1));
        }
        while let Some((handle, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            let node = &self.arena[handle];
            stack.extend(node.left.map(|left| (left, depth + 1)));
            stack.extend(node.right.map(|right| (right, depth + 1)));
        }
        max_depth
    }

    /// Exchanges the positions of two nodes in the link structure. Keys, values, and metadata
    /// stay with their nodes, so each handle keeps naming the same entry afterwards.
    pub fn node_swap(&mut self, a: Handle, b: Handle) {
        if a == b {
            return;
        }
        let a_side = self.side_of(a);
        let b_side = self.side_of(b);
        let (a_parent, a_left, a_right) = {
            let node = &self.arena[a];
            (node.parent, node.left, node.right)
        };
        let (b_parent, b_left, b_right) = {
            let node = &self.arena[b];
            (node.parent, node.left, node.right)
        };

        // Adjacent nodes point at each other; those links must flip rather than copy.
        let exchange = |link: Option<Handle>| match link {
            Some(handle) if handle == a => Some(b),
            Some(handle) if handle == b => Some(a),
            other => other,
        };

        {
            let node = &mut self.arena[a];
            node.parent = exchange(b_parent);
            node.left = exchange(b_left);
            node.right = exchange(b_right);
        }
        {
            let node = &mut self.arena[b];
            node.parent = exchange(a_parent);
            node.left = exchange(a_left);
            node.right = exchange(a_right);
        }

        if a_parent != Some(b) {
            match (a_parent, a_side) {
                (Some(parent), Some(side)) => self.set_child(parent, side, Some(b)),
                _ => self.root = Some(b),
            }
        }
        if b_parent != Some(a) {
            match (b_parent, b_side) {
                (Some(parent), Some(side)) => self.set_child(parent, side, Some(a)),
                _ => self.root = Some(a),
            }
        }

        for &handle in &[a, b] {
            let (left, right) = {
                let node = &self.arena[handle];
                (node.left, node.right)
            };
            for child in left.into_iter().chain(right) {
                self.set_parent(child, Some(handle));
            }
        }
    }

    /// Unlinks a node with at most one child, promotes that child into its place, and releases
    /// the node.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the node has two children.
    pub fn splice(&mut self, handle: Handle) -> Spliced<T, U, M> {
        let (parent, child) = {
            let node = &self.arena[handle];
            debug_assert!(
                node.left.is_none() || node.right.is_none(),
                "Error: attempting to splice a node with two children.",
            );
            (node.parent, node.left.or(node.right))
        };
        let side = self.side_of(handle);

        if let Some(child) = child {
            self.set_parent(child, parent);
        }
        self.replace_child(parent, handle, child);

        let Node {
            entry: Entry { key, value },
            meta,
            ..
        } = self.arena.free(&handle);
        Spliced {
            key,
            value,
            meta,
            parent,
            side,
        }
    }

    /// Returns an iterator over the node handles of the tree in key order.
    pub fn handles(&self) -> Handles<'_, T, U, M> {
        Handles {
            tree: self,
            next: self.first(),
            remaining: self.len(),
        }
    }

    /// Returns an iterator over the entries of the tree in key order.
    pub fn iter(&self) -> Iter<'_, T, U, M> {
        Iter {
            handles: self.handles(),
        }
    }

    /// Returns an iterator over the entries of the tree in key order with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, T, U> {
        let chunk_size = self.arena.chunk_size();
        let mut rank = vec![0; self.arena.capacity()];
        for (index, handle) in self.handles().enumerate() {
            rank[handle.slot(chunk_size)] = index;
        }
        let mut slots: Vec<Option<(&T, &mut U)>> = (0..self.len()).map(|_| None).collect();
        for (handle, node) in self.arena.iter_mut() {
            let Entry {
                ref key,
                ref mut value,
            } = node.entry;
            slots[rank[handle.slot(chunk_size)]] = Some((key, value));
        }
        let entries: Vec<(&T, &mut U)> = slots
            .into_iter()
            .map(|slot| slot.expect("Expected every live node to be reachable from the root."))
            .collect();
        IterMut {
            entries: entries.into_iter(),
        }
    }
}

impl<T, U, M> BinarySearchTree<T, U, M>
where
    T: Ord,
{
    /// Returns the handle of the node holding `key`.
    pub fn find<V>(&self, key: &V) -> Option<Handle>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        match self.search(key) {
            Search::Found(handle) => Some(handle),
            Search::Vacant { .. } => None,
        }
    }

    /// Walks down from the root comparing against `key`.
    pub fn search<V>(&self, key: &V) -> Search
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let mut parent = None;
        let mut side = Side::Left;
        let mut curr = self.root;
        while let Some(handle) = curr {
            side = match key.cmp(self.key(handle).borrow()) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return Search::Found(handle),
            };
            parent = Some(handle);
            curr = self.child(handle, side);
        }
        Search::Vacant { parent, side }
    }

    pub fn get<V>(&self, key: &V) -> Option<&U>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        self.find(key).map(|handle| self.value(handle))
    }

    pub fn get_mut<V>(&mut self, key: &V) -> Option<&mut U>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        match self.find(key) {
            Some(handle) => Some(self.value_mut(handle)),
            None => None,
        }
    }

    /// Returns the node with the greatest key less than or equal to `key`.
    pub fn floor<V>(&self, key: &V) -> Option<Handle>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        self.bound(key, Side::Left)
    }

    /// Returns the node with the least key greater than or equal to `key`.
    pub fn ceil<V>(&self, key: &V) -> Option<Handle>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        self.bound(key, Side::Right)
    }

    fn bound<V>(&self, key: &V, side: Side) -> Option<Handle>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let mut best = None;
        let mut curr = self.root;
        while let Some(handle) = curr {
            let next_side = match key.cmp(self.key(handle).borrow()) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => return Some(handle),
            };
            // Stepping away from `side` means this node lies on the wanted side of `key`.
            if next_side != side {
                best = Some(handle);
            }
            curr = self.child(handle, next_side);
        }
        best
    }

    /// Allocates a node and hangs it in an empty slot found by `search`. Nothing is linked if
    /// the allocation fails.
    pub fn attach(
        &mut self,
        parent: Option<Handle>,
        side: Side,
        key: T,
        value: U,
        meta: M,
    ) -> Result<Handle> {
        let handle = self.arena.try_allocate(Node::new(key, value, meta, parent))?;
        match parent {
            None => {
                debug_assert!(self.root.is_none());
                self.root = Some(handle);
            },
            Some(parent) => {
                debug_assert!(self.child(parent, side).is_none());
                self.set_child(parent, side, Some(handle));
            },
        }
        Ok(handle)
    }

    /// Inserts a key-value pair without rebalancing. If the key already exists, its value is
    /// replaced in place and the old value is returned.
    pub fn insert(&mut self, key: T, value: U) -> Result<Option<U>>
    where
        M: Default,
    {
        match self.search(&key) {
            Search::Found(handle) => Ok(Some(mem::replace(self.value_mut(handle), value))),
            Search::Vacant { parent, side } => {
                self.attach(parent, side, key, value, M::default())?;
                Ok(None)
            },
        }
    }

    /// Removes a key without rebalancing. A node with two children first trades places with
    /// its predecessor so that the node unlinked has at most one child.
    pub fn remove<V>(&mut self, key: &V) -> Option<(T, U)>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let handle = self.find(key)?;
        let node = self.node(handle);
        if node.left.is_some() && node.right.is_some() {
            let predecessor = self
                .predecessor(handle)
                .expect("Expected a predecessor for a node with a left child.");
            self.node_swap(handle, predecessor);
        }
        let Spliced { key, value, .. } = self.splice(handle);
        Some((key, value))
    }
}

impl<T, U, M> IntoIterator for BinarySearchTree<T, U, M> {
    type IntoIter = IntoIter<T, U, M>;
    type Item = (T, U);

    fn into_iter(self) -> Self::IntoIter {
        let order: Vec<Handle> = self.handles().collect();
        IntoIter {
            arena: self.arena,
            order: order.into_iter(),
        }
    }
}

/// An iterator over the node handles of a `BinarySearchTree<T, U, M>` in key order.
pub struct Handles<'a, T, U, M> {
    tree: &'a BinarySearchTree<T, U, M>,
    next: Option<Handle>,
    remaining: usize,
}

impl<'a, T, U, M> Iterator for Handles<'a, T, U, M> {
    type Item = Handle;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.next?;
        self.next = self.tree.successor(handle);
        self.remaining -= 1;
        Some(handle)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// An iterator for `BinarySearchTree<T, U, M>`.
///
/// This iterator traverses the elements of the tree in-order and yields immutable references.
pub struct Iter<'a, T, U, M> {
    handles: Handles<'a, T, U, M>,
}

impl<'a, T, U, M> Iterator for Iter<'a, T, U, M> {
    type Item = (&'a T, &'a U);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.handles.tree;
        self.handles.next().map(|handle| {
            let Entry { ref key, ref value } = tree.node(handle).entry;
            (key, value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.handles.size_hint()
    }
}

/// A mutable iterator for `BinarySearchTree<T, U, M>`.
///
/// This iterator traverses the elements of the tree in-order and yields mutable references to
/// the values.
pub struct IterMut<'a, T, U> {
    entries: vec::IntoIter<(&'a T, &'a mut U)>,
}

impl<'a, T, U> Iterator for IterMut<'a, T, U> {
    type Item = (&'a T, &'a mut U);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// An owning iterator for `BinarySearchTree<T, U, M>`.
///
/// This iterator traverses the elements of the tree in-order and yields owned entries.
pub struct IntoIter<T, U, M> {
    arena: TypedArena<Node<T, U, M>>,
    order: vec::IntoIter<Handle>,
}

impl<T, U, M> Iterator for IntoIter<T, U, M> {
    type Item = (T, U);

    fn next(&mut self) -> Option<Self::Item> {
        let arena = &mut self.arena;
        self.order.next().map(|handle| {
            let Node {
                entry: Entry { key, value },
                ..
            } = arena.free(&handle);
            (key, value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}
