use crate::arena::Handle;
use crate::avl_tree::fixup::{self, InsertStep, RemoveStep, Rotation, Shape};
use crate::avl_tree::node::Balance;
use crate::bst::{self, BinarySearchTree, Search, Side, Spliced};
use crate::error::Result;
use log::trace;
use std::borrow::Borrow;
use std::mem;

/// An AVL tree layered on `BinarySearchTree`.
///
/// Each node stores only its balance factor. Insertion and removal delegate the structural work
/// to the base container and then walk parent links upward, adjusting factors by the change in
/// subtree height and rotating where a factor would reach two. An insertion walk stops at the
/// first node whose height does not change; a removal walk continues while the subtree it left
/// got shorter, which may be all the way to the root.
pub struct BalancedTree<T, U> {
    tree: BinarySearchTree<T, U, Balance>,
    rotations: u64,
}

impl<T, U> BalancedTree<T, U> {
    pub fn new(chunk_size: usize) -> Self {
        BalancedTree {
            tree: BinarySearchTree::new(chunk_size),
            rotations: 0,
        }
    }

    /// Read access to the base container for lookups and traversal.
    pub fn base(&self) -> &BinarySearchTree<T, U, Balance> {
        &self.tree
    }

    pub fn into_base(self) -> BinarySearchTree<T, U, Balance> {
        self.tree
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Number of single rotations performed since the tree was created. A double rotation
    /// counts as two.
    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    pub fn balance(&self, handle: Handle) -> Balance {
        *self.tree.meta(handle)
    }

    fn set_balance(&mut self, handle: Handle, balance: Balance) {
        *self.tree.meta_mut(handle) = balance;
    }

    pub fn iter_mut(&mut self) -> bst::IterMut<'_, T, U> {
        self.tree.iter_mut()
    }

    /// Promotes the child of `node` opposite to `direction` into the position of `node`, which
    /// becomes that child's `direction` child. Balance factors are not touched. Does nothing if
    /// there is no child to promote.
    fn rotate(&mut self, node: Handle, direction: Side) {
        let promoted = match self.tree.child(node, direction.opposite()) {
            Some(promoted) => promoted,
            None => return,
        };
        let transferred = self.tree.child(promoted, direction);
        let parent = self.tree.parent(node);

        self.tree.set_child(node, direction.opposite(), transferred);
        if let Some(transferred) = transferred {
            self.tree.set_parent(transferred, Some(node));
        }
        self.tree.set_child(promoted, direction, Some(node));
        self.tree.set_parent(node, Some(promoted));
        self.tree.set_parent(promoted, parent);
        self.tree.replace_child(parent, node, Some(promoted));

        self.rotations += 1;
        trace!("rotated {:?} at {:?}, promoting {:?}", direction, node, promoted);
    }

    fn rotate_left(&mut self, node: Handle) {
        self.rotate(node, Side::Left);
    }

    fn rotate_right(&mut self, node: Handle) {
        self.rotate(node, Side::Right);
    }

    /// Rotates `node` away from its `heavy` side.
    fn rotate_away(&mut self, node: Handle, heavy: Side) {
        match heavy {
            Side::Left => self.rotate_right(node),
            Side::Right => self.rotate_left(node),
        }
    }

    /// Exchanges the tree positions of two nodes and then their balance factors, so each
    /// position keeps the factor that describes its subtrees.
    fn node_swap(&mut self, a: Handle, b: Handle) {
        self.tree.node_swap(a, b);
        let a_balance = self.balance(a);
        let b_balance = self.balance(b);
        self.set_balance(a, b_balance);
        self.set_balance(b, a_balance);
    }

    /// Walks upward after `parent` gained height on the side of `node`.
    fn insert_fix(&mut self, mut parent: Handle, mut node: Handle) {
        while let Some(grandparent) = self.tree.parent(parent) {
            let grown = self.tree.side_of(parent).expect("Expected a side for a non-root node.");
            let node_side = self.tree.side_of(node).expect("Expected a side for a non-root node.");

            match fixup::insert_step(self.balance(grandparent), grown, node_side) {
                InsertStep::Absorbed => {
                    self.set_balance(grandparent, Balance::EVEN);
                    return;
                },
                InsertStep::Propagate(balance) => {
                    self.set_balance(grandparent, balance);
                    node = parent;
                    parent = grandparent;
                },
                InsertStep::Rotate {
                    heavy,
                    shape: Shape::ZigZig,
                } => {
                    let child_balance = self.balance(parent);
                    self.rotate_away(grandparent, heavy);
                    let rebalanced = fixup::single_rotation_balances(heavy, child_balance);
                    self.set_balance(grandparent, rebalanced.top);
                    self.set_balance(parent, rebalanced.child);
                    return;
                },
                InsertStep::Rotate {
                    heavy,
                    shape: Shape::ZigZag,
                } => {
                    let pivot_balance = self.balance(node);
                    self.rotate_away(parent, heavy.opposite());
                    self.rotate_away(grandparent, heavy);
                    let rebalanced = fixup::double_rotation_balances(heavy, pivot_balance);
                    self.set_balance(grandparent, rebalanced.top);
                    self.set_balance(parent, rebalanced.child);
                    self.set_balance(node, Balance::EVEN);
                    return;
                },
            }
        }
    }

    /// Walks upward after the `shrunk` subtree of `node` lost a level.
    fn remove_fix(&mut self, mut node: Handle, mut shrunk: Side) {
        loop {
            let parent = self.tree.parent(node);
            let parent_shrunk = self.tree.side_of(node);

            match fixup::remove_step(self.balance(node), shrunk) {
                RemoveStep::Settle(balance) => {
                    self.set_balance(node, balance);
                    return;
                },
                RemoveStep::Propagate => self.set_balance(node, Balance::EVEN),
                RemoveStep::Rotate { heavy } => {
                    let child = self
                        .tree
                        .child(node, heavy)
                        .expect("Expected a child on the heavy side.");
                    let child_balance = self.balance(child);
                    let Rotation {
                        shape,
                        preserves_height,
                    } = fixup::removal_rotation(heavy, child_balance);

                    match shape {
                        Shape::ZigZig => {
                            self.rotate_away(node, heavy);
                            let rebalanced = fixup::single_rotation_balances(heavy, child_balance);
                            self.set_balance(node, rebalanced.top);
                            self.set_balance(child, rebalanced.child);
                        },
                        Shape::ZigZag => {
                            let pivot = self
                                .tree
                                .child(child, heavy.opposite())
                                .expect("Expected an inner child under a child leaning inward.");
                            let pivot_balance = self.balance(pivot);
                            self.rotate_away(child, heavy.opposite());
                            self.rotate_away(node, heavy);
                            let rebalanced = fixup::double_rotation_balances(heavy, pivot_balance);
                            self.set_balance(node, rebalanced.top);
                            self.set_balance(child, rebalanced.child);
                            self.set_balance(pivot, Balance::EVEN);
                        },
                    }

                    if preserves_height {
                        return;
                    }
                },
            }

            match (parent, parent_shrunk) {
                (Some(parent), Some(side)) => {
                    node = parent;
                    shrunk = side;
                },
                _ => return,
            }
        }
    }
}

impl<T, U> BalancedTree<T, U>
where
    T: Ord,
{
    /// Inserts a key-value pair, or overwrites the value of an existing key in place. Returns
    /// the previous value. If the node cannot be allocated the tree is left unchanged.
    pub fn try_insert(&mut self, key: T, value: U) -> Result<Option<U>> {
        let (parent, side) = match self.tree.search(&key) {
            Search::Found(handle) => {
                return Ok(Some(mem::replace(self.tree.value_mut(handle), value)));
            },
            Search::Vacant { parent, side } => (parent, side),
        };
        let node = self.tree.attach(parent, side, key, value, Balance::EVEN)?;

        if let Some(parent) = parent {
            if self.balance(parent) == Balance::EVEN {
                self.set_balance(parent, Balance::leaning(side));
                self.insert_fix(parent, node);
            } else {
                // A leaf's parent with one child: the new node fills the empty side.
                debug_assert_eq!(self.balance(parent), Balance::leaning(side.opposite()));
                self.set_balance(parent, Balance::EVEN);
            }
        }
        Ok(None)
    }

    pub fn get_mut<V>(&mut self, key: &V) -> Option<&mut U>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        self.tree.get_mut(key)
    }

    /// Removes a key and returns its entry. Removing an absent key changes nothing.
    pub fn remove<V>(&mut self, key: &V) -> Option<(T, U)>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let handle = self.tree.find(key)?;
        let node = self.tree.node(handle);
        if node.left.is_some() && node.right.is_some() {
            let predecessor = self
                .tree
                .predecessor(handle)
                .expect("Expected a predecessor for a node with a left child.");
            self.node_swap(handle, predecessor);
        }

        let Spliced {
            key,
            value,
            parent,
            side,
            ..
        } = self.tree.splice(handle);
        if let (Some(parent), Some(side)) = (parent, side) {
            self.remove_fix(parent, side);
        }
        Some((key, value))
    }

    /// Checks the order, link, and balance invariants of the whole tree, measuring every
    /// subtree height from scratch.
    ///
    /// # Panics
    ///
    /// Panics if any invariant does not hold.
    pub fn assert_invariants(&self) {
        let mut count = 0;
        if let Some(root) = self.tree.root() {
            assert_eq!(self.tree.parent(root), None, "root has a parent link");
            count = self.assert_invariants_at(root).1;
        }
        assert_eq!(count, self.tree.len(), "reachable node count differs from length");

        let mut prev: Option<&T> = None;
        for (key, _) in self.tree.iter() {
            if let Some(prev) = prev {
                assert!(prev < key, "keys out of order");
            }
            prev = Some(key);
        }
    }

    /// Returns the height and node count of the subtree rooted at `handle`.
    fn assert_invariants_at(&self, handle: Handle) -> (usize, usize) {
        let mut heights = [0, 0];
        let mut count = 1;
        for (index, &side) in [Side::Left, Side::Right].iter().enumerate() {
            if let Some(child) = self.tree.child(handle, side) {
                assert_eq!(self.tree.parent(child), Some(handle), "child does not link back");
                let (height, child_count) = self.assert_invariants_at(child);
                heights[index] = height;
                count += child_count;
            }
        }

        let measured = heights[1] as i64 - heights[0] as i64;
        let stored = self.balance(handle);
        assert!(stored.is_valid(), "balance factor {:?} out of range", stored);
        assert_eq!(
            i64::from(stored.value()),
            measured,
            "stored balance factor disagrees with subtree heights",
        );
        (heights[0].max(heights[1]) + 1, count)
    }
}

#[cfg(test)]
mod tests {
    use super::BalancedTree;
    use crate::avl_tree::node::Balance;
    use crate::bst::Side;
    use crate::error::Error;

    type Snapshot = Vec<(u32, i8, Option<u32>, Option<u32>, Option<u32>)>;

    fn tree_from(keys: &[u32]) -> BalancedTree<u32, u32> {
        let mut tree = BalancedTree::new(8);
        for &key in keys {
            tree.try_insert(key, key * 10).unwrap();
            tree.assert_invariants();
        }
        tree
    }

    fn key_at(tree: &BalancedTree<u32, u32>, key: u32, side: Side) -> Option<u32> {
        let base = tree.base();
        let handle = base.find(&key).unwrap();
        base.child(handle, side).map(|child| *base.key(child))
    }

    fn root_key(tree: &BalancedTree<u32, u32>) -> u32 {
        *tree.base().key(tree.base().root().unwrap())
    }

    fn balance_of(tree: &BalancedTree<u32, u32>, key: u32) -> i8 {
        tree.balance(tree.base().find(&key).unwrap()).value()
    }

    fn snapshot(tree: &BalancedTree<u32, u32>) -> Snapshot {
        let base = tree.base();
        base.handles()
            .map(|handle| {
                let key_of = |link: Option<_>| link.map(|h| *base.key(h));
                (
                    *base.key(handle),
                    tree.balance(handle).value(),
                    key_of(base.parent(handle)),
                    key_of(base.child(handle, Side::Left)),
                    key_of(base.child(handle, Side::Right)),
                )
            })
            .collect()
    }

    #[test]
    fn test_insert_root() {
        let tree = tree_from(&[1]);
        assert_eq!(root_key(&tree), 1);
        assert_eq!(balance_of(&tree, 1), 0);
    }

    #[test]
    fn test_insert_right_right() {
        let tree = tree_from(&[10, 20, 30]);
        assert_eq!(root_key(&tree), 20);
        assert_eq!(key_at(&tree, 20, Side::Left), Some(10));
        assert_eq!(key_at(&tree, 20, Side::Right), Some(30));
        for &key in &[10, 20, 30] {
            assert_eq!(balance_of(&tree, key), 0);
        }
        assert_eq!(tree.rotations(), 1);
    }

    #[test]
    fn test_insert_left_left() {
        let tree = tree_from(&[30, 20, 10]);
        assert_eq!(root_key(&tree), 20);
        assert_eq!(tree.rotations(), 1);
    }

    #[test]
    fn test_insert_left_right() {
        let tree = tree_from(&[30, 10, 20]);
        assert_eq!(root_key(&tree), 20);
        assert_eq!(key_at(&tree, 20, Side::Left), Some(10));
        assert_eq!(key_at(&tree, 20, Side::Right), Some(30));
        for &key in &[10, 20, 30] {
            assert_eq!(balance_of(&tree, key), 0);
        }
        assert_eq!(tree.rotations(), 2);
    }

    #[test]
    fn test_insert_right_left() {
        let tree = tree_from(&[10, 30, 20]);
        assert_eq!(root_key(&tree), 20);
        assert_eq!(tree.rotations(), 2);
    }

    #[test]
    fn test_insert_zig_zag_with_leaning_pivot() {
        // 50 leans left with 40 leaning right; inserting 47 under 45 makes 45 the pivot.
        let tree = tree_from(&[50, 40, 60, 30, 45, 47]);
        assert_eq!(root_key(&tree), 45);
        assert_eq!(key_at(&tree, 45, Side::Left), Some(40));
        assert_eq!(key_at(&tree, 45, Side::Right), Some(50));
        assert_eq!(balance_of(&tree, 40), -1);
        assert_eq!(balance_of(&tree, 50), 0);
        assert_eq!(balance_of(&tree, 45), 0);
    }

    #[test]
    fn test_insert_absorbed_by_leaning_parent() {
        let mut tree = tree_from(&[2, 1]);
        let before = tree.rotations();
        tree.try_insert(3, 30).unwrap();
        assert_eq!(balance_of(&tree, 2), 0);
        assert_eq!(tree.rotations(), before);
    }

    #[test]
    fn test_upsert_changes_nothing_structural() {
        let mut tree = tree_from(&[5, 3, 8, 1, 4, 7, 9, 2, 6]);
        let before = snapshot(&tree);
        let rotations = tree.rotations();

        assert_eq!(tree.try_insert(4, 99).unwrap(), Some(40));
        assert_eq!(snapshot(&tree), before);
        assert_eq!(tree.rotations(), rotations);
        assert_eq!(tree.base().get(&4), Some(&99));
    }

    #[test]
    fn test_failed_allocation_leaves_tree_unchanged() {
        // Eight keys fill the single chunk, so the next new key needs another one.
        let mut tree = tree_from(&[4, 2, 6, 1, 3, 5, 7, 8]);
        let before = snapshot(&tree);
        let rotations = tree.rotations();
        tree.tree.arena_mut().set_chunk_size(usize::MAX);

        assert!(matches!(
            tree.try_insert(9, 90),
            Err(Error::AllocationFailure(_)),
        ));
        assert_eq!(snapshot(&tree), before);
        assert_eq!(tree.rotations(), rotations);
        assert_eq!(tree.len(), 8);
        assert_eq!(tree.base().get(&9), None);
        tree.assert_invariants();

        assert_eq!(tree.try_insert(8, 81).unwrap(), Some(80));
        assert_eq!(tree.remove(&1), Some((1, 10)));
        assert_eq!(tree.try_insert(9, 90).unwrap(), None);
        tree.assert_invariants();
    }

    #[test]
    fn test_ascending_builds_perfect_tree() {
        let tree = tree_from(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(root_key(&tree), 4);
        assert_eq!(tree.height(), 3);
        for key in 1..=7 {
            assert_eq!(balance_of(&tree, key), 0);
        }
    }

    #[test]
    fn test_remove_with_propagation_and_rotation() {
        let mut tree = tree_from(&[1, 2, 3, 4, 5, 6, 7]);

        assert_eq!(tree.remove(&1), Some((1, 10)));
        tree.assert_invariants();
        assert_eq!(tree.remove(&2), Some((2, 20)));
        tree.assert_invariants();
        assert_eq!(tree.len(), 5);
        for key in 3..=7 {
            assert_eq!(tree.base().get(&key), Some(&(key * 10)));
        }

        // 4 now leans right over a level 6, so the next removal rotates without shrinking.
        let rotations = tree.rotations();
        assert_eq!(tree.remove(&3), Some((3, 30)));
        tree.assert_invariants();
        assert_eq!(tree.rotations(), rotations + 1);
        assert_eq!(root_key(&tree), 6);
        assert_eq!(balance_of(&tree, 6), -1);
        assert_eq!(balance_of(&tree, 4), 1);
    }

    #[test]
    fn test_remove_double_rotation() {
        let mut tree = tree_from(&[50, 30, 70, 20, 40, 80, 35]);
        let rotations = tree.rotations();
        tree.remove(&80);
        tree.assert_invariants();
        assert_eq!(tree.rotations(), rotations + 2);
        assert_eq!(root_key(&tree), 40);
    }

    #[test]
    fn test_remove_propagates_to_root() {
        // Removing 13 rotates the right subtree down a level, so the root 8 has to rotate too.
        let mut tree = tree_from(&[8, 4, 10, 2, 6, 9, 12, 1, 3, 5, 7, 11, 13, 0]);
        tree.remove(&9);
        tree.assert_invariants();
        let rotations = tree.rotations();
        tree.remove(&13);
        tree.remove(&11);
        tree.assert_invariants();
        assert!(tree.rotations() > rotations);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut tree = tree_from(&[5, 3, 8, 1, 4]);
        let before = snapshot(&tree);
        assert_eq!(tree.remove(&6), None);
        assert_eq!(snapshot(&tree), before);

        let mut empty: BalancedTree<u32, u32> = BalancedTree::new(8);
        assert_eq!(empty.remove(&1), None);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_remove_two_children_splices_predecessor() {
        let mut tree = tree_from(&[1, 2, 3, 4, 5, 6, 7]);
        let root = tree.base().root().unwrap();
        let predecessor = tree.base().find(&3).unwrap();

        assert_eq!(tree.remove(&4), Some((4, 40)));
        tree.assert_invariants();
        assert_eq!(tree.base().get(&4), None);
        assert_eq!(tree.base().root(), Some(predecessor));
        assert_ne!(tree.base().root(), Some(root));
        assert_eq!(key_at(&tree, 3, Side::Left), Some(2));
        assert_eq!(key_at(&tree, 3, Side::Right), Some(6));
        assert_eq!(balance_of(&tree, 2), -1);
    }

    #[test]
    fn test_remove_two_children_adjacent_predecessor() {
        let mut tree = tree_from(&[2, 1, 3]);
        tree.remove(&2);
        tree.assert_invariants();
        assert_eq!(root_key(&tree), 1);
        assert_eq!(key_at(&tree, 1, Side::Right), Some(3));
        assert_eq!(balance_of(&tree, 1), 1);
    }

    #[test]
    fn test_remove_root_leaf() {
        let mut tree = tree_from(&[1]);
        assert_eq!(tree.remove(&1), Some((1, 10)));
        assert!(tree.is_empty());
        assert_eq!(tree.base().root(), None);
        tree.try_insert(2, 20).unwrap();
        assert_eq!(root_key(&tree), 2);
    }

    #[test]
    fn test_node_swap_exchanges_balances() {
        let mut tree = tree_from(&[2, 1, 3, 4]);
        let two = tree.base().find(&2).unwrap();
        let four = tree.base().find(&4).unwrap();
        assert_eq!(tree.balance(two), Balance::leaning(Side::Right));
        tree.node_swap(two, four);
        assert_eq!(tree.balance(four), Balance::leaning(Side::Right));
        assert_eq!(tree.balance(two), Balance::EVEN);
        tree.node_swap(two, four);
        tree.assert_invariants();
    }

    #[test]
    fn test_rotations_relink_subtrees() {
        let mut tree = tree_from(&[4, 2, 6, 1, 3]);
        let root = tree.base().root().unwrap();
        tree.rotate_right(root);
        assert_eq!(root_key(&tree), 2);
        assert_eq!(key_at(&tree, 2, Side::Right), Some(4));
        assert_eq!(key_at(&tree, 4, Side::Left), Some(3));
        let three = tree.base().find(&3).unwrap();
        assert_eq!(tree.base().parent(three), Some(root));

        tree.rotate_left(tree.base().root().unwrap());
        assert_eq!(tree.base().root(), Some(root));
        assert_eq!(key_at(&tree, 4, Side::Left), Some(2));
        assert_eq!(key_at(&tree, 2, Side::Right), Some(3));
        tree.assert_invariants();

        // Nothing to promote.
        let one = tree.base().find(&1).unwrap();
        let before = snapshot(&tree);
        tree.rotate_left(one);
        assert_eq!(snapshot(&tree), before);
    }

    #[test]
    #[should_panic]
    fn test_assert_invariants_detects_bad_balance() {
        let mut tree = tree_from(&[2, 1, 3]);
        let root = tree.base().root().unwrap();
        tree.set_balance(root, Balance::leaning(Side::Left));
        tree.assert_invariants();
    }
}
