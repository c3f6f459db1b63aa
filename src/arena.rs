//! Chunked node storage addressed by stable handles.

use crate::error::Result;
use log::debug;
use std::mem;
use std::ops::{Index, IndexMut};
use std::vec::Vec;

/// A stable reference to an object stored in a `TypedArena<T>`.
///
/// A handle stays valid until the object it refers to is freed. After that, the slot may be
/// reused by a later allocation, so a stale handle can alias a newer object.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Handle {
    chunk_index: usize,
    block_index: usize,
}

impl Handle {
    /// Returns the position of the handle in storage order for an arena with `chunk_size`
    /// objects per chunk. Positions are below the arena's `capacity()`.
    pub fn slot(&self, chunk_size: usize) -> usize {
        self.chunk_index * chunk_size + self.block_index
    }
}

enum Block<T> {
    Occupied(T),
    Vacant(Option<Handle>),
}

/// A fast, but limited allocator that only allocates a single type of object.
///
/// Objects live in fixed-size chunks, so growing the arena never moves an existing object and
/// never invalidates a handle. Freed slots are threaded onto a free list and reused before a new
/// chunk is requested. All objects are dropped when the arena is dropped or cleared.
///
/// # Examples
///
/// ```
/// use avl_bst::arena::TypedArena;
///
/// let mut arena = TypedArena::new(1024);
///
/// let x = arena.allocate(1);
/// assert_eq!(arena[x], 1);
///
/// arena[x] += 1;
/// assert_eq!(arena[x], 2);
///
/// assert_eq!(arena.free(&x), 2);
/// assert!(arena.is_empty());
/// ```
pub struct TypedArena<T> {
    head: Option<Handle>,
    chunks: Vec<Vec<Block<T>>>,
    chunk_size: usize,
    len: usize,
    capacity: usize,
}

impl<T> TypedArena<T> {
    fn is_valid_handle(&self, handle: &Handle) -> bool {
        handle.chunk_index < self.chunks.len()
            && handle.block_index < self.chunks[handle.chunk_index].len()
    }

    /// Constructs a new, empty `TypedArena<T>` that stores `chunk_size` objects per chunk.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_bst::arena::TypedArena;
    ///
    /// let arena: TypedArena<u32> = TypedArena::new(1024);
    /// assert_eq!(arena.chunk_size(), 1024);
    /// ```
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "Error: chunk size must be positive.");
        TypedArena {
            head: None,
            chunks: Vec::new(),
            chunk_size,
            len: 0,
            capacity: 0,
        }
    }

    /// Reserves room for one more object without storing anything. On failure nothing about the
    /// arena changes.
    fn try_reserve_one(&mut self) -> Result<()> {
        if self.len < self.capacity {
            return Ok(());
        }
        let mut chunk = Vec::new();
        chunk.try_reserve_exact(self.chunk_size)?;
        self.chunks.try_reserve(1)?;
        self.chunks.push(chunk);
        self.capacity += self.chunk_size;
        debug!(
            "arena grew to {} chunks ({} slots)",
            self.chunks.len(),
            self.capacity,
        );
        Ok(())
    }

    /// Allocates an object in the arena and returns its handle, or an error if the backing
    /// memory could not be reserved. A failed allocation leaves the arena untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_bst::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new(16);
    /// let x = arena.try_allocate(7).unwrap();
    /// assert_eq!(arena.get(&x), Some(&7));
    /// ```
    pub fn try_allocate(&mut self, value: T) -> Result<Handle> {
        self.try_reserve_one()?;
        self.len += 1;

        match self.head.take() {
            None => {
                let chunk_count = self.chunks.len();
                let last_chunk = &mut self.chunks[chunk_count - 1];
                last_chunk.push(Block::Occupied(value));
                Ok(Handle {
                    chunk_index: chunk_count - 1,
                    block_index: last_chunk.len() - 1,
                })
            },
            Some(handle) => {
                let vacant_block = mem::replace(
                    &mut self.chunks[handle.chunk_index][handle.block_index],
                    Block::Occupied(value),
                );
                match vacant_block {
                    Block::Vacant(next_handle) => {
                        self.head = next_handle;
                        Ok(handle)
                    },
                    Block::Occupied(_) => panic!("Error: free list points at an occupied block."),
                }
            },
        }
    }

    /// Allocates an object in the arena and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the backing memory could not be reserved.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_bst::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new(1024);
    /// let x = arena.allocate(0);
    /// assert_eq!(arena.len(), 1);
    /// ```
    pub fn allocate(&mut self, value: T) -> Handle {
        match self.try_allocate(value) {
            Ok(handle) => handle,
            Err(error) => panic!("Error: {}", error),
        }
    }

    /// Deallocates an object in the arena and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the handle corresponds to an invalid or vacant slot.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_bst::arena::TypedArena;
    ///
    /// let mut arena = TypedArena::new(1024);
    /// let x = arena.allocate(0);
    /// assert_eq!(arena.free(&x), 0);
    /// ```
    pub fn free(&mut self, handle: &Handle) -> T {
        if !self.is_valid_handle(handle) {
            panic!("Error: attempting to free invalid block.");
        }
        let old_block = mem::replace(
            &mut self.chunks[handle.chunk_index][handle.block_index],
            Block::Vacant(self.head),
        );
        match old_block {
            Block::Vacant(next_handle) => {
                self.chunks[handle.chunk_index][handle.block_index] = Block::Vacant(next_handle);
                panic!("Error: attempting to free vacant block.");
            },
            Block::Occupied(value) => {
                self.len -= 1;
                self.head = Some(*handle);
                value
            },
        }
    }

    /// Returns an immutable reference to an object in the arena, or `None` if the handle does
    /// not correspond to a live object.
    pub fn get(&self, handle: &Handle) -> Option<&T> {
        if !self.is_valid_handle(handle) {
            return None;
        }
        match self.chunks[handle.chunk_index][handle.block_index] {
            Block::Occupied(ref value) => Some(value),
            Block::Vacant(_) => None,
        }
    }

    /// Returns a mutable reference to an object in the arena, or `None` if the handle does not
    /// correspond to a live object.
    pub fn get_mut(&mut self, handle: &Handle) -> Option<&mut T> {
        if !self.is_valid_handle(handle) {
            return None;
        }
        match self.chunks[handle.chunk_index][handle.block_index] {
            Block::Occupied(ref mut value) => Some(value),
            Block::Vacant(_) => None,
        }
    }

    /// Returns an iterator over every live object and its handle, in storage order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.chunks
            .iter_mut()
            .enumerate()
            .flat_map(|(chunk_index, chunk)| {
                chunk
                    .iter_mut()
                    .enumerate()
                    .filter_map(move |(block_index, block)| match block {
                        Block::Occupied(value) => Some((
                            Handle {
                                chunk_index,
                                block_index,
                            },
                            value,
                        )),
                        Block::Vacant(_) => None,
                    })
            })
    }

    /// Drops every object and releases every chunk.
    pub fn clear(&mut self) {
        self.head = None;
        self.chunks.clear();
        self.len = 0;
        self.capacity = 0;
    }

    /// Returns the number of live objects.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the arena holds no live objects.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of objects stored per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Changes the size of chunks requested from now on. Handle slots are only meaningful while
    /// every chunk has the same size.
    #[cfg(test)]
    pub(crate) fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size;
    }

    /// Returns the number of slots the arena can hold without requesting another chunk.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Index<Handle> for TypedArena<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &Self::Output {
        self.get(&handle).expect("Error: handle out of bounds.")
    }
}

impl<T> IndexMut<Handle> for TypedArena<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut Self::Output {
        self.get_mut(&handle).expect("Error: handle out of bounds.")
    }
}

#[cfg(test)]
mod tests {
    use super::Handle;
    use super::TypedArena;

    #[test]
    #[should_panic]
    fn test_zero_chunk_size() {
        let _arena: TypedArena<u32> = TypedArena::new(0);
    }

    #[test]
    #[should_panic]
    fn test_free_invalid_block() {
        let mut arena: TypedArena<u32> = TypedArena::new(1024);
        arena.free(&Handle {
            chunk_index: 0,
            block_index: 0,
        });
    }

    #[test]
    #[should_panic]
    fn test_free_vacant_block() {
        let mut arena = TypedArena::new(1024);
        let x = arena.allocate(0);
        arena.free(&x);
        arena.free(&x);
    }

    #[test]
    fn test_allocate_multiple_chunks() {
        let mut arena = TypedArena::new(2);
        assert_eq!(
            arena.allocate(0),
            Handle {
                chunk_index: 0,
                block_index: 0,
            },
        );
        assert_eq!(
            arena.allocate(0),
            Handle {
                chunk_index: 0,
                block_index: 1,
            },
        );
        assert_eq!(
            arena.allocate(0),
            Handle {
                chunk_index: 1,
                block_index: 0,
            },
        );
        assert_eq!(arena.capacity(), 4);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_free_reuses_slot() {
        let mut arena = TypedArena::new(1024);
        let x = arena.allocate(0);
        let y = arena.allocate(1);
        assert_eq!(arena.free(&x), 0);
        assert_eq!(arena.get(&x), None);
        assert_eq!(arena.allocate(2), x);
        assert_eq!(arena[x], 2);
        assert_eq!(arena[y], 1);
        assert_eq!(arena.capacity(), 1024);
    }

    #[test]
    fn test_get_invalid_block() {
        let arena: TypedArena<u32> = TypedArena::new(1024);
        assert_eq!(
            arena.get(&Handle {
                chunk_index: 0,
                block_index: 0,
            }),
            None,
        );
    }

    #[test]
    fn test_iter_mut_skips_vacant() {
        let mut arena = TypedArena::new(2);
        let x = arena.allocate(1);
        let y = arena.allocate(2);
        let z = arena.allocate(3);
        arena.free(&y);
        for (_, value) in arena.iter_mut() {
            *value *= 10;
        }
        let handles: Vec<Handle> = arena.iter_mut().map(|(handle, _)| handle).collect();
        assert_eq!(handles, vec![x, z]);
        assert_eq!(arena[x], 10);
        assert_eq!(arena[z], 30);
    }

    #[test]
    fn test_try_allocate_failure_leaves_arena_untouched() {
        let mut arena = TypedArena::new(2);
        let x = arena.allocate(1);
        let y = arena.allocate(2);
        arena.set_chunk_size(usize::MAX);
        assert!(arena.try_allocate(3).is_err());
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.capacity(), 2);
        assert_eq!(arena[x], 1);
        assert_eq!(arena[y], 2);

        arena.free(&x);
        assert_eq!(arena.try_allocate(4).unwrap(), x);
    }

    #[test]
    fn test_slots_are_dense() {
        let mut arena = TypedArena::new(3);
        let slots: Vec<usize> = (0..7)
            .map(|value| arena.allocate(value).slot(arena.chunk_size()))
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5, 6]);
        assert!(slots.iter().all(|&slot| slot < arena.capacity()));
    }

    #[test]
    fn test_clear() {
        let mut arena = TypedArena::new(2);
        arena.allocate(1);
        arena.allocate(2);
        arena.allocate(3);
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.capacity(), 0);
        assert_eq!(
            arena.allocate(4),
            Handle {
                chunk_index: 0,
                block_index: 0,
            },
        );
    }
}
