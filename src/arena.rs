//! A pooled arena for small, immutable byte strings.
//!
//! Domain names and labels are short, at most 256 and 64 bytes and often
//! only a handful of bytes in practice. An [`Arena`] hands out space for
//! them from a sequence of
//! fixed size pools by simply bumping an offset. When a request doesn’t
//! fit into what is left of the current pool, a fresh pool is started and
//! the tail of the old one stays unused.
//!
//! Allocations are identified by a [`Region`], a small copyable handle
//! that is resolved against the arena that owns it. Once all strings for a
//! unit of data have been stored, the arena is [closed][Arena::close] into
//! a [`ClosedArena`] which can no longer grow and can be shared freely
//! between threads.
//!
//! Several arenas can be combined into one via [`Arena::merge`]. The pools
//! of the source arena are moved, not copied, and the source is consumed.
//! Regions handed out by the source are translated with the [`Rebase`]
//! returned by the merge.

use core::fmt;

use crate::utils::config::DefMinMax;

//------------ Configuration Constants ---------------------------------------

/// The largest object that can be allocated from an arena.
pub const MAX_OBJECT_SIZE: usize = 256;

/// The size of a single pool.
///
/// The default is 1024 bytes. A pool must at least be able to hold the
/// largest object.
pub const POOL_SIZE: DefMinMax<usize> =
    DefMinMax::new(1024, MAX_OBJECT_SIZE, 1 << 16);

/// The number of pools initially reserved in the pool table.
///
/// The table doubles whenever it runs out of space.
const INITIAL_POOLS: usize = 4;

//------------ Region --------------------------------------------------------

/// A handle to bytes allocated from an arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Region {
    /// The index of the pool.
    pool: u32,

    /// The start of the region within the pool.
    start: u32,

    /// The length of the region.
    len: u16,
}

impl Region {
    /// Returns the length of the region in bytes.
    pub fn len(self) -> usize {
        self.len.into()
    }

    /// Returns whether the region is empty.
    ///
    /// This is never the case for regions allocated from an arena.
    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    fn range(self) -> core::ops::Range<usize> {
        let start = self.start as usize;
        start..start + self.len()
    }
}

//------------ Rebase --------------------------------------------------------

/// Translates regions of a merged arena into regions of the target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rebase {
    offset: u32,
}

impl Rebase {
    /// Returns the region in the target for a region of the source.
    pub fn apply(self, region: Region) -> Region {
        Region {
            pool: region.pool + self.offset,
            ..region
        }
    }
}

//------------ Arena ---------------------------------------------------------

/// An arena that is still being filled.
pub struct Arena {
    /// All pools owned by the arena.
    pools: Vec<Box<[u8]>>,

    /// The index of the pool new allocations come from.
    current: usize,

    /// The offset of the next allocation in the current pool.
    offset: usize,

    /// The size of each pool.
    pool_size: usize,
}

impl Arena {
    /// Creates a new arena with the default pool size.
    pub fn new() -> Self {
        Self::with_pool_size(POOL_SIZE.default())
    }

    /// Creates a new arena with the given pool size.
    ///
    /// The size is limited to the range allowed by [`POOL_SIZE`].
    pub fn with_pool_size(pool_size: usize) -> Self {
        let pool_size = POOL_SIZE.limit(pool_size);
        let mut pools = Vec::with_capacity(INITIAL_POOLS);
        pools.push(new_pool(pool_size));
        Arena {
            pools,
            current: 0,
            offset: 0,
            pool_size,
        }
    }

    /// Returns the size of each pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of pools owned by the arena.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Allocates `size` zeroed bytes.
    ///
    /// # Panics
    ///
    /// The method panics if `size` is zero or larger than
    /// [`MAX_OBJECT_SIZE`].
    pub fn alloc(&mut self, size: usize) -> Region {
        assert!(
            size > 0 && size <= MAX_OBJECT_SIZE,
            "arena allocation of {size} bytes out of range"
        );

        if self.offset + size > self.pool_size {
            if self.pools.len() == self.pools.capacity() {
                self.pools.reserve_exact(self.pools.capacity());
            }
            self.pools.push(new_pool(self.pool_size));
            self.current = self.pools.len() - 1;
            self.offset = 0;
        }

        let res = Region {
            pool: self.current as u32,
            start: self.offset as u32,
            len: size as u16,
        };
        self.offset += size;
        res
    }

    /// Allocates a copy of `data`.
    ///
    /// # Panics
    ///
    /// The method panics if `data` is empty or longer than
    /// [`MAX_OBJECT_SIZE`].
    pub fn alloc_copy(&mut self, data: &[u8]) -> Region {
        let res = self.alloc(data.len());
        self.get_mut(res).copy_from_slice(data);
        res
    }

    /// Returns the bytes of a region.
    ///
    /// # Panics
    ///
    /// The method panics if the region wasn’t allocated from this arena.
    pub fn get(&self, region: Region) -> &[u8] {
        &self.pools[region.pool as usize][region.range()]
    }

    /// Returns the bytes of a region for writing.
    ///
    /// # Panics
    ///
    /// The method panics if the region wasn’t allocated from this arena.
    pub fn get_mut(&mut self, region: Region) -> &mut [u8] {
        &mut self.pools[region.pool as usize][region.range()]
    }

    /// Moves all pools of `source` into this arena.
    ///
    /// New allocations continue to use the current pool of `self`.
    pub fn merge(&mut self, source: Arena) -> Rebase {
        self.absorb(source.pools)
    }

    /// Moves all pools of a closed arena into this arena.
    pub fn merge_closed(&mut self, source: ClosedArena) -> Rebase {
        self.absorb(source.pools.into_vec())
    }

    fn absorb(&mut self, pools: Vec<Box<[u8]>>) -> Rebase {
        let offset = self.pools.len() as u32;
        let needed = self.pools.len() + pools.len();
        if needed > self.pools.capacity() {
            let mut capacity = self.pools.capacity().max(INITIAL_POOLS);
            while capacity < needed {
                capacity <<= 1;
            }
            self.pools.reserve_exact(capacity - self.pools.len());
        }
        self.pools.extend(pools);
        Rebase { offset }
    }

    /// Finishes the arena.
    ///
    /// The pool table is trimmed to the pools actually in use.
    pub fn close(self) -> ClosedArena {
        ClosedArena {
            pools: self.pools.into_boxed_slice(),
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("pools", &self.pools.len())
            .field("current", &self.current)
            .field("offset", &self.offset)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

//------------ ClosedArena ---------------------------------------------------

/// An arena that can no longer grow.
pub struct ClosedArena {
    pools: Box<[Box<[u8]>]>,
}

impl ClosedArena {
    /// Returns the number of pools owned by the arena.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Returns the bytes of a region.
    ///
    /// # Panics
    ///
    /// The method panics if the region wasn’t allocated from this arena.
    pub fn get(&self, region: Region) -> &[u8] {
        &self.pools[region.pool as usize][region.range()]
    }
}

impl fmt::Debug for ClosedArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosedArena")
            .field("pools", &self.pools.len())
            .finish()
    }
}

//------------ Helpers -------------------------------------------------------

fn new_pool(size: usize) -> Box<[u8]> {
    vec![0u8; size].into_boxed_slice()
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn alloc_spills_into_new_pools() {
        let mut arena = Arena::new();
        let sizes = [200, 256, 1, 64, 255, 100, 256, 13, 77, 256];
        let regions: Vec<_> =
            sizes.iter().map(|size| arena.alloc(*size)).collect();
        assert!(sizes.iter().sum::<usize>() > arena.pool_size());
        assert!(arena.pool_count() > 1);

        for (region, size) in regions.iter().zip(sizes) {
            assert_eq!(region.len(), size);
            assert!(arena.get(*region).iter().all(|b| *b == 0));
        }
        for (i, region) in regions.iter().enumerate() {
            arena.get_mut(*region).fill(i as u8 + 1);
        }
        for (i, region) in regions.iter().enumerate() {
            assert!(arena.get(*region).iter().all(|b| *b == i as u8 + 1));
        }
    }

    #[test]
    fn small_pools_are_limited() {
        let arena = Arena::with_pool_size(10);
        assert_eq!(arena.pool_size(), MAX_OBJECT_SIZE);
    }

    #[test]
    fn pool_table_grows() {
        let mut arena = Arena::new();
        for _ in 0..40 {
            arena.alloc(MAX_OBJECT_SIZE);
        }
        assert_eq!(arena.pool_count(), 10);
        let closed = arena.close();
        assert_eq!(closed.pool_count(), 10);
    }

    #[test]
    #[should_panic]
    fn alloc_zero() {
        Arena::new().alloc(0);
    }

    #[test]
    #[should_panic]
    fn alloc_too_large() {
        Arena::new().alloc(MAX_OBJECT_SIZE + 1);
    }

    #[test]
    fn merge_keeps_both_sides() {
        let mut target = Arena::new();
        let mut source = Arena::new();
        let t1 = target.alloc_copy(b"example");
        let s1 = source.alloc_copy(b"com");
        for _ in 0..6 {
            source.alloc(MAX_OBJECT_SIZE);
        }
        let s2 = source.alloc_copy(b"net");
        let target_pools = target.pool_count();
        let source_pools = source.pool_count();

        let rebase = target.merge(source);
        assert_eq!(target.pool_count(), target_pools + source_pools);
        assert_eq!(target.get(t1), b"example");
        assert_eq!(target.get(rebase.apply(s1)), b"com");
        assert_eq!(target.get(rebase.apply(s2)), b"net");

        // Writes through either side stay where they belong.
        target.get_mut(rebase.apply(s1)).copy_from_slice(b"org");
        target.get_mut(t1).copy_from_slice(b"EXAMPLE");
        assert_eq!(target.get(rebase.apply(s1)), b"org");
        assert_eq!(target.get(t1), b"EXAMPLE");

        // New allocations keep filling the target’s own pool.
        let t2 = target.alloc_copy(b"test");
        assert_eq!(target.pool_count(), target_pools + source_pools);
        assert_eq!(target.get(t2), b"test");
        assert_eq!(target.get(rebase.apply(s2)), b"net");
    }

    #[test]
    fn merge_closed_then_close() {
        let mut parts = Arena::new();
        let part = parts.alloc_copy(b"label");
        let closed = parts.close();

        let mut whole = Arena::new();
        let own = whole.alloc_copy(b"zone");
        let rebase = whole.merge_closed(closed);
        let whole = whole.close();
        assert_eq!(whole.pool_count(), 2);
        assert_eq!(whole.get(own), b"zone");
        assert_eq!(whole.get(rebase.apply(part)), b"label");
    }

    #[test]
    fn closed_arena_is_shared() {
        let mut arena = Arena::new();
        let regions: Vec<_> = (0u8..50)
            .map(|i| arena.alloc_copy(&[i; 40]))
            .collect();
        let arena = Arc::new(arena.close());
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let arena = arena.clone();
                let regions = &regions;
                scope.spawn(move || {
                    for (i, region) in regions.iter().enumerate() {
                        assert_eq!(arena.get(*region), &[i as u8; 40]);
                    }
                });
            }
        });
    }
}
