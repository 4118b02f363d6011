//! Locality-scoped arenas
//!
//! A slab allocator carving a fixed-size byte region into 128-byte granules. Three heap classes
//! sit on top: [`Tier::L1Scratchpad`] (per-core), [`Tier::L2Scratchpad`] (per-pod), and
//! [`Tier::Main`] (per-node DRAM). Distributed containers reserve capacity from a `Slab`
//! before storing typed values in their own backing `Vec`; the byte-accounting here is what
//! turns "the arena is exhausted" into an observable `Status::BadAlloc` rather than an
//! unconditional heap growth, matching a fixed-capacity scratchpad model.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Result, Status};

pub const GRANULE_BYTES: usize = 128;
pub const NODE_ARENA_BYTES: usize = 1 << 25;
pub const POD_ARENA_BYTES: usize = 1 << 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tier {
    L1Scratchpad,
    L2Scratchpad,
    Main,
}

/// A bump allocator over a fixed-size byte region, serving granule-rounded requests.
pub struct Slab {
    tier: Tier,
    capacity_bytes: usize,
    used_bytes: AtomicUsize,
}

impl Slab {
    pub fn new(tier: Tier, capacity_bytes: usize) -> Self {
        Self {
            tier,
            capacity_bytes,
            used_bytes: AtomicUsize::new(0),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes.load(Ordering::SeqCst)
    }

    fn round_up_to_granule(bytes: usize) -> usize {
        ((bytes + GRANULE_BYTES - 1) / GRANULE_BYTES) * GRANULE_BYTES
    }

    /// Reserves `bytes`, rounded up to a granule multiple, returning the offset at which the
    /// reservation begins. Fails with `BadAlloc` when the slab is exhausted.
    pub fn allocate_bytes(&self, bytes: usize) -> Result<usize> {
        let granuled = Self::round_up_to_granule(bytes.max(1));
        loop {
            let used = self.used_bytes.load(Ordering::SeqCst);
            let next = used + granuled;
            if next > self.capacity_bytes {
                return Err(Status::BadAlloc);
            }
            if self
                .used_bytes
                .compare_exchange(used, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(used);
            }
        }
    }

    pub fn allocate_for<T>(&self, count: usize) -> Result<usize> {
        self.allocate_bytes(count * std::mem::size_of::<T>())
    }

    pub fn deallocate_all(&self) {
        self.used_bytes.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_round_up_to_granule_and_bump() {
        let slab = Slab::new(Tier::Main, 1024);
        let first = slab.allocate_bytes(10).unwrap();
        assert_eq!(first, 0);
        assert_eq!(slab.used_bytes(), GRANULE_BYTES);
        let second = slab.allocate_bytes(200).unwrap();
        assert_eq!(second, GRANULE_BYTES);
    }

    #[test]
    fn exhausted_slab_returns_bad_alloc() {
        let slab = Slab::new(Tier::L2Scratchpad, GRANULE_BYTES);
        slab.allocate_bytes(1).unwrap();
        assert_eq!(slab.allocate_bytes(1), Err(Status::BadAlloc));
    }

    #[test]
    fn deallocate_all_resets_bump_pointer() {
        let slab = Slab::new(Tier::Main, GRANULE_BYTES);
        slab.allocate_bytes(1).unwrap();
        slab.deallocate_all();
        assert_eq!(slab.used_bytes(), 0);
        assert!(slab.allocate_bytes(1).is_ok());
    }
}
