//! `HostCachedArray<T>`
//!
//! Built from one bucket of data per node (mirroring how each node just finished building its own
//! piece of something, e.g. a CSR's edge list); every node then holds a full, read-only replica of
//! every other node's bucket, so `get(i)` never has to cross the fabric. This is the "cache once,
//! read everywhere" counterpart to [`super::dist_array::DistArray`], which instead keeps each
//! element resident on exactly one node and crosses the fabric on every access to a foreign bucket.

use crate::containers::handle::{Deinit, Owned, Shared};

struct Inner<T> {
    bucket_starts: Vec<usize>,
    buckets: Vec<Vec<T>>,
    len: usize,
}

impl<T> Deinit for Inner<T> {
    fn deinitialize(&mut self) {
        self.buckets.clear();
        self.bucket_starts.clear();
        self.len = 0;
    }
}

#[derive(Clone)]
pub struct HostCachedArray<T> {
    handle: Shared<Inner<T>>,
}

pub struct HostCachedArrayOwner<T> {
    owned: Owned<Inner<T>>,
}

impl<T: Clone> HostCachedArray<T> {
    /// Replicates `buckets` (one per node, in node order) into a single cached copy.
    pub fn initialize(buckets: Vec<Vec<T>>) -> HostCachedArrayOwner<T> {
        let mut bucket_starts = Vec::with_capacity(buckets.len() + 1);
        let mut start = 0usize;
        for bucket in &buckets {
            bucket_starts.push(start);
            start += bucket.len();
        }
        bucket_starts.push(start);
        HostCachedArrayOwner {
            owned: Owned::new(Inner {
                bucket_starts,
                buckets,
                len: start,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.handle.read().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> T {
        let inner = self.handle.read();
        let bucket = match inner.bucket_starts.binary_search(&i) {
            Ok(exact) => exact,
            Err(insertion) => insertion - 1,
        };
        inner.buckets[bucket][i - inner.bucket_starts[bucket]].clone()
    }

    /// The bucket a given global index lives in, i.e. the node that originally produced it.
    pub fn host_of(&self, i: usize) -> usize {
        let inner = self.handle.read();
        match inner.bucket_starts.binary_search(&i) {
            Ok(exact) => exact,
            Err(insertion) => insertion - 1,
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        let inner = self.handle.read();
        inner.buckets.iter().flat_map(|b| b.iter().cloned()).collect()
    }
}

impl<T> HostCachedArrayOwner<T> {
    pub fn handle(&self) -> HostCachedArray<T> {
        HostCachedArray {
            handle: self.owned.handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_any_bucket_without_crossing_the_fabric() {
        let owner = HostCachedArray::initialize(vec![vec![1, 2, 3], vec![4, 5], vec![6]]);
        let cached = owner.handle();
        assert_eq!(cached.len(), 6);
        assert_eq!(cached.get(0), 1);
        assert_eq!(cached.get(3), 4);
        assert_eq!(cached.get(5), 6);
        assert_eq!(cached.host_of(4), 1);
        assert_eq!(cached.to_vec(), vec![1, 2, 3, 4, 5, 6]);
    }
}
