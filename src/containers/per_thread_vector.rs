//! `PerThreadVector<T>`
//!
//! One growable `Vec<T>` per hardware thread. Tasks push to their own thread's vector with no
//! cross-thread contention; once all writers are done, `compute_indices` runs a prefix sum over
//! the per-thread sizes so the combined sequence can be flattened back out in thread order, either
//! as one big buffer (`assign`) or bucketed per node (`host_flatten_append`).

use crate::containers::handle::{Deinit, Owned, Shared};
use crate::containers::host_local::HostLocalStorage;
use crate::place::{current_place, place_dims, thread_dims};

struct Inner<T> {
    slots: Vec<Vec<T>>,
    indices: Vec<usize>,
    indices_computed: bool,
    cores_per_node: usize,
    threads_per_core: usize,
}

impl<T> Deinit for Inner<T> {
    fn deinitialize(&mut self) {
        self.slots.clear();
        self.indices.clear();
        self.indices_computed = false;
    }
}

pub struct PerThreadVector<T> {
    handle: Shared<Inner<T>>,
}

impl<T> Clone for PerThreadVector<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

pub struct PerThreadVectorOwner<T> {
    owned: Owned<Inner<T>>,
}

fn local_vector_id(cores_per_node: usize, threads_per_core: usize) -> usize {
    let place = current_place();
    let dims = place_dims();
    let core_in_node = place.pod.id().unwrap_or(0) * dims.cores_per_pod + place.core.id().unwrap_or(0);
    let core_global = place.node * cores_per_node + core_in_node;
    let thread_local = rayon::current_thread_index().unwrap_or(0) % threads_per_core.max(1);
    core_global * threads_per_core.max(1) + thread_local
}

impl<T> PerThreadVector<T> {
    /// One vector per `(node, core, hardware thread)` triple in the current fabric.
    pub fn initialize() -> PerThreadVectorOwner<T> {
        let dims = place_dims();
        let threads_per_core = thread_dims().threads_per_core.max(1);
        let cores_per_node = dims.cores_per_node();
        let total = dims.total_cores() * threads_per_core;
        PerThreadVectorOwner {
            owned: Owned::new(Inner {
                slots: (0..total).map(|_| Vec::new()).collect(),
                indices: Vec::new(),
                indices_computed: false,
                cores_per_node,
                threads_per_core,
            }),
        }
    }

    pub fn size(&self) -> usize {
        self.handle.read().slots.len()
    }

    pub fn size_all(&self) -> usize {
        self.handle.read().slots.iter().map(Vec::len).sum()
    }

    pub fn clear(&self) {
        let mut inner = self.handle.write();
        inner.indices_computed = false;
        for slot in &mut inner.slots {
            slot.clear();
        }
    }

    /// Appends `value` to the calling hardware thread's own vector.
    pub fn push_back(&self, value: T) {
        let mut inner = self.handle.write();
        let id = local_vector_id(inner.cores_per_node, inner.threads_per_core);
        inner.slots[id].push(value);
        inner.indices_computed = false;
    }

    pub fn with<R>(&self, slot: usize, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.handle.read().slots[slot])
    }

    /// Prefix sum of per-slot sizes; `indices[i]` is the global index one past slot `i`'s last
    /// element. Must be recomputed after any further `push_back`.
    pub fn compute_indices(&self) {
        let mut inner = self.handle.write();
        if inner.indices_computed {
            return;
        }
        let mut running = 0usize;
        let indices = inner
            .slots
            .iter()
            .map(|slot| {
                running += slot.len();
                running
            })
            .collect();
        inner.indices = indices;
        inner.indices_computed = true;
    }

    fn slots_per_host(&self) -> usize {
        let inner = self.handle.read();
        inner.cores_per_node * inner.threads_per_core
    }

    /// Global index where `host`'s elements begin; `host == num_hosts` is a legal sentinel query.
    pub fn host_index_offset(&self, host: usize) -> usize {
        self.compute_indices();
        if host == 0 {
            return 0;
        }
        let inner = self.handle.read();
        inner.indices[host * inner.cores_per_node * inner.threads_per_core - 1]
    }

    pub fn elements_on_host(&self, host: usize) -> usize {
        self.host_index_offset(host + 1) - self.host_index_offset(host)
    }

    pub fn local_elements(&self) -> usize {
        self.elements_on_host(current_place().node)
    }

    /// Global index where hardware thread `slot`'s elements begin.
    pub fn index_on_thread(&self, slot: usize) -> usize {
        self.compute_indices();
        if slot == 0 {
            0
        } else {
            self.handle.read().indices[slot - 1]
        }
    }

    /// Flattens every thread's vector, in thread order, into a single `Vec<T>`.
    pub fn assign(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.compute_indices();
        let inner = self.handle.read();
        inner.slots.iter().flat_map(|slot| slot.iter().cloned()).collect()
    }

    /// Flattens each node's slice of threads into that node's bucket of `flat`, appending after
    /// whatever `flat` already held.
    pub fn host_flatten_append(&self, flat: &HostLocalStorage<Vec<T>>)
    where
        T: Clone,
    {
        self.compute_indices();
        let per_host = self.slots_per_host();
        let hosts = self.size() / per_host.max(1);
        let inner = self.handle.read();
        for host in 0..hosts {
            let start = host * per_host;
            let end = start + per_host;
            let mut appended: Vec<T> = inner.slots[start..end].iter().flat_map(|s| s.iter().cloned()).collect();
            flat.with_mut(host, |bucket| bucket.append(&mut appended));
        }
    }
}

impl<T> PerThreadVectorOwner<T> {
    pub fn handle(&self) -> PerThreadVector<T> {
        PerThreadVector {
            handle: self.owned.handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::{self, Place, PlaceDims, ThreadDims};

    #[test]
    fn push_and_flatten_preserve_all_elements() {
        place::init(
            PlaceDims {
                nodes: 1,
                pods_per_node: 1,
                cores_per_pod: 4,
            },
            ThreadDims { threads_per_core: 1 },
        );
        let owner: PerThreadVectorOwner<u32> = PerThreadVector::initialize();
        let handle = owner.handle();
        for core in 0..4 {
            let h = handle.clone();
            place::execute_on_wait(Place::new(0, crate::place::Coord::Id(0), crate::place::Coord::Id(core)), move || {
                h.push_back(core as u32);
                h.push_back(core as u32 * 100);
            })
            .unwrap();
        }
        assert_eq!(handle.size_all(), 8);
        let mut flat = handle.assign();
        flat.sort_unstable();
        assert_eq!(flat, vec![0, 0, 1, 2, 3, 100, 200, 300]);
    }
}
