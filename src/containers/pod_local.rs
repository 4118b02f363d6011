//! `PodLocalStorage<T>`
//!
//! One `T` per pod, analogous to [`super::host_local::HostLocalStorage`] but keyed by the global
//! pod index `node * pods_per_node + pod`.

use crate::containers::handle::{Deinit, Owned, Shared};
use crate::place::{current_place, place_dims};

struct Inner<T> {
    pods_per_node: usize,
    values: Vec<T>,
}

impl<T> Deinit for Inner<T> {
    fn deinitialize(&mut self) {
        self.values.clear();
    }
}

pub struct PodLocalStorage<T> {
    handle: Shared<Inner<T>>,
}

impl<T> Clone for PodLocalStorage<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

pub struct PodLocalStorageOwner<T> {
    owned: Owned<Inner<T>>,
}

fn global_pod_index(pods_per_node: usize, node: usize, pod: usize) -> usize {
    node * pods_per_node + pod
}

impl<T> PodLocalStorage<T> {
    pub fn len(&self) -> usize {
        self.handle.read().values.len()
    }

    pub fn with<R>(&self, node: usize, pod: usize, f: impl FnOnce(&T) -> R) -> R {
        let inner = self.handle.read();
        let idx = global_pod_index(inner.pods_per_node, node, pod);
        f(&inner.values[idx])
    }

    pub fn with_mut<R>(&self, node: usize, pod: usize, f: impl FnOnce(&mut T) -> R) -> R {
        let mut inner = self.handle.write();
        let idx = global_pod_index(inner.pods_per_node, node, pod);
        f(&mut inner.values[idx])
    }

    pub fn with_local<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let place = current_place();
        self.with(place.node, place.pod.id().unwrap_or(0), f)
    }

    pub fn with_local_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let place = current_place();
        self.with_mut(place.node, place.pod.id().unwrap_or(0), f)
    }
}

impl<T> PodLocalStorage<T> {
    pub fn initialize_with(mut f: impl FnMut(usize, usize) -> T) -> PodLocalStorageOwner<T> {
        let dims = place_dims();
        let values = (0..dims.nodes)
            .flat_map(|node| (0..dims.pods_per_node).map(move |pod| (node, pod)))
            .map(|(node, pod)| f(node, pod))
            .collect();
        PodLocalStorageOwner {
            owned: Owned::new(Inner {
                pods_per_node: dims.pods_per_node,
                values,
            }),
        }
    }
}

impl<T: Default> PodLocalStorage<T> {
    pub fn initialize() -> PodLocalStorageOwner<T> {
        Self::initialize_with(|_, _| T::default())
    }
}

impl<T> PodLocalStorageOwner<T> {
    pub fn handle(&self) -> PodLocalStorage<T> {
        PodLocalStorage {
            handle: self.owned.handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::{self, PlaceDims, ThreadDims};

    #[test]
    fn one_slot_per_pod() {
        place::init(
            PlaceDims {
                nodes: 2,
                pods_per_node: 3,
                cores_per_pod: 1,
            },
            ThreadDims { threads_per_core: 1 },
        );
        let owner: PodLocalStorageOwner<usize> = PodLocalStorage::initialize_with(|n, p| n * 10 + p);
        let handle = owner.handle();
        assert_eq!(handle.len(), 6);
        assert_eq!(handle.with(1, 2, |v| *v), 12);
    }
}
