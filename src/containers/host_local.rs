//! `HostLocalStorage<T>`
//!
//! Exactly one `T` per node, all conceptually at the per-node arena base. `local()` returns the
//! current node's copy; `get(n)` returns node `n`'s. This is the backbone the graph layer
//! builds on: one `LocalCsr` per node, one bit set per node, and so on.

use crate::containers::handle::{Deinit, Owned, Shared};
use crate::place::current_place;

struct Inner<T> {
    values: Vec<T>,
}

impl<T> Deinit for Inner<T> {
    fn deinitialize(&mut self) {
        self.values.clear();
    }
}

pub struct HostLocalStorage<T> {
    handle: Shared<Inner<T>>,
}

impl<T> Clone for HostLocalStorage<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

pub struct HostLocalStorageOwner<T> {
    owned: Owned<Inner<T>>,
}

impl<T> HostLocalStorage<T> {
    pub fn len(&self) -> usize {
        self.handle.read().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn with<R>(&self, node: usize, f: impl FnOnce(&T) -> R) -> R {
        f(&self.handle.read().values[node])
    }

    pub fn with_mut<R>(&self, node: usize, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.handle.write().values[node])
    }

    pub fn with_local<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.with(current_place().node, f)
    }

    pub fn with_local_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.with_mut(current_place().node, f)
    }
}

impl<T: Clone> HostLocalStorage<T> {
    pub fn get(&self, node: usize) -> T {
        self.with(node, |v| v.clone())
    }

    pub fn set(&self, node: usize, value: T) {
        self.with_mut(node, |slot| *slot = value);
    }

    pub fn get_local(&self) -> T {
        self.get(current_place().node)
    }

    pub fn set_local(&self, value: T) {
        self.set(current_place().node, value);
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.handle.read().values.clone()
    }
}

impl<T: Default + Clone> HostLocalStorage<T> {
    pub fn initialize(nodes: usize) -> HostLocalStorageOwner<T> {
        HostLocalStorageOwner {
            owned: Owned::new(Inner {
                values: vec![T::default(); nodes],
            }),
        }
    }
}

impl<T> HostLocalStorage<T> {
    pub fn initialize_with(nodes: usize, mut f: impl FnMut(usize) -> T) -> HostLocalStorageOwner<T> {
        HostLocalStorageOwner {
            owned: Owned::new(Inner {
                values: (0..nodes).map(&mut f).collect(),
            }),
        }
    }
}

impl<T> HostLocalStorageOwner<T> {
    pub fn handle(&self) -> HostLocalStorage<T> {
        HostLocalStorage {
            handle: self.owned.handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::{self, Place, PlaceDims, ThreadDims};

    #[test]
    fn one_slot_per_node_visited_in_node_order() {
        let owner: HostLocalStorageOwner<u64> = HostLocalStorage::initialize_with(4, |n| n as u64 * 2);
        let handle = owner.handle();
        assert_eq!(handle.to_vec(), vec![0, 2, 4, 6]);
    }

    #[test]
    fn local_ref_routes_through_current_place() {
        place::init(
            PlaceDims {
                nodes: 3,
                pods_per_node: 1,
                cores_per_pod: 1,
            },
            ThreadDims { threads_per_core: 1 },
        );
        let owner: HostLocalStorageOwner<u64> = HostLocalStorage::initialize(3);
        let handle = owner.handle();
        place::execute_on_wait(Place::node(2), {
            let handle = handle.clone();
            move || handle.set_local(42)
        })
        .unwrap();
        assert_eq!(handle.get(2), 42);
    }
}
