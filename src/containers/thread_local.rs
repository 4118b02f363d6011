//! `ThreadLocalStorage<T>`
//!
//! One `T` per hardware thread. In the real fabric this allocates per-pod blocks sized
//! `threadsPerPod * sizeof(T)` in L2 scratchpad; here each `rayon` worker thread (one per
//! simulated core) is the unit of locality, and `rayon::current_thread_index()` stands in for
//! the hardware-thread id.

use crate::containers::handle::{Deinit, Owned, Shared};

struct Inner<T> {
    values: Vec<T>,
}

impl<T> Deinit for Inner<T> {
    fn deinitialize(&mut self) {
        self.values.clear();
    }
}

pub struct ThreadLocalStorage<T> {
    handle: Shared<Inner<T>>,
}

impl<T> Clone for ThreadLocalStorage<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

pub struct ThreadLocalStorageOwner<T> {
    owned: Owned<Inner<T>>,
}

fn thread_index() -> usize {
    rayon::current_thread_index().unwrap_or(0)
}

impl<T> ThreadLocalStorage<T> {
    pub fn len(&self) -> usize {
        self.handle.read().values.len()
    }

    pub fn with<R>(&self, thread: usize, f: impl FnOnce(&T) -> R) -> R {
        f(&self.handle.read().values[thread])
    }

    pub fn with_mut<R>(&self, thread: usize, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.handle.write().values[thread])
    }

    pub fn with_local<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.with(thread_index(), f)
    }

    pub fn with_local_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.with_mut(thread_index(), f)
    }
}

impl<T> ThreadLocalStorage<T> {
    pub fn initialize_with(num_threads: usize, mut f: impl FnMut(usize) -> T) -> ThreadLocalStorageOwner<T> {
        ThreadLocalStorageOwner {
            owned: Owned::new(Inner {
                values: (0..num_threads).map(&mut f).collect(),
            }),
        }
    }
}

impl<T: Default> ThreadLocalStorage<T> {
    pub fn initialize(num_threads: usize) -> ThreadLocalStorageOwner<T> {
        Self::initialize_with(num_threads, |_| T::default())
    }
}

impl<T> ThreadLocalStorageOwner<T> {
    pub fn handle(&self) -> ThreadLocalStorage<T> {
        ThreadLocalStorage {
            handle: self.owned.handle(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_slot_per_thread() {
        let owner: ThreadLocalStorageOwner<u64> = ThreadLocalStorage::initialize(8);
        let handle = owner.handle();
        assert_eq!(handle.len(), 8);
        handle.with_mut(3, |v| *v = 99);
        assert_eq!(handle.with(3, |v| *v), 99);
    }
}
