//! Shared Handle / Owner Split
//!
//! Every distributed container in this crate is a thin domain wrapper around one of these two
//! primitives, generalizing the `ArcRwLock` pattern the upstream crate uses for its graph node
//! pointers. `Shared<T>` is the trivially-copyable handle a `doAll` closure captures by value
//! (cheap clone, aliases the same backing storage); `Owned<T>` is the move-only value that calls
//! `deinitialize` when dropped, so a container's backing memory is released exactly once even
//! though many `Shared` handles may still be outstanding (the same discipline the upstream crate
//! enforces by convention without the type system's help — see DESIGN.md).

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Implemented by every container's inner state so `Owned` knows how to release it.
pub trait Deinit {
    fn deinitialize(&mut self);
}

pub struct Shared<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// A move-only owner of container state: dropping it releases the backing storage.
pub struct Owned<T: Deinit> {
    shared: Shared<T>,
}

impl<T: Deinit> Owned<T> {
    pub fn new(value: T) -> Self {
        Self {
            shared: Shared::new(value),
        }
    }

    /// Returns a cheap handle aliasing this owner's backing storage.
    pub fn handle(&self) -> Shared<T> {
        self.shared.clone()
    }
}

impl<T: Deinit> Drop for Owned<T> {
    fn drop(&mut self) {
        self.shared.write().deinitialize();
    }
}
