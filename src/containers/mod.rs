//! Distributed containers.
//!
//! Everything here is built on top of [`handle`]'s `Shared`/`Owned` split: a cheap, `Clone`-able
//! handle that `doAll` closures capture by value, and a move-only owner that releases backing
//! storage on drop.

pub mod dist_array;
pub mod handle;
pub mod host_cached_array;
pub mod host_local;
pub mod per_thread_vector;
pub mod pod_local;
pub mod thread_local;

pub use dist_array::{DistArray, DistArrayOwner};
pub use handle::{Deinit, Owned, Shared};
pub use host_cached_array::{HostCachedArray, HostCachedArrayOwner};
pub use host_local::{HostLocalStorage, HostLocalStorageOwner};
pub use per_thread_vector::{PerThreadVector, PerThreadVectorOwner};
pub use pod_local::{PodLocalStorage, PodLocalStorageOwner};
pub use thread_local::{ThreadLocalStorage, ThreadLocalStorageOwner};
