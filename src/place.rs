//! Place model & remote-reference primitive
//!
//! A [`Place`] is a triple `(node, pod, core)` naming where a task may run or a datum lives.
//! Every allocated byte has exactly one owning node; a pod/core wildcard is permitted for
//! scheduling (`execute_on`) but not for residence.
//!
//! A real PGAS fabric is a multi-process address space reachable only through remote-procedure
//! dereference. This crate simulates the fabric inside one process: `Fabric` is a `rayon` thread
//! pool whose workers are pinned one-per-core with `core_affinity`, and "crossing the fabric" is
//! an explicit method call rather than a transparent pointer dereference — see DESIGN.md for why
//! that's the faithful-and-idiomatic translation of a raw `GlobalPtr` in Rust.

use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::cell::Cell;
use std::marker::PhantomData;

use crate::error::{Result, Status};

/// A pod/core coordinate: either a concrete id or the `Any` wildcard used for scheduling.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Coord {
    Any,
    Id(usize),
}

impl Coord {
    pub fn id(self) -> Option<usize> {
        match self {
            Coord::Any => None,
            Coord::Id(id) => Some(id),
        }
    }
}

pub const ANY_POD: Coord = Coord::Any;
pub const ANY_CORE: Coord = Coord::Any;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Place {
    pub node: usize,
    pub pod: Coord,
    pub core: Coord,
}

impl Place {
    pub const fn node(node: usize) -> Self {
        Self {
            node,
            pod: ANY_POD,
            core: ANY_CORE,
        }
    }

    pub const fn new(node: usize, pod: Coord, core: Coord) -> Self {
        Self { node, pod, core }
    }

    /// A place is resident (can own bytes) only when pod and core are both concrete.
    pub fn is_resident(&self) -> bool {
        matches!(self.pod, Coord::Id(_)) && matches!(self.core, Coord::Id(_))
    }
}

/// Dimensions of the simulated fabric: how many nodes, pods per node, cores per pod.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlaceDims {
    pub nodes: usize,
    pub pods_per_node: usize,
    pub cores_per_pod: usize,
}

impl PlaceDims {
    pub fn cores_per_node(&self) -> usize {
        self.pods_per_node * self.cores_per_pod
    }

    pub fn total_cores(&self) -> usize {
        self.nodes * self.cores_per_node()
    }
}

/// Dimensions of the FGMT thread model: how many hardware threads multiplex onto each core.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThreadDims {
    pub threads_per_core: usize,
}

/// An opaque handle carrying `(place, offset)`. Two pointers compare equal iff they denote the
/// same byte. Arithmetic steps by `size_of::<T>()` within the owning arena only; crossing arena
/// boundaries is undefined and not expressible through this type (there is no `+` impl that
/// crosses a `node` boundary).
pub struct GlobalPtr<T> {
    pub place: Place,
    pub offset: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> GlobalPtr<T> {
    pub fn new(place: Place, offset: usize) -> Self {
        Self {
            place,
            offset,
            _marker: PhantomData,
        }
    }

    pub fn step(&self, delta: isize) -> Self {
        Self::new(self.place, (self.offset as isize + delta) as usize)
    }
}

impl<T> Copy for GlobalPtr<T> {}
impl<T> Clone for GlobalPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> PartialEq for GlobalPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.place == other.place && self.offset == other.offset
    }
}
impl<T> Eq for GlobalPtr<T> {}
impl<T> std::hash::Hash for GlobalPtr<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.place.hash(state);
        self.offset.hash(state);
    }
}
impl<T> std::fmt::Debug for GlobalPtr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GlobalPtr(node={}, offset={})", self.place.node, self.offset)
    }
}

thread_local! {
    /// The place the current `rayon` worker believes it is executing at. Set by `Fabric::execute_on`
    /// and by locality-routed `do_all` tasks; purely local scalar computation never touches it.
    static CURRENT_PLACE: Cell<Place> = Cell::new(Place::node(0));
}

/// Runs `f` with `CURRENT_PLACE` set to `place` for the duration of the call, restoring the
/// previous value afterward (tasks may nest: `execute_on` inside a `do_all` body).
pub(crate) fn with_place<R>(place: Place, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT_PLACE.with(|c| c.replace(place));
    let result = f();
    CURRENT_PLACE.with(|c| c.set(previous));
    result
}

pub fn current_place() -> Place {
    CURRENT_PLACE.with(|c| c.get())
}

pub fn locality_of<T>(ptr: GlobalPtr<T>) -> Place {
    ptr.place
}

/// The simulated fabric: a thread pool, core-pinning table, and the dimensions tasks may query.
pub struct Fabric {
    pub dims: PlaceDims,
    pub thread_dims: ThreadDims,
    pool: rayon::ThreadPool,
    core_ids: Vec<core_affinity::CoreId>,
}

impl Fabric {
    pub fn new(dims: PlaceDims, thread_dims: ThreadDims) -> Self {
        let total = dims.total_cores().max(1);
        let core_ids = core_affinity::get_core_ids().unwrap_or_default();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(total)
            .build()
            .expect("failed to build fabric thread pool");
        Self {
            dims,
            thread_dims,
            pool,
            core_ids,
        }
    }

    fn core_index(&self, place: Place) -> Option<usize> {
        let pod = place.pod.id()?;
        let core = place.core.id()?;
        Some(place.node * self.dims.cores_per_node() + pod * self.dims.cores_per_pod + core)
    }

    /// Pins the calling `rayon` worker to a physical core, best-effort (a CI sandbox or a
    /// container without core affinity support is allowed to ignore this).
    fn pin_if_possible(&self, core_index: usize) {
        if let Some(core_id) = self.core_ids.get(core_index % self.core_ids.len().max(1)) {
            core_affinity::set_for_current(*core_id);
        }
    }

    /// Spawns a task bound to `place`, returning immediately; the task may run concurrently with
    /// the caller. A place with `Coord::Any` for pod/core runs on some core of that node/pod.
    pub fn execute_on<F>(&self, place: Place, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if place.node >= self.dims.nodes {
            return Err(Status::OutOfBounds);
        }
        let core_index = self.core_index(place);
        let pin_table = self.core_ids.clone();
        self.pool.spawn(move || {
            with_place(place, || {
                if let Some(idx) = core_index {
                    if let Some(core_id) = pin_table.get(idx % pin_table.len().max(1)) {
                        core_affinity::set_for_current(*core_id);
                    }
                }
                f();
            });
        });
        Ok(())
    }

    /// Spawns a task bound to `place` and blocks until it completes.
    pub fn execute_on_wait<F, R>(&self, place: Place, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        if place.node >= self.dims.nodes {
            return Err(Status::OutOfBounds);
        }
        let core_index = self.core_index(place);
        let result = self.pool.install(|| {
            with_place(place, || {
                if let Some(idx) = core_index {
                    self.pin_if_possible(idx);
                }
                f()
            })
        });
        Ok(result)
    }

    pub fn pool(&self) -> &rayon::ThreadPool {
        &self.pool
    }
}

lazy_static! {
    static ref FABRIC: RwLock<Option<Fabric>> = RwLock::new(None);
}

/// Initializes the global fabric singleton. Subsequent calls are no-ops so test binaries that
/// each call `init` don't race each other.
pub fn init(dims: PlaceDims, thread_dims: ThreadDims) {
    let mut guard = FABRIC.write();
    if guard.is_none() {
        *guard = Some(Fabric::new(dims, thread_dims));
    }
}

/// Initializes a single-node fabric sized to the available CPU parallelism, for tests and small
/// CLI runs that don't care about multi-node locality.
pub fn init_default() {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    init(
        PlaceDims {
            nodes: 1,
            pods_per_node: 1,
            cores_per_pod: cores,
        },
        ThreadDims { threads_per_core: 4 },
    );
}

pub fn place_dims() -> PlaceDims {
    FABRIC.read().as_ref().expect("fabric not initialized").dims
}

pub fn thread_dims() -> ThreadDims {
    FABRIC.read().as_ref().expect("fabric not initialized").thread_dims
}

pub fn execute_on<F>(place: Place, f: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    FABRIC.read().as_ref().expect("fabric not initialized").execute_on(place, f)
}

pub fn execute_on_wait<F, R>(place: Place, f: F) -> Result<R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    FABRIC.read().as_ref().expect("fabric not initialized").execute_on_wait(place, f)
}

pub fn with_fabric<R>(f: impl FnOnce(&Fabric) -> R) -> R {
    let guard = FABRIC.read();
    f(guard.as_ref().expect("fabric not initialized"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_wildcards_are_not_resident() {
        let scheduling = Place::node(0);
        assert!(!scheduling.is_resident());
        let resident = Place::new(0, Coord::Id(0), Coord::Id(0));
        assert!(resident.is_resident());
    }

    #[test]
    fn global_ptr_equality_is_by_place_and_offset() {
        let a = GlobalPtr::<u64>::new(Place::node(1), 4);
        let b = GlobalPtr::<u64>::new(Place::node(1), 4);
        let c = GlobalPtr::<u64>::new(Place::node(2), 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(locality_of(a).node, 1);
    }

    #[test]
    fn execute_on_routes_current_place() {
        init(
            PlaceDims {
                nodes: 2,
                pods_per_node: 1,
                cores_per_pod: 2,
            },
            ThreadDims { threads_per_core: 1 },
        );
        let observed = execute_on_wait(Place::node(1), current_place).unwrap();
        assert_eq!(observed.node, 1);
    }
}
