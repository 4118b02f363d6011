//! Parallel primitives
//!
//! `do_all` and friends schedule one task per element of a range on the shared `rayon` thread
//! pool; the `_locality` variants route each task to the place that owns its data, the same way
//! the graph layer routes per-vertex work to the node that holds the vertex. `WaitGroup` and
//! `DAccumulator` are the barrier and cross-node counter every higher layer is built from.
//! `PrefixSum` is the two-level chunked algorithm described in the original prefix-sum utility,
//! re-expressed with `rayon::scope`'s structured barrier standing in for the hand-rolled
//! wait/done handoff chain (see DESIGN.md) while `WaterfallLock` is kept as a standalone primitive
//! for call sites, such as the mirror sync protocol, that need the same phase-gate discipline.

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::place::{execute_on, Place};

/// Runs `f` once per element of `range` on the shared pool, returning once every task has
/// completed.
pub fn do_all<T, F>(range: impl IntoIterator<Item = T>, f: F)
where
    T: Send,
    F: Fn(T) + Sync,
{
    let items: Vec<T> = range.into_iter().collect();
    rayon::scope(|scope| {
        for item in items {
            scope.spawn(|_| f(item));
        }
    });
}

/// Like `do_all`, but each task is pinned to the place `locality_fn` returns for its element
/// before `f` runs — the mechanism the graph layer uses to route per-vertex work to the vertex's
/// owning node.
pub fn do_all_locality<T, L, F>(range: Vec<T>, locality_fn: L, f: F)
where
    T: Send + 'static,
    L: Fn(&T) -> Place,
    F: Fn(T) + Sync + Send + 'static + Clone,
{
    let wait_group = WaitGroup::new();
    wait_group.add(range.len());
    for item in range {
        let place = locality_fn(&item);
        let wait_group = wait_group.clone();
        let f = f.clone();
        execute_on(place, move || {
            f(item);
            wait_group.done();
        })
        .expect("do_all_locality: place out of bounds");
    }
    wait_group.wait();
}

/// Scheduling policy for [`do_all_explicit_policy`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Pin to a uniformly random core of the element's owning node, to spread contention across
    /// cores that would otherwise all touch the same node's memory.
    InferRandomCore,
}

/// Like `do_all_locality`, but `node_of` only names the owning node; `policy` decides which core
/// of that node the task runs on.
pub fn do_all_explicit_policy<T, N, F>(policy: Policy, range: Vec<T>, node_of: N, f: F)
where
    T: Send + 'static,
    N: Fn(&T) -> usize,
    F: Fn(T) + Sync + Send + 'static + Clone,
{
    let Policy::InferRandomCore = policy;
    let dims = crate::place::place_dims();
    do_all_locality(
        range,
        |item| {
            let node = node_of(item);
            let pod = rand::thread_rng().gen_range(0..dims.pods_per_node.max(1));
            let core = rand::thread_rng().gen_range(0..dims.cores_per_pod.max(1));
            Place::new(node, crate::place::Coord::Id(pod), crate::place::Coord::Id(core))
        },
        f,
    );
}

/// Splits `0..n` into `workers` contiguous chunks and runs `f(worker_id, workers)` for each,
/// blocking until every chunk's task has completed.
pub fn do_all_evenly_partition<F>(n: usize, workers: usize, f: F)
where
    F: Fn(usize, usize) + Sync,
{
    let workers = workers.max(1).min(n.max(1));
    rayon::scope(|scope| {
        for worker in 0..workers {
            scope.spawn(move |_| f(worker, workers));
        }
    });
}

struct WaitGroupInner {
    remaining: Mutex<usize>,
    cvar: Condvar,
}

/// A barrier with an atomic count: `add(n)` registers `n` units of outstanding work, `done()`
/// retires one, `wait()` blocks until the count returns to zero.
#[derive(Clone)]
pub struct WaitGroup {
    inner: Arc<WaitGroupInner>,
}

impl WaitGroup {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(WaitGroupInner {
                remaining: Mutex::new(0),
                cvar: Condvar::new(),
            }),
        }
    }

    pub fn add(&self, n: usize) {
        *self.inner.remaining.lock() += n;
    }

    pub fn done(&self) {
        let mut remaining = self.inner.remaining.lock();
        *remaining -= 1;
        if *remaining == 0 {
            self.inner.cvar.notify_all();
        }
    }

    pub fn wait(&self) {
        let mut remaining = self.inner.remaining.lock();
        while *remaining != 0 {
            self.inner.cvar.wait(&mut remaining);
        }
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// `do_all` over `range`, but registered against `wait_group` instead of blocking locally — lets a
/// caller fan a batch of work out across several `do_all_wait_group` calls and wait on all of them
/// together.
pub fn do_all_wait_group<T, F>(range: impl IntoIterator<Item = T>, wait_group: &WaitGroup, f: F)
where
    T: Send + 'static,
    F: Fn(T) + Sync + Send + 'static + Clone,
{
    let items: Vec<T> = range.into_iter().collect();
    wait_group.add(items.len());
    rayon::scope(|scope| {
        for item in items {
            let wg = wait_group.clone();
            let f = f.clone();
            scope.spawn(move |_| {
                f(item);
                wg.done();
            });
        }
    });
}

/// Values that have a multiplicative-style "one", used by [`DAccumulator::increment`].
pub trait Unit: Copy {
    fn one() -> Self;
}

macro_rules! impl_unit {
    ($($t:ty),*) => {
        $(impl Unit for $t {
            fn one() -> Self { 1 as $t }
        })*
    };
}
impl_unit!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

/// A per-node counter: `add`/`increment`/`reset` touch only the calling node's slot (no locking
/// across the fabric); `reduce` sums every node's slot.
pub struct DAccumulator<T> {
    storage: crate::containers::host_local::HostLocalStorage<T>,
}

impl<T> Clone for DAccumulator<T> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
        }
    }
}

pub struct DAccumulatorOwner<T> {
    owned: crate::containers::host_local::HostLocalStorageOwner<T>,
}

impl<T: Default + Clone + std::ops::AddAssign> DAccumulator<T> {
    pub fn initialize(nodes: usize) -> DAccumulatorOwner<T> {
        DAccumulatorOwner {
            owned: crate::containers::host_local::HostLocalStorage::initialize(nodes),
        }
    }

    pub fn add(&self, value: T) {
        self.storage.with_local_mut(|slot| *slot += value);
    }

    pub fn reset(&self, node: usize) {
        self.storage.set(node, T::default());
    }

    pub fn reduce(&self) -> T {
        let mut total = T::default();
        for value in self.storage.to_vec() {
            total += value;
        }
        total
    }
}

impl<T: Default + Clone + std::ops::AddAssign + Unit> DAccumulator<T> {
    pub fn increment(&self) {
        self.add(T::one());
    }
}

impl<T> DAccumulatorOwner<T> {
    pub fn handle(&self) -> DAccumulator<T> {
        DAccumulator {
            storage: self.owned.handle(),
        }
    }
}

/// A per-worker phase counter: `wait(id, phase)` spin-blocks until worker `id` has reached
/// `phase`; `done(id, phase)` advances worker `id` to `phase`. Used to gate hand-off protocols
/// (the mirror sync reduce/broadcast steps) the way the original runtime's `WaterFallLock` gates
/// the three prefix-sum phases.
pub struct WaterfallLock {
    phases: Vec<AtomicUsize>,
}

impl WaterfallLock {
    pub fn new(workers: usize) -> Self {
        Self {
            phases: (0..workers).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn done(&self, id: usize, phase: usize) {
        self.phases[id].store(phase, Ordering::Release);
    }

    pub fn wait(&self, id: usize, phase: usize) {
        while self.phases[id].load(Ordering::Acquire) < phase {
            std::hint::spin_loop();
        }
    }

    pub fn reset(&self) {
        for phase in &self.phases {
            phase.store(0, Ordering::Relaxed);
        }
    }
}

/// Two-level parallel prefix sum over a homogeneous sequence: `items` is split into `workers`
/// contiguous chunks, each chunk is scanned locally in parallel (phase 0), the chunk totals are
/// combined into an exclusive prefix serially (phase 1, gated by `rayon::scope`'s barrier rather
/// than a hand-rolled wait/done chain), and each chunk is corrected by its exclusive offset in
/// parallel (phase 2). Returns the inclusive prefix sum, i.e. `result[i] = items[0] + .. + items[i]`
/// under `combine`.
pub fn prefix_sum<T, C>(items: &[T], combine: C) -> Vec<T>
where
    T: Clone + Send + Sync,
    C: Fn(&T, &T) -> T + Sync,
{
    let n = items.len();
    if n == 0 {
        return Vec::new();
    }
    let workers = rayon::current_num_threads().max(1).min(n);
    let chunk_len = n.div_ceil(workers);
    let mut dst: Vec<T> = items.to_vec();

    // Phase 0: local inclusive scan within each chunk.
    rayon::scope(|scope| {
        for (chunk_idx, chunk) in dst.chunks_mut(chunk_len).enumerate() {
            let src_chunk = &items[chunk_idx * chunk_len..chunk_idx * chunk_len + chunk.len()];
            let combine = &combine;
            scope.spawn(move |_| {
                for i in 1..chunk.len() {
                    chunk[i] = combine(&src_chunk[i], &chunk[i - 1]);
                }
            });
        }
    });

    // Phase 1: serial exclusive prefix over chunk totals (one combine per chunk boundary, cheap).
    let num_chunks = n.div_ceil(chunk_len);
    let mut chunk_offset: Vec<Option<T>> = vec![None; num_chunks];
    let mut running: Option<T> = None;
    for (chunk_idx, chunk) in dst.chunks(chunk_len).enumerate() {
        chunk_offset[chunk_idx] = running.clone();
        let total = chunk.last().expect("chunk is non-empty").clone();
        running = Some(match running {
            None => total,
            Some(prev) => combine(&total, &prev),
        });
    }

    // Phase 2: apply each chunk's exclusive offset to every element but the first, in parallel.
    rayon::scope(|scope| {
        for (chunk_idx, chunk) in dst.chunks_mut(chunk_len).enumerate() {
            if let Some(offset) = &chunk_offset[chunk_idx] {
                let combine = &combine;
                scope.spawn(move |_| {
                    for slot in chunk.iter_mut() {
                        *slot = combine(slot, offset);
                    }
                });
            }
        }
    });

    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

    #[test]
    fn do_all_runs_every_item() {
        let counter = Arc::new(AtomicU64::new(0));
        let c = counter.clone();
        do_all(0..100, move |_| {
            c.fetch_add(1, AtomicOrdering::Relaxed);
        });
        assert_eq!(counter.load(AtomicOrdering::Relaxed), 100);
    }

    #[test]
    fn wait_group_blocks_until_all_done() {
        let wg = WaitGroup::new();
        wg.add(3);
        let flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
        for _ in 0..3 {
            let wg = wg.clone();
            let flag = flag.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(5));
                flag.store(true, AtomicOrdering::Relaxed);
                wg.done();
            });
        }
        wg.wait();
        assert!(flag.load(AtomicOrdering::Relaxed));
    }

    #[test]
    fn daccumulator_reduces_across_nodes() {
        place::init(
            place::PlaceDims {
                nodes: 3,
                pods_per_node: 1,
                cores_per_pod: 1,
            },
            place::ThreadDims { threads_per_core: 1 },
        );
        let owner: DAccumulatorOwner<u64> = DAccumulator::initialize(3);
        let acc = owner.handle();
        for node in 0..3 {
            let a = acc.clone();
            place::execute_on_wait(Place::node(node), move || {
                a.add(10);
                a.increment();
            })
            .unwrap();
        }
        assert_eq!(acc.reduce(), 33);
    }

    #[test]
    fn prefix_sum_matches_serial_scan() {
        let items: Vec<u64> = (1..=1000).collect();
        let result = prefix_sum(&items, |a, b| a + b);
        let mut expected = Vec::with_capacity(items.len());
        let mut running = 0u64;
        for v in &items {
            running += v;
            expected.push(running);
        }
        assert_eq!(result, expected);
    }
}
