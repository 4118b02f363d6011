//! A PGAS graph-processing substrate: hierarchical places (node/pod/core), tiered scratchpad and
//! main-memory arenas, distributed containers, locality-routed parallel loops, and a CSR-based
//! distributed graph with mirror/master replication for bulk-synchronous algorithms.

extern crate parking_lot;
extern crate more_asserts;
extern crate rand;
extern crate itertools;
extern crate rayon;
extern crate clap;
extern crate lazy_static;
extern crate pbr;

pub mod error;
pub mod algo;
pub mod arena;
pub mod cli;
pub mod containers;
pub mod graph;
pub mod ingest;
pub mod parallel;
pub mod place;

pub use error::{Result, Status};
