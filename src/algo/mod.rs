//! Graph algorithms built purely on the [`crate::graph`] and [`crate::parallel`] layers.

pub mod bfs;
pub mod triangle_count;

pub use bfs::{bfs, UNREACHABLE};
pub use triangle_count::triangle_count;
