//! `GraphApi`: the read-only surface every graph layer (`LocalCsr`, `DistLocalCsr`,
//! `MirrorDistLocalCsr`) implements, so that reference algorithms can be written once against
//! `impl GraphApi` instead of hardcoding a concrete layer. `GraphApiMut` adds `set_data` for the
//! two handle-based distributed layers; `LocalCsr` sits out of it since its `set_data` needs
//! `&mut self`, not the shared-handle interior mutability the distributed layers use.

use crate::graph::local_csr::{EdgeHandle, VertexTopologyId};
use crate::place::Place;

pub trait GraphApi {
    type VertexData;
    type EdgeData;

    /// Number of physical nodes the graph is spread across (always 1 for `LocalCsr`).
    fn nodes(&self) -> usize;
    /// Number of (master) vertices in the logical graph.
    fn size(&self) -> usize;
    fn vertices(&self) -> Vec<VertexTopologyId>;
    fn edges(&self, v: VertexTopologyId) -> Vec<EdgeHandle>;
    fn get_num_edges(&self, v: VertexTopologyId) -> usize;
    fn get_edge_dst(&self, eh: EdgeHandle) -> VertexTopologyId;
    fn get_data(&self, v: VertexTopologyId) -> Self::VertexData;
    fn get_edge_data(&self, eh: EdgeHandle) -> Self::EdgeData;
    fn get_locality_vertex(&self, v: VertexTopologyId) -> Place;
    /// Dense global index, e.g. for sizing a per-vertex output array.
    fn get_vertex_index(&self, v: VertexTopologyId) -> usize;
}

pub trait GraphApiMut: GraphApi {
    fn set_data(&self, v: VertexTopologyId, data: Self::VertexData);
}
