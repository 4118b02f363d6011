//! `LocalCsr<V, E>`
//!
//! A single-place compressed sparse row graph. Vertices are dense local indices `0..size()`;
//! `offsets[i]..offsets[i+1]` names vertex `i`'s half-edges in `edge_dst`/`edge_data`. A half-edge's
//! destination is a [`VertexTopologyId`] rather than a local index, because `DistLocalCsr` resolves
//! edges straight to their (possibly remote) owning node at construction time — traversal never
//! re-touches the token table.

use hashbrown::HashMap;

use crate::place::{GlobalPtr, Place};

/// Marker type for vertex topology handles: `GlobalPtr<VertexMarker>` names `(owning node, local
/// index)`, the same `(place, offset)` shape every other global pointer in this crate uses.
pub struct VertexMarker;
/// Marker type for edge handles, local to the node that owns the source vertex.
pub struct HalfEdgeMarker;

pub type VertexTopologyId = GlobalPtr<VertexMarker>;
pub type EdgeHandle = GlobalPtr<HalfEdgeMarker>;

pub fn vertex_id(node: usize, index: usize) -> VertexTopologyId {
    GlobalPtr::new(Place::node(node), index)
}

fn edge_handle(node: usize, index: usize) -> EdgeHandle {
    GlobalPtr::new(Place::node(node), index)
}

pub struct LocalCsr<V, E> {
    node: usize,
    offsets: Vec<usize>,
    edge_dst: Vec<VertexTopologyId>,
    vertex_data: Vec<V>,
    edge_data: Vec<E>,
    token_to_topology: HashMap<u64, usize>,
    topology_to_token: Vec<u64>,
}

impl<V, E> LocalCsr<V, E> {
    /// Builds a CSR from index-aligned vertex entries and their (already-resolved) outgoing
    /// edges. `vertices[i]` is `(token, data)` for local vertex `i`; `edges[i]` is vertex `i`'s
    /// half-edge list in the order they should appear in `edges(v)`.
    pub fn build(node: usize, vertices: Vec<(u64, V)>, mut edges: Vec<Vec<(VertexTopologyId, E)>>) -> Self {
        assert_eq!(vertices.len(), edges.len(), "vertices and edges must be index-aligned");
        let n = vertices.len();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut edge_dst = Vec::new();
        let mut edge_data = Vec::new();
        let mut vertex_data = Vec::with_capacity(n);
        let mut topology_to_token = Vec::with_capacity(n);
        let mut token_to_topology = HashMap::with_capacity(n);

        let mut running = 0usize;
        for (idx, (token, data)) in vertices.into_iter().enumerate() {
            offsets.push(running);
            vertex_data.push(data);
            topology_to_token.push(token);
            token_to_topology.insert(token, idx);
            running += edges[idx].len();
        }
        offsets.push(running);
        for vertex_edges in edges.drain(..) {
            for (dst, data) in vertex_edges {
                edge_dst.push(dst);
                edge_data.push(data);
            }
        }

        Self {
            node,
            offsets,
            edge_dst,
            vertex_data,
            edge_data,
            token_to_topology,
            topology_to_token,
        }
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn size(&self) -> usize {
        self.vertex_data.len()
    }

    pub fn size_edges(&self) -> usize {
        self.edge_dst.len()
    }

    fn local_index(&self, v: VertexTopologyId) -> usize {
        debug_assert_eq!(v.place.node, self.node, "vertex does not belong to this node's CSR");
        v.offset
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexTopologyId> + '_ {
        let node = self.node;
        (0..self.size()).map(move |i| vertex_id(node, i))
    }

    pub fn edges(&self, v: VertexTopologyId) -> impl Iterator<Item = EdgeHandle> + '_ {
        let idx = self.local_index(v);
        let node = self.node;
        (self.offsets[idx]..self.offsets[idx + 1]).map(move |i| edge_handle(node, i))
    }

    pub fn get_num_edges(&self, v: VertexTopologyId) -> usize {
        let idx = self.local_index(v);
        self.offsets[idx + 1] - self.offsets[idx]
    }

    pub fn get_data(&self, v: VertexTopologyId) -> &V {
        &self.vertex_data[self.local_index(v)]
    }

    pub fn set_data(&mut self, v: VertexTopologyId, data: V) {
        let idx = self.local_index(v);
        self.vertex_data[idx] = data;
    }

    pub fn get_edge_data(&self, eh: EdgeHandle) -> &E {
        &self.edge_data[eh.offset]
    }

    pub fn set_edge_data(&mut self, eh: EdgeHandle, data: E) {
        self.edge_data[eh.offset] = data;
    }

    pub fn get_edge_dst(&self, eh: EdgeHandle) -> VertexTopologyId {
        self.edge_dst[eh.offset]
    }

    pub fn get_topology_id(&self, token: u64) -> Option<VertexTopologyId> {
        self.token_to_topology.get(&token).map(|&idx| vertex_id(self.node, idx))
    }

    pub fn get_token_id(&self, v: VertexTopologyId) -> u64 {
        self.topology_to_token[self.local_index(v)]
    }

    pub fn get_locality_vertex(&self, _v: VertexTopologyId) -> Place {
        Place::node(self.node)
    }

    pub fn get_vertex_index(&self, v: VertexTopologyId) -> usize {
        self.local_index(v)
    }
}

impl<V: Clone, E: Clone> crate::graph::api::GraphApi for LocalCsr<V, E> {
    type VertexData = V;
    type EdgeData = E;

    fn nodes(&self) -> usize {
        1
    }

    fn size(&self) -> usize {
        LocalCsr::size(self)
    }

    fn vertices(&self) -> Vec<VertexTopologyId> {
        LocalCsr::vertices(self).collect()
    }

    fn edges(&self, v: VertexTopologyId) -> Vec<EdgeHandle> {
        LocalCsr::edges(self, v).collect()
    }

    fn get_num_edges(&self, v: VertexTopologyId) -> usize {
        LocalCsr::get_num_edges(self, v)
    }

    fn get_edge_dst(&self, eh: EdgeHandle) -> VertexTopologyId {
        LocalCsr::get_edge_dst(self, eh)
    }

    fn get_data(&self, v: VertexTopologyId) -> V {
        LocalCsr::get_data(self, v).clone()
    }

    fn get_edge_data(&self, eh: EdgeHandle) -> E {
        LocalCsr::get_edge_data(self, eh).clone()
    }

    fn get_locality_vertex(&self, v: VertexTopologyId) -> Place {
        LocalCsr::get_locality_vertex(self, v)
    }

    fn get_vertex_index(&self, v: VertexTopologyId) -> usize {
        LocalCsr::get_vertex_index(self, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csr_fixture() -> LocalCsr<u64, ()> {
        // 4 vertices, tokens = index+1; edges 0->1, 0->2, 1->2
        let vertices = vec![(1u64, 10u64), (2, 20), (3, 30), (4, 40)];
        let edges = vec![
            vec![(vertex_id(0, 1), ()), (vertex_id(0, 2), ())],
            vec![(vertex_id(0, 2), ())],
            vec![],
            vec![],
        ];
        LocalCsr::build(0, vertices, edges)
    }

    #[test]
    fn offsets_match_degree() {
        let csr = csr_fixture();
        assert_eq!(csr.size(), 4);
        assert_eq!(csr.size_edges(), 3);
        let v0 = csr.get_topology_id(1).unwrap();
        assert_eq!(csr.get_num_edges(v0), 2);
        assert_eq!(csr.edges(v0).count(), 2);
    }

    #[test]
    fn token_topology_round_trips() {
        let csr = csr_fixture();
        for token in 1..=4u64 {
            let v = csr.get_topology_id(token).unwrap();
            assert_eq!(csr.get_token_id(v), token);
        }
    }

    #[test]
    fn edge_destinations_resolve_to_expected_tokens() {
        let csr = csr_fixture();
        let v0 = csr.get_topology_id(1).unwrap();
        let dst_tokens: Vec<u64> = csr.edges(v0).map(|eh| csr.get_token_id(csr.get_edge_dst(eh))).collect();
        assert_eq!(dst_tokens, vec![2, 3]);
    }
}
