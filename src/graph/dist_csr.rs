//! `DistLocalCsr<V, E>`
//!
//! An array of [`LocalCsr`]s, one per node, plus the virtual-host table that routes a token to its
//! owning node. Built in two passes: first every node's vertex list is finalized (fixing local
//! topology indices), then a second pass resolves every edge's destination token against the now-
//! complete, cross-node token table — so traversal never has to consult a token map again.

use hashbrown::HashMap;
use more_asserts::assert_gt;

use crate::containers::host_local::{HostLocalStorage, HostLocalStorageOwner};
use crate::graph::local_csr::{vertex_id, EdgeHandle, LocalCsr, VertexTopologyId};
use crate::graph::virtual_host::{build_virtual_to_physical, virtual_host_of};
use crate::place::Place;

/// A single input vertex: its token and payload.
pub type VertexRecord<V> = (u64, V);
/// A single input edge: source token, destination token, payload.
pub type EdgeRecord<E> = (u64, u64, E);

pub struct DistLocalCsr<V, E> {
    csrs: HostLocalStorage<LocalCsr<V, E>>,
    virtual_to_physical: std::sync::Arc<Vec<usize>>,
    num_virtual_hosts: usize,
    node_offsets: std::sync::Arc<Vec<usize>>,
}

impl<V, E> Clone for DistLocalCsr<V, E> {
    fn clone(&self) -> Self {
        Self {
            csrs: self.csrs.clone(),
            virtual_to_physical: self.virtual_to_physical.clone(),
            num_virtual_hosts: self.num_virtual_hosts,
            node_offsets: self.node_offsets.clone(),
        }
    }
}

pub struct DistLocalCsrOwner<V, E> {
    owned: HostLocalStorageOwner<LocalCsr<V, E>>,
    virtual_to_physical: std::sync::Arc<Vec<usize>>,
    num_virtual_hosts: usize,
    node_offsets: std::sync::Arc<Vec<usize>>,
}

impl<V, E> DistLocalCsrOwner<V, E> {
    pub fn handle(&self) -> DistLocalCsr<V, E> {
        DistLocalCsr {
            csrs: self.owned.handle(),
            virtual_to_physical: self.virtual_to_physical.clone(),
            num_virtual_hosts: self.num_virtual_hosts,
            node_offsets: self.node_offsets.clone(),
        }
    }
}

impl<V: Clone, E> DistLocalCsr<V, E> {
    /// Builds the graph from a flat vertex list and edge list: every vertex's owning node is
    /// derived from its token through the virtual-host table this call computes, so the caller
    /// never partitions data by hand. `scale_factor` sizes the virtual-host table at
    /// `nodes * scale_factor`, a finer grain than the physical node count so the LPT balancer in
    /// [`build_virtual_to_physical`] has room to work.
    pub fn build(nodes: usize, scale_factor: usize, vertices: Vec<VertexRecord<V>>, edges: Vec<EdgeRecord<E>>) -> DistLocalCsrOwner<V, E> {
        assert_gt!(nodes, 0, "at least one physical node is required");
        let num_virtual_hosts = (nodes * scale_factor.max(1)).max(1);

        let mut vhost_loads = vec![0u64; num_virtual_hosts];
        for (src, _, _) in &edges {
            vhost_loads[virtual_host_of(*src, num_virtual_hosts)] += 1;
        }
        let virtual_to_physical = build_virtual_to_physical(&vhost_loads, nodes);

        // Partition vertices and outgoing edge lists by owning physical node.
        let mut per_node_entries: Vec<Vec<(u64, V)>> = (0..nodes).map(|_| Vec::new()).collect();
        let mut per_node_local_index: HashMap<u64, usize> = HashMap::with_capacity(vertices.len());
        for (token, data) in vertices {
            let node = virtual_to_physical[virtual_host_of(token, num_virtual_hosts)];
            per_node_local_index.insert(token, per_node_entries[node].len());
            per_node_entries[node].push((token, data));
        }

        let mut per_node_out_edges: Vec<Vec<Vec<(u64, E)>>> =
            per_node_entries.iter().map(|entries| vec![Vec::new(); entries.len()]).collect();
        for (src, dst, data) in edges {
            let node = virtual_to_physical[virtual_host_of(src, num_virtual_hosts)];
            let local_idx = *per_node_local_index
                .get(&src)
                .unwrap_or_else(|| panic!("edge source token {src} was never inserted as a vertex"));
            per_node_out_edges[node][local_idx].push((dst, data));
        }

        // Pass 1: every vertex now has a fixed (node, local index); build the global token map.
        let mut global_tokens: HashMap<u64, VertexTopologyId> = HashMap::new();
        for (node, entries) in per_node_entries.iter().enumerate() {
            for (idx, (token, _)) in entries.iter().enumerate() {
                global_tokens.insert(*token, vertex_id(node, idx));
            }
        }

        // Pass 2: resolve every edge's destination token now that every vertex has a place.
        let mut node_sizes = Vec::with_capacity(nodes);
        let mut csrs: Vec<Option<LocalCsr<V, E>>> = (0..nodes).map(|_| None).collect();
        for (node, (entries, out_edges)) in per_node_entries.into_iter().zip(per_node_out_edges).enumerate() {
            node_sizes.push(entries.len());
            let resolved_edges: Vec<Vec<(VertexTopologyId, E)>> = out_edges
                .into_iter()
                .map(|edges| {
                    edges
                        .into_iter()
                        .map(|(dst_token, data)| {
                            let dst = *global_tokens
                                .get(&dst_token)
                                .unwrap_or_else(|| panic!("edge destination token {dst_token} was never inserted"));
                            (dst, data)
                        })
                        .collect()
                })
                .collect();
            csrs[node] = Some(LocalCsr::build(node, entries, resolved_edges));
        }

        let mut node_offsets = Vec::with_capacity(nodes + 1);
        let mut running = 0usize;
        for size in &node_sizes {
            node_offsets.push(running);
            running += size;
        }
        node_offsets.push(running);

        DistLocalCsrOwner {
            owned: HostLocalStorage::initialize_with(nodes, move |n| csrs[n].take().expect("built above")),
            virtual_to_physical: std::sync::Arc::new(virtual_to_physical),
            num_virtual_hosts,
            node_offsets: std::sync::Arc::new(node_offsets),
        }
    }
}

impl<V: Clone, E> DistLocalCsr<V, E> {
    pub fn nodes(&self) -> usize {
        self.csrs.len()
    }

    pub fn size(&self) -> usize {
        self.csrs.to_vec().iter().map(LocalCsr::size).sum()
    }

    pub fn size_edges(&self) -> usize {
        self.csrs.to_vec().iter().map(LocalCsr::size_edges).sum()
    }

    fn physical_node_of_token(&self, token: u64) -> usize {
        self.virtual_to_physical[virtual_host_of(token, self.num_virtual_hosts)]
    }

    pub fn get_topology_id(&self, token: u64) -> VertexTopologyId {
        let node = self.physical_node_of_token(token);
        self.csrs
            .with(node, |csr| csr.get_topology_id(token))
            .unwrap_or_else(|| panic!("token {token} was never inserted"))
    }

    pub fn get_token_id(&self, v: VertexTopologyId) -> u64 {
        self.csrs.with(v.place.node, |csr| csr.get_token_id(v))
    }

    pub fn get_locality_vertex(&self, v: VertexTopologyId) -> Place {
        Place::node(v.place.node)
    }

    /// Dense global index: local index on `v`'s node plus the sizes of every preceding node.
    pub fn get_vertex_index(&self, v: VertexTopologyId) -> usize {
        self.node_offsets[v.place.node] + v.offset
    }

    pub fn vertices(&self) -> Vec<VertexTopologyId> {
        self.csrs.to_vec().iter().flat_map(LocalCsr::vertices).collect()
    }

    pub fn edges(&self, v: VertexTopologyId) -> Vec<EdgeHandle> {
        self.csrs.with(v.place.node, |csr| csr.edges(v).collect())
    }

    pub fn get_num_edges(&self, v: VertexTopologyId) -> usize {
        self.csrs.with(v.place.node, |csr| csr.get_num_edges(v))
    }

    pub fn get_data(&self, v: VertexTopologyId) -> V {
        self.csrs.with(v.place.node, |csr| csr.get_data(v).clone())
    }

    pub fn set_data(&self, v: VertexTopologyId, data: V) {
        self.csrs.with_mut(v.place.node, |csr| csr.set_data(v, data));
    }

    pub fn get_edge_dst(&self, eh: EdgeHandle) -> VertexTopologyId {
        self.csrs.with(eh.place.node, |csr| csr.get_edge_dst(eh))
    }
}

impl<V: Clone, E: Clone> DistLocalCsr<V, E> {
    pub fn get_edge_data(&self, eh: EdgeHandle) -> E {
        self.csrs.with(eh.place.node, |csr| csr.get_edge_data(eh).clone())
    }

    pub fn set_edge_data(&self, eh: EdgeHandle, data: E) {
        self.csrs.with_mut(eh.place.node, |csr| csr.set_edge_data(eh, data));
    }
}

impl<V: Clone, E: Clone> crate::graph::api::GraphApi for DistLocalCsr<V, E> {
    type VertexData = V;
    type EdgeData = E;

    fn nodes(&self) -> usize {
        DistLocalCsr::nodes(self)
    }

    fn size(&self) -> usize {
        DistLocalCsr::size(self)
    }

    fn vertices(&self) -> Vec<VertexTopologyId> {
        DistLocalCsr::vertices(self)
    }

    fn edges(&self, v: VertexTopologyId) -> Vec<EdgeHandle> {
        DistLocalCsr::edges(self, v)
    }

    fn get_num_edges(&self, v: VertexTopologyId) -> usize {
        DistLocalCsr::get_num_edges(self, v)
    }

    fn get_edge_dst(&self, eh: EdgeHandle) -> VertexTopologyId {
        DistLocalCsr::get_edge_dst(self, eh)
    }

    fn get_data(&self, v: VertexTopologyId) -> V {
        DistLocalCsr::get_data(self, v)
    }

    fn get_edge_data(&self, eh: EdgeHandle) -> E {
        DistLocalCsr::get_edge_data(self, eh)
    }

    fn get_locality_vertex(&self, v: VertexTopologyId) -> Place {
        DistLocalCsr::get_locality_vertex(self, v)
    }

    fn get_vertex_index(&self, v: VertexTopologyId) -> usize {
        DistLocalCsr::get_vertex_index(self, v)
    }
}

impl<V: Clone, E: Clone> crate::graph::api::GraphApiMut for DistLocalCsr<V, E> {
    fn set_data(&self, v: VertexTopologyId, data: V) {
        DistLocalCsr::set_data(self, v, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place;

    fn simple_graph() -> (Vec<VertexRecord<u64>>, Vec<EdgeRecord<()>>) {
        // S1: 9 vertices, tokens 1..=9. Edges:
        // (1,2) (1,3) (1,7) (2,3) (2,7) (3,4) (4,5) (4,6) (5,6) (6,7) (7,8) (8,9)
        let pairs = [
            (1u64, 2u64),
            (1, 3),
            (1, 7),
            (2, 3),
            (2, 7),
            (3, 4),
            (4, 5),
            (4, 6),
            (5, 6),
            (6, 7),
            (7, 8),
            (8, 9),
        ];
        let vertices = (1..=9u64).map(|t| (t, t * 10)).collect();
        let edges = pairs.into_iter().map(|(src, dst)| (src, dst, ())).collect();
        (vertices, edges)
    }

    #[test]
    fn s1_csr_build_on_nine_vertex_graph() {
        place::init_default();
        let (vertices, edges) = simple_graph();
        let owner = DistLocalCsr::build(1, 4, vertices, edges);
        let g = owner.handle();
        assert_eq!(g.size(), 9);
        assert_eq!(g.size_edges(), 12);
        let v1 = g.get_topology_id(1);
        assert_eq!(g.get_num_edges(v1), 3);
        let v4 = g.get_topology_id(4);
        let dst_tokens: std::collections::BTreeSet<u64> =
            g.edges(v4).into_iter().map(|eh| g.get_token_id(g.get_edge_dst(eh))).collect();
        assert_eq!(dst_tokens, [5u64, 6].into_iter().collect());
    }

    #[test]
    fn vertex_index_accounts_for_preceding_nodes() {
        place::init(
            place::PlaceDims {
                nodes: 2,
                pods_per_node: 1,
                cores_per_pod: 1,
            },
            place::ThreadDims { threads_per_core: 1 },
        );
        // 4 virtual hosts (scale_factor 2); only the edge's source token (1, vhost 1) carries any
        // load, so LPT assigns vhost 1 to node 0 first, then vhosts 0, 2, 3 (all load-0, ties
        // broken by ascending node id) all land on node 1. Tokens 2 and 3 (vhosts 2 and 3) both
        // land on node 1, with token 2 appended first in input order.
        let vertices = vec![(1u64, 'a'), (2, 'b'), (3, 'c')];
        let edges = vec![(1u64, 2u64, ())];
        let owner = DistLocalCsr::build(2, 2, vertices, edges);
        let g = owner.handle();
        let v3 = g.get_topology_id(3);
        assert_eq!(g.get_locality_vertex(v3), place::Place::node(1));
        assert_eq!(g.get_vertex_index(v3), 2);
        assert_eq!(g.get_token_id(v3), 3);
    }
}
