//! Breadth-first search over a [`MirrorDistLocalCsr`] (scenario S5).
//!
//! Level-synchronous: each round relaxes every frontier vertex's out-edges with
//! [`do_all_locality`], so an edge is always walked on the node that owns its source. A relax that
//! crosses a node boundary lands on a local mirror rather than touching the remote master
//! directly; [`MirrorDistLocalCsr::sync`] with a `min` reduction is what carries those writes back
//! to their masters and back out to every other mirror between rounds. The next frontier is
//! whichever masters come out of that round's `sync` with their dirty bit set — direct same-node
//! writes set it immediately, reduce sets it when a mirror's value actually lowers the master.

use crate::graph::{vertex_id, MirrorDistLocalCsr, VertexTopologyId};
use crate::parallel::do_all_locality;

/// Distance reported for a vertex BFS never reaches.
pub const UNREACHABLE: u64 = u64::MAX;

/// Runs BFS from `src`, returning hop distances indexed by [`MirrorDistLocalCsr::get_vertex_index`];
/// `src` itself is distance 0. Mirrors never appear in the result: they're write-through proxies for
/// remote masters, not members of the logical vertex set.
pub fn bfs<E>(graph: &MirrorDistLocalCsr<u64, E>, src: u64) -> Vec<u64>
where
    E: Send + Sync + 'static,
{
    let n = graph.size();
    for v in graph.vertices() {
        graph.set_data_only(v, UNREACHABLE);
    }
    for node in 0..graph.nodes() {
        for offset in graph.get_local_mirror_range(node) {
            graph.set_data_only(vertex_id(node, offset), UNREACHABLE);
        }
    }
    graph.reset_bit_sets();

    let src_id = graph.get_topology_id(src);
    graph.set_data(src_id, 0);

    let mut frontier = vec![src_id];
    let mut dist = 0u64;
    while !frontier.is_empty() {
        let next_dist = dist + 1;
        let graph_for_locality = graph.clone();
        let graph_for_relax = graph.clone();

        do_all_locality(
            frontier,
            move |v| graph_for_locality.get_locality_vertex(*v),
            move |v| {
                for eh in graph_for_relax.edges(v) {
                    let dst = graph_for_relax.get_edge_dst(eh);
                    if graph_for_relax.get_data(dst) == UNREACHABLE {
                        graph_for_relax.set_data(dst, next_dist);
                    }
                }
            },
        );

        graph.sync(|mirror, master| {
            if *mirror < *master {
                *master = *mirror;
            }
        });

        let next: Vec<VertexTopologyId> = graph.vertices().into_iter().filter(|&v| graph.master_bit(v)).collect();
        graph.reset_bit_sets();
        frontier = next;
        dist = next_dist;
    }

    let mut result = vec![UNREACHABLE; n];
    for v in graph.vertices() {
        result[graph.get_vertex_index(v)] = graph.get_data(v);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::dist_csr::{DistLocalCsr as Dlcsr, EdgeRecord, VertexRecord};
    use crate::place;

    fn chain_graph() -> MirrorDistLocalCsr<u64, ()> {
        // S5: 1->2->3->4->5 directed chain, plus a shortcut 1->4 so vertex 4's shortest hop is 1.
        // 2 physical nodes forces some of these edges to cross a node boundary and materialize
        // mirrors, exercising the sync path.
        place::init(
            place::PlaceDims {
                nodes: 2,
                pods_per_node: 1,
                cores_per_pod: 1,
            },
            place::ThreadDims { threads_per_core: 1 },
        );
        let vertices: Vec<VertexRecord<u64>> = (1..=5u64).map(|t| (t, 0)).collect();
        let edges: Vec<EdgeRecord<()>> = vec![(1, 2, ()), (2, 3, ()), (3, 4, ()), (4, 5, ()), (1, 4, ())];
        let dlcsr = Dlcsr::build(2, 3, vertices, edges).handle();
        MirrorDistLocalCsr::build(dlcsr).handle()
    }

    #[test]
    fn distances_follow_shortest_path() {
        let g = chain_graph();
        let distances = bfs(&g, 1);
        let dist_of = |token: u64| distances[g.get_vertex_index(g.get_topology_id(token))];
        assert_eq!(dist_of(1), 0);
        assert_eq!(dist_of(2), 1);
        assert_eq!(dist_of(3), 2);
        assert_eq!(dist_of(4), 1);
        assert_eq!(dist_of(5), 2);
    }

    #[test]
    fn unreached_vertex_stays_at_sentinel() {
        place::init_default();
        let vertices: Vec<VertexRecord<u64>> = vec![(1, 0), (2, 0), (3, 0)];
        let edges: Vec<EdgeRecord<()>> = vec![(1, 2, ())];
        let dlcsr = Dlcsr::build(1, 1, vertices, edges).handle();
        let g = MirrorDistLocalCsr::build(dlcsr).handle();
        let distances = bfs(&g, 1);
        let dist_of = |token: u64| distances[g.get_vertex_index(g.get_topology_id(token))];
        assert_eq!(dist_of(1), 0);
        assert_eq!(dist_of(2), 1);
        assert_eq!(dist_of(3), UNREACHABLE);
    }
}
