//! Virtual-host → physical-node assignment (C6/C8).
//!
//! Every token is first hashed to one of `V = nodes * scale_factor` virtual hosts by `token % V`;
//! this table then maps each virtual host to one of the `nodes` physical nodes. Splitting the
//! assignment into two steps lets the balancer work at a finer grain than the physical node count,
//! which is what makes the LPT heuristic below effective on heavy-tailed degree distributions.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use more_asserts::assert_gt;

pub fn virtual_host_of(token: u64, num_virtual_hosts: usize) -> usize {
    (token % num_virtual_hosts as u64) as usize
}

/// Longest-processing-time bin packing: sort virtual hosts by descending load, then repeatedly
/// assign the heaviest remaining virtual host to the currently lightest physical node.
pub fn build_virtual_to_physical(virtual_host_loads: &[u64], num_physical: usize) -> Vec<usize> {
    assert_gt!(num_physical, 0, "at least one physical node is required");
    let mut order: Vec<usize> = (0..virtual_host_loads.len()).collect();
    order.sort_by_key(|&v| Reverse(virtual_host_loads[v]));

    let mut heap: BinaryHeap<Reverse<(u64, usize)>> =
        (0..num_physical).map(|node| Reverse((0u64, node))).collect();

    let mut mapping = vec![0usize; virtual_host_loads.len()];
    for virtual_host in order {
        let Reverse((load, node)) = heap.pop().expect("num_physical > 0");
        mapping[virtual_host] = node;
        heap.push(Reverse((load + virtual_host_loads[virtual_host], node)));
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balances_heavy_tailed_loads_within_lpt_bound() {
        // S2: virtual-host edge counts [1,3,2,1,2,1,1,1], 3 physical nodes.
        let loads = [1u64, 3, 2, 1, 2, 1, 1, 1];
        let mapping = build_virtual_to_physical(&loads, 3);
        let mut totals = vec![0u64; 3];
        for (vhost, &node) in mapping.iter().enumerate() {
            totals[node] += loads[vhost];
        }
        let total: u64 = loads.iter().sum();
        let max_edge = *loads.iter().max().unwrap();
        let bound = total / 3 + max_edge;
        assert!(totals.iter().all(|&t| t <= bound), "totals {totals:?} exceed LPT bound {bound}");
        let mut sorted = totals.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![3, 4, 5]);
    }

    #[test]
    fn single_physical_node_gets_everything() {
        let mapping = build_virtual_to_physical(&[5, 2, 9], 1);
        assert_eq!(mapping, vec![0, 0, 0]);
    }
}
