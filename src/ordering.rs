// This code is part of Qiskit.
//
// (C) Copyright IBM 2024
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

use std::cmp::Reverse;

use rustworkx_core::petgraph::stable_graph::NodeIndex;
use rustworkx_core::petgraph::visit::{
    EdgeCount, GraphBase, GraphProp, IntoEdgesDirected, IntoNeighborsDirected,
    IntoNodeIdentifiers, NodeCount, NodeIndexable,
};
use rustworkx_core::petgraph::{Incoming, Outgoing};

use crate::state::GraphState;

/// Compute the VF2++ visitation order for the pattern graph.
///
/// `rarity` holds, per interned label id, the number of target-graph nodes carrying that label;
/// it is decremented as pattern nodes are placed, so ties keep favoring labels whose remaining
/// supply is about to run out.
///
/// Seeds are the rarest-labeled remaining nodes (ties: highest degree, then lowest index); from
/// each seed the component is laid out in BFS layers, treating the graph as undirected.  Within
/// a layer, nodes are emitted by most already-placed neighbors, then highest total degree, then
/// rarest label, then lowest index.  Disconnected components restart the seeding.
pub(crate) fn matching_order<G>(st: &GraphState<'_, G>, mut rarity: Vec<usize>) -> Vec<NodeIndex>
where
    G: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
{
    let graph = st.graph;
    let directed = graph.is_directed();
    let bound = graph.node_bound();
    let total_degree = |ix: usize| st.dout[ix] + st.din.get(ix).copied().unwrap_or(0);

    // Number of already-placed neighbors of each unplaced node ("used degree").
    let mut conn = vec![0usize; bound];
    let mut seen = vec![false; bound];
    let mut order = Vec::with_capacity(st.nodes.len());

    // Emit one BFS layer in priority order, updating rarity and used degrees as we go.
    let mut process = |layer: &mut Vec<NodeIndex>, rarity: &mut [usize], conn: &mut [usize]| {
        for i in 0..layer.len() {
            let (offset, _) = layer[i..]
                .iter()
                .enumerate()
                .max_by_key(|&(_, &node)| {
                    let ix = node.index();
                    (
                        conn[ix],
                        total_degree(ix),
                        Reverse(rarity[st.labels[ix]]),
                        Reverse(ix),
                    )
                })
                .unwrap();
            layer.swap(i, i + offset);
            let node = layer[i];
            order.push(node);
            let label = st.labels[node.index()];
            rarity[label] = rarity[label].saturating_sub(1);
            for nbr in graph.neighbors_directed(node, Outgoing) {
                conn[nbr.index()] += 1;
            }
            if directed {
                for nbr in graph.neighbors_directed(node, Incoming) {
                    conn[nbr.index()] += 1;
                }
            }
        }
    };

    loop {
        // Seed a new connected exploration with the rarest-labeled remaining node.
        let Some(&seed) = st
            .nodes
            .iter()
            .filter(|node| !seen[node.index()])
            .min_by_key(|&&node| {
                let ix = node.index();
                (rarity[st.labels[ix]], Reverse(total_degree(ix)), ix)
            })
        else {
            break;
        };

        seen[seed.index()] = true;
        let mut layer = vec![seed];
        while !layer.is_empty() {
            process(&mut layer, &mut rarity, &mut conn);
            let mut next_layer = Vec::new();
            for &node in &layer {
                let mut visit = |nbr: NodeIndex| {
                    if !seen[nbr.index()] {
                        seen[nbr.index()] = true;
                        next_layer.push(nbr);
                    }
                };
                for nbr in graph.neighbors_directed(node, Outgoing) {
                    visit(nbr);
                }
                if directed {
                    for nbr in graph.neighbors_directed(node, Incoming) {
                        visit(nbr);
                    }
                }
            }
            layer = next_layer;
        }
    }

    order
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::GraphState;
    use rustworkx_core::petgraph::graph::UnGraph;

    #[test]
    fn high_degree_seed_comes_first() {
        // Star: center 0, leaves 1..=3, all one label.
        let mut graph = UnGraph::<(), ()>::new_undirected();
        let nodes: Vec<_> = (0..4).map(|_| graph.add_node(())).collect();
        for leaf in &nodes[1..] {
            graph.add_edge(nodes[0], *leaf, ());
        }
        let state = GraphState::new(&graph, vec![0; 4], 1);
        let order = matching_order(&state, vec![4]);
        assert_eq!(order[0], nodes[0]);
        assert_eq!(order.len(), 4);
        // Leaves are interchangeable; the tie-break is lowest index.
        assert_eq!(&order[1..], &nodes[1..]);
    }

    #[test]
    fn rare_label_outranks_degree_for_the_seed() {
        // Path 0-1-2-3; node 3 carries a label that is unique in the target.
        let mut graph = UnGraph::<(), ()>::new_undirected();
        let nodes: Vec<_> = (0..4).map(|_| graph.add_node(())).collect();
        for pair in nodes.windows(2) {
            graph.add_edge(pair[0], pair[1], ());
        }
        let state = GraphState::new(&graph, vec![0, 0, 0, 1], 2);
        let order = matching_order(&state, vec![3, 1]);
        assert_eq!(order[0], nodes[3]);
        // The rest follows BFS layers from the seed.
        assert_eq!(&order[1..], &[nodes[2], nodes[1], nodes[0]]);
    }

    #[test]
    fn disconnected_components_are_all_ordered() {
        let mut graph = UnGraph::<(), ()>::new_undirected();
        let nodes: Vec<_> = (0..5).map(|_| graph.add_node(())).collect();
        graph.add_edge(nodes[0], nodes[1], ());
        graph.add_edge(nodes[3], nodes[4], ());
        let state = GraphState::new(&graph, vec![0; 5], 1);
        let order = matching_order(&state, vec![5]);
        assert_eq!(order.len(), 5);
        let mut sorted: Vec<_> = order.iter().map(|n| n.index()).collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    }
}
