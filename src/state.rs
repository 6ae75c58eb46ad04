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

use hashbrown::{hash_map::Entry, HashMap};

use rustworkx_core::petgraph::stable_graph::NodeIndex;
use rustworkx_core::petgraph::visit::{
    EdgeCount, EdgeRef, GraphBase, GraphProp, IntoEdgeReferences, IntoEdgesDirected,
    IntoNeighborsDirected, IntoNodeIdentifiers, NodeCount, NodeIndexable,
};
use rustworkx_core::petgraph::{Incoming, Outgoing};

use crate::label::group_by_label;

/// The search-time view of one of the two graphs.
///
/// Everything the candidate, feasibility and ordering code touches in a hot loop lives here as a
/// dense vector indexed by node index: interned labels, degrees, self-loop multiplicities, the
/// partial mapping, and the frontier marks.  The only hash lookup left is edge multiplicity.
#[derive(Debug)]
pub(crate) struct GraphState<'g, G> {
    pub graph: &'g G,
    /// Real nodes of the graph in ascending index order.
    pub nodes: Vec<NodeIndex>,
    /// Interned label id of each node.
    pub labels: Vec<usize>,
    /// Nodes grouped by interned label id, each group in ascending index order.
    pub nodes_by_label: Vec<Vec<NodeIndex>>,
    /// Out-degree, counting parallel edges.  For undirected graphs this is the full degree.
    pub dout: Vec<usize>,
    /// In-degree, counting parallel edges.  Empty for undirected graphs.
    pub din: Vec<usize>,
    /// Multiplicity of the self-loop at each node (0 for most).
    pub self_loops: Vec<usize>,
    /// The current mapping from indices in this graph to indices in the other graph.  If a node
    /// is not yet mapped, the other index is stored as `NodeIndex::end`.
    pub mapping: Vec<NodeIndex>,
    /// Mapping from node index to the generation at which a node first gained a mapped neighbor
    /// with an edge towards it.  Unmapped nodes with a non-zero entry form the out-frontier;
    /// tracking the generation lets a pop remove exactly the marks its push created.
    out: Vec<usize>,
    /// Same as `out` for edges from the node into the mapping.  Empty for undirected graphs,
    /// where it would just duplicate `out`.
    ins: Vec<usize>,
    /// The number of non-zero entries in `out`.
    pub out_size: usize,
    /// The number of non-zero entries in `ins`.  Always zero for undirected graphs.
    pub ins_size: usize,
    /// The edge multiplicity of a given node pair.  If the graph is directed, the keys are
    /// `(source, target)`.  If the graph is undirected, the keys are always in sorted order and
    /// the multiplicity covers both "directions" of the edge.
    adjacency: HashMap<(NodeIndex, NodeIndex), usize>,
    /// Does this graph carry parallel edges?
    pub multigraph: bool,
    /// The number of nodes currently in the mapping.
    pub generation: usize,
}

impl<'g, G> GraphState<'g, G>
where
    G: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
{
    pub fn new(graph: &'g G, labels: Vec<usize>, num_labels: usize) -> Self {
        let bound = graph.node_bound();
        let directed = graph.is_directed();

        let mut nodes: Vec<NodeIndex> = graph.node_identifiers().collect();
        nodes.sort_unstable();
        let nodes_by_label = group_by_label(&labels, num_labels, &nodes);

        let mut adjacency = HashMap::with_capacity(graph.edge_count());
        let mut self_loops = vec![0; bound];
        let mut multigraph = false;
        for edge in graph.edge_references() {
            if edge.source() == edge.target() {
                self_loops[edge.source().index()] += 1;
            }
            let item = if directed || edge.source() <= edge.target() {
                (edge.source(), edge.target())
            } else {
                (edge.target(), edge.source())
            };
            match adjacency.entry(item) {
                Entry::Vacant(entry) => {
                    entry.insert(1);
                }
                Entry::Occupied(mut entry) => {
                    multigraph = true;
                    *entry.get_mut() += 1;
                }
            }
        }

        let mut dout = vec![0; bound];
        let mut din = vec![0; if directed { bound } else { 0 }];
        for &node in &nodes {
            dout[node.index()] = graph.neighbors_directed(node, Outgoing).count();
            if directed {
                din[node.index()] = graph.neighbors_directed(node, Incoming).count();
            }
        }

        GraphState {
            graph,
            nodes,
            labels,
            nodes_by_label,
            dout,
            din,
            self_loops,
            mapping: vec![NodeIndex::end(); bound],
            out: vec![0; bound],
            ins: vec![0; if directed { bound } else { 0 }],
            out_size: 0,
            ins_size: 0,
            adjacency,
            multigraph,
            generation: 0,
        }
    }

    /// Is every node in the graph mapped?
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.generation == self.nodes.len()
    }

    #[inline]
    pub fn is_mapped(&self, node: NodeIndex) -> bool {
        self.mapping[node.index()] != NodeIndex::end()
    }

    /// Is this node in the out-frontier `T` (unmapped, with an edge from the mapping to it)?
    /// For undirected graphs this is the whole frontier.
    #[inline]
    pub fn in_frontier_out(&self, node: NodeIndex) -> bool {
        self.out[node.index()] > 0 && !self.is_mapped(node)
    }

    /// Is this node in the in-frontier `T_in` (unmapped, with an edge from it into the mapping)?
    #[inline]
    pub fn in_frontier_in(&self, node: NodeIndex) -> bool {
        !self.ins.is_empty() && self.ins[node.index()] > 0 && !self.is_mapped(node)
    }

    /// Is this node in the rest set `T~` (unmapped, with no mapped neighbor in any direction)?
    #[inline]
    pub fn in_rest(&self, node: NodeIndex) -> bool {
        let index = node.index();
        self.out[index] == 0
            && (self.ins.is_empty() || self.ins[index] == 0)
            && !self.is_mapped(node)
    }

    /// The (in, out) degree pair of a node; the in component is 0 for undirected graphs.
    #[inline]
    pub fn degree(&self, node: NodeIndex) -> (usize, usize) {
        let index = node.index();
        (
            self.din.get(index).copied().unwrap_or(0),
            self.dout[index],
        )
    }

    /// Add a new entry into the mapping.
    pub fn push_mapping(&mut self, ours: NodeIndex, theirs: NodeIndex) {
        self.generation += 1;
        debug_assert_eq!(self.mapping[ours.index()], NodeIndex::end());
        self.mapping[ours.index()] = theirs;
        // Mark any nodes that are newly neighbors of the set of mapped nodes.  To be _newly_ a
        // neighbor, it must not already be a neighbor.
        for ix in self.graph.neighbors_directed(ours, Outgoing) {
            if self.out[ix.index()] == 0 {
                self.out[ix.index()] = self.generation;
                self.out_size += 1;
            }
        }
        if self.graph.is_directed() {
            for ix in self.graph.neighbors_directed(ours, Incoming) {
                if self.ins[ix.index()] == 0 {
                    self.ins[ix.index()] = self.generation;
                    self.ins_size += 1;
                }
            }
        }
    }

    /// Undo the mapping of node `ours`.  The node `ours` must be the last one given to
    /// `push_mapping` for this to make sense.
    pub fn pop_mapping(&mut self, ours: NodeIndex) {
        // Any neighbors of ours that became neighbors of the mapping at our generation are no
        // longer neighbors of the mapping, since all the nodes that were added after us have
        // already been popped.
        for ix in self.graph.neighbors_directed(ours, Outgoing) {
            if self.out[ix.index()] == self.generation {
                self.out[ix.index()] = 0;
                self.out_size -= 1;
            }
        }
        if self.graph.is_directed() {
            for ix in self.graph.neighbors_directed(ours, Incoming) {
                if self.ins[ix.index()] == self.generation {
                    self.ins[ix.index()] = 0;
                    self.ins_size -= 1;
                }
            }
        }
        self.mapping[ours.index()] = NodeIndex::end();
        self.generation -= 1;
    }

    /// Number of edges from `source` to `target` (including the reverse, if the graph is
    /// undirected).  0 if the nodes are not adjacent.
    #[inline]
    pub fn edge_multiplicity(&self, source: NodeIndex, target: NodeIndex) -> usize {
        let item = if self.graph.is_directed() || source <= target {
            (source, target)
        } else {
            (target, source)
        };
        *self.adjacency.get(&item).unwrap_or(&0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rustworkx_core::petgraph::graph::{DiGraph, UnGraph};

    fn path3() -> UnGraph<(), ()> {
        let mut graph = UnGraph::new_undirected();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        graph.add_edge(a, b, ());
        graph.add_edge(b, c, ());
        graph
    }

    #[test]
    fn frontier_marks_follow_push_and_pop() {
        let graph = path3();
        let labels = vec![0; 3];
        let mut state = GraphState::new(&graph, labels, 1);
        let (a, b, c) = (NodeIndex::new(0), NodeIndex::new(1), NodeIndex::new(2));

        assert!(state.in_rest(a) && state.in_rest(b) && state.in_rest(c));

        state.push_mapping(b, NodeIndex::new(0));
        assert!(state.is_mapped(b));
        assert!(state.in_frontier_out(a) && state.in_frontier_out(c));
        assert!(!state.in_rest(a) && !state.in_rest(c));
        assert_eq!(state.out_size, 2);

        state.push_mapping(a, NodeIndex::new(1));
        // `a` keeps its mark but is no longer frontier once mapped.
        assert!(!state.in_frontier_out(a));
        assert!(state.in_frontier_out(c));

        state.pop_mapping(a);
        assert!(state.in_frontier_out(a));
        state.pop_mapping(b);
        assert!(state.in_rest(a) && state.in_rest(b) && state.in_rest(c));
        assert_eq!(state.out_size, 0);
        assert_eq!(state.generation, 0);
    }

    #[test]
    fn multiplicity_index_detects_parallel_edges_and_loops() {
        let mut graph = UnGraph::<(), ()>::new_undirected();
        let a = graph.add_node(());
        let b = graph.add_node(());
        graph.add_edge(a, b, ());
        graph.add_edge(b, a, ());
        graph.add_edge(a, a, ());

        let state = GraphState::new(&graph, vec![0; 2], 1);
        assert!(state.multigraph);
        assert_eq!(state.edge_multiplicity(a, b), 2);
        assert_eq!(state.edge_multiplicity(b, a), 2);
        assert_eq!(state.edge_multiplicity(a, a), 1);
        assert_eq!(state.self_loops[a.index()], 1);
        assert_eq!(state.self_loops[b.index()], 0);
    }

    #[test]
    fn directed_state_splits_frontiers() {
        let mut graph = DiGraph::<(), ()>::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        graph.add_edge(a, b, ());
        graph.add_edge(c, a, ());

        let mut state = GraphState::new(&graph, vec![0; 3], 1);
        assert_eq!(state.degree(a), (1, 1));
        state.push_mapping(a, NodeIndex::new(0));
        assert!(state.in_frontier_out(b) && !state.in_frontier_in(b));
        assert!(state.in_frontier_in(c) && !state.in_frontier_out(c));
        assert_eq!((state.out_size, state.ins_size), (1, 1));
    }
}
