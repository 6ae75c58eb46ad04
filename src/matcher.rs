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

use hashbrown::HashMap;
use indexmap::IndexMap;
use itertools::Itertools;
use smallvec::SmallVec;

use rustworkx_core::petgraph::stable_graph::NodeIndex;
use rustworkx_core::petgraph::visit::{
    EdgeCount, GraphBase, GraphProp, IntoEdgesDirected, IntoNeighborsDirected,
    IntoNodeIdentifiers, NodeCount, NodeIndexable,
};
use rustworkx_core::petgraph::{Direction, Incoming, Outgoing};

use rayon::slice::ParallelSliceMut;

use crate::error::InvalidInputError;
use crate::label::{LabelTable, NodeLabeller};
use crate::ordering::matching_order;
use crate::state::GraphState;

/// A complete node-to-node isomorphism witness, keyed by pattern-graph node in ascending index
/// order.  Each yield of [Vf2Algorithm] is an independent snapshot; resuming the search does not
/// mutate mappings already handed out.
pub type NodeMapping = IndexMap<NodeIndex, NodeIndex, ::ahash::RandomState>;

/// Return `true` if `g0` and `g1` are isomorphic under the given labellings.
///
/// The labellers must produce the same label type; use [crate::UniformLabel] on both sides for
/// pure structural isomorphism.  Mismatched directedness or multigraph-ness between the two
/// graphs is a configuration error, not a negative result.
pub fn is_isomorphic<G0, G1, L0, L1>(
    g0: &G0,
    g1: &G1,
    labeller0: L0,
    labeller1: L1,
) -> Result<bool, InvalidInputError>
where
    G0: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G0:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
    G1: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G1:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
    L0: NodeLabeller<G0>,
    L1: NodeLabeller<G1, Label = L0::Label>,
{
    Ok(Vf2Algorithm::new(g0, g1, labeller0, labeller1)?
        .next()
        .is_some())
}

/// Return the first isomorphism found between `g0` and `g1`, if any.
///
/// The full search completes before `Ok(None)` is returned; "no isomorphism" always means
/// "proved impossible", whether by the precheck or by exhaustion.
pub fn find_mapping<G0, G1, L0, L1>(
    g0: &G0,
    g1: &G1,
    labeller0: L0,
    labeller1: L1,
) -> Result<Option<NodeMapping>, InvalidInputError>
where
    G0: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G0:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
    G1: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G1:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
    L0: NodeLabeller<G0>,
    L1: NodeLabeller<G1, Label = L0::Label>,
{
    Ok(Vf2Algorithm::new(g0, g1, labeller0, labeller1)?.next())
}

/// One level of the backtracking search: the pattern node mapped at this depth, its candidate
/// partners in deterministic order, a cursor into them, and the partner currently committed (if
/// any).  A frame whose pair is committed is resumable; advancing it first retracts the pair.
#[derive(Debug)]
struct Frame {
    node: NodeIndex,
    candidates: Vec<NodeIndex>,
    pos: usize,
    chosen: Option<NodeIndex>,
}

#[inline]
fn directions(directed: bool) -> &'static [Direction] {
    if directed {
        &[Outgoing, Incoming]
    } else {
        &[Outgoing]
    }
}

/// Per-label-class statistics of a node's neighborhood in one direction, used by the cutting
/// rule: how many same-label neighbors sit in the frontier sets and the rest set, and the edge
/// multiplicities towards them (multigraphs only; left unsorted until compared).
#[derive(Default)]
struct ClassStats {
    frontier_out: usize,
    frontier_in: usize,
    rest: usize,
    multiplicities: SmallVec<[usize; 4]>,
}

fn neighborhood_stats<G>(
    st: &GraphState<'_, G>,
    node: NodeIndex,
    direction: Direction,
    multigraph: bool,
) -> HashMap<usize, ClassStats>
where
    G: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
{
    let mut stats: HashMap<usize, ClassStats> = HashMap::new();
    // Parallel edges repeat neighbors; the partition is over distinct neighbors.
    for nbr in st
        .graph
        .neighbors_directed(node, direction)
        .sorted_unstable()
        .dedup()
    {
        let entry = stats.entry(st.labels[nbr.index()]).or_default();
        if multigraph {
            let multiplicity = match direction {
                Outgoing => st.edge_multiplicity(node, nbr),
                Incoming => st.edge_multiplicity(nbr, node),
            };
            entry.multiplicities.push(multiplicity);
        }
        if st.in_frontier_out(nbr) {
            entry.frontier_out += 1;
        }
        if st.in_frontier_in(nbr) {
            entry.frontier_in += 1;
        }
        if st.in_rest(nbr) {
            entry.rest += 1;
        }
    }
    stats
}

/// An iterator which uses the VF2++ algorithm to produce every isomorphism between two graphs,
/// one defensive snapshot per call to `next`.
///
/// Construction interns the labels, runs the structural precheck and computes the pattern
/// visitation order; iteration runs the backtracking search with an explicit stack, so a partial
/// search can be abandoned at any yield with no cleanup.  Output order is deterministic for a
/// fixed pair of inputs.
pub struct Vf2Algorithm<'g, G0, G1> {
    st: (GraphState<'g, G0>, GraphState<'g, G1>),
    order: Vec<NodeIndex>,
    stack: Vec<Frame>,
    viable: bool,
    started: bool,
    exhausted: bool,
}

impl<'g, G0, G1> Vf2Algorithm<'g, G0, G1>
where
    G0: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G0:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
    G1: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G1:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
{
    pub fn new<L0, L1>(
        g0: &'g G0,
        g1: &'g G1,
        labeller0: L0,
        labeller1: L1,
    ) -> Result<Self, InvalidInputError>
    where
        L0: NodeLabeller<G0>,
        L1: NodeLabeller<G1, Label = L0::Label>,
    {
        if g0.is_directed() != g1.is_directed() {
            return Err(InvalidInputError::DirectednessMismatch);
        }

        // Labels from both graphs share one table so the interned ids are comparable.
        let mut table = LabelTable::new();
        let mut nodes0: Vec<NodeIndex> = g0.node_identifiers().collect();
        nodes0.sort_unstable();
        let mut labels0 = vec![0usize; g0.node_bound()];
        for &node in &nodes0 {
            labels0[node.index()] = table.intern(labeller0.label(g0, node));
        }
        let mut nodes1: Vec<NodeIndex> = g1.node_identifiers().collect();
        nodes1.sort_unstable();
        let mut labels1 = vec![0usize; g1.node_bound()];
        for &node in &nodes1 {
            labels1[node.index()] = table.intern(labeller1.label(g1, node));
        }
        let num_labels = table.len();

        let st0 = GraphState::new(g0, labels0, num_labels);
        let st1 = GraphState::new(g1, labels1, num_labels);
        if st0.multigraph != st1.multigraph {
            return Err(InvalidInputError::MultigraphMismatch);
        }

        // Label rarity in the target graph; consumed by the ordering heuristic and compared
        // against the pattern's distribution in the precheck.
        let mut rarity = vec![0usize; num_labels];
        for &node in &st1.nodes {
            rarity[st1.labels[node.index()]] += 1;
        }

        let viable = Self::precheck(&st0, &st1, num_labels, &rarity);
        let order = if viable {
            matching_order(&st0, rarity)
        } else {
            Vec::new()
        };
        let stack = Vec::with_capacity(order.len());

        Ok(Vf2Algorithm {
            st: (st0, st1),
            order,
            stack,
            viable,
            started: false,
            exhausted: false,
        })
    }

    /// Fast necessary conditions, checked once before any search work.  Failure here is an
    /// ordinary negative result: the search is skipped and the iterator is simply empty.
    fn precheck(
        st0: &GraphState<'_, G0>,
        st1: &GraphState<'_, G1>,
        num_labels: usize,
        rarity1: &[usize],
    ) -> bool {
        if st0.nodes.len() != st1.nodes.len()
            || st0.graph.edge_count() != st1.graph.edge_count()
        {
            return false;
        }
        let mut degrees0: Vec<(usize, usize)> = st0.nodes.iter().map(|&n| st0.degree(n)).collect();
        let mut degrees1: Vec<(usize, usize)> = st1.nodes.iter().map(|&n| st1.degree(n)).collect();
        degrees0.par_sort_unstable();
        degrees1.par_sort_unstable();
        if degrees0 != degrees1 {
            return false;
        }
        let mut counts0 = vec![0usize; num_labels];
        for &node in &st0.nodes {
            counts0[st0.labels[node.index()]] += 1;
        }
        counts0 == rarity1
    }

    /// Compute the viable partners for `ours`, in ascending index order.
    ///
    /// When `ours` has no mapped neighbor yet (the first vertex of a new connected region), its
    /// partner must come from the rest set `T2~`, filtered down to matching label, degree and
    /// self-loop multiplicity.  Otherwise, a partner must be adjacent (with the right edge
    /// direction) to the image of every mapped neighbor of `ours`, plus the same filters.
    fn candidates(&self, ours: NodeIndex) -> Vec<NodeIndex> {
        let st0 = &self.st.0;
        let st1 = &self.st.1;
        let ui = ours.index();

        // Images of ours's mapped neighbors, tagged with whether the edge points away from ours.
        let mut anchors: Vec<(NodeIndex, bool)> = Vec::new();
        for nbr in st0.graph.neighbors_directed(ours, Outgoing) {
            if st0.is_mapped(nbr) {
                anchors.push((st0.mapping[nbr.index()], true));
            }
        }
        if st0.graph.is_directed() {
            for nbr in st0.graph.neighbors_directed(ours, Incoming) {
                if st0.is_mapped(nbr) {
                    anchors.push((st0.mapping[nbr.index()], false));
                }
            }
        }
        anchors.sort_unstable();
        anchors.dedup();

        let accept = |cand: NodeIndex| -> bool {
            let ci = cand.index();
            !st1.is_mapped(cand)
                && st1.labels[ci] == st0.labels[ui]
                && st1.degree(cand) == st0.degree(ours)
                && st1.self_loops[ci] == st0.self_loops[ui]
        };

        match anchors.split_first() {
            None => st1.nodes_by_label[st0.labels[ui]]
                .iter()
                .copied()
                .filter(|&cand| st1.in_rest(cand) && accept(cand))
                .collect(),
            Some((&(first_image, first_outgoing), rest)) => {
                // An edge ours -> nbr means the partner needs an edge towards the image, so the
                // partner is found among the image's predecessors; and vice versa.
                let direction = if first_outgoing { Incoming } else { Outgoing };
                let mut candidates: Vec<NodeIndex> = st1
                    .graph
                    .neighbors_directed(first_image, direction)
                    .filter(|&cand| accept(cand))
                    .sorted_unstable()
                    .dedup()
                    .collect();
                candidates.retain(|&cand| {
                    rest.iter().all(|&(image, outgoing)| {
                        let multiplicity = if outgoing {
                            st1.edge_multiplicity(cand, image)
                        } else {
                            st1.edge_multiplicity(image, cand)
                        };
                        multiplicity > 0
                    })
                });
                candidates
            }
        }
    }

    /// Would adding this pair keep the partial mapping extendable to a full solution?
    ///
    /// Consistency is the precise part: it must cut whenever the pair contradicts an edge that
    /// is already committed.  The cutting rule is lookahead only: it may keep a doomed branch,
    /// never reject a viable one.
    fn is_feasible(&self, ours: NodeIndex, theirs: NodeIndex) -> bool {
        let directed = self.st.0.graph.is_directed();
        for &direction in directions(directed) {
            if !self.consistent_in_direction(ours, theirs, direction) {
                return false;
            }
        }
        for &direction in directions(directed) {
            if self.cut_in_direction(ours, theirs, direction) {
                return false;
            }
        }
        true
    }

    /// Every mapped neighbor of `ours` must agree on edge multiplicity with `theirs`'s view of
    /// its image, and symmetrically through the reverse mapping.  Self-loops are matched by the
    /// candidate filter, not here.
    fn consistent_in_direction(
        &self,
        ours: NodeIndex,
        theirs: NodeIndex,
        direction: Direction,
    ) -> bool {
        let st0 = &self.st.0;
        let st1 = &self.st.1;
        for nbr in st0.graph.neighbors_directed(ours, direction) {
            if nbr == ours || !st0.is_mapped(nbr) {
                continue;
            }
            let image = st0.mapping[nbr.index()];
            let (ours_mult, theirs_mult) = match direction {
                Outgoing => (
                    st0.edge_multiplicity(ours, nbr),
                    st1.edge_multiplicity(theirs, image),
                ),
                Incoming => (
                    st0.edge_multiplicity(nbr, ours),
                    st1.edge_multiplicity(image, theirs),
                ),
            };
            if ours_mult != theirs_mult {
                return false;
            }
        }
        for nbr in st1.graph.neighbors_directed(theirs, direction) {
            if nbr == theirs || !st1.is_mapped(nbr) {
                continue;
            }
            let preimage = st1.mapping[nbr.index()];
            let (theirs_mult, ours_mult) = match direction {
                Outgoing => (
                    st1.edge_multiplicity(theirs, nbr),
                    st0.edge_multiplicity(ours, preimage),
                ),
                Incoming => (
                    st1.edge_multiplicity(nbr, theirs),
                    st0.edge_multiplicity(preimage, ours),
                ),
            };
            if ours_mult != theirs_mult {
                return false;
            }
        }
        true
    }

    /// The VF2++ one-step lookahead.  Partition both neighborhoods by label; reject when the
    /// label-class keys differ, when any class disagrees on frontier/rest membership counts, or
    /// (for multigraphs) when a class's sorted multiplicity sequences differ.
    fn cut_in_direction(&self, ours: NodeIndex, theirs: NodeIndex, direction: Direction) -> bool {
        let directed = self.st.0.graph.is_directed();
        let multigraph = self.st.0.multigraph;
        let mut stats0 = neighborhood_stats(&self.st.0, ours, direction, multigraph);
        let mut stats1 = neighborhood_stats(&self.st.1, theirs, direction, multigraph);
        if stats0.len() != stats1.len() {
            return true;
        }
        for (label, class0) in stats0.iter_mut() {
            let Some(class1) = stats1.get_mut(label) else {
                return true;
            };
            if class0.frontier_out != class1.frontier_out
                || class0.rest != class1.rest
                || (directed && class0.frontier_in != class1.frontier_in)
            {
                return true;
            }
            if multigraph {
                class0.multiplicities.sort_unstable();
                class1.multiplicities.sort_unstable();
                if class0.multiplicities != class1.multiplicities {
                    return true;
                }
            }
        }
        false
    }

    /// Add a new pair of nodes to the mapping.
    fn push_state(&mut self, ours: NodeIndex, theirs: NodeIndex) {
        self.st.0.push_mapping(ours, theirs);
        self.st.1.push_mapping(theirs, ours);
    }

    /// Remove this pair of nodes from the mapping.  The pair must be on top of the stack of
    /// pushes.
    fn pop_state(&mut self, ours: NodeIndex, theirs: NodeIndex) {
        self.st.1.pop_mapping(theirs);
        self.st.0.pop_mapping(ours);
    }

    /// Snapshot the (complete) mapping, keyed by pattern node in ascending index order.
    fn mapping(&self) -> NodeMapping {
        self.st
            .0
            .nodes
            .iter()
            .map(|&node| {
                let image = self.st.0.mapping[node.index()];
                debug_assert!(image != NodeIndex::end());
                (node, image)
            })
            .collect()
    }
}

impl<G0, G1> Iterator for Vf2Algorithm<'_, G0, G1>
where
    G0: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G0:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
    G1: GraphProp + GraphBase<NodeId = NodeIndex> + NodeCount + EdgeCount,
    for<'a> &'a G1:
        GraphBase<NodeId = NodeIndex> + IntoEdgesDirected + IntoNodeIdentifiers + NodeIndexable,
{
    type Item = NodeMapping;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        if !self.started {
            self.started = true;
            if !self.viable {
                self.exhausted = true;
                return None;
            }
            if self.st.0.nodes.is_empty() {
                // Two empty graphs: the empty mapping is the unique isomorphism.
                self.exhausted = true;
                return Some(NodeMapping::default());
            }
            let first = self.order[0];
            let candidates = self.candidates(first);
            self.stack.push(Frame {
                node: first,
                candidates,
                pos: 0,
                chosen: None,
            });
        } else {
            // Re-entry immediately after a yield: the top frame still holds the pair that
            // completed the mapping.  Retract it and resume scanning that frame's candidates.
            let retract = self
                .stack
                .last_mut()
                .and_then(|frame| frame.chosen.take().map(|theirs| (frame.node, theirs)));
            if let Some((ours, theirs)) = retract {
                self.pop_state(ours, theirs);
            }
        }

        loop {
            let Some(top) = self.stack.last() else {
                self.exhausted = true;
                return None;
            };
            let ours = top.node;

            let mut accepted = None;
            loop {
                let frame = self.stack.last_mut().unwrap();
                if frame.pos == frame.candidates.len() {
                    break;
                }
                let theirs = frame.candidates[frame.pos];
                frame.pos += 1;
                if self.is_feasible(ours, theirs) {
                    accepted = Some(theirs);
                    break;
                }
            }

            match accepted {
                Some(theirs) => {
                    self.push_state(ours, theirs);
                    self.stack.last_mut().unwrap().chosen = Some(theirs);
                    if self.st.0.is_complete() {
                        return Some(self.mapping());
                    }
                    let next_node = self.order[self.stack.len()];
                    let candidates = self.candidates(next_node);
                    self.stack.push(Frame {
                        node: next_node,
                        candidates,
                        pos: 0,
                        chosen: None,
                    });
                }
                None => {
                    // This frame is exhausted; backtrack one level and retract the pair the
                    // parent had committed.
                    self.stack.pop();
                    let retract = self
                        .stack
                        .last_mut()
                        .and_then(|frame| frame.chosen.take().map(|theirs| (frame.node, theirs)));
                    if let Some((ours, theirs)) = retract {
                        self.pop_state(ours, theirs);
                    }
                }
            }
        }
    }
}
