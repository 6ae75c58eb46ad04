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

use std::hash::Hash;

use hashbrown::HashMap;
use indexmap::IndexSet;
use smallvec::SmallVec;

use rustworkx_core::petgraph::data::DataMap;
use rustworkx_core::petgraph::stable_graph::NodeIndex;
use rustworkx_core::petgraph::visit::{Data, GraphBase};

/// Assignment of a matching label to every node of a graph.
///
/// Two nodes may be paired by the matcher only if their labels compare equal.  The label type
/// must be totally ordered so that grouping and rarity tie-breaks are deterministic.
pub trait NodeLabeller<G: GraphBase> {
    type Label: Clone + Eq + Hash + Ord;

    fn label(&self, graph: &G, node: G::NodeId) -> Self::Label;
}

/// Every node shares a single label; matching is purely structural.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformLabel;

impl<G: GraphBase> NodeLabeller<G> for UniformLabel {
    type Label = ();

    #[inline]
    fn label(&self, _graph: &G, _node: G::NodeId) -> Self::Label {}
}

/// Any `Fn(&NodeWeight) -> L` closure labels nodes by their weights.
impl<G, F, L> NodeLabeller<G> for F
where
    G: GraphBase + DataMap,
    F: Fn(&G::NodeWeight) -> L,
    L: Clone + Eq + Hash + Ord,
{
    type Label = L;

    fn label(&self, graph: &G, node: G::NodeId) -> Self::Label {
        self(graph.node_weight(node).unwrap())
    }
}

/// Labels drawn from named attributes of map-valued node weights.
///
/// A node's label is the tuple of its values for the requested keys, in key order.  A node
/// missing one of the keys uses the default value for that position, so the assignment stays
/// total over both graphs.
#[derive(Clone, Debug)]
pub struct AttributeKeys<V> {
    keys: Vec<String>,
    default: V,
}

impl<V> AttributeKeys<V> {
    pub fn new<I, K>(keys: I, default: V) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        AttributeKeys {
            keys: keys.into_iter().map(Into::into).collect(),
            default,
        }
    }
}

impl<G, V> NodeLabeller<G> for AttributeKeys<V>
where
    G: GraphBase + DataMap + Data<NodeWeight = HashMap<String, V>>,
    V: Clone + Eq + Hash + Ord,
{
    type Label = SmallVec<[V; 2]>;

    fn label(&self, graph: &G, node: G::NodeId) -> Self::Label {
        let attrs = graph.node_weight(node).unwrap();
        self.keys
            .iter()
            .map(|key| attrs.get(key).cloned().unwrap_or_else(|| self.default.clone()))
            .collect()
    }
}

/// Interns labels from both graphs into dense ids.
///
/// Ids are assigned by first insertion, so they are deterministic for a fixed pair of inputs;
/// all hot-path label handling downstream is plain vector indexing.
pub(crate) struct LabelTable<L> {
    table: IndexSet<L, ::ahash::RandomState>,
}

impl<L: Clone + Eq + Hash + Ord> LabelTable<L> {
    pub fn new() -> Self {
        LabelTable {
            table: IndexSet::with_hasher(::ahash::RandomState::default()),
        }
    }

    pub fn intern(&mut self, label: L) -> usize {
        self.table.insert_full(label).0
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}

/// Group nodes by interned label id.  `nodes` must be in ascending index order, which keeps
/// every group ascending as well.
pub(crate) fn group_by_label(
    labels: &[usize],
    num_labels: usize,
    nodes: &[NodeIndex],
) -> Vec<Vec<NodeIndex>> {
    let mut groups = vec![Vec::new(); num_labels];
    for &node in nodes {
        groups[labels[node.index()]].push(node);
    }
    groups
}
