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

//! An implementation of the VF2++ algorithm for deciding graph isomorphism.
//!
//! The engine decides whether two graphs admit a structure-preserving bijection between their
//! node sets, optionally constrained by node labels and, for multigraphs, by parallel-edge
//! multiplicities.  Directed and undirected graphs are handled uniformly; the two inputs must
//! agree on directedness and on whether they carry parallel edges.
//!
//! The entry points are [is_isomorphic] for a yes/no answer, [find_mapping] for a single
//! witness, and [Vf2Algorithm] for lazy enumeration of every isomorphism:
//!
//! ```rust
//! use rustworkx_core::petgraph::graph::UnGraph;
//! use vf2pp::{find_mapping, UniformLabel};
//!
//! let mut g0 = UnGraph::<(), ()>::new_undirected();
//! let a = g0.add_node(());
//! let b = g0.add_node(());
//! g0.add_edge(a, b, ());
//! let g1 = g0.clone();
//!
//! let mapping = find_mapping(&g0, &g1, UniformLabel, UniformLabel)
//!     .unwrap()
//!     .expect("a graph is isomorphic to itself");
//! assert_eq!(mapping.len(), 2);
//! ```
//!
//! Node labels are supplied through the [NodeLabeller] trait; any `Fn(&NodeWeight) -> L`
//! closure works directly, [UniformLabel] ignores weights entirely, and [AttributeKeys] reads
//! named entries out of map-valued weights.

mod error;
mod label;
mod matcher;
mod ordering;
mod state;

pub use error::InvalidInputError;
pub use label::{AttributeKeys, NodeLabeller, UniformLabel};
pub use matcher::{find_mapping, is_isomorphic, NodeMapping, Vf2Algorithm};
