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

use thiserror::Error;

/// Error cases stemming from graph configuration at the point of entry into the matcher.
///
/// These cover mismatches that make the two graphs incomparable, not mismatches that make them
/// non-isomorphic; the latter are ordinary negative results and are reported as an empty match
/// sequence, never as an error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidInputError {
    #[error("cannot compare a directed graph against an undirected graph")]
    DirectednessMismatch,
    #[error("cannot compare a graph with parallel edges against one without")]
    MultigraphMismatch,
}
