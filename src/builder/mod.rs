// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Conversion of profile-processed OSM data into an edge-expanded [Graph](crate::graph::Graph).
//!
//! The pipeline runs in three phases: [junction map](JunctionMap) construction
//! (with contraction of shape-only nodes), [restriction map](RestrictionMap)
//! construction, and edge expansion, which evaluates every maneuver at every
//! junction with a caller-provided turn cost function.

use crate::osm::{NodeId, WayId};

mod data;
mod expand;
mod junctions;
mod restrictions;

pub use data::OsmData;
pub use expand::{expand, Turn};
pub use junctions::{build_junctions, contract, Edge, Junction, JunctionMap};
pub use restrictions::{Restriction, RestrictionKind, RestrictionMap};

/// Non-fatal problem with the input data. The offending element is skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("{way} references missing {node}")]
    MissingNode { node: NodeId, way: WayId },

    #[error("{0} has less than 2 nodes")]
    MalformedWay(WayId),

    #[error("no position for maneuver {from} -> {via} -> {to}")]
    MissingEdge {
        from: NodeId,
        via: NodeId,
        to: NodeId,
    },
}
