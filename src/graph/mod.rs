// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Edge-expanded routing graph: the in-memory form produced by the
//! [builder](crate::builder), its serializer, and a zero-copy read API
//! over the serialized sections.

use std::collections::{BTreeMap, BTreeSet};

use crate::osm::NodeId;

mod accessor;
mod error;
mod sections;
mod serialize;

pub use accessor::{Connection, GraphAccessor, DEFAULT_SNAP_DISTANCE};
pub use error::{AccessorError, SerializeError};
pub use sections::{
    CoordinatePrecision, IndexWidth, Layouts, GRAPH_CODEC, GRAPH_FORMAT, INDEX_TYPE_FLAG,
    SIGNATURE,
};
pub use serialize::{SerializeOptions, Serialized, WRITING_PROGRAM};

/// Identifies an edge of the original graph by its endpoint junctions.
pub type EdgeKey = (NodeId, NodeId);

/// A vertex of the edge-expanded graph: a directed stretch of road
/// between two junctions, with all legal maneuvers onto and off it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedEdge {
    /// All nodes between (and including) the start and end junction, in traversal order.
    pub nodes: Vec<NodeId>,

    /// Length in meters.
    pub length: f64,

    /// Maneuvers leaving this edge: end node of the next edge (which starts
    /// where this one ends) mapped to the cost of the maneuver.
    pub to: BTreeMap<NodeId, f64>,

    /// Maneuvers entering this edge: start node of the previous edge
    /// (which ends where this one starts) mapped to the cost of the maneuver.
    pub from: BTreeMap<NodeId, f64>,
}

/// Position of a node used by the [Graph], with all edges passing through it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphNode {
    pub lon: f64,
    pub lat: f64,
    pub edges: BTreeSet<EdgeKey>,
}

/// In-memory edge-expanded graph, ready to be [serialized](Graph::serialize).
///
/// `edges[a][b]` is the edge from junction `a` to junction `b`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub edges: BTreeMap<NodeId, BTreeMap<NodeId, ExpandedEdge>>,
    pub nodes: BTreeMap<NodeId, GraphNode>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&ExpandedEdge> {
        self.edges.get(&from).and_then(|e| e.get(&to))
    }

    /// Returns the total number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|e| e.len()).sum()
    }

    pub fn edge_keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges
            .iter()
            .flat_map(|(&from, tos)| tos.keys().map(move |&to| (from, to)))
    }

    /// Gets an edge, creating it if it doesn't exist yet. New edges register
    /// themselves on every node they pass through, with positions
    /// provided by `position` as `(lon, lat)`. Nodes without a position are skipped.
    pub fn edge_entry<F>(
        &mut self,
        key: EdgeKey,
        nodes: &[NodeId],
        length: f64,
        position: F,
    ) -> &mut ExpandedEdge
    where
        F: Fn(NodeId) -> Option<(f64, f64)>,
    {
        let (from, to) = key;
        let tos = self.edges.entry(from).or_default();

        if !tos.contains_key(&to) {
            for &node_id in nodes {
                let Some((lon, lat)) = position(node_id) else {
                    continue;
                };
                self.nodes
                    .entry(node_id)
                    .or_insert_with(|| GraphNode {
                        lon,
                        lat,
                        edges: BTreeSet::default(),
                    })
                    .edges
                    .insert(key);
            }
        }

        tos.entry(to).or_insert_with(|| ExpandedEdge {
            nodes: nodes.to_vec(),
            length,
            ..ExpandedEdge::default()
        })
    }

    /// Serializes the graph into the binary graph format.
    pub fn serialize(&self, options: &SerializeOptions) -> Result<Serialized, SerializeError> {
        serialize::serialize(self, options)
    }
}
