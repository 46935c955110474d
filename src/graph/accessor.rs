// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use super::sections::{
    CoordinatePrecision, IndexWidth, Layouts, CONNECTIONS_LIST, COORDINATE_PRECISION_FLAG, EDGES,
    EDGE_LIST, GRAPH_CODEC, INDEX, INDEX_SIZES_FLAG, INDEX_TYPE_FLAG, METADATA, NODES, NODE_LIST,
};
use super::AccessorError;
use crate::format::{ByteOrder, Column, Deserialized, Section, SectionDefinition};
use crate::kd::KDTree;
use crate::osm::NodeId;

/// Default distance, in meters, within which coordinates are snapped onto edges.
pub const DEFAULT_SNAP_DISTANCE: f64 = 50.0;

/// A maneuver between two edges, as stored in the connections list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Index of the connected edge.
    pub edge: usize,

    /// Cost of the maneuver, including the base cost of the departed edge.
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
struct NodeColumns {
    osm_id: Column<i64>,
    lon: Column<f64>,
    lat: Column<f64>,
    edge_list_index: Column<u64>,
    edge_list_length: Column<u64>,
}

#[derive(Debug, Clone, Copy)]
struct EdgeColumns {
    node_list_length: Column<u64>,
    to_length: Column<u64>,
    from_length: Column<u64>,
    length: Column<f64>,
    node_list_index: Column<u64>,
    to_index: Column<u64>,
    from_index: Column<u64>,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    nodes: NodeColumns,
    edges: EdgeColumns,
    edge_list: Column<u64>,
    node_list: Column<u64>,
    connection_edge: Column<u64>,
    connection_cost: Column<f64>,
}

impl Columns {
    fn new(l: &Layouts) -> Result<Self, AccessorError> {
        Ok(Self {
            nodes: NodeColumns {
                osm_id: l.nodes.signed("osmId")?,
                lon: l.nodes.float("lon")?,
                lat: l.nodes.float("lat")?,
                edge_list_index: l.nodes.unsigned("edgeListIndex")?,
                edge_list_length: l.nodes.unsigned("edgeListLength")?,
            },
            edges: EdgeColumns {
                node_list_length: l.edges.unsigned("nodeListLength")?,
                to_length: l.edges.unsigned("toEdgeListLength")?,
                from_length: l.edges.unsigned("fromEdgeListLength")?,
                length: l.edges.float("length")?,
                node_list_index: l.edges.unsigned("nodeListIndex")?,
                to_index: l.edges.unsigned("toEdgeListIndex")?,
                from_index: l.edges.unsigned("fromEdgeListIndex")?,
            },
            edge_list: l.edge_list.unsigned("edgeIndex")?,
            node_list: l.node_list.unsigned("nodeIndex")?,
            connection_edge: l.connections_list.unsigned("edgeIndex")?,
            connection_cost: l.connections_list.float("cost")?,
        })
    }
}

/// Read-only view over a deserialized graph file.
///
/// Fields are decoded straight from the section bytes on every access;
/// nothing is materialized apart from the spatial index. The accessor
/// is immutable and may be shared between concurrent searches.
#[derive(Debug, Clone)]
pub struct GraphAccessor {
    id: u64,
    timestamp: i64,
    byte_order: ByteOrder,
    index_width: IndexWidth,
    precision: CoordinatePrecision,
    all_nodes_indexed: bool,
    metadata: Map<String, Value>,

    nodes: Vec<u8>,
    edges: Vec<u8>,
    edge_list: Vec<u8>,
    node_list: Vec<u8>,
    connections_list: Vec<u8>,

    node_count: usize,
    edge_count: usize,
    columns: Columns,
    index: KDTree,
}

/// Removes the only section of a given kind from the list.
fn take_section(
    sections: &mut Vec<Section>,
    definition: &SectionDefinition,
) -> Result<Option<Section>, AccessorError> {
    let mut matching = sections
        .iter()
        .enumerate()
        .filter(|(_, s)| s.definition == *definition)
        .map(|(i, _)| i);

    match (matching.next(), matching.next()) {
        (None, _) => Ok(None),
        (Some(i), None) => Ok(Some(sections.swap_remove(i))),
        (Some(_), Some(_)) => Err(AccessorError::DuplicateSection(definition.name)),
    }
}

fn require_section(
    sections: &mut Vec<Section>,
    definition: &SectionDefinition,
) -> Result<Section, AccessorError> {
    take_section(sections, definition)?.ok_or(AccessorError::MissingSection(definition.name))
}

impl GraphAccessor {
    /// Builds an accessor over an already deserialized container.
    ///
    /// Digests are not checked, see [Deserialized::verify].
    pub fn from_deserialized(d: Deserialized) -> Result<Self, AccessorError> {
        let Deserialized {
            header,
            byte_order,
            mut sections,
            ..
        } = d;

        let nodes = require_section(&mut sections, &NODES)?;
        let edges = require_section(&mut sections, &EDGES)?;
        let edge_list = require_section(&mut sections, &EDGE_LIST)?;
        let node_list = require_section(&mut sections, &NODE_LIST)?;
        let connections_list = require_section(&mut sections, &CONNECTIONS_LIST)?;
        let index = require_section(&mut sections, &INDEX)?;

        let metadata = match take_section(&mut sections, &METADATA)? {
            Some(s) if !s.data.is_empty() => match serde_json::from_slice(&s.data)? {
                Value::Object(m) => m,
                _ => Map::new(),
            },
            _ => Map::new(),
        };

        let index_width = IndexWidth::from_flag(header.flags.get(INDEX_SIZES_FLAG));
        let precision = CoordinatePrecision::from_flag(nodes.flags.get(COORDINATE_PRECISION_FLAG));
        let layouts = Layouts::new(index_width, precision, byte_order);
        let columns = Columns::new(&layouts)?;

        let node_count = layouts.nodes.count(nodes.data.len());
        let edge_count = layouts.edges.count(edges.data.len());
        let all_nodes_indexed = index.flags.get(INDEX_TYPE_FLAG);
        let index_tree = KDTree::decode(&index.data, byte_order)?;

        log::debug!(
            "loaded graph {:016x}: {} nodes, {} edges, {:?} indices",
            header.id,
            node_count,
            edge_count,
            index_width,
        );

        Ok(Self {
            id: header.id,
            timestamp: header.timestamp,
            byte_order,
            index_width,
            precision,
            all_nodes_indexed,
            metadata,
            nodes: nodes.data,
            edges: edges.data,
            edge_list: edge_list.data,
            node_list: node_list.data,
            connections_list: connections_list.data,
            node_count,
            edge_count,
            columns,
            index: index_tree,
        })
    }

    pub fn from_reader<R: Read>(r: R) -> Result<Self, AccessorError> {
        Self::from_deserialized(GRAPH_CODEC.deserialize(r)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, AccessorError> {
        Self::from_reader(data)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AccessorError> {
        Self::from_deserialized(GRAPH_CODEC.deserialize_file(path)?)
    }

    /// Random identifier assigned when the graph was written.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Creation time, in milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn index_width(&self) -> IndexWidth {
        self.index_width
    }

    pub fn coordinate_precision(&self) -> CoordinatePrecision {
        self.precision
    }

    /// Returns true if the spatial index covers all nodes, not only edge starts.
    pub fn all_nodes_indexed(&self) -> bool {
        self.all_nodes_indexed
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns the position of a node as `(lon, lat)`.
    pub fn node_pos(&self, node: usize) -> (f64, f64) {
        let c = &self.columns.nodes;
        (c.lon.get(&self.nodes, node), c.lat.get(&self.nodes, node))
    }

    pub fn node_osm_id(&self, node: usize) -> NodeId {
        NodeId(self.columns.nodes.osm_id.get(&self.nodes, node))
    }

    /// Length of an edge in meters.
    pub fn edge_length(&self, edge: usize) -> f64 {
        self.columns.edges.length.get(&self.edges, edge)
    }

    /// Iterates over all edges passing through a node.
    pub fn list_node_edges(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        let c = &self.columns.nodes;
        let start = c.edge_list_index.get(&self.nodes, node) as usize;
        let len = c.edge_list_length.get(&self.nodes, node) as usize;
        (start..start + len).map(move |i| self.columns.edge_list.get(&self.edge_list, i) as usize)
    }

    /// Iterates over the node indices of an edge, in traversal order.
    pub fn list_edge_nodes(&self, edge: usize) -> impl Iterator<Item = usize> + '_ {
        let c = &self.columns.edges;
        let start = c.node_list_index.get(&self.edges, edge) as usize;
        let len = c.node_list_length.get(&self.edges, edge) as usize;
        (start..start + len).map(move |i| self.columns.node_list.get(&self.node_list, i) as usize)
    }

    /// Iterates over the maneuvers leaving an edge.
    pub fn list_to_edges(&self, edge: usize) -> impl Iterator<Item = Connection> + '_ {
        let c = &self.columns.edges;
        let start = c.to_index.get(&self.edges, edge) as usize;
        let len = c.to_length.get(&self.edges, edge) as usize;
        self.connections(start, len)
    }

    /// Iterates over the maneuvers entering an edge.
    pub fn list_from_edges(&self, edge: usize) -> impl Iterator<Item = Connection> + '_ {
        let c = &self.columns.edges;
        let start = c.from_index.get(&self.edges, edge) as usize;
        let len = c.from_length.get(&self.edges, edge) as usize;
        self.connections(start, len)
    }

    fn connections(&self, start: usize, len: usize) -> impl Iterator<Item = Connection> + '_ {
        (start..start + len).map(move |i| Connection {
            edge: self.columns.connection_edge.get(&self.connections_list, i) as usize,
            cost: self.columns.connection_cost.get(&self.connections_list, i),
        })
    }

    /// Finds up to `max_results` indexed nodes at most `max_distance` meters away, closest first.
    pub fn get_nearby_nodes(
        &self,
        lon: f64,
        lat: f64,
        max_results: usize,
        max_distance: f64,
    ) -> Vec<usize> {
        self.index
            .around(lon, lat, max_results, max_distance / 1000.0)
            .into_iter()
            .map(|(id, _)| id as usize)
            .collect()
    }

    /// Finds edges passing through up to `max_results` nodes at most `max_distance`
    /// meters away. Edges are returned without duplicates, those of closer nodes first.
    pub fn get_nearby_edges(
        &self,
        lon: f64,
        lat: f64,
        max_results: usize,
        max_distance: f64,
    ) -> Vec<usize> {
        let mut seen = HashSet::new();
        self.get_nearby_nodes(lon, lat, max_results, max_distance)
            .into_iter()
            .flat_map(|node| self.list_node_edges(node))
            .filter(|&edge| seen.insert(edge))
            .collect()
    }
}
