// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Map, Value};

use super::sections::{
    CoordinatePrecision, IndexWidth, Layouts, CONNECTIONS_LIST, COORDINATE_PRECISION_FLAG, EDGES,
    EDGE_LIST, GRAPH_CODEC, INDEX, INDEX_SIZES_FLAG, INDEX_TYPE_FLAG, METADATA, NODES, NODE_LIST,
};
use super::{EdgeKey, Graph, SerializeError};
use crate::format::{ByteOrder, Flags, Section, BIG_ENDIAN_FLAG};
use crate::kd::{KDTree, Point};
use crate::osm::NodeId;

/// Value of the "writingprogram" metadata key.
pub const WRITING_PROGRAM: &str = concat!("edgeroute-", env!("CARGO_PKG_VERSION"));

/// Controls how a [Graph] is serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerializeOptions {
    pub byte_order: ByteOrder,
    pub coordinate_precision: CoordinatePrecision,

    /// Put every node in the spatial index, not only edge start nodes.
    pub index_all_nodes: bool,

    /// Use 64-bit indices even if 32 bits would suffice.
    pub wide_indices: bool,

    /// Extra metadata, merged over the default `{"writingprogram": ...}` object.
    pub metadata: Map<String, Value>,
}

/// Result of [Graph::serialize].
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized {
    pub id: u64,
    pub timestamp: i64,
    pub index_width: IndexWidth,

    /// Buffers which, concatenated, form the graph file.
    pub buffers: Vec<Vec<u8>>,
}

impl Serialized {
    pub fn to_bytes(&self) -> Vec<u8> {
        self.buffers.concat()
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        for buf in &self.buffers {
            w.write_all(buf)?;
        }
        w.flush()
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.write_to(BufWriter::new(File::create(path)?))
    }
}

/// Dense numbering of nodes and edges, as stored in the file.
struct Numbering {
    nodes: Vec<NodeId>,
    node_index: HashMap<NodeId, usize>,
    edges: Vec<EdgeKey>,
    edge_index: HashMap<EdgeKey, usize>,
    edge_starts: usize,
    edge_list_len: usize,
    node_list_len: usize,
    connections_len: usize,
}

impl Numbering {
    /// Numbers edge start nodes first, so that spatial index ids
    /// of junctions are the node indices themselves.
    fn new(g: &Graph) -> Self {
        let mut nodes: Vec<NodeId> = g.edges.keys().copied().collect();
        let edge_starts = nodes.len();
        nodes.extend(g.nodes.keys().filter(|id| !g.edges.contains_key(*id)));

        let node_index = nodes.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let edges: Vec<EdgeKey> = g.edge_keys().collect();
        let edge_index = edges.iter().enumerate().map(|(i, &k)| (k, i)).collect();

        let edge_list_len = g.nodes.values().map(|n| n.edges.len()).sum();
        let (node_list_len, connections_len) = g
            .edges
            .values()
            .flat_map(|tos| tos.values())
            .fold((0, 0), |(n, c), e| (n + e.nodes.len(), c + e.to.len() + e.from.len()));

        Self {
            nodes,
            node_index,
            edges,
            edge_index,
            edge_starts,
            edge_list_len,
            node_list_len,
            connections_len,
        }
    }

    fn index_width(&self) -> IndexWidth {
        let largest = [
            self.nodes.len(),
            self.edges.len(),
            self.edge_list_len,
            self.node_list_len,
            self.connections_len,
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        IndexWidth::for_count(largest)
    }

    fn edge(&self, key: EdgeKey, referrer: EdgeKey) -> Result<usize, SerializeError> {
        self.edge_index
            .get(&key)
            .copied()
            .ok_or(SerializeError::DanglingReference {
                from: referrer.0,
                to: referrer.1,
                what: "edge",
            })
    }
}

fn check_u16(what: &'static str, count: usize) -> Result<u64, SerializeError> {
    if count > u16::MAX as usize {
        Err(SerializeError::LengthOverflow { what, count })
    } else {
        Ok(count as u64)
    }
}

pub(super) fn serialize(
    g: &Graph,
    options: &SerializeOptions,
) -> Result<Serialized, SerializeError> {
    let numbering = Numbering::new(g);
    let width = if options.wide_indices {
        IndexWidth::U64
    } else {
        numbering.index_width()
    };
    let layouts = Layouts::new(width, options.coordinate_precision, options.byte_order);

    let (nodes, edge_list) = serialize_nodes(g, &numbering, &layouts)?;
    let (edges, node_list, connections) = serialize_edges(g, &numbering, &layouts)?;
    let index = serialize_index(g, &numbering, options)?;

    let mut metadata = Map::new();
    metadata.insert("writingprogram".to_string(), Value::from(WRITING_PROGRAM));
    metadata.extend(options.metadata.clone());

    let sections = [
        Section::new(METADATA, Flags::new(), serde_json::to_vec(&Value::Object(metadata))?),
        Section::new(
            NODES,
            Flags::new().with(
                COORDINATE_PRECISION_FLAG,
                options.coordinate_precision.is_double(),
            ),
            nodes,
        ),
        Section::new(EDGE_LIST, Flags::new(), edge_list),
        Section::new(EDGES, Flags::new(), edges),
        Section::new(NODE_LIST, Flags::new(), node_list),
        Section::new(CONNECTIONS_LIST, Flags::new(), connections),
        Section::new(
            INDEX,
            Flags::new().with(INDEX_TYPE_FLAG, options.index_all_nodes),
            index,
        ),
    ];

    let id: u64 = rand::random();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    let flags = Flags::new()
        .with(BIG_ENDIAN_FLAG, options.byte_order == ByteOrder::BigEndian)
        .with(INDEX_SIZES_FLAG, width.is_wide());

    let buffers = GRAPH_CODEC.serialize(id, timestamp, &flags, &sections)?;
    log::info!(
        "serialized graph {:016x}: {} nodes, {} edges, {} connections",
        id,
        numbering.nodes.len(),
        numbering.edges.len(),
        numbering.connections_len,
    );

    Ok(Serialized {
        id,
        timestamp,
        index_width: width,
        buffers,
    })
}

fn serialize_nodes(
    g: &Graph,
    numbering: &Numbering,
    layouts: &Layouts,
) -> Result<(Vec<u8>, Vec<u8>), SerializeError> {
    let osm_id = layouts.nodes.writer("osmId")?;
    let lon = layouts.nodes.writer("lon")?;
    let lat = layouts.nodes.writer("lat")?;
    let edge_list_index = layouts.nodes.writer("edgeListIndex")?;
    let edge_list_length = layouts.nodes.writer("edgeListLength")?;
    let edge_index = layouts.edge_list.writer("edgeIndex")?;

    let mut nodes = vec![0u8; numbering.nodes.len() * layouts.nodes.stride()];
    let mut edge_list = vec![0u8; numbering.edge_list_len * layouts.edge_list.stride()];
    let mut cursor = 0;

    for (i, &id) in numbering.nodes.iter().enumerate() {
        let node = g.nodes.get(&id).ok_or(SerializeError::MissingNode(id))?;

        osm_id.put_signed(&mut nodes, i, id.0);
        lon.put_float(&mut nodes, i, node.lon);
        lat.put_float(&mut nodes, i, node.lat);
        edge_list_index.put_unsigned(&mut nodes, i, cursor as u64);
        edge_list_length.put_unsigned(
            &mut nodes,
            i,
            check_u16("edge list of a node", node.edges.len())?,
        );

        for &key in &node.edges {
            let idx = numbering.edge(key, key)?;
            edge_index.put_unsigned(&mut edge_list, cursor, idx as u64);
            cursor += 1;
        }
    }

    Ok((nodes, edge_list))
}

fn serialize_edges(
    g: &Graph,
    numbering: &Numbering,
    layouts: &Layouts,
) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), SerializeError> {
    let node_list_length = layouts.edges.writer("nodeListLength")?;
    let to_length = layouts.edges.writer("toEdgeListLength")?;
    let from_length = layouts.edges.writer("fromEdgeListLength")?;
    let length = layouts.edges.writer("length")?;
    let node_list_index = layouts.edges.writer("nodeListIndex")?;
    let to_index = layouts.edges.writer("toEdgeListIndex")?;
    let from_index = layouts.edges.writer("fromEdgeListIndex")?;
    let node_index = layouts.node_list.writer("nodeIndex")?;
    let connection_edge = layouts.connections_list.writer("edgeIndex")?;
    let connection_cost = layouts.connections_list.writer("cost")?;

    let mut edges = vec![0u8; numbering.edges.len() * layouts.edges.stride()];
    let mut node_list = vec![0u8; numbering.node_list_len * layouts.node_list.stride()];
    let mut connections = vec![0u8; numbering.connections_len * layouts.connections_list.stride()];
    let mut node_cursor = 0;
    let mut connection_cursor = 0;

    for (i, &key) in numbering.edges.iter().enumerate() {
        let (start, end) = key;
        let Some(edge) = g.edge(start, end) else {
            return Err(SerializeError::DanglingReference {
                from: start,
                to: end,
                what: "edge",
            });
        };

        node_list_length.put_unsigned(&mut edges, i, check_u16("node list", edge.nodes.len())?);
        to_length.put_unsigned(&mut edges, i, check_u16("to-connections", edge.to.len())?);
        from_length.put_unsigned(&mut edges, i, check_u16("from-connections", edge.from.len())?);
        length.put_float(&mut edges, i, edge.length);
        node_list_index.put_unsigned(&mut edges, i, node_cursor as u64);

        to_index.put_unsigned(&mut edges, i, connection_cursor as u64);
        for (&next_end, &cost) in &edge.to {
            let idx = numbering.edge((end, next_end), key)?;
            connection_edge.put_unsigned(&mut connections, connection_cursor, idx as u64);
            connection_cost.put_float(&mut connections, connection_cursor, cost);
            connection_cursor += 1;
        }

        from_index.put_unsigned(&mut edges, i, connection_cursor as u64);
        for (&prev_start, &cost) in &edge.from {
            let idx = numbering.edge((prev_start, start), key)?;
            connection_edge.put_unsigned(&mut connections, connection_cursor, idx as u64);
            connection_cost.put_float(&mut connections, connection_cursor, cost);
            connection_cursor += 1;
        }

        for node in &edge.nodes {
            let idx = numbering
                .node_index
                .get(node)
                .ok_or(SerializeError::DanglingReference {
                    from: start,
                    to: end,
                    what: "node",
                })?;
            node_index.put_unsigned(&mut node_list, node_cursor, *idx as u64);
            node_cursor += 1;
        }
    }

    Ok((edges, node_list, connections))
}

fn serialize_index(
    g: &Graph,
    numbering: &Numbering,
    options: &SerializeOptions,
) -> Result<Vec<u8>, SerializeError> {
    let indexed = if options.index_all_nodes {
        numbering.nodes.len()
    } else {
        numbering.edge_starts
    };

    let mut points = Vec::with_capacity(indexed);
    for (i, id) in numbering.nodes[..indexed].iter().enumerate() {
        let node = g.nodes.get(id).ok_or(SerializeError::MissingNode(*id))?;
        let (lon, lat) = match options.coordinate_precision {
            CoordinatePrecision::Single => (node.lon as f32 as f64, node.lat as f32 as f64),
            CoordinatePrecision::Double => (node.lon, node.lat),
        };
        points.push(Point {
            id: i as u64,
            lon,
            lat,
        });
    }

    Ok(KDTree::build(points).encode(options.byte_order))
}
