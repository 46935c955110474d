// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Small hand-built datasets shared by unit tests.

use crate::builder::OsmData;
use crate::graph::{Graph, GraphAccessor, SerializeOptions};
use crate::osm::{
    FeatureType, Node, NodeId, PerDirection, Relation, RelationId, RelationMember, Tags, Way, WayId,
};

/// Travel speed of all fixture ways, in m/s.
pub const SPEED: f64 = 10.0;

pub fn node(id: i64, lat: f64, lon: f64) -> Node {
    Node {
        id: NodeId(id),
        lat,
        lon,
        tags: Tags::default(),
    }
}

pub fn way(id: i64, nodes: &[i64], tags: Tags) -> Way {
    Way {
        id: WayId(id),
        nodes: nodes.iter().map(|&n| NodeId(n)).collect(),
        tags,
    }
}

/// A turn restriction relation with a single from way, via node and to way.
pub fn restriction(id: i64, from: i64, via: i64, to: i64, value: &str) -> Relation {
    let member = |type_, ref_, role: &str| RelationMember {
        type_,
        ref_,
        role: role.to_string(),
    };
    Relation {
        id: RelationId(id),
        members: vec![
            member(FeatureType::Way, from, "from"),
            member(FeatureType::Node, via, "via"),
            member(FeatureType::Way, to, "to"),
        ],
        tags: Tags::from_iter([
            ("type".to_string(), "restriction".to_string()),
            ("restriction".to_string(), value.to_string()),
        ]),
    }
}

fn with_nodes(nodes: &[(i64, f64, f64)]) -> OsmData {
    let mut data = OsmData::new();
    for &(id, lat, lon) in nodes {
        data.load_node(node(id, lat, lon));
    }
    data
}

fn make_accessible(data: &mut OsmData) {
    data.process_ways(|w| {
        w.speed = PerDirection::both(SPEED);
        true
    });
}

/// Three ways going east, one after another:
///
/// ```text
/// 1 ── 2 ── 3 ── 4 ── 5
///  W1   └─ W2 ─┘   W3
/// ```
pub fn straight_road() -> OsmData {
    let mut data = with_nodes(&[
        (1, 52.0, 21.000),
        (2, 52.0, 21.001),
        (3, 52.0, 21.002),
        (4, 52.0, 21.003),
        (5, 52.0, 21.004),
    ]);
    data.load_way(way(1, &[1, 2], Tags::default()));
    data.load_way(way(2, &[2, 3, 4], Tags::default()));
    data.load_way(way(3, &[4, 5], Tags::default()));
    make_accessible(&mut data);
    data
}

/// One-way W1 `1 -> 2 -> 3` crossed at 2 by an unusable footway W2 `2 - 4`.
pub fn oneway_through_footway() -> OsmData {
    let mut data = with_nodes(&[
        (1, 52.0, 21.000),
        (2, 52.0, 21.001),
        (3, 52.0, 21.002),
        (4, 52.001, 21.001),
    ]);
    data.load_way(way(1, &[1, 2, 3], Tags::default()));
    data.load_way(way(2, &[2, 4], Tags::default()));
    data.process_ways(|w| {
        if w.id == WayId(1) {
            w.speed = PerDirection::new(SPEED, 0.0);
            w.inaccessible.backward = true;
        } else {
            w.inaccessible = PerDirection::both(true);
        }
        true
    });
    data
}

/// Four two-way arms meeting at node 0:
///
/// ```text
///       2
///       │ W2
/// 1 ─── 0 ─── 3
///   W1  │  W3
///       │ W4
///       4
/// ```
pub fn cross_junction() -> OsmData {
    let mut data = with_nodes(&[
        (0, 52.0, 21.0),
        (1, 52.0, 20.999),
        (2, 52.001, 21.0),
        (3, 52.0, 21.001),
        (4, 51.999, 21.0),
    ]);
    data.load_way(way(1, &[1, 0], Tags::default()));
    data.load_way(way(2, &[0, 2], Tags::default()));
    data.load_way(way(3, &[0, 3], Tags::default()));
    data.load_way(way(4, &[0, 4], Tags::default()));
    make_accessible(&mut data);
    data
}

/// Two ways joining the same pair of junctions: a fast W1 `1 - 2`
/// and a slow W2 `1 - 3 - 2` with a shape node bending north.
pub fn parallel_ways() -> OsmData {
    let mut data = with_nodes(&[(1, 52.0, 21.000), (2, 52.0, 21.002), (3, 52.001, 21.001)]);
    data.load_way(way(1, &[1, 2], Tags::default()));
    data.load_way(way(2, &[1, 3, 2], Tags::default()));
    data.process_ways(|w| {
        let speed = if w.id == WayId(1) { SPEED * 2.0 } else { SPEED / 2.0 };
        w.speed = PerDirection::both(speed);
        true
    });
    data
}

/// Two-way road W1 `1 - 2` continued by W2 `2 - 3`, which dead-ends at 3.
pub fn dead_end() -> OsmData {
    let mut data = with_nodes(&[(1, 52.0, 21.000), (2, 52.0, 21.001), (3, 52.0, 21.002)]);
    data.load_way(way(1, &[1, 2], Tags::default()));
    data.load_way(way(2, &[2, 3], Tags::default()));
    make_accessible(&mut data);
    data
}

/// Three two-way ways forming a loop, with a shape node 4 on W1:
///
/// ```text
///        3
///   W3 /   \ W2
///     1─4───2
///        W1
/// ```
pub fn triangle() -> OsmData {
    let mut data = with_nodes(&[
        (1, 52.000, 21.000),
        (2, 52.000, 21.003),
        (3, 52.002, 21.0015),
        (4, 52.000, 21.0015),
    ]);
    data.load_way(way(1, &[1, 4, 2], Tags::default()));
    data.load_way(way(2, &[2, 3], Tags::default()));
    data.load_way(way(3, &[3, 1], Tags::default()));
    make_accessible(&mut data);
    data
}

/// Graph built from [triangle], with every maneuver costing 1.
pub fn triangle_graph() -> Graph {
    triangle().build(|_, _, _| Some(1.0))
}

/// Serializes and reads back a graph with default options.
pub fn accessor(g: &Graph) -> GraphAccessor {
    let bytes = g
        .serialize(&SerializeOptions::default())
        .expect("serialization failed")
        .to_bytes();
    GraphAccessor::from_bytes(&bytes).expect("deserialization failed")
}

/// Finds the index of the serialized edge from junction `from` to junction `to`.
pub fn find_edge(a: &GraphAccessor, from: i64, to: i64) -> usize {
    (0..a.edge_count())
        .find(|&e| {
            let nodes: Vec<usize> = a.list_edge_nodes(e).collect();
            a.node_osm_id(nodes[0]) == NodeId(from)
                && a.node_osm_id(nodes[nodes.len() - 1]) == NodeId(to)
        })
        .unwrap_or_else(|| panic!("no edge {} -> {}", from, to))
}
