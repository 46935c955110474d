// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;

use super::{OsmData, Warning};
use crate::distance::earth_distance;
use crate::osm::{Direction, Node, NodeId, ProcessedWay, WayId};

/// A directed stretch of a single way between two junctions.
///
/// Traversing the same stretch in the opposite direction is a separate
/// Edge, with its own cost and reversed `nodes`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub way: WayId,

    /// Direction of travel relative to the order of the way's nodes.
    pub direction: Direction,

    /// Length in meters.
    pub length: f64,
    pub cost: f64,

    /// All nodes of the stretch, in traversal order. Always has at least 2 elements.
    pub nodes: Vec<NodeId>,
}

impl Edge {
    pub fn start(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn end(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }
}

/// Edges touching a node: `to` maps end nodes of edges leaving the node,
/// `from` maps start nodes of edges arriving at the node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Junction {
    pub to: BTreeMap<NodeId, Edge>,
    pub from: BTreeMap<NodeId, Edge>,
}

pub type JunctionMap = BTreeMap<NodeId, Junction>;

/// Indexes an edge by both of its junctions. Of parallel edges between
/// the same pair of junctions only the cheapest one is kept.
fn insert_edge(junctions: &mut JunctionMap, edge: Edge) {
    let (start, end) = (edge.start(), edge.end());
    let outgoing = &mut junctions.entry(start).or_default().to;
    if outgoing.get(&end).is_some_and(|existing| existing.cost <= edge.cost) {
        return;
    }
    outgoing.insert(end, edge.clone());
    junctions.entry(end).or_default().from.insert(start, edge);
}

/// Resolves the nodes of a way, reporting every missing reference.
fn resolve_way<'a>(
    data: &'a OsmData,
    way: &ProcessedWay,
    warnings: &mut Vec<Warning>,
) -> Vec<&'a Node> {
    way.nodes
        .iter()
        .filter_map(|&id| {
            let node = data.nodes.get(&id);
            if node.is_none() {
                warnings.push(Warning::MissingNode {
                    node: id,
                    way: way.id,
                });
            }
            node
        })
        .collect()
}

fn add_segment(junctions: &mut JunctionMap, way: &ProcessedWay, nodes: &[&Node], length: f64) {
    let forward: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();

    if let Some(cost) = way.cost(Direction::Forward, length) {
        insert_edge(
            junctions,
            Edge {
                way: way.id,
                direction: Direction::Forward,
                length,
                cost,
                nodes: forward.clone(),
            },
        );
    }

    if let Some(cost) = way.cost(Direction::Backward, length) {
        let mut backward = forward;
        backward.reverse();
        insert_edge(
            junctions,
            Edge {
                way: way.id,
                direction: Direction::Backward,
                length,
                cost,
                nodes: backward,
            },
        );
    }
}

/// Splits every way into [Edges](Edge) at nodes shared with other ways,
/// and indexes them by the junctions they touch.
///
/// Ways with less than 2 nodes and references to missing nodes are
/// reported through `warnings` and skipped.
pub fn build_junctions(data: &OsmData, warnings: &mut Vec<Warning>) -> JunctionMap {
    let mut junctions = JunctionMap::new();

    for way in data.ways.values() {
        if way.nodes.len() <= 1 {
            warnings.push(Warning::MalformedWay(way.id));
            continue;
        }

        let nodes = resolve_way(data, way, warnings);
        if nodes.len() < 2 {
            continue;
        }

        let mut start = 0;
        let mut length = 0.0;
        for i in 1..nodes.len() {
            let (prev, curr) = (nodes[i - 1], nodes[i]);
            length += earth_distance(prev.lat, prev.lon, curr.lat, curr.lon) * 1000.0;

            if i == nodes.len() - 1 || data.is_junction(curr.id) {
                add_segment(&mut junctions, way, &nodes[start..=i], length);
                start = i;
                length = 0.0;
            }
        }
    }

    junctions
}

/// Removes nodes with exactly one incoming and one outgoing edge of the same way,
/// replacing the two edges by a single one. Returns the number of removed nodes.
///
/// Dead ends and loops are never contracted, so running this on
/// an already contracted map removes nothing.
pub fn contract(junctions: &mut JunctionMap) -> usize {
    let candidates: Vec<NodeId> = junctions.keys().copied().collect();
    let mut removed = 0;

    for node in candidates {
        let Some(junction) = junctions.get(&node) else {
            continue;
        };
        if junction.to.len() != 1 || junction.from.len() != 1 {
            continue;
        }

        let Some((&to_node, to_edge)) = junction.to.iter().next() else {
            continue;
        };
        let Some((&from_node, from_edge)) = junction.from.iter().next() else {
            continue;
        };

        if from_edge.way != to_edge.way
            || from_edge.direction != to_edge.direction
            || from_node == to_node
            || from_node == node
            || to_node == node
        {
            continue;
        }

        let mut nodes = Vec::with_capacity(from_edge.nodes.len() + to_edge.nodes.len() - 1);
        nodes.extend_from_slice(&from_edge.nodes);
        nodes.extend_from_slice(&to_edge.nodes[1..]);
        let merged = Edge {
            way: from_edge.way,
            direction: from_edge.direction,
            length: from_edge.length + to_edge.length,
            cost: from_edge.cost + to_edge.cost,
            nodes,
        };

        junctions.remove(&node);
        removed += 1;

        if let Some(j) = junctions.get_mut(&from_node) {
            j.to.remove(&node);
        }
        if let Some(j) = junctions.get_mut(&to_node) {
            j.from.remove(&node);
        }
        insert_edge(junctions, merged);
    }

    removed
}
