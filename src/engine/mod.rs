// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Shortest path searches over a [GraphAccessor].
//!
//! Both [Dijkstra] and [BidirectionalDijkstra] work on edge indices: sources and
//! targets are edges, and every candidate describes the best known way of
//! reaching an edge. Each search owns its [CandidatePool]s, which are reused
//! (but never shared) between runs.
//!
//! Costs of a candidate are split into the fixed part, summed from the costs of
//! connections stored in the graph, and the dynamic part, computed at runtime by
//! a [DynamicCostFn]. Connection costs include the cost of the departed edge, so
//! a route's cost covers every edge but the last one.

use crate::graph::{GraphAccessor, DEFAULT_SNAP_DISTANCE};

mod bidijkstra;
mod common;
mod dijkstra;
mod geometry;
mod pool;

pub use bidijkstra::{BidirectionalDijkstra, BidirectionalResult};
pub use common::{
    sum_dynamic_costs, zero_cost, BidirectionalOptions, DynamicCostFn, MergeFn, NodeHandle,
    RouteNode, RoutingOptions, SearchDirection,
};
pub use dijkstra::{Dijkstra, DijkstraResult};
pub use geometry::{path_geometry, path_nodes};
pub use pool::CandidatePool;

/// A route between two positions, see [find_route].
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub total_cost: f64,

    /// Length of the route in meters.
    pub total_length: f64,

    pub iterations: usize,

    /// Indices of traversed edges, in the order of travel.
    pub edges: Vec<usize>,

    /// `(lon, lat)` positions along the route, from the start to the end node.
    pub geometry: Vec<(f64, f64)>,
}

/// Number of nearby nodes considered when snapping a position to the graph.
const SNAP_CANDIDATES: usize = 8;

/// Picks the closest node with at least one edge leaving it, returning the node
/// together with those edges.
fn snap(graph: &GraphAccessor, lon: f64, lat: f64) -> Option<(usize, Vec<usize>)> {
    graph
        .get_nearby_nodes(lon, lat, SNAP_CANDIDATES, DEFAULT_SNAP_DISTANCE)
        .into_iter()
        .find_map(|node| {
            let edges: Vec<usize> = graph
                .list_node_edges(node)
                .filter(|&e| graph.list_edge_nodes(e).next() == Some(node))
                .collect();
            (!edges.is_empty()).then_some((node, edges))
        })
}

/// Finds a route between the nodes closest to the provided `(lon, lat)` positions,
/// at most [DEFAULT_SNAP_DISTANCE] meters away. Nodes with no edges leaving them
/// (like shape nodes or ends of one-way roads) are passed over in favor of
/// the next closest ones.
///
/// The search starts on edges leaving the start node, and finishes on edges leaving
/// the end node. The final maneuver onto such an edge is included in the returned cost,
/// but the edge itself is not part of the route. Returns `None` if either position
/// can't be snapped, or if there's no route between them.
pub fn find_route(
    graph: &GraphAccessor,
    start: (f64, f64),
    end: (f64, f64),
    options: &BidirectionalOptions,
) -> Option<Route> {
    let Some((start_node, sources)) = snap(graph, start.0, start.1) else {
        log::debug!("no node near start position {:?}", start);
        return None;
    };
    let Some((end_node, targets)) = snap(graph, end.0, end.1) else {
        log::debug!("no node near end position {:?}", end);
        return None;
    };

    let mut search = BidirectionalDijkstra::new(graph);
    let result = search.run(&sources, &targets, options)?;
    let mut edges = search.path(&result);
    let last = edges.pop()?;

    let geometry = if start_node == end_node {
        vec![graph.node_pos(start_node)]
    } else {
        path_geometry(graph, &edges)
    };

    Some(Route {
        total_cost: result.total_cost,
        total_length: result.total_length - graph.edge_length(last),
        iterations: result.iterations,
        edges,
        geometry,
    })
}
