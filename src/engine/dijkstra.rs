// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

use super::{path_geometry, CandidatePool, NodeHandle, RouteNode, RoutingOptions};
use crate::graph::GraphAccessor;

/// Outcome of [Dijkstra::run].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DijkstraResult {
    /// Best candidate on a target edge, or `None` if no target was reached.
    pub route: Option<NodeHandle>,
    pub iterations: usize,
}

/// Single-direction search over a [GraphAccessor].
///
/// The search state is kept between runs, so that [Dijkstra::path] and
/// [Dijkstra::geometry] can resolve the last result. Running another search
/// invalidates all previously returned handles.
#[derive(Debug, Clone)]
pub struct Dijkstra<'g> {
    graph: &'g GraphAccessor,
    pool: CandidatePool<'g>,
}

impl<'g> Dijkstra<'g> {
    pub fn new(graph: &'g GraphAccessor) -> Self {
        Self {
            graph,
            pool: CandidatePool::new(graph),
        }
    }

    pub fn pool(&self) -> &CandidatePool<'g> {
        &self.pool
    }

    /// Finds the cheapest way from any of the `sources` to any of the `targets` edges.
    ///
    /// For [Backward](super::SearchDirection::Backward) searches, incoming
    /// connections are followed, so the route leads from the found candidate
    /// back to the root.
    pub fn run(
        &mut self,
        sources: &[usize],
        targets: &[usize],
        options: &RoutingOptions,
    ) -> DijkstraResult {
        let targets: HashSet<usize> = targets.iter().copied().collect();
        let mut result = DijkstraResult::default();
        if !self.pool.init(sources, options.dynamic_cost) {
            return result;
        }

        let mut best_cost = f64::INFINITY;
        while let Some(handle) = self.pool.next() {
            let candidate = *self.pool.node(handle);
            if best_cost + options.max_cost_past_best < candidate.total_cost {
                break;
            }

            result.iterations += 1;
            if targets.contains(&candidate.edge) && candidate.total_cost < best_cost {
                best_cost = candidate.total_cost;
                result.route = Some(handle);
            }

            self.pool.expand(handle, options.direction, options.dynamic_cost);
        }

        log::debug!(
            "dijkstra finished after {} iterations, route found: {}",
            result.iterations,
            result.route.is_some(),
        );
        result
    }

    /// Resolves a candidate returned by the last [Dijkstra::run].
    pub fn get(&self, handle: NodeHandle) -> Option<&RouteNode> {
        self.pool.get(handle)
    }

    /// Returns the edges leading to a found candidate, in the order of travel.
    pub fn path(&self, route: NodeHandle, options: &RoutingOptions) -> Vec<usize> {
        self.pool.path_edges(route, options.direction)
    }

    /// Returns `(lon, lat)` positions along a found route, in the order of travel.
    pub fn geometry(&self, route: NodeHandle, options: &RoutingOptions) -> Vec<(f64, f64)> {
        path_geometry(self.graph, &self.path(route, options))
    }
}
