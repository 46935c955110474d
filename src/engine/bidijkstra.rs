// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{
    path_geometry, BidirectionalOptions, CandidatePool, NodeHandle, RouteNode, SearchDirection,
};
use crate::graph::GraphAccessor;

/// A route found by [BidirectionalDijkstra::run]: two candidates
/// on the same edge, where the forward and backward searches met.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BidirectionalResult {
    pub forward: NodeHandle,
    pub backward: NodeHandle,

    /// Sum of both fixed costs, plus the merged dynamic cost.
    pub total_cost: f64,

    /// Length of all edges of the route, in meters.
    pub total_length: f64,

    pub iterations: usize,
}

/// Search running simultaneously from the sources (forward)
/// and from the targets (backward), until both frontiers meet.
#[derive(Debug, Clone)]
pub struct BidirectionalDijkstra<'g> {
    graph: &'g GraphAccessor,
    forward: CandidatePool<'g>,
    backward: CandidatePool<'g>,
}

impl<'g> BidirectionalDijkstra<'g> {
    pub fn new(graph: &'g GraphAccessor) -> Self {
        Self {
            graph,
            forward: CandidatePool::new(graph),
            backward: CandidatePool::new(graph),
        }
    }

    pub fn graph(&self) -> &'g GraphAccessor {
        self.graph
    }

    fn pool(&self, direction: SearchDirection) -> &CandidatePool<'g> {
        match direction {
            SearchDirection::Forward => &self.forward,
            SearchDirection::Backward => &self.backward,
        }
    }

    fn pool_mut(&mut self, direction: SearchDirection) -> &mut CandidatePool<'g> {
        match direction {
            SearchDirection::Forward => &mut self.forward,
            SearchDirection::Backward => &mut self.backward,
        }
    }

    /// Finds the cheapest way from any of the `sources` to any of the `targets` edges.
    /// Returns `None` if the two searches never met.
    pub fn run(
        &mut self,
        sources: &[usize],
        targets: &[usize],
        options: &BidirectionalOptions,
    ) -> Option<BidirectionalResult> {
        let forward_ok = self.forward.init(sources, options.dynamic_cost);
        let backward_ok = self.backward.init(targets, options.dynamic_cost);
        if !forward_ok || !backward_ok {
            return None;
        }

        let mut best: Option<(NodeHandle, NodeHandle, f64)> = None;
        let mut iterations = 0;

        loop {
            let (Some(f), Some(b)) = (self.forward.peek(), self.backward.peek()) else {
                break;
            };
            let f_cost = self.forward.node(f).total_cost;
            let b_cost = self.backward.node(b).total_cost;

            if let Some((_, _, best_cost)) = best {
                if best_cost + options.max_cost_past_best <= f_cost + b_cost {
                    break;
                }
            }

            let direction = if b_cost < f_cost {
                SearchDirection::Backward
            } else {
                SearchDirection::Forward
            };
            let Some(handle) = self.pool_mut(direction).next() else {
                break;
            };
            iterations += 1;

            let candidate = *self.pool(direction).node(handle);
            let opposite = self.pool(direction.reversed());
            if let Some(other) = opposite.candidate(candidate.edge) {
                let other_node = opposite.node(other);
                let (forward, backward, fh, bh) = match direction {
                    SearchDirection::Forward => (&candidate, other_node, handle, other),
                    SearchDirection::Backward => (other_node, &candidate, other, handle),
                };

                let total = forward.fixed_cost
                    + backward.fixed_cost
                    + (options.dynamic_cost_merge)(forward, backward);
                if best.map_or(true, |(_, _, best_cost)| total < best_cost) {
                    best = Some((fh, bh, total));
                }
            }

            self.pool_mut(direction)
                .expand(handle, direction, options.dynamic_cost);
        }

        log::debug!(
            "bidirectional dijkstra finished after {} iterations, route found: {}",
            iterations,
            best.is_some(),
        );

        let (forward, backward, total_cost) = best?;
        let f = self.forward.node(forward);
        let b = self.backward.node(backward);
        Some(BidirectionalResult {
            forward,
            backward,
            total_cost,
            total_length: f.total_length + b.total_length - self.graph.edge_length(f.edge),
            iterations,
        })
    }

    /// Resolves a candidate of the forward search.
    pub fn forward(&self, handle: NodeHandle) -> Option<&RouteNode> {
        self.forward.get(handle)
    }

    /// Resolves a candidate of the backward search.
    pub fn backward(&self, handle: NodeHandle) -> Option<&RouteNode> {
        self.backward.get(handle)
    }

    /// Returns the edges of a found route, in the order of travel.
    pub fn path(&self, result: &BidirectionalResult) -> Vec<usize> {
        let mut edges = self
            .forward
            .path_edges(result.forward, SearchDirection::Forward);
        edges.extend(
            self.backward
                .path_edges(result.backward, SearchDirection::Backward)
                .into_iter()
                .skip(1),
        );
        edges
    }

    /// Returns `(lon, lat)` positions along a found route, in the order of travel.
    pub fn geometry(&self, result: &BidirectionalResult) -> Vec<(f64, f64)> {
        path_geometry(self.graph, &self.path(result))
    }
}
