// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{DynamicCostFn, NodeHandle, RouteNode, SearchDirection};
use crate::graph::{Connection, GraphAccessor};

#[derive(Debug, Clone, Copy)]
struct QueueItem {
    total_cost: f64,
    edge: usize,
    index: usize,
}

impl PartialEq for QueueItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueItem {}

impl PartialOrd for QueueItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // NOTE: We revert the order of comparison,
        // as lower costs are considered better ("higher"),
        // and Rust's BinaryHeap is a max-heap. Ties are broken
        // by the edge index to keep searches deterministic.
        other
            .total_cost
            .total_cmp(&self.total_cost)
            .then_with(|| other.edge.cmp(&self.edge))
            .then_with(|| other.index.cmp(&self.index))
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    generation: u32,
    index: usize,
}

/// Best-known candidates for every edge, together with a priority queue
/// of candidates to explore, for a single search direction.
///
/// The pool is reused across searches: [CandidatePool::init] starts a new
/// generation, which invalidates all previous candidates without
/// clearing the per-edge table.
#[derive(Debug, Clone)]
pub struct CandidatePool<'g> {
    graph: &'g GraphAccessor,
    generation: u32,
    best: Vec<Slot>,
    nodes: Vec<RouteNode>,
    queue: BinaryHeap<QueueItem>,
}

impl<'g> CandidatePool<'g> {
    pub fn new(graph: &'g GraphAccessor) -> Self {
        Self {
            graph,
            generation: 0,
            best: vec![Slot::default(); graph.edge_count()],
            nodes: Vec::new(),
            queue: BinaryHeap::new(),
        }
    }

    pub fn graph(&self) -> &'g GraphAccessor {
        self.graph
    }

    /// Resets the pool and seeds it with a root candidate for every provided edge.
    /// Returns `false` if no candidate could be created.
    pub fn init(&mut self, edges: &[usize], dynamic_cost: &DynamicCostFn<'_>) -> bool {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.best.fill(Slot::default());
            self.generation = 1;
        }
        self.nodes.clear();
        self.queue.clear();

        for &edge in edges {
            self.push(edge, 0.0, dynamic_cost(None, edge, 0.0), None);
        }
        !self.queue.is_empty()
    }

    /// Records a candidate for an edge, unless an existing candidate is at least as good.
    /// Returns a handle to the new candidate, or `None` if nothing was recorded.
    pub fn push(
        &mut self,
        edge: usize,
        fixed_cost: f64,
        dynamic_cost: f64,
        parent: Option<NodeHandle>,
    ) -> Option<NodeHandle> {
        if edge >= self.best.len() {
            log::debug!("ignoring candidate for non-existing edge {}", edge);
            return None;
        }

        let total_cost = fixed_cost + dynamic_cost;
        if self.candidate(edge).is_some_and(|c| self.node(c).total_cost <= total_cost) {
            return None;
        }

        let (depth, parent_length) = parent
            .and_then(|p| self.get(p))
            .map_or((0, 0.0), |p| (p.depth + 1, p.total_length));

        let handle = NodeHandle {
            generation: self.generation,
            index: self.nodes.len(),
        };

        self.nodes.push(RouteNode {
            edge,
            fixed_cost,
            dynamic_cost,
            total_cost,
            total_length: parent_length + self.graph.edge_length(edge),
            depth,
            parent,
        });
        self.best[edge] = Slot {
            generation: self.generation,
            index: handle.index,
        };
        self.queue.push(QueueItem {
            total_cost,
            edge,
            index: handle.index,
        });
        Some(handle)
    }

    /// Relaxes a connection leaving the `from` candidate.
    pub fn relax(
        &mut self,
        from: NodeHandle,
        connection: Connection,
        dynamic_cost: &DynamicCostFn<'_>,
    ) -> Option<NodeHandle> {
        let previous = *self.node(from);
        let dynamic = dynamic_cost(Some(&previous), connection.edge, connection.cost);
        let fixed = previous.fixed_cost + connection.cost;
        self.push(connection.edge, fixed, dynamic, Some(from))
    }

    /// Relaxes all connections of a candidate's edge in the given direction.
    pub fn expand(
        &mut self,
        from: NodeHandle,
        direction: SearchDirection,
        dynamic_cost: &DynamicCostFn<'_>,
    ) {
        let graph = self.graph;
        let edge = self.node(from).edge;
        match direction {
            SearchDirection::Forward => {
                for c in graph.list_to_edges(edge) {
                    self.relax(from, c, dynamic_cost);
                }
            }
            SearchDirection::Backward => {
                for c in graph.list_from_edges(edge) {
                    self.relax(from, c, dynamic_cost);
                }
            }
        }
    }

    /// Returns the current best candidate for an edge.
    pub fn candidate(&self, edge: usize) -> Option<NodeHandle> {
        self.best
            .get(edge)
            .filter(|slot| slot.generation == self.generation)
            .map(|slot| NodeHandle {
                generation: slot.generation,
                index: slot.index,
            })
    }

    /// Resolves a handle created in the current generation.
    pub fn get(&self, handle: NodeHandle) -> Option<&RouteNode> {
        if handle.generation == self.generation {
            self.nodes.get(handle.index)
        } else {
            None
        }
    }

    pub(super) fn node(&self, handle: NodeHandle) -> &RouteNode {
        &self.nodes[handle.index]
    }

    /// Removes and returns the cheapest candidate to explore.
    pub fn next(&mut self) -> Option<NodeHandle> {
        self.discard_stale();
        let generation = self.generation;
        self.queue.pop().map(|item| NodeHandle {
            generation,
            index: item.index,
        })
    }

    /// Returns the cheapest candidate to explore, without removing it.
    pub fn peek(&mut self) -> Option<NodeHandle> {
        self.discard_stale();
        self.queue.peek().map(|item| NodeHandle {
            generation: self.generation,
            index: item.index,
        })
    }

    /// Drops queued candidates which were superseded by a cheaper one for the same edge.
    fn discard_stale(&mut self) {
        while let Some(top) = self.queue.peek() {
            if self.best[top.edge].index == top.index {
                break;
            }
            self.queue.pop();
        }
    }

    /// Iterates from a candidate up to the root of its search.
    pub fn path(&self, handle: NodeHandle) -> impl Iterator<Item = &RouteNode> + '_ {
        std::iter::successors(self.get(handle), move |n| n.parent.and_then(|p| self.get(p)))
    }

    /// Returns edges on the path to a candidate, in the order of travel.
    pub fn path_edges(&self, handle: NodeHandle, direction: SearchDirection) -> Vec<usize> {
        let mut edges: Vec<usize> = self.path(handle).map(|n| n.edge).collect();
        if direction == SearchDirection::Forward {
            edges.reverse();
        }
        edges
    }
}
