// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Handle to a [RouteNode] stored in a [CandidatePool](super::CandidatePool).
///
/// Handles are only valid within the search which created them; once the pool
/// is re-initialized, [CandidatePool::get](super::CandidatePool::get) stops resolving them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    pub(super) generation: u32,
    pub(super) index: usize,
}

/// A search candidate: the best known way of reaching an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteNode {
    /// Index of the reached edge.
    pub edge: usize,

    /// Sum of connection costs from the root of the search.
    pub fixed_cost: f64,

    /// Runtime-only cost, as returned by the [DynamicCostFn]. It is not accumulated.
    pub dynamic_cost: f64,

    /// `fixed_cost + dynamic_cost`, the priority of this candidate.
    pub total_cost: f64,

    /// Sum of lengths of all edges from the root of the search, including this one.
    pub total_length: f64,

    /// Number of ancestors.
    pub depth: usize,

    pub parent: Option<NodeHandle>,
}

/// Direction in which a search walks the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SearchDirection {
    /// From sources along outgoing connections.
    #[default]
    Forward,

    /// From sources along incoming connections, so that the found
    /// candidate is where travel starts.
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// Computes the dynamic cost of reaching an edge, given the previous candidate
/// (`None` for search roots), the edge index and the cost of the used connection.
pub type DynamicCostFn<'a> = dyn Fn(Option<&RouteNode>, usize, f64) -> f64 + 'a;

/// Combines dynamic costs of the forward and backward candidates meeting at the same edge.
pub type MergeFn<'a> = dyn Fn(&RouteNode, &RouteNode) -> f64 + 'a;

/// [DynamicCostFn] which always returns zero.
pub fn zero_cost(_: Option<&RouteNode>, _: usize, _: f64) -> f64 {
    0.0
}

/// [MergeFn] adding both dynamic costs.
pub fn sum_dynamic_costs(forward: &RouteNode, backward: &RouteNode) -> f64 {
    forward.dynamic_cost + backward.dynamic_cost
}

/// Options for [Dijkstra::run](super::Dijkstra::run).
#[derive(Clone, Copy)]
pub struct RoutingOptions<'a> {
    /// How much the cost of explored candidates may exceed the best found route
    /// before the search stops. Non-zero values allow later, cheaper-in-total
    /// routes to be found when the dynamic cost is not monotonic.
    pub max_cost_past_best: f64,

    pub dynamic_cost: &'a DynamicCostFn<'a>,
    pub direction: SearchDirection,
}

impl Default for RoutingOptions<'_> {
    fn default() -> Self {
        Self {
            max_cost_past_best: 0.0,
            dynamic_cost: &zero_cost,
            direction: SearchDirection::Forward,
        }
    }
}

/// Options for [BidirectionalDijkstra::run](super::BidirectionalDijkstra::run).
#[derive(Clone, Copy)]
pub struct BidirectionalOptions<'a> {
    /// See [RoutingOptions::max_cost_past_best].
    pub max_cost_past_best: f64,

    pub dynamic_cost: &'a DynamicCostFn<'a>,
    pub dynamic_cost_merge: &'a MergeFn<'a>,
}

impl Default for BidirectionalOptions<'_> {
    fn default() -> Self {
        Self {
            max_cost_past_best: 0.0,
            dynamic_cost: &zero_cost,
            dynamic_cost_merge: &sum_dynamic_costs,
        }
    }
}
