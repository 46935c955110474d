// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};

use super::{build_junctions, contract, expand, Edge, Junction, RestrictionMap, Turn, Warning};
use crate::graph::Graph;
use crate::osm::{Feature, Node, NodeId, Obstacle, ProcessedWay, Relation, RelationId, Way, WayId};

/// OSM features loaded for graph building, together with
/// everything the profile attached to them.
#[derive(Debug, Clone, Default)]
pub struct OsmData {
    pub nodes: BTreeMap<NodeId, Node>,
    pub ways: BTreeMap<WayId, ProcessedWay>,

    /// Only turn restriction relations are kept.
    pub relations: BTreeMap<RelationId, Relation>,

    /// All ways passing through a node, without duplicates.
    pub node_to_ways: HashMap<NodeId, Vec<WayId>>,

    pub obstacles: HashMap<NodeId, Vec<Obstacle>>,
    pub warnings: Vec<Warning>,
}

impl OsmData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_feature(&mut self, f: Feature) {
        match f {
            Feature::Node(n) => self.load_node(n),
            Feature::Way(w) => self.load_way(w),
            Feature::Relation(r) => self.load_relation(r),
        }
    }

    pub fn load_node(&mut self, node: Node) {
        self.nodes.insert(node.id, node);
    }

    pub fn load_way(&mut self, way: Way) {
        let way = ProcessedWay::from(way);
        Self::index_way(&mut self.node_to_ways, &way);
        self.ways.insert(way.id, way);
    }

    /// Loads a relation, ignoring everything but turn restrictions.
    pub fn load_relation(&mut self, relation: Relation) {
        if relation.tags.get("type").map(|v| v.as_str()) == Some("restriction") {
            self.relations.insert(relation.id, relation);
        }
    }

    fn index_way(node_to_ways: &mut HashMap<NodeId, Vec<WayId>>, way: &ProcessedWay) {
        for &node in &way.nodes {
            let ways = node_to_ways.entry(node).or_default();
            if !ways.contains(&way.id) {
                ways.push(way.id);
            }
        }
    }

    fn reindex_ways(&mut self) {
        self.node_to_ways.clear();
        for way in self.ways.values() {
            Self::index_way(&mut self.node_to_ways, way);
        }
    }

    /// Returns true if a node is shared by at least 2 ways.
    pub fn is_junction(&self, node: NodeId) -> bool {
        self.node_to_ways.get(&node).is_some_and(|w| w.len() > 1)
    }

    pub fn add_obstacle(&mut self, node: NodeId, obstacle: Obstacle) {
        self.obstacles.entry(node).or_default().push(obstacle);
    }

    pub fn obstacles(&self, node: NodeId) -> &[Obstacle] {
        self.obstacles.get(&node).map(|o| o.as_slice()).unwrap_or(&[])
    }

    /// Iterates over obstacles encountered when traversing an edge,
    /// excluding those at its start node. Obstacles limited to one
    /// direction of travel are only returned for edges going in that direction.
    pub fn obstacles_along<'a>(
        &'a self,
        edge: &'a Edge,
    ) -> impl Iterator<Item = &'a Obstacle> + 'a {
        edge.nodes[1..]
            .iter()
            .flat_map(move |&node| self.obstacles(node))
            .filter(move |o| o.direction.applies_to(edge.direction))
    }

    /// Logs a warning and stores it in [OsmData::warnings].
    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Runs a processing step on every node. The step may emit obstacles
    /// attached to the node; returning `false` removes the node.
    pub fn process_nodes<F>(&mut self, mut step: F)
    where
        F: FnMut(&Node, &mut Vec<Obstacle>) -> bool,
    {
        let obstacles = &mut self.obstacles;
        let mut found = Vec::new();
        self.nodes.retain(|&id, node| {
            found.clear();
            let keep = step(node, &mut found);
            if keep && !found.is_empty() {
                obstacles.entry(id).or_default().append(&mut found);
            }
            keep
        });
    }

    /// Runs a processing step on every way; returning `false` removes the way.
    pub fn process_ways<F>(&mut self, mut step: F)
    where
        F: FnMut(&mut ProcessedWay) -> bool,
    {
        let before = self.ways.len();
        self.ways.retain(|_, way| step(way));
        if self.ways.len() != before {
            self.reindex_ways();
        }
    }

    /// Runs a processing step on every relation; returning `false` removes the relation.
    pub fn process_relations<F>(&mut self, mut step: F)
    where
        F: FnMut(&mut Relation) -> bool,
    {
        self.relations.retain(|_, relation| step(relation));
    }

    /// Removes nodes not used by any way, returning the number of removed nodes.
    pub fn prune_unreferenced_nodes(&mut self) -> usize {
        let before = self.nodes.len();
        let node_to_ways = &self.node_to_ways;
        self.nodes.retain(|id, _| node_to_ways.contains_key(id));
        self.obstacles.retain(|id, _| node_to_ways.contains_key(id));
        before - self.nodes.len()
    }

    /// Builds the edge-expanded [Graph] from the processed data,
    /// using `turn_cost` to price (or forbid, by returning `None`) every maneuver.
    ///
    /// Problems with the data are logged and appended to [OsmData::warnings].
    pub fn build<F>(&mut self, turn_cost: F) -> Graph
    where
        F: Fn(&Turn, &Junction, &OsmData) -> Option<f64>,
    {
        let mut warnings = Vec::new();

        let mut junctions = build_junctions(self, &mut warnings);
        let contracted = contract(&mut junctions);
        log::info!(
            "built junction map with {} junctions ({} contracted)",
            junctions.len(),
            contracted,
        );

        let restrictions = RestrictionMap::build(self);
        log::info!("built restriction map with {} restrictions", restrictions.len());

        let graph = expand(self, &junctions, &restrictions, &turn_cost, &mut warnings);
        log::info!(
            "built graph with {} edges over {} nodes",
            graph.edge_count(),
            graph.nodes.len(),
        );

        for warning in warnings {
            self.warn(warning);
        }
        graph
    }
}
