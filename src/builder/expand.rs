// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::{Edge, Junction, JunctionMap, OsmData, Restriction, RestrictionMap, Warning};
use crate::distance::turn_angle;
use crate::graph::Graph;
use crate::osm::NodeId;

/// A candidate maneuver: leaving `from_edge` at `via_node` onto `to_edge`.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    /// Start junction of `from_edge`.
    pub from_node: NodeId,
    pub from_edge: &'a Edge,

    /// Node of `from_edge` right before `via_node`.
    pub from_closest: NodeId,

    pub via_node: NodeId,

    /// End junction of `to_edge`.
    pub to_node: NodeId,
    pub to_edge: &'a Edge,

    /// Node of `to_edge` right after `via_node`.
    pub to_closest: NodeId,

    /// Signed turn angle in degrees, in range (-180, 180]. Right turns are positive,
    /// 0 means going straight on and ±180 is a u-turn.
    pub angle: f64,

    /// Restrictions matching exactly this maneuver. Those which forbid it
    /// have already been applied.
    pub restrictions: &'a [Restriction],
}

impl<'a> Turn<'a> {
    /// Describes a maneuver, or returns `None` if any of the nodes around `via_node`
    /// has no known position.
    pub fn new(
        data: &OsmData,
        from_edge: &'a Edge,
        to_edge: &'a Edge,
        restrictions: &'a [Restriction],
    ) -> Option<Self> {
        let from_closest = from_edge.nodes[from_edge.nodes.len() - 2];
        let via_node = to_edge.start();
        let to_closest = to_edge.nodes[1];

        let position = |id: NodeId| data.nodes.get(&id).map(|n| (n.lat, n.lon));
        let angle = turn_angle(
            position(from_closest)?,
            position(via_node)?,
            position(to_closest)?,
        );

        Some(Self {
            from_node: from_edge.start(),
            from_edge,
            from_closest,
            via_node,
            to_node: to_edge.end(),
            to_edge,
            to_closest,
            angle,
            restrictions,
        })
    }

    /// Returns true if the maneuver goes back onto the same way in the opposite direction.
    pub fn is_reversal(&self) -> bool {
        self.from_edge.way == self.to_edge.way && self.from_edge.direction != self.to_edge.direction
    }
}

/// Builds the edge-expanded graph by evaluating every maneuver at every junction.
///
/// Maneuvers rejected by `restrictions` or for which `turn_cost` returns `None`
/// are skipped. Every other maneuver becomes a connection leaving `from_edge`
/// and a connection entering `to_edge`, both with the cost of the turn plus
/// the cost of `from_edge`.
pub fn expand<F>(
    data: &OsmData,
    junctions: &JunctionMap,
    restrictions: &RestrictionMap,
    turn_cost: &F,
    warnings: &mut Vec<Warning>,
) -> Graph
where
    F: Fn(&Turn, &Junction, &OsmData) -> Option<f64> + ?Sized,
{
    let mut graph = Graph::new();
    let position = |id: NodeId| data.nodes.get(&id).map(|n| (n.lon, n.lat));

    for (&via_node, junction) in junctions {
        for (&from_node, from_edge) in &junction.from {
            for (&to_node, to_edge) in &junction.to {
                if !restrictions.is_allowed(from_edge.way, via_node, to_edge.way) {
                    continue;
                }

                let matching = restrictions.get(from_edge.way, via_node, to_edge.way);
                let Some(turn) = Turn::new(data, from_edge, to_edge, matching) else {
                    warnings.push(Warning::MissingEdge {
                        from: from_node,
                        via: via_node,
                        to: to_node,
                    });
                    continue;
                };

                let Some(cost) = turn_cost(&turn, junction, data) else {
                    continue;
                };
                let total = cost + from_edge.cost;

                graph
                    .edge_entry(
                        (from_node, via_node),
                        &from_edge.nodes,
                        from_edge.length,
                        position,
                    )
                    .to
                    .insert(to_node, total);

                graph
                    .edge_entry((via_node, to_node), &to_edge.nodes, to_edge.length, position)
                    .from
                    .insert(from_node, total);
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_junctions;
    use crate::osm::WayId;
    use crate::test_support::{cross_junction, restriction, straight_road};

    fn free(_: &Turn, _: &Junction, _: &OsmData) -> Option<f64> {
        Some(0.0)
    }

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr) => {
            assert!(
                (($a - $b).abs() < 1e-4),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    #[test]
    fn turn_angles() {
        let data = cross_junction();
        let mut warnings = Vec::new();
        let junctions = build_junctions(&data, &mut warnings);
        let j = &junctions[&NodeId(0)];

        // Coming from the west (node 1), going north (node 2) is a left turn
        let from = &j.from[&NodeId(1)];
        let left = Turn::new(&data, from, &j.to[&NodeId(2)], &[]).unwrap();
        assert_eq!(left.from_node, NodeId(1));
        assert_eq!(left.via_node, NodeId(0));
        assert_eq!(left.to_node, NodeId(2));
        assert!((left.angle + 90.0).abs() < 1.0, "{}", left.angle);
        assert!(!left.is_reversal());

        let straight = Turn::new(&data, from, &j.to[&NodeId(3)], &[]).unwrap();
        assert!(straight.angle.abs() < 1.0, "{}", straight.angle);

        let right = Turn::new(&data, from, &j.to[&NodeId(4)], &[]).unwrap();
        assert!((right.angle - 90.0).abs() < 1.0, "{}", right.angle);

        let back = Turn::new(&data, from, &j.to[&NodeId(1)], &[]).unwrap();
        assert_eq!(back.angle, 180.0);
        assert!(back.is_reversal());
    }

    #[test]
    fn expands_all_maneuvers() {
        let data = cross_junction();
        let mut warnings = Vec::new();
        let junctions = build_junctions(&data, &mut warnings);
        let g = expand(&data, &junctions, &RestrictionMap::new(), &free, &mut warnings);
        assert!(warnings.is_empty());

        // 4 arms, each in two directions
        assert_eq!(g.edge_count(), 8);

        let west_in = g.edge(NodeId(1), NodeId(0)).unwrap();
        assert_eq!(west_in.to.len(), 4);
        let base = junctions[&NodeId(0)].from[&NodeId(1)].cost;
        assert_almost_eq!(west_in.to[&NodeId(2)], base);

        let north_out = g.edge(NodeId(0), NodeId(2)).unwrap();
        assert_eq!(north_out.from.len(), 4);
        assert_almost_eq!(north_out.from[&NodeId(1)], base);

        // Arm ends are dead ends: the only maneuver is a u-turn
        let north_in = g.edge(NodeId(2), NodeId(0)).unwrap();
        assert_eq!(north_in.from.keys().copied().collect::<Vec<_>>(), [NodeId(0)]);
    }

    #[test]
    fn skips_restricted_and_forbidden_maneuvers() {
        let mut data = cross_junction();
        data.load_relation(restriction(-1, 1, 0, 2, "no_left_turn"));

        let mut warnings = Vec::new();
        let junctions = build_junctions(&data, &mut warnings);
        let restrictions = RestrictionMap::build(&data);

        let g = expand(
            &data,
            &junctions,
            &restrictions,
            &|t, _, _| if t.is_reversal() { None } else { Some(1.0) },
            &mut warnings,
        );

        let west_in = g.edge(NodeId(1), NodeId(0)).unwrap();
        assert_eq!(
            west_in.to.keys().copied().collect::<Vec<_>>(),
            [NodeId(3), NodeId(4)]
        );
        assert!(!g.edge(NodeId(0), NodeId(2)).unwrap().from.contains_key(&NodeId(1)));

        // Nothing leaves the dead ends, but the opposite edges can still be used
        assert!(g.edge(NodeId(0), NodeId(2)).unwrap().to.is_empty());
        assert_eq!(g.edge(NodeId(2), NodeId(0)).unwrap().to.len(), 3);
    }

    #[test]
    fn turn_carries_matching_restrictions() {
        let mut data = cross_junction();
        data.load_relation(restriction(-1, 1, 0, 3, "only_straight_on"));

        let mut warnings = Vec::new();
        let junctions = build_junctions(&data, &mut warnings);
        let restrictions = RestrictionMap::build(&data);

        let seen = std::cell::RefCell::new(Vec::new());
        expand(
            &data,
            &junctions,
            &restrictions,
            &|t, _, _| {
                if t.from_edge.way == WayId(1) && t.via_node == NodeId(0) {
                    seen.borrow_mut().push((t.to_edge.way, t.restrictions.len()));
                }
                Some(0.0)
            },
            &mut warnings,
        );

        assert_eq!(seen.into_inner(), [(WayId(3), 1)]);
    }

    #[test]
    fn reports_missing_positions() {
        let mut data = straight_road();
        let mut warnings = Vec::new();
        let junctions = build_junctions(&data, &mut warnings);

        // Shape node 3 of way 2 vanishes after the junctions were built
        data.nodes.remove(&NodeId(3));
        let g = expand(&data, &junctions, &RestrictionMap::new(), &free, &mut warnings);

        assert!(warnings.contains(&Warning::MissingEdge {
            from: NodeId(1),
            via: NodeId(2),
            to: NodeId(4),
        }));
        assert!(g.edge(NodeId(1), NodeId(2)).unwrap().to.get(&NodeId(4)).is_none());
        assert!(g.edge(NodeId(1), NodeId(2)).unwrap().to.contains_key(&NodeId(1)));
    }
}
