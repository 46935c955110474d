// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;

/// Tags of an [OSM element](https://wiki.openstreetmap.org/wiki/Elements).
pub type Tags = HashMap<String, String>;

macro_rules! osm_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "/{}"), self.0)
            }
        }
    };
}

osm_id!(NodeId, "node");
osm_id!(WayId, "way");
osm_id!(RelationId, "relation");

/// Represents an [OSM node](https://wiki.openstreetmap.org/wiki/Node).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

/// Represents an [OSM way](https://wiki.openstreetmap.org/wiki/Way).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: WayId,
    pub nodes: Vec<NodeId>,
    pub tags: Tags,
}

/// Type of an [OSM feature/element](https://wiki.openstreetmap.org/wiki/Elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    Node,
    Way,
    Relation,
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Way => write!(f, "way"),
            Self::Relation => write!(f, "relation"),
        }
    }
}

/// Represents a member of an [OSM relation](https://wiki.openstreetmap.org/wiki/Relation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    pub type_: FeatureType,
    pub ref_: i64,
    pub role: String,
}

/// Represents an [OSM relation](https://wiki.openstreetmap.org/wiki/Relation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub id: RelationId,
    pub members: Vec<RelationMember>,
    pub tags: Tags,
}

impl Relation {
    /// Returns the ref of the only member with the provided type and role.
    /// If there are zero or multiple such members, returns `None`.
    pub fn only_member(&self, type_: FeatureType, role: &str) -> Option<i64> {
        let mut matching = self
            .members
            .iter()
            .filter(|m| m.type_ == type_ && m.role == role);
        match (matching.next(), matching.next()) {
            (Some(m), None) => Some(m.ref_),
            _ => None,
        }
    }
}

/// Union over all possible [OSM features/elements](https://wiki.openstreetmap.org/wiki/Elements).
#[derive(Debug, Clone)]
pub enum Feature {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

/// Direction of travel along a way, relative to the order of its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// A pair of values, one for each [Direction].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerDirection<T> {
    pub forward: T,
    pub backward: T,
}

impl<T> PerDirection<T> {
    pub const fn new(forward: T, backward: T) -> Self {
        Self { forward, backward }
    }

    pub fn get(&self, d: Direction) -> &T {
        match d {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
        }
    }

    pub fn get_mut(&mut self, d: Direction) -> &mut T {
        match d {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
        }
    }
}

impl<T: Copy> PerDirection<T> {
    pub const fn both(value: T) -> Self {
        Self {
            forward: value,
            backward: value,
        }
    }
}

/// A [Way] annotated with routing attributes for each direction of travel.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedWay {
    pub id: WayId,
    pub nodes: Vec<NodeId>,
    pub tags: Tags,

    /// Travel speed, in meters per second.
    pub speed: PerDirection<f64>,

    /// Multiplier applied to the travel time to obtain the cost.
    pub multiplier: PerDirection<f64>,

    pub inaccessible: PerDirection<bool>,

    /// Set on ways with restricted access (e.g. destination-only),
    /// which should only be entered when necessary.
    pub restricted: PerDirection<bool>,
}

impl ProcessedWay {
    /// Returns the cost of traversing `length` meters of this way in the given direction,
    /// or `None` if that direction can't be used at all.
    pub fn cost(&self, d: Direction, length: f64) -> Option<f64> {
        let speed = *self.speed.get(d);
        if *self.inaccessible.get(d) || speed <= 0.0 || !speed.is_finite() {
            None
        } else {
            Some(length / speed * self.multiplier.get(d))
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| v.as_str())
    }
}

impl From<Way> for ProcessedWay {
    fn from(way: Way) -> Self {
        Self {
            id: way.id,
            nodes: way.nodes,
            tags: way.tags,
            speed: PerDirection::both(0.0),
            multiplier: PerDirection::both(1.0),
            inaccessible: PerDirection::both(false),
            restricted: PerDirection::both(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn way() -> ProcessedWay {
        ProcessedWay::from(Way {
            id: WayId(1),
            nodes: vec![NodeId(1), NodeId(2)],
            tags: Tags::default(),
        })
    }

    #[test]
    fn cost() {
        let mut w = way();
        assert_eq!(w.cost(Direction::Forward, 100.0), None);

        w.speed = PerDirection::new(10.0, 5.0);
        w.multiplier.backward = 2.0;
        assert_eq!(w.cost(Direction::Forward, 100.0), Some(10.0));
        assert_eq!(w.cost(Direction::Backward, 100.0), Some(40.0));

        w.inaccessible.forward = true;
        assert_eq!(w.cost(Direction::Forward, 100.0), None);
    }

    #[test]
    fn only_member() {
        let member = |type_, ref_, role: &str| RelationMember {
            type_,
            ref_,
            role: role.to_string(),
        };
        let r = Relation {
            id: RelationId(1),
            members: vec![
                member(FeatureType::Way, 10, "from"),
                member(FeatureType::Node, 20, "via"),
                member(FeatureType::Way, 30, "to"),
                member(FeatureType::Way, 31, "to"),
            ],
            tags: Tags::default(),
        };

        assert_eq!(r.only_member(FeatureType::Way, "from"), Some(10));
        assert_eq!(r.only_member(FeatureType::Node, "via"), Some(20));
        assert_eq!(r.only_member(FeatureType::Way, "to"), None);
        assert_eq!(r.only_member(FeatureType::Way, "via"), None);
    }

    #[test]
    fn display_ids() {
        assert_eq!(NodeId(-5).to_string(), "node/-5");
        assert_eq!(WayId(7).to_string(), "way/7");
    }
}
