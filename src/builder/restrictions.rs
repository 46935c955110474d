// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};

use super::OsmData;
use crate::osm::{FeatureType, NodeId, Relation, RelationId, WayId};

/// Turn restriction kind indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionKind {
    /// The maneuver is prohibited (`no_*` restrictions).
    Disallowed,

    /// The maneuver is the only one allowed from the `from` way
    /// at the `via` node (`only_*` restrictions).
    Mandatory,
}

impl RestrictionKind {
    /// Classifies the value of a `restriction` tag.
    pub fn from_tag(restriction: &str) -> Option<Self> {
        if restriction.starts_with("no_") {
            Some(Self::Disallowed)
        } else if restriction.starts_with("only_") {
            Some(Self::Mandatory)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restriction {
    pub relation: RelationId,

    /// Value of the `restriction` tag, e.g. "no_left_turn".
    pub restriction: String,
    pub kind: RestrictionKind,
}

fn has_kind(restrictions: &[Restriction], kind: RestrictionKind) -> bool {
    restrictions.iter().any(|r| r.kind == kind)
}

/// Turn restrictions indexed by `(from way, via node, to way)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestrictionMap {
    by_from_via: HashMap<(WayId, NodeId), BTreeMap<WayId, Vec<Restriction>>>,
    len: usize,
}

impl RestrictionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes all restriction relations from `data` with a single `from` way,
    /// `via` node and `to` way, all of which must be present in the data.
    pub fn build(data: &OsmData) -> Self {
        let mut map = Self::new();
        for relation in data.relations.values() {
            if let Some((from, via, to, restriction)) = Self::parse(data, relation) {
                map.insert(from, via, to, restriction);
            }
        }
        map
    }

    fn parse(data: &OsmData, r: &Relation) -> Option<(WayId, NodeId, WayId, Restriction)> {
        let from = WayId(r.only_member(FeatureType::Way, "from")?);
        let via = NodeId(r.only_member(FeatureType::Node, "via")?);
        let to = WayId(r.only_member(FeatureType::Way, "to")?);

        let tag = r.tags.get("restriction")?;
        let kind = RestrictionKind::from_tag(tag)?;

        if !data.ways.contains_key(&from)
            || !data.ways.contains_key(&to)
            || !data.nodes.contains_key(&via)
        {
            return None;
        }

        Some((
            from,
            via,
            to,
            Restriction {
                relation: r.id,
                restriction: tag.clone(),
                kind,
            },
        ))
    }

    pub fn insert(&mut self, from: WayId, via: NodeId, to: WayId, restriction: Restriction) {
        self.by_from_via
            .entry((from, via))
            .or_default()
            .entry(to)
            .or_default()
            .push(restriction);
        self.len += 1;
    }

    /// Returns the number of indexed restrictions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns restrictions applying to exactly the provided maneuver.
    pub fn get(&self, from: WayId, via: NodeId, to: WayId) -> &[Restriction] {
        self.by_from_via
            .get(&(from, via))
            .and_then(|destinations| destinations.get(&to))
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    /// Checks if a maneuver is allowed. A maneuver is forbidden if a [Disallowed](RestrictionKind::Disallowed)
    /// restriction matches it, or if any [Mandatory](RestrictionKind::Mandatory) restriction
    /// exists from the same way at the same node which doesn't lead onto `to`.
    pub fn is_allowed(&self, from: WayId, via: NodeId, to: WayId) -> bool {
        let Some(destinations) = self.by_from_via.get(&(from, via)) else {
            return true;
        };

        if destinations
            .get(&to)
            .is_some_and(|r| has_kind(r, RestrictionKind::Disallowed))
        {
            return false;
        }

        let mut mandatory = destinations
            .iter()
            .filter(|(_, r)| has_kind(r, RestrictionKind::Mandatory))
            .map(|(&destination, _)| destination)
            .peekable();

        mandatory.peek().is_none() || mandatory.any(|destination| destination == to)
    }
}
