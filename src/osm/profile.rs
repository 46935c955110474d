// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::model::{Direction, Node, PerDirection, ProcessedWay, Relation, Tags};
use super::obstacles::{Obstacle, ObstacleDirection, ObstacleType};
use crate::builder::{Edge, Junction, OsmData, Turn};

const KMH_TO_MS: f64 = 10.0 / 36.0;
const MPH_TO_KMH: f64 = 1.609;

/// Turns sharper than this (in degrees) are not allowed at real junctions.
const MAX_JUNCTION_TURN: f64 = 110.0;

/// Turns sharper than this (in degrees) are u-turns.
const U_TURN: f64 = 135.0;

const MAXSPEED_KEYS: [&str; 4] = [
    "maxspeed:advisory",
    "maxspeed",
    "source:maxspeed",
    "maxspeed:type",
];

/// Describes how to turn OSM data into speeds, cost multipliers, obstacles
/// and turn costs of an edge-expanded graph.
///
/// A profile is a plain value; all of its tables are slices of `(tag value, number)`
/// pairs, with speeds given in km/h.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile<'a> {
    /// Human readable name of the routing profile,
    /// customary the most specific [access tag](https://wiki.openstreetmap.org/wiki/Key:access).
    pub name: &'a str,

    /// Array of OSM [access tags](https://wiki.openstreetmap.org/wiki/Key:access#Land-based_transportation)
    /// (in order from least to most specific) to consider when checking for road prohibitions.
    ///
    /// The same modes are used to find mode-specific one-way tags, turn restrictions
    /// and restriction exemptions (see [Profile::is_exempted]).
    pub access: &'a [&'a str],

    /// Access tag values which prohibit usage of a way or passing through a node.
    pub access_blacklist: &'a [&'a str],

    /// Blacklisted access tag values which still allow usage of a way when necessary,
    /// e.g. "destination" or "private". Such ways are marked as [restricted](ProcessedWay::restricted).
    pub restricted_access: &'a [&'a str],

    /// Highway types on which [Profile::restricted_access] values mark the way as restricted.
    pub restricted_highways: &'a [&'a str],

    /// `barrier` values which don't block the passage.
    pub barrier_whitelist: &'a [&'a str],

    /// `construction` values which don't block the way.
    pub construction_whitelist: &'a [&'a str],

    /// `highway` values of ways which are never used.
    pub avoid: &'a [&'a str],

    /// `service` values of ways which are never used.
    pub forbidden_services: &'a [&'a str],

    /// `route` values of ways which are never used, like ferries.
    pub forbidden_routes: &'a [&'a str],

    /// Travel speeds per `highway` value.
    pub speeds: &'a [(&'a str, f64)],

    /// Travel speed on ways with an unknown `highway` value, but with an explicit access tag.
    pub default_speed: f64,

    /// Upper limits on the travel speed per `surface` value.
    pub surface_speeds: &'a [(&'a str, f64)],

    /// Upper limits on the travel speed per `tracktype` value.
    pub tracktype_speeds: &'a [(&'a str, f64)],

    /// Upper limits on the travel speed per `smoothness` value.
    pub smoothness_speeds: &'a [(&'a str, f64)],

    /// Implicit `maxspeed` values, like "pl:rural". Zero means no limit.
    pub maxspeeds: &'a [(&'a str, f64)],

    /// Fallback for implicit `maxspeed` values missing from [Profile::maxspeeds],
    /// keyed by the part after the country code.
    pub default_maxspeeds: &'a [(&'a str, f64)],

    /// Fraction of the legal speed limit actually driven.
    pub speed_reduction: f64,

    /// Preference for specific ways. All matching penalties are considered,
    /// and the smallest one divides the cost multiplier of a way.
    pub penalties: &'a [Penalty<'a>],

    /// Penalty for ways at most 3 meters wide, or for two-way ways with a single lane.
    pub narrow_penalty: f64,

    /// Penalty for `oneway=alternating` ways.
    pub alternating_penalty: f64,

    /// Penalty for `side_road=yes` and `side_road=rotary` ways.
    pub side_road_penalty: f64,

    /// Time, in seconds, lost on making a u-turn.
    pub u_turn_penalty: f64,

    /// Time, in seconds, lost on traffic signals.
    pub traffic_signal_penalty: f64,

    /// Time, in seconds, lost on a stop sign.
    pub stop_penalty: f64,

    /// Time, in seconds, lost on a give way sign.
    pub give_way_penalty: f64,

    /// Cost of entering a restricted way from an unrestricted one.
    pub restricted_penalty: f64,

    /// Force ignoring of [turn restrictions](https://wiki.openstreetmap.org/wiki/Turn_restriction).
    pub disable_restrictions: bool,
}

/// Numeric multiplier for OSM ways with specific keys and values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty<'a> {
    /// Key of an OSM way for which this Penalty applies,
    /// used for [Penalty::value] comparison (e.g. "service")
    pub key: &'a str,

    /// Value under [Penalty::key] of an OSM way for which this Penalty applies.
    /// E.g. "alley" or "driveway".
    pub value: &'a str,

    /// Preference for matching ways, in range (0, 1]. The cost of using
    /// a way is divided by its penalty.
    pub penalty: f64,
}

fn tag<'t>(tags: &'t Tags, key: &str) -> Option<&'t str> {
    tags.get(key).map(|v| v.as_str())
}

fn lookup(table: &[(&str, f64)], value: Option<&str>) -> Option<f64> {
    let value = value?;
    table.iter().find(|(k, _)| *k == value).map(|&(_, v)| v)
}

/// Returns the first present value of the provided keys for each direction,
/// preferring `KEY:forward` and `KEY:backward` over plain `KEY`.
fn per_direction<'t, 'k>(
    tags: &'t Tags,
    keys: impl IntoIterator<Item = &'k str>,
) -> PerDirection<Option<&'t str>> {
    let mut value = PerDirection::<Option<&str>>::default();
    for key in keys {
        let common = tag(tags, key);
        value.forward = value
            .forward
            .or_else(|| tag(tags, &format!("{}:forward", key)))
            .or(common);
        value.backward = value
            .backward
            .or_else(|| tag(tags, &format!("{}:backward", key)))
            .or(common);

        if value.forward.is_some() && value.backward.is_some() {
            break;
        }
    }
    value
}

/// Parses the leading decimal number of a string, like "50" from "50 mph".
fn leading_number(value: &str) -> Option<f64> {
    let value = value.trim_start();
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map_or(value.len(), |(i, _)| i);
    value[..end].parse().ok()
}

/// Parses a length (like `width`) into meters.
fn parse_length(value: &str) -> Option<f64> {
    if let Some((feet, rest)) = value.split_once('\'') {
        let feet: f64 = feet.trim().parse().ok()?;
        let inches = rest.trim().trim_end_matches('"').trim().parse::<f64>().unwrap_or(0.0);
        return Some(feet * 0.3048 + inches * 0.0254);
    }

    let amount = leading_number(value)?;
    let unit = if value.contains("km") {
        1000.0
    } else if value.contains("mi") {
        1609.344
    } else {
        1.0
    };
    Some(amount * unit)
}

fn positive(value: f64) -> Option<f64> {
    (value > 0.0).then_some(value)
}

impl<'a> Profile<'a> {
    /// Applies all processing steps of this profile onto `data`:
    /// obstacles are generated for nodes, unusable ways are removed
    /// and inapplicable turn restrictions are dropped.
    pub fn apply(&self, data: &mut OsmData) {
        data.process_nodes(|node, obstacles| self.process_node(node, obstacles));
        data.process_ways(|way| self.process_way(way));
        data.process_relations(|relation| self.process_relation(relation));
        let pruned = data.prune_unreferenced_nodes();

        log::info!(
            "applied {} profile: {} ways, {} nodes ({} pruned), {} restrictions",
            self.name,
            data.ways.len(),
            data.nodes.len(),
            pruned,
            data.relations.len(),
        );
    }

    /// Sets speeds, multipliers and access flags of a way.
    /// Returns `false` if the way can't be used at all.
    pub fn process_way(&self, way: &mut ProcessedWay) -> bool {
        self.check_blocked(way)
            && self.apply_access(way)
            && self.apply_oneway(way)
            && self.apply_hov(way)
            && self.apply_speed(way)
            && self.apply_maxspeed(way)
            && self.apply_surface(way)
            && self.apply_penalties(way)
    }

    fn check_blocked(&self, way: &ProcessedWay) -> bool {
        if way.tag("area") == Some("yes") {
            return false;
        }

        if matches!(way.tag("psv"), Some("yes" | "designated"))
            || matches!(way.tag("bus"), Some("yes" | "designated"))
        {
            return false;
        }

        if way.tag("highway").is_some_and(|h| self.avoid.contains(&h)) {
            return false;
        }

        if way.tag("railway") == Some("construction")
            || way
                .tag("construction")
                .is_some_and(|c| !self.construction_whitelist.contains(&c))
            || way.tags.contains_key("proposed")
        {
            return false;
        }

        if way.tag("oneway") == Some("reversible")
            || way.tag("impassable") == Some("yes")
            || way.tag("status") == Some("impassable")
        {
            return false;
        }

        if way.tag("route").is_some_and(|r| self.forbidden_routes.contains(&r))
            || way.tag("service").is_some_and(|s| self.forbidden_services.contains(&s))
        {
            return false;
        }

        true
    }

    fn apply_access(&self, way: &mut ProcessedWay) -> bool {
        let access = per_direction(&way.tags, self.access.iter().rev().copied());

        if tag(&way.tags, "highway").is_some_and(|h| self.restricted_highways.contains(&h)) {
            way.restricted = PerDirection::new(
                access.forward.is_some_and(|a| self.restricted_access.contains(&a)),
                access.backward.is_some_and(|a| self.restricted_access.contains(&a)),
            );
        }

        for d in [Direction::Forward, Direction::Backward] {
            let blacklisted = access.get(d).is_some_and(|a| self.access_blacklist.contains(&a));
            if blacklisted && !*way.restricted.get(d) {
                *way.inaccessible.get_mut(d) = true;
            }
        }

        !(way.inaccessible.forward && way.inaccessible.backward)
    }

    fn apply_oneway(&self, way: &mut ProcessedWay) -> bool {
        match self.get_active_oneway_value(&way.tags) {
            "-1" | "reverse" => way.inaccessible.forward = true,
            "yes" | "true" | "1" => way.inaccessible.backward = true,
            "no" => {}
            _ => {
                let implied =
                    matches!(tag(&way.tags, "highway"), Some("motorway" | "motorway_link"))
                        || matches!(tag(&way.tags, "junction"), Some("roundabout" | "circular"));
                if implied {
                    way.inaccessible.backward = true;
                }
            }
        }

        !(way.inaccessible.forward && way.inaccessible.backward)
    }

    /// Returns the value of the most specific "oneway:MODE" tag (based on [Profile::access]),
    /// falling back to simply "oneway", and returning an empty string if no relevant tag was found.
    fn get_active_oneway_value<'t>(&self, tags: &'t Tags) -> &'t str {
        self.access
            .iter()
            .rev()
            .filter(|&&mode| mode != "access")
            .find_map(|&mode| tags.get(&format!("oneway:{}", mode)))
            .or_else(|| tags.get("oneway"))
            .map(|oneway_tag| oneway_tag.as_str())
            .unwrap_or("")
    }

    fn apply_hov(&self, way: &mut ProcessedWay) -> bool {
        if way.tag("hov") == Some("designated") {
            way.restricted = PerDirection::both(true);
        }

        let lanes = per_direction(&way.tags, ["hov:lanes"]);
        for d in [Direction::Forward, Direction::Backward] {
            if lanes.get(d).is_some_and(|l| l.split('|').all(|v| v == "designated")) {
                *way.inaccessible.get_mut(d) = true;
            }
        }

        !(way.inaccessible.forward && way.inaccessible.backward)
    }

    fn apply_speed(&self, way: &mut ProcessedWay) -> bool {
        let Some(highway) = way.tag("highway") else {
            return false;
        };

        if let Some(speed) = lookup(self.speeds, Some(highway)) {
            way.speed = PerDirection::both(speed * KMH_TO_MS);
        } else {
            // Unknown highway types are only used with explicit access tags
            let access = per_direction(&way.tags, self.access.iter().rev().copied());
            for d in [Direction::Forward, Direction::Backward] {
                match (*access.get(d), *access.get(d.reversed())) {
                    (Some(a), _) if !self.access_blacklist.contains(&a) => {
                        *way.speed.get_mut(d) = self.default_speed * KMH_TO_MS;
                    }
                    (None, Some(_)) => *way.inaccessible.get_mut(d) = true,
                    _ => {}
                }
            }
        }

        way.speed.forward > 0.0 || way.speed.backward > 0.0
    }

    fn apply_maxspeed(&self, way: &mut ProcessedWay) -> bool {
        let limits = per_direction(&way.tags, MAXSPEED_KEYS);
        for d in [Direction::Forward, Direction::Backward] {
            if let Some(limit) = limits.get(d).and_then(|v| self.parse_maxspeed(v)) {
                *way.speed.get_mut(d) = limit * KMH_TO_MS * self.speed_reduction;
            }
        }
        true
    }

    /// Parses a `maxspeed`-like value into km/h.
    fn parse_maxspeed(&self, value: &str) -> Option<f64> {
        let explicit = leading_number(value).map(|speed| {
            if value.contains("mph") || value.contains("mp/h") {
                speed * MPH_TO_KMH
            } else {
                speed
            }
        });

        explicit
            .and_then(positive)
            .or_else(|| lookup(self.maxspeeds, Some(value)).and_then(positive))
            .or_else(|| {
                // "CC:type" zones not listed explicitly
                let (country, zone) = value.split_once(':')?;
                let is_country = country
                    .chars()
                    .rev()
                    .take(2)
                    .filter(char::is_ascii_alphabetic)
                    .count()
                    == 2;
                let end = zone.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(zone.len());
                if !is_country || end == 0 {
                    return None;
                }
                lookup(self.default_maxspeeds, Some(&zone[..end])).and_then(positive)
            })
    }

    fn apply_surface(&self, way: &mut ProcessedWay) -> bool {
        let limits = [
            lookup(self.surface_speeds, way.tag("surface")),
            lookup(self.tracktype_speeds, way.tag("tracktype")),
            lookup(self.smoothness_speeds, way.tag("smoothness")),
        ];

        for limit in limits.into_iter().flatten() {
            let limit = limit * KMH_TO_MS;
            way.speed.forward = way.speed.forward.min(limit);
            way.speed.backward = way.speed.backward.min(limit);
        }

        way.speed.forward > 0.0 || way.speed.backward > 0.0
    }

    fn apply_penalties(&self, way: &mut ProcessedWay) -> bool {
        let matching = self
            .penalties
            .iter()
            .filter(|p| way.tag(p.key) == Some(p.value))
            .map(|p| p.penalty);

        let width = way.tag("width").and_then(parse_length).unwrap_or(f64::INFINITY);
        let lanes = way.tag("lanes").and_then(leading_number).unwrap_or(f64::INFINITY);
        let bidirectional = !way.inaccessible.forward && !way.inaccessible.backward;
        let narrow = if width <= 3.0 || (lanes <= 1.0 && bidirectional) {
            self.narrow_penalty
        } else {
            1.0
        };

        let alternating = if way.tag("oneway") == Some("alternating") {
            self.alternating_penalty
        } else {
            1.0
        };

        let side_road = if matches!(way.tag("side_road"), Some("yes" | "rotary")) {
            self.side_road_penalty
        } else {
            1.0
        };

        let penalty = matching
            .chain([narrow, alternating, side_road])
            .fold(1.0, f64::min);
        if penalty <= 0.0 {
            return false;
        }

        way.multiplier.forward /= penalty;
        way.multiplier.backward /= penalty;
        true
    }

    /// Generates [obstacles](Obstacle) for a node: barriers for blocking
    /// access tags and `barrier` values, and time losses for
    /// traffic signals, stop and give way signs.
    pub fn process_node(&self, node: &Node, obstacles: &mut Vec<Obstacle>) -> bool {
        let tags = &node.tags;

        if let Some(access) = self.access.iter().rev().find_map(|&mode| tag(tags, mode)) {
            if self.access_blacklist.contains(&access)
                && !self.restricted_access.contains(&access)
            {
                obstacles.push(Obstacle::barrier());
            }
        } else if let Some(barrier) = tag(tags, "barrier") {
            let rising_bollard = tag(tags, "bollard") == Some("rising");
            let flat_kerb = matches!(tag(tags, "kerb"), Some("lowered" | "flush"));
            let crossing_kerb = barrier == "kerb" && tag(tags, "highway") == Some("crossing");

            if !self.barrier_whitelist.contains(&barrier)
                && !rising_bollard
                && !flat_kerb
                && !crossing_kerb
            {
                obstacles.push(Obstacle::barrier());
            }
        } else if let Some(type_) = tag(tags, "highway").and_then(ObstacleType::from_highway) {
            let mut direction = tag(tags, "direction");
            let (type_, duration) = match type_ {
                ObstacleType::TrafficSignals => {
                    direction = tag(tags, "traffic_signals:direction").or(direction);
                    (type_, self.traffic_signal_penalty)
                }
                ObstacleType::Stop if tag(tags, "stop") == Some("minor") => {
                    (ObstacleType::StopMinor, self.stop_penalty)
                }
                ObstacleType::Stop => (type_, self.stop_penalty),
                ObstacleType::GiveWay => (type_, self.give_way_penalty),
                _ => (type_, 0.0),
            };

            let direction = direction.map_or(ObstacleDirection::None, ObstacleDirection::parse);
            obstacles.push(Obstacle::new(type_, direction, duration));
        }

        true
    }

    /// Keeps only turn restrictions applicable to this profile, storing the value of
    /// the most specific restriction tag under `restriction`.
    pub fn process_relation(&self, relation: &mut Relation) -> bool {
        if self.disable_restrictions || self.is_exempted(&relation.tags) {
            return false;
        }

        let restriction = self.get_active_restriction_tag(&relation.tags);
        let supported = restriction.split_once('_').is_some_and(|(kind, description)| {
            matches!(kind, "no" | "only")
                && matches!(description, "right_turn" | "left_turn" | "u_turn" | "straight_on")
        });
        if !supported {
            return false;
        }

        let restriction = restriction.to_string();
        relation.tags.insert("restriction".to_string(), restriction);
        true
    }

    /// Returns true if [Profile::access] intersects with any mode present in the `except` tag.
    /// If the tag is missing, returns false.
    pub fn is_exempted(&self, tags: &Tags) -> bool {
        tags.get("except")
            .map_or("", |v| v.as_str())
            .split(';')
            .any(|exempted_type| self.access.contains(&exempted_type))
    }

    /// Returns the value of the most specific "restriction:MODE" tag (based on [Profile::access]),
    /// falling back to simply "restriction", and returning an empty string if no relevant tag
    /// was found.
    fn get_active_restriction_tag<'t>(&self, tags: &'t Tags) -> &'t str {
        self.access
            .iter()
            .rev()
            .filter(|&&mode| mode != "access")
            .find_map(|&mode| tags.get(&format!("restriction:{}", mode)))
            .or_else(|| tags.get("restriction"))
            .map(|v| v.as_str())
            .unwrap_or("")
    }

    /// Prices a maneuver, in seconds, or forbids it by returning `None`.
    ///
    /// The cost is the sum of obstacle durations along the incoming edge, plus a penalty
    /// growing with the turn angle at real junctions (where turns sharper than 110°
    /// are forbidden), plus [Profile::u_turn_penalty] for turns sharper than 135°.
    /// Barriers forbid the maneuver, and entering a restricted way from
    /// an unrestricted one always costs [Profile::restricted_penalty].
    pub fn turn_cost(&self, turn: &Turn, junction: &Junction, data: &OsmData) -> Option<f64> {
        let mut duration = 0.0;
        for obstacle in data.obstacles_along(turn.from_edge) {
            if obstacle.type_ == ObstacleType::Barrier {
                return None;
            }
            duration += obstacle.duration.unwrap_or(0.0);
        }

        let angle = turn.angle.abs();
        if junction.from.len() > 1 || junction.to.len() > 1 {
            if angle > MAX_JUNCTION_TURN {
                return None;
            }
            duration += 7.5 / (1.0 + (-(12.0 * angle / 180.0 - 7.0)).exp());
        }

        if angle > U_TURN {
            duration += self.u_turn_penalty;
        }

        let restricted = |edge: &Edge| {
            data.ways
                .get(&edge.way)
                .is_some_and(|w| *w.restricted.get(edge.direction))
        };
        if !restricted(turn.from_edge) && restricted(turn.to_edge) {
            duration = self.restricted_penalty;
        }

        Some(duration)
    }
}

/// Routing [Profile] for cars, modelled after the
/// [OSRM car profile](https://github.com/Project-OSRM/osrm-backend/blob/master/profiles/car.lua).
pub const CAR_PROFILE: Profile = Profile {
    name: "motorcar",
    access: &["access", "vehicle", "motor_vehicle", "motorcar"],
    access_blacklist: &[
        "no",
        "agricultural",
        "forestry",
        "emergency",
        "psv",
        "customers",
        "private",
        "delivery",
        "destination",
    ],
    restricted_access: &["private", "delivery", "destination", "customers"],
    restricted_highways: &[
        "motorway",
        "motorway_link",
        "trunk",
        "trunk_link",
        "primary",
        "primary_link",
        "secondary",
        "secondary_link",
        "tertiary",
        "tertiary_link",
        "residential",
        "living_street",
        "unclassified",
        "service",
    ],
    barrier_whitelist: &[
        "cattle_grid",
        "border_control",
        "toll_booth",
        "sally_port",
        "gate",
        "lift_gate",
        "no",
        "entrance",
        "height_restrictor",
        "arch",
    ],
    construction_whitelist: &["no", "widening", "minor"],
    avoid: &[
        "area",
        "reversible",
        "impassable",
        "hov_lanes",
        "steps",
        "construction",
        "proposed",
        "pedestrian",
        "busway",
        "footway",
    ],
    forbidden_services: &["emergency_access", "parking_aisle"],
    forbidden_routes: &["ferry", "shuttle_train"],
    speeds: &[
        ("motorway", 90.0),
        ("motorway_link", 45.0),
        ("trunk", 85.0),
        ("trunk_link", 40.0),
        ("primary", 65.0),
        ("primary_link", 30.0),
        ("secondary", 55.0),
        ("secondary_link", 25.0),
        ("tertiary", 40.0),
        ("tertiary_link", 20.0),
        ("unclassified", 25.0),
        ("residential", 25.0),
        ("living_street", 10.0),
        ("service", 15.0),
    ],
    default_speed: 10.0,
    surface_speeds: &[
        ("cement", 80.0),
        ("compacted", 80.0),
        ("fine_gravel", 80.0),
        ("paving_stones", 60.0),
        ("metal", 60.0),
        ("bricks", 60.0),
        ("grass", 40.0),
        ("wood", 40.0),
        ("sett", 40.0),
        ("grass_paver", 40.0),
        ("gravel", 40.0),
        ("unpaved", 40.0),
        ("ground", 40.0),
        ("dirt", 40.0),
        ("pebblestone", 40.0),
        ("tartan", 40.0),
        ("cobblestone", 30.0),
        ("clay", 30.0),
        ("earth", 20.0),
        ("stone", 20.0),
        ("rocky", 20.0),
        ("sand", 20.0),
        ("mud", 10.0),
    ],
    tracktype_speeds: &[
        ("grade1", 60.0),
        ("grade2", 40.0),
        ("grade3", 30.0),
        ("grade4", 25.0),
        ("grade5", 20.0),
    ],
    smoothness_speeds: &[
        ("intermediate", 80.0),
        ("bad", 40.0),
        ("very_bad", 20.0),
        ("horrible", 10.0),
        ("very_horrible", 5.0),
        ("impassable", 0.0),
    ],
    maxspeeds: &[
        ("at:rural", 100.0),
        ("at:trunk", 100.0),
        ("be:motorway", 120.0),
        ("be-bru:rural", 70.0),
        ("be-bru:urban", 30.0),
        ("be-vlg:rural", 70.0),
        ("bg:motorway", 140.0),
        ("by:urban", 60.0),
        ("by:motorway", 110.0),
        ("ca-on:rural", 80.0),
        ("ch:rural", 80.0),
        ("ch:trunk", 100.0),
        ("ch:motorway", 120.0),
        ("cz:trunk", 0.0),
        ("cz:motorway", 0.0),
        ("de:living_street", 7.0),
        ("de:rural", 100.0),
        ("de:motorway", 0.0),
        ("dk:rural", 80.0),
        ("es:trunk", 90.0),
        ("fr:rural", 80.0),
        ("gb:nsl_single", 96.54),
        ("gb:nsl_dual", 112.63),
        ("gb:motorway", 112.63),
        ("nl:rural", 80.0),
        ("nl:trunk", 100.0),
        ("no:rural", 80.0),
        ("no:motorway", 110.0),
        ("ph:urban", 40.0),
        ("ph:rural", 80.0),
        ("ph:motorway", 100.0),
        ("pl:rural", 100.0),
        ("pl:expressway", 120.0),
        ("pl:motorway", 140.0),
        ("ro:trunk", 100.0),
        ("ru:living_street", 20.0),
        ("ru:urban", 60.0),
        ("ru:motorway", 110.0),
        ("uk:nsl_single", 96.54),
        ("uk:nsl_dual", 112.63),
        ("uk:motorway", 112.63),
        ("za:urban", 60.0),
        ("za:rural", 100.0),
        ("none", 140.0),
    ],
    default_maxspeeds: &[
        ("urban", 50.0),
        ("rural", 90.0),
        ("trunk", 110.0),
        ("motorway", 130.0),
    ],
    speed_reduction: 0.8,
    penalties: &[
        Penalty {
            key: "service",
            value: "alley",
            penalty: 0.5,
        },
        Penalty {
            key: "service",
            value: "parking",
            penalty: 0.5,
        },
        Penalty {
            key: "service",
            value: "parking_aisle",
            penalty: 0.5,
        },
        Penalty {
            key: "service",
            value: "driveway",
            penalty: 0.5,
        },
        Penalty {
            key: "service",
            value: "drive-through",
            penalty: 0.5,
        },
        Penalty {
            key: "service",
            value: "drive-thru",
            penalty: 0.5,
        },
    ],
    narrow_penalty: 0.5,
    alternating_penalty: 0.4,
    side_road_penalty: 0.8,
    u_turn_penalty: 20.0,
    traffic_signal_penalty: 2.0,
    stop_penalty: 2.0,
    give_way_penalty: 1.0,
    restricted_penalty: 10_000.0,
    disable_restrictions: false,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::{NodeId, RelationId, WayId};
    use crate::test_support::{cross_junction, node, way, SPEED};

    const PROFILE_WITHOUT_RESTRICTIONS: Profile = Profile {
        disable_restrictions: true,
        ..CAR_PROFILE
    };

    macro_rules! tags {
        {} => { Tags::default() };
        {$( $k:literal : $v:literal ),+ $(,)?} => {
            Tags::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
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

    fn processed(tags: Tags) -> Option<ProcessedWay> {
        let mut w = ProcessedWay::from(way(1, &[1, 2], tags));
        if CAR_PROFILE.process_way(&mut w) {
            Some(w)
        } else {
            None
        }
    }

    fn obstacles(tags: Tags) -> Vec<Obstacle> {
        let mut n = node(1, 52.0, 21.0);
        n.tags = tags;
        let mut obstacles = Vec::new();
        assert!(CAR_PROFILE.process_node(&n, &mut obstacles));
        obstacles
    }

    #[test]
    fn blocked_ways() {
        assert!(processed(tags! {"highway": "residential", "area": "yes"}).is_none());
        assert!(processed(tags! {"highway": "footway"}).is_none());
        assert!(processed(tags! {"highway": "construction"}).is_none());
        assert!(processed(tags! {"highway": "primary", "construction": "yes"}).is_none());
        assert!(processed(tags! {"highway": "primary", "construction": "minor"}).is_some());
        assert!(processed(tags! {"highway": "primary", "proposed": "secondary"}).is_none());
        assert!(processed(tags! {"highway": "primary", "oneway": "reversible"}).is_none());
        assert!(processed(tags! {"highway": "primary", "route": "ferry"}).is_none());
        assert!(processed(tags! {"highway": "service", "service": "parking_aisle"}).is_none());
        assert!(processed(tags! {}).is_none());
    }

    #[test]
    fn access() {
        assert!(processed(tags! {"highway": "residential", "access": "no"}).is_none());

        let w = processed(tags! {"highway": "residential", "access": "no", "motor_vehicle": "yes"})
            .unwrap();
        assert_eq!(w.inaccessible, PerDirection::both(false));

        let w = processed(tags! {"highway": "residential", "access": "destination"}).unwrap();
        assert_eq!(w.restricted, PerDirection::both(true));
        assert_eq!(w.inaccessible, PerDirection::both(false));

        let w = processed(tags! {"highway": "residential", "motorcar:backward": "no"}).unwrap();
        assert_eq!(w.inaccessible, PerDirection::new(false, true));
        assert_eq!(w.restricted, PerDirection::both(false));
    }

    #[test]
    fn unknown_highways_need_access_tags() {
        assert!(processed(tags! {"highway": "track"}).is_none());

        let w = processed(tags! {"highway": "track", "motor_vehicle": "yes"}).unwrap();
        assert_almost_eq!(w.speed.forward, 10.0 / 3.6);
        assert_almost_eq!(w.speed.backward, 10.0 / 3.6);

        let w = processed(tags! {"highway": "track", "motor_vehicle:forward": "yes"}).unwrap();
        assert_almost_eq!(w.speed.forward, 10.0 / 3.6);
        assert_eq!(w.speed.backward, 0.0);
        assert!(w.inaccessible.backward);
    }

    #[test]
    fn oneway() {
        let inaccessible = |tags| processed(tags).unwrap().inaccessible;
        assert_eq!(
            inaccessible(tags! {"highway": "residential"}),
            PerDirection::new(false, false),
        );
        assert_eq!(
            inaccessible(tags! {"highway": "residential", "oneway": "yes"}),
            PerDirection::new(false, true),
        );
        assert_eq!(
            inaccessible(tags! {"highway": "residential", "oneway": "-1"}),
            PerDirection::new(true, false),
        );
        assert_eq!(
            inaccessible(tags! {"highway": "motorway"}),
            PerDirection::new(false, true),
        );
        assert_eq!(
            inaccessible(tags! {"highway": "motorway", "oneway": "no"}),
            PerDirection::new(false, false),
        );
        assert_eq!(
            inaccessible(tags! {"highway": "primary", "junction": "roundabout"}),
            PerDirection::new(false, true),
        );
        assert_eq!(
            inaccessible(tags! {"highway": "residential", "oneway": "yes", "oneway:motorcar": "no"}),
            PerDirection::new(false, false),
        );
    }

    #[test]
    fn hov() {
        let w = processed(tags! {"highway": "primary", "hov": "designated"}).unwrap();
        assert_eq!(w.restricted, PerDirection::both(true));

        let w = processed(tags! {"highway": "primary", "hov:lanes:forward": "designated|designated"})
            .unwrap();
        assert_eq!(w.inaccessible, PerDirection::new(true, false));
    }

    #[test]
    fn speeds() {
        let speed = |tags| processed(tags).unwrap().speed;

        assert_almost_eq!(speed(tags! {"highway": "residential"}).forward, 6.9444);
        assert_almost_eq!(speed(tags! {"highway": "primary", "maxspeed": "50"}).forward, 11.1111);
        assert_almost_eq!(
            speed(tags! {"highway": "primary", "maxspeed": "30 mph"}).forward,
            10.7267
        );
        assert_almost_eq!(
            speed(tags! {"highway": "primary", "maxspeed": "pl:rural"}).forward,
            22.2222
        );
        assert_almost_eq!(
            speed(tags! {"highway": "primary", "maxspeed": "de:motorway"}).forward,
            28.8889
        );

        let s = speed(tags! {"highway": "primary", "maxspeed:forward": "30"});
        assert_almost_eq!(s.forward, 6.6667);
        assert_almost_eq!(s.backward, 18.0556);
    }

    #[test]
    fn surface_limits_speed() {
        let speed = |tags| processed(tags).unwrap().speed.forward;

        assert_almost_eq!(speed(tags! {"highway": "primary", "surface": "gravel"}), 11.1111);
        assert_almost_eq!(speed(tags! {"highway": "residential", "surface": "gravel"}), 6.9444);
        assert_almost_eq!(speed(tags! {"highway": "primary", "surface": "asphalt"}), 18.0556);
        assert_almost_eq!(
            speed(tags! {"highway": "primary", "tracktype": "grade5", "smoothness": "bad"}),
            5.5556
        );
        assert!(processed(tags! {"highway": "residential", "smoothness": "impassable"}).is_none());
    }

    #[test]
    fn penalties() {
        let multiplier = |tags| processed(tags).unwrap().multiplier;

        assert_eq!(multiplier(tags! {"highway": "residential"}), PerDirection::both(1.0));
        assert_eq!(
            multiplier(tags! {"highway": "service", "service": "driveway"}),
            PerDirection::both(2.0),
        );
        assert_eq!(
            multiplier(tags! {"highway": "residential", "width": "2.5"}),
            PerDirection::both(2.0),
        );
        assert_eq!(
            multiplier(tags! {"highway": "residential", "width": "7'"}),
            PerDirection::both(2.0),
        );
        assert_eq!(
            multiplier(tags! {"highway": "residential", "lanes": "1"}),
            PerDirection::both(2.0),
        );
        assert_eq!(
            multiplier(tags! {"highway": "residential", "lanes": "1", "oneway": "yes"}),
            PerDirection::both(1.0),
        );
        assert_eq!(
            multiplier(tags! {"highway": "residential", "oneway": "alternating"}),
            PerDirection::both(2.5),
        );
        assert_eq!(
            multiplier(tags! {"highway": "residential", "side_road": "yes"}),
            PerDirection::both(1.25),
        );
    }

    #[test]
    fn barriers() {
        assert_eq!(obstacles(tags! {"barrier": "bollard"}), [Obstacle::barrier()]);
        assert!(obstacles(tags! {"barrier": "gate"}).is_empty());
        assert!(obstacles(tags! {"barrier": "bollard", "bollard": "rising"}).is_empty());
        assert!(obstacles(tags! {"barrier": "kerb", "kerb": "lowered"}).is_empty());
        assert!(obstacles(tags! {"barrier": "kerb", "highway": "crossing"}).is_empty());
        assert_eq!(obstacles(tags! {"access": "no"}), [Obstacle::barrier()]);
        assert!(obstacles(tags! {"access": "destination", "barrier": "bollard"}).is_empty());
    }

    #[test]
    fn node_obstacles() {
        assert_eq!(
            obstacles(tags! {"highway": "traffic_signals", "traffic_signals:direction": "forward"}),
            [Obstacle::new(
                ObstacleType::TrafficSignals,
                ObstacleDirection::Forward,
                2.0
            )],
        );
        assert_eq!(
            obstacles(tags! {"highway": "stop", "stop": "minor", "direction": "backward"}),
            [Obstacle::new(
                ObstacleType::StopMinor,
                ObstacleDirection::Backward,
                2.0
            )],
        );
        assert_eq!(
            obstacles(tags! {"highway": "give_way"}),
            [Obstacle::new(ObstacleType::GiveWay, ObstacleDirection::None, 1.0)],
        );
        assert_eq!(
            obstacles(tags! {"highway": "crossing"}),
            [Obstacle::new(ObstacleType::Crossing, ObstacleDirection::None, 0.0)],
        );
        assert!(obstacles(tags! {"highway": "street_lamp"}).is_empty());
    }

    #[test]
    fn relations() {
        let relation = |tags| {
            let mut r = Relation {
                id: RelationId(1),
                members: Vec::new(),
                tags,
            };
            if CAR_PROFILE.process_relation(&mut r) {
                Some(r.tags["restriction"].clone())
            } else {
                None
            }
        };

        assert_eq!(
            relation(tags! {"type": "restriction", "restriction": "no_left_turn"}).as_deref(),
            Some("no_left_turn"),
        );
        assert_eq!(
            relation(tags! {
                "type": "restriction",
                "restriction": "no_left_turn",
                "restriction:motorcar": "only_straight_on",
            })
            .as_deref(),
            Some("only_straight_on"),
        );
        assert_eq!(
            relation(tags! {"type": "restriction", "restriction": "no_left_turn", "except": "psv;motorcar"}),
            None,
        );
        assert_eq!(relation(tags! {"type": "restriction", "restriction": "no_entry"}), None);
        assert_eq!(relation(tags! {"type": "restriction", "restriction:hgv": "no_u_turn"}), None);

        let mut r = Relation {
            id: RelationId(1),
            members: Vec::new(),
            tags: tags! {"type": "restriction", "restriction": "no_u_turn"},
        };
        assert!(!PROFILE_WITHOUT_RESTRICTIONS.process_relation(&mut r));
    }

    #[test]
    fn is_exempted() {
        assert!(!CAR_PROFILE.is_exempted(&tags! {}));
        assert!(!CAR_PROFILE.is_exempted(&tags! {"except": "bicycle"}));
        assert!(CAR_PROFILE.is_exempted(&tags! {"except": "motorcar"}));
        assert!(CAR_PROFILE.is_exempted(&tags! {"except": "psv;motor_vehicle"}));
    }

    fn build_with_car(data: &mut OsmData) -> crate::graph::Graph {
        data.build(|t, j, d| CAR_PROFILE.turn_cost(t, j, d))
    }

    fn base_cost(g: &crate::graph::Graph, from: i64, to: i64) -> f64 {
        g.edge(NodeId(from), NodeId(to)).unwrap().length / SPEED
    }

    #[test]
    fn turn_cost_angles() {
        let mut data = cross_junction();
        let g = build_with_car(&mut data);
        let west_in = g.edge(NodeId(1), NodeId(0)).unwrap();
        let base = base_cost(&g, 1, 0);

        // Straight on costs almost nothing, u-turns at junctions are forbidden
        assert_almost_eq!(west_in.to[&NodeId(3)] - base, 0.006833);
        assert!((west_in.to[&NodeId(4)] - base - 2.017).abs() < 0.05);
        assert!((west_in.to[&NodeId(2)] - base - 2.017).abs() < 0.05);
        assert!(!west_in.to.contains_key(&NodeId(1)));

        // Turning around at a dead end costs the u-turn penalty
        let north_out = g.edge(NodeId(0), NodeId(2)).unwrap();
        assert_almost_eq!(north_out.to[&NodeId(0)] - base_cost(&g, 0, 2), 20.0);
    }

    #[test]
    fn turn_cost_obstacles() {
        let mut data = cross_junction();
        data.add_obstacle(
            NodeId(0),
            Obstacle::new(ObstacleType::TrafficSignals, ObstacleDirection::None, 2.0),
        );
        let g = build_with_car(&mut data);
        let straight = g.edge(NodeId(1), NodeId(0)).unwrap().to[&NodeId(3)];
        assert_almost_eq!(straight - base_cost(&g, 1, 0), 2.006833);

        let mut data = cross_junction();
        data.add_obstacle(NodeId(0), Obstacle::barrier());
        let g = build_with_car(&mut data);
        for arm in 1..=4 {
            assert!(g.edge(NodeId(arm), NodeId(0)).map_or(true, |e| e.to.is_empty()));
        }
    }

    #[test]
    fn turn_cost_restricted() {
        let mut data = cross_junction();
        data.process_ways(|w| {
            if w.id == WayId(2) {
                w.restricted = PerDirection::both(true);
            }
            true
        });
        let g = build_with_car(&mut data);

        let west_in = g.edge(NodeId(1), NodeId(0)).unwrap();
        assert_almost_eq!(west_in.to[&NodeId(2)] - base_cost(&g, 1, 0), 10_000.0);

        // Leaving a restricted way is not penalized
        let north_in = g.edge(NodeId(2), NodeId(0)).unwrap();
        assert!(north_in.to[&NodeId(3)] - base_cost(&g, 2, 0) < 10.0);
    }

    #[test]
    fn apply_prunes_unused_ways_and_nodes() {
        let mut data = OsmData::new();
        for (id, lon) in [(1, 21.000), (2, 21.001), (3, 21.002)] {
            data.load_node(node(id, 52.0, lon));
        }
        data.load_way(way(1, &[1, 2], tags! {"highway": "residential"}));
        data.load_way(way(2, &[2, 3], tags! {"highway": "footway"}));

        CAR_PROFILE.apply(&mut data);
        assert_eq!(data.ways.keys().copied().collect::<Vec<_>>(), [WayId(1)]);
        assert!(!data.nodes.contains_key(&NodeId(3)));
    }
}
