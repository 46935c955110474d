// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Edge-expanded routing over [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! OSM data is first interpreted by a [profile](crate::osm::Profile), then converted by the
//! [builder] into an edge-expanded [Graph]: every vertex is a directed stretch of road
//! between two junctions, and every arc is a legal maneuver with its cost. Turn restrictions
//! and turn costs are thus resolved once, when the graph is built.
//!
//! The graph is stored in a compact, checksummed [binary format](crate::format), which
//! is read back (without copying) by the [GraphAccessor]. The [engine] runs shortest
//! path searches directly over the accessor.
//!
//! # Example
//!
//! ```no_run
//! let mut data = edgeroute::builder::OsmData::new();
//! edgeroute::osm::add_features_from_file(
//!     &mut data,
//!     &edgeroute::osm::Options::default(),
//!     "path/to/monaco.osm",
//! ).expect("failed to load monaco.osm");
//!
//! let profile = &edgeroute::osm::CAR_PROFILE;
//! profile.apply(&mut data);
//! let graph = data.build(|turn, junction, data| profile.turn_cost(turn, junction, data));
//!
//! graph
//!     .serialize(&edgeroute::graph::SerializeOptions::default())
//!     .expect("failed to serialize the graph")
//!     .write_file("monaco.bin")
//!     .expect("failed to write the graph");
//!
//! let g = edgeroute::GraphAccessor::from_file("monaco.bin").expect("failed to read the graph");
//! let route = edgeroute::find_route(
//!     &g,
//!     (7.4246, 43.7384),
//!     (7.4323, 43.7478),
//!     &edgeroute::engine::BidirectionalOptions::default(),
//! );
//!
//! println!("Route: {:?}", route);
//! ```

pub mod builder;
mod distance;
pub mod engine;
pub mod format;
pub mod graph;
mod kd;
pub mod osm;

#[cfg(test)]
mod test_support;

pub use distance::earth_distance;
pub use engine::{find_route, Route};
pub use graph::{Graph, GraphAccessor};
pub use kd::KDTree;
