// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! OpenStreetMap data model, the XML feature reader, obstacles and routing profiles.

mod model;
mod obstacles;
mod profile;
mod reader;

pub use model::{
    Direction, Feature, FeatureType, Node, NodeId, PerDirection, ProcessedWay, Relation,
    RelationId, RelationMember, Tags, Way, WayId,
};
pub use obstacles::{Obstacle, ObstacleDirection, ObstacleType};
pub use profile::{Penalty, Profile, CAR_PROFILE};
pub use reader::{
    add_features_from_buffer, add_features_from_file, add_features_from_io, FileFormat, Options,
    ReadError,
};
