// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use super::model::Direction;

/// Kind of an [Obstacle], following
/// [OSRM obstacle types](https://github.com/Project-OSRM/osrm-backend/blob/master/docs/profiles.md#obstacle).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ObstacleType {
    #[default]
    None,
    Barrier,
    TrafficSignals,
    Stop,
    StopMinor,
    GiveWay,
    Crossing,
    TrafficCalming,
    MiniRoundabout,
    TurningLoop,
    TurningCircle,
}

impl ObstacleType {
    /// Maps a value of the `highway` tag onto an obstacle type.
    pub fn from_highway(value: &str) -> Option<Self> {
        match value {
            "traffic_signals" => Some(Self::TrafficSignals),
            "stop" => Some(Self::Stop),
            "give_way" => Some(Self::GiveWay),
            "crossing" => Some(Self::Crossing),
            "traffic_calming" => Some(Self::TrafficCalming),
            "mini_roundabout" => Some(Self::MiniRoundabout),
            "turning_loop" => Some(Self::TurningLoop),
            "turning_circle" => Some(Self::TurningCircle),
            _ => None,
        }
    }
}

/// Direction of travel, relative to the way, in which an [Obstacle] applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ObstacleDirection {
    /// Direction unknown; the obstacle applies both ways.
    #[default]
    None,
    Forward,
    Backward,
    Both,
}

impl ObstacleDirection {
    /// Parses a `direction`-like tag value. Unrecognized values map to [ObstacleDirection::None].
    pub fn parse(value: &str) -> Self {
        match value {
            "forward" => Self::Forward,
            "backward" => Self::Backward,
            "both" => Self::Both,
            _ => Self::None,
        }
    }

    pub fn applies_to(self, d: Direction) -> bool {
        match self {
            Self::None | Self::Both => true,
            Self::Forward => d == Direction::Forward,
            Self::Backward => d == Direction::Backward,
        }
    }
}

/// A point cost or block attached to a node, folded into turn costs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Obstacle {
    pub type_: ObstacleType,
    pub direction: ObstacleDirection,

    /// Time, in seconds, lost when passing the obstacle.
    pub duration: Option<f64>,
}

impl Obstacle {
    pub fn new(type_: ObstacleType, direction: ObstacleDirection, duration: f64) -> Self {
        Self {
            type_,
            direction,
            duration: Some(duration),
        }
    }

    pub fn barrier() -> Self {
        Self {
            type_: ObstacleType::Barrier,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_applies() {
        assert!(ObstacleDirection::None.applies_to(Direction::Forward));
        assert!(ObstacleDirection::Both.applies_to(Direction::Backward));
        assert!(ObstacleDirection::Forward.applies_to(Direction::Forward));
        assert!(!ObstacleDirection::Forward.applies_to(Direction::Backward));
        assert!(!ObstacleDirection::Backward.applies_to(Direction::Forward));
    }

    #[test]
    fn parse() {
        assert_eq!(ObstacleDirection::parse("backward"), ObstacleDirection::Backward);
        assert_eq!(ObstacleDirection::parse("sideways"), ObstacleDirection::None);
        assert_eq!(
            ObstacleType::from_highway("traffic_signals"),
            Some(ObstacleType::TrafficSignals)
        );
        assert_eq!(ObstacleType::from_highway("residential"), None);
    }
}
