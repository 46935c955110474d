// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// Mean radius of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_RADIUS: f64 = 6371.0088;

/// Mean diameter of Earth, in kilometers.
/// Source: https://en.wikipedia.org/wiki/Earth_radius#Arithmetic_mean_radius
const EARTH_DIAMETER: f64 = EARTH_RADIUS + EARTH_RADIUS;

/// Calculates the great-circle distance between two lat-lon positions
/// on Earth using the `haversine formula <https://en.wikipedia.org/wiki/Haversine_formula>`_.
/// Returns the result in kilometers.
pub fn earth_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lon1 = lon1.to_radians();
    let lat2 = lat2.to_radians();
    let lon2 = lon2.to_radians();

    let sin_dlat_half = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon_half = ((lon2 - lon1) * 0.5).sin();

    let h = sin_dlat_half * sin_dlat_half + lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half;

    EARTH_DIAMETER * h.sqrt().min(1.0).asin()
}

/// Calculates the initial great-circle bearing from the first to the second position,
/// in degrees clockwise from north, within `[0, 360)`.
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Calculates the signed angle of a turn `from → via → to`, in degrees within `(-180, 180]`.
///
/// Driving straight through gives 0, right turns are positive, left turns negative,
/// and a full reversal gives 180.
pub fn turn_angle(from: (f64, f64), via: (f64, f64), to: (f64, f64)) -> f64 {
    let (from_lat, from_lon) = from;
    let (via_lat, via_lon) = via;
    let (to_lat, to_lon) = to;

    // Bearings of a segment and its reverse are not exactly opposite on a sphere
    if from == to {
        return 180.0;
    }

    let incoming = bearing(from_lat, from_lon, via_lat, via_lon);
    let outgoing = bearing(via_lat, via_lon, to_lat, to_lon);

    let angle = (outgoing - incoming).rem_euclid(360.0);
    if angle > 180.0 {
        angle - 360.0
    } else {
        angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_almost_eq {
        ($a:expr, $b:expr, $eps:expr) => {
            assert!(
                (($a - $b).abs() < $eps),
                "assertion failed: {} ≈ {}",
                $a,
                $b
            )
        };
    }

    #[test]
    fn earth_distance_one_degree() {
        // One degree of latitude is roughly 111.2 km
        assert_almost_eq!(earth_distance(0.0, 0.0, 1.0, 0.0), 111.195, 1e-2);
        assert_eq!(earth_distance(52.0, 21.0, 52.0, 21.0), 0.0);
    }

    #[test]
    fn bearing_cardinal_directions() {
        assert_almost_eq!(bearing(0.0, 0.0, 1.0, 0.0), 0.0, 1e-9);
        assert_almost_eq!(bearing(0.0, 0.0, 0.0, 1.0), 90.0, 1e-9);
        assert_almost_eq!(bearing(0.0, 0.0, -1.0, 0.0), 180.0, 1e-9);
        assert_almost_eq!(bearing(0.0, 0.0, 0.0, -1.0), 270.0, 1e-9);
    }

    #[test]
    fn turn_angle_signs() {
        // Heading north, then...
        let from = (0.0, 0.0);
        let via = (0.001, 0.0);

        // ...straight on
        assert_almost_eq!(turn_angle(from, via, (0.002, 0.0)), 0.0, 1e-6);
        // ...right (east)
        assert_almost_eq!(turn_angle(from, via, (0.001, 0.001)), 90.0, 1e-3);
        // ...left (west)
        assert_almost_eq!(turn_angle(from, via, (0.001, -0.001)), -90.0, 1e-3);
        // ...back
        assert_almost_eq!(turn_angle(from, via, (0.0, 0.0)).abs(), 180.0, 1e-6);
    }

    #[test]
    fn turn_angle_reversal_off_meridian() {
        let from = (52.0, 21.0);
        let via = (52.0, 21.001);
        assert_eq!(turn_angle(from, via, from), 180.0);
        assert_eq!(turn_angle(via, from, via), 180.0);
    }
}
