// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::distance::earth_distance;
use crate::format::{ByteOrder, FormatError};

/// Size of a single serialized [Point]: id, lon and lat.
const ENTRY_SIZE: usize = 24;

/// A point stored in the [KDTree].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub id: u64,
    pub lon: f64,
    pub lat: f64,
}

/// KDTree implements the [k-d tree data structure](https://en.wikipedia.org/wiki/K-d_tree),
/// which is used to answer nearest-neighbor queries against the graph's nodes.
///
/// The tree is stored flat, in implicit median-split order: the pivot of every
/// subtree `points[lo..hi]` is `points[lo + (hi - lo) / 2]`, with the left subtree
/// before and the right subtree after it. Even levels divide by latitude,
/// odd levels by longitude. This makes the tree trivial to (de)serialize.
///
/// Splitting assumes euclidean geometry, even though distances are computed with
/// [earth_distance]. Results may be inaccurate close to the ante meridian
/// (180°/-180° longitude) or the poles (90°/-90° latitude).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KDTree {
    points: Vec<Point>,
}

impl KDTree {
    /// Builds a k-d tree, reordering the provided points.
    pub fn build(mut points: Vec<Point>) -> Self {
        build_impl(&mut points, false);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Finds the closest point to the given position.
    pub fn nearest(&self, lon: f64, lat: f64) -> Option<Point> {
        self.around(lon, lat, 1, f64::INFINITY)
            .first()
            .and_then(|&(id, _)| self.points.iter().find(|p| p.id == id).copied())
    }

    /// Finds up to `max_results` points at most `max_distance` kilometers away
    /// from the given position. Returns `(id, distance_km)` pairs, closest first.
    pub fn around(
        &self,
        lon: f64,
        lat: f64,
        max_results: usize,
        max_distance: f64,
    ) -> Vec<(u64, f64)> {
        if max_results == 0 {
            return Vec::new();
        }

        let mut search = Search {
            points: &self.points,
            lon,
            lat,
            max_results,
            max_distance,
            found: BinaryHeap::with_capacity(max_results + 1),
        };
        search.visit(0, self.points.len(), false);

        let mut found = search.found.into_vec();
        found.sort();
        found.into_iter().map(|f| (f.id, f.distance)).collect()
    }

    /// Serializes the tree: a u64 count followed by `(id u64, lon f64, lat f64)` entries.
    pub fn encode(&self, order: ByteOrder) -> Vec<u8> {
        let mut buf = vec![0u8; 8 + self.points.len() * ENTRY_SIZE];
        order.put_u64(&mut buf, 0, self.points.len() as u64);
        for (i, p) in self.points.iter().enumerate() {
            let at = 8 + i * ENTRY_SIZE;
            order.put_u64(&mut buf, at, p.id);
            order.put_f64(&mut buf, at + 8, p.lon);
            order.put_f64(&mut buf, at + 16, p.lat);
        }
        buf
    }

    /// Deserializes a tree produced by [KDTree::encode].
    pub fn decode(data: &[u8], order: ByteOrder) -> Result<Self, FormatError> {
        if data.len() < 8 {
            return Err(FormatError::Truncated {
                expected: 8,
                got: data.len(),
            });
        }

        let count = order.get_u64(data, 0) as usize;
        let expected = count
            .checked_mul(ENTRY_SIZE)
            .and_then(|n| n.checked_add(8))
            .unwrap_or(usize::MAX);
        if data.len() < expected {
            return Err(FormatError::Truncated {
                expected,
                got: data.len(),
            });
        }

        let points = (0..count)
            .map(|i| {
                let at = 8 + i * ENTRY_SIZE;
                Point {
                    id: order.get_u64(data, at),
                    lon: order.get_f64(data, at + 8),
                    lat: order.get_f64(data, at + 16),
                }
            })
            .collect();
        Ok(Self { points })
    }
}

fn build_impl(points: &mut [Point], lon_divides: bool) {
    if points.len() <= 1 {
        return;
    }

    let median = points.len() / 2;
    if lon_divides {
        points.select_nth_unstable_by(median, |a, b| a.lon.total_cmp(&b.lon));
    } else {
        points.select_nth_unstable_by(median, |a, b| a.lat.total_cmp(&b.lat));
    }

    let (left, right_and_pivot) = points.split_at_mut(median);
    build_impl(left, !lon_divides);
    build_impl(&mut right_and_pivot[1..], !lon_divides);
}

#[derive(Debug, Clone, Copy)]
struct Found {
    id: u64,
    distance: f64,
}

impl PartialEq for Found {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Found {}

impl PartialOrd for Found {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Found {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

struct Search<'a> {
    points: &'a [Point],
    lon: f64,
    lat: f64,
    max_results: usize,
    max_distance: f64,

    /// Max-heap of the best results so far, worst on top.
    found: BinaryHeap<Found>,
}

impl Search<'_> {
    fn worst_acceptable(&self) -> f64 {
        if self.found.len() < self.max_results {
            self.max_distance
        } else {
            self.found
                .peek()
                .map_or(self.max_distance, |f| f.distance.min(self.max_distance))
        }
    }

    fn visit(&mut self, lo: usize, hi: usize, lon_divides: bool) {
        if lo >= hi {
            return;
        }

        let mid = lo + (hi - lo) / 2;
        let pivot = self.points[mid];

        let distance = earth_distance(self.lat, self.lon, pivot.lat, pivot.lon);
        if distance <= self.max_distance {
            self.found.push(Found {
                id: pivot.id,
                distance,
            });
            if self.found.len() > self.max_results {
                self.found.pop();
            }
        }

        // Select which branch to recurse into first
        let first_left = if lon_divides {
            self.lon < pivot.lon
        } else {
            self.lat < pivot.lat
        };
        let (first, second) = if first_left {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.visit(first.0, first.1, !lon_divides);

        // A closer point is possible in the second branch if and only if
        // the splitting axis is closer than the current worst candidate.
        let (axis_lat, axis_lon) = if lon_divides {
            (self.lat, pivot.lon)
        } else {
            (pivot.lat, self.lon)
        };
        let dist_to_axis = earth_distance(self.lat, self.lon, axis_lat, axis_lon);
        if dist_to_axis <= self.worst_acceptable() {
            self.visit(second.0, second.1, !lon_divides);
        }
    }
}
