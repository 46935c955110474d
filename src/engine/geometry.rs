// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::graph::GraphAccessor;

/// Lists the node indices along a sequence of consecutive edges.
///
/// The first edge contributes all of its nodes; every following edge starts where
/// the previous one ended, so its first node is skipped.
pub fn path_nodes(graph: &GraphAccessor, edges: &[usize]) -> Vec<usize> {
    let mut nodes = Vec::new();
    for (i, &edge) in edges.iter().enumerate() {
        let skip = if i == 0 { 0 } else { 1 };
        nodes.extend(graph.list_edge_nodes(edge).skip(skip));
    }
    nodes
}

/// Converts a sequence of consecutive edges into `(lon, lat)` positions,
/// see [path_nodes].
pub fn path_geometry(graph: &GraphAccessor, edges: &[usize]) -> Vec<(f64, f64)> {
    path_nodes(graph, edges)
        .into_iter()
        .map(|node| graph.node_pos(node))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{accessor, find_edge, triangle_graph};

    #[test]
    fn joins_edges() {
        let g = accessor(&triangle_graph());
        let a = find_edge(&g, 1, 2);
        let b = find_edge(&g, 2, 3);

        let coords = path_geometry(&g, &[a, b]);
        assert_eq!(coords.len(), 4);

        let expected = [(21.000, 52.000), (21.0015, 52.000), (21.003, 52.000), (21.0015, 52.002)];
        for (got, want) in coords.iter().zip(expected) {
            assert!((got.0 - want.0).abs() < 1e-5, "{:?} != {:?}", got, want);
            assert!((got.1 - want.1).abs() < 1e-5, "{:?} != {:?}", got, want);
        }
    }

    #[test]
    fn reversed_edge() {
        let g = accessor(&triangle_graph());
        let coords = path_geometry(&g, &[find_edge(&g, 2, 1)]);
        assert_eq!(coords.len(), 3);
        assert!((coords[0].0 - 21.003).abs() < 1e-5);
        assert!((coords[1].0 - 21.0015).abs() < 1e-5);
        assert!((coords[2].0 - 21.000).abs() < 1e-5);
    }

    #[test]
    fn nodes_of_joined_edges() {
        let g = accessor(&triangle_graph());
        let nodes = path_nodes(&g, &[find_edge(&g, 3, 1), find_edge(&g, 1, 2)]);
        let ids: Vec<i64> = nodes.into_iter().map(|n| g.node_osm_id(n).0).collect();
        assert_eq!(ids, [3, 1, 4, 2]);
    }

    #[test]
    fn empty() {
        let g = accessor(&triangle_graph());
        assert!(path_geometry(&g, &[]).is_empty());
    }
}
