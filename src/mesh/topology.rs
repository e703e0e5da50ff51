//! Grid construction, connectivity derivation, and validation
//!
//! All structural validation happens here, eagerly, before any geometry work:
//! out-of-range or duplicate node references, degenerate cells, and
//! non-manifold edges fail construction with
//! [`RegridError::InvalidTopology`]. Derived tables (edges, adjacency,
//! boundaries, areas, centroids) are computed once; the resulting grids are
//! immutable values, and subsetting returns a renumbered copy.

use crate::error::{RegridError, Result};
use crate::mesh::geometry::{self, GEOM_TOL};
use crate::mesh::types::{FaceConnectivity, NetworkGrid, Point, PointGrid, PolygonGrid};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Assemble node coordinates from coordinate arrays
fn build_nodes(x: &[f64], y: &[f64]) -> Result<Vec<Point>> {
    if x.len() != y.len() {
        return Err(RegridError::InvalidTopology(format!(
            "coordinate arrays disagree in length: {} x values, {} y values",
            x.len(),
            y.len()
        )));
    }
    for (i, (&xi, &yi)) in x.iter().zip(y.iter()).enumerate() {
        if !xi.is_finite() || !yi.is_finite() {
            return Err(RegridError::InvalidTopology(format!(
                "node {} has non-finite coordinates ({}, {})",
                i, xi, yi
            )));
        }
    }
    Ok(x.iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| Point::new(xi, yi))
        .collect())
}

impl PointGrid {
    /// Build a 0D grid from coordinate arrays
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        let points = build_nodes(x, y)?;
        Ok(Self { points })
    }
}

impl NetworkGrid {
    /// Build a 1D grid from coordinate arrays and edge-node connectivity
    pub fn new(x: &[f64], y: &[f64], edges: &[[usize; 2]]) -> Result<Self> {
        let nodes = build_nodes(x, y)?;
        let n_node = nodes.len();

        let mut edge_lengths = Vec::with_capacity(edges.len());
        for (i, &[a, b]) in edges.iter().enumerate() {
            if a >= n_node || b >= n_node {
                return Err(RegridError::InvalidTopology(format!(
                    "edge {} references node out of range (have {} nodes)",
                    i, n_node
                )));
            }
            if a == b {
                return Err(RegridError::InvalidTopology(format!(
                    "edge {} connects node {} to itself",
                    i, a
                )));
            }
            let length = geometry::distance(&nodes[a], &nodes[b]);
            if length <= GEOM_TOL {
                return Err(RegridError::InvalidTopology(format!(
                    "edge {} is degenerate (length {:.3e})",
                    i, length
                )));
            }
            edge_lengths.push(length);
        }

        let mut incident: Vec<Vec<usize>> = vec![Vec::new(); n_node];
        for (i, &[a, b]) in edges.iter().enumerate() {
            incident[a].push(i);
            incident[b].push(i);
        }
        let boundary_nodes = incident
            .iter()
            .enumerate()
            .filter(|(_, e)| e.len() == 1)
            .map(|(n, _)| n)
            .collect();
        let node_edges = FaceConnectivity::from_ragged(&incident);

        log::debug!(
            "built network grid: {} nodes, {} edges",
            n_node,
            edges.len()
        );

        Ok(Self {
            nodes,
            edges: edges.to_vec(),
            edge_lengths,
            node_edges,
            boundary_nodes,
        })
    }

    /// Renumbered copy containing only the edges selected by `mask`
    ///
    /// Returns the new grid and the new-to-old edge index map. The original
    /// is untouched; other consumers may keep querying it.
    pub fn subset(&self, mask: &[bool]) -> Result<(Self, Vec<usize>)> {
        if mask.len() != self.edges.len() {
            return Err(RegridError::DimensionMismatch {
                expected: self.edges.len(),
                found: mask.len(),
            });
        }

        let kept: Vec<usize> = (0..self.edges.len()).filter(|&i| mask[i]).collect();
        let (node_map, x, y) = renumber_nodes(
            &self.nodes,
            kept.iter().flat_map(|&e| self.edges[e].iter().copied()),
        );
        let new_edges: Vec<[usize; 2]> = kept
            .iter()
            .map(|&e| {
                let [a, b] = self.edges[e];
                [node_map[&a], node_map[&b]]
            })
            .collect();

        let grid = Self::new(&x, &y, &new_edges)?;
        Ok((grid, kept))
    }
}

impl PolygonGrid {
    /// Build a 2D grid from coordinate arrays and a fixed-width padded
    /// face-node table
    ///
    /// `face_nodes` holds one row of `stride` entries per face, padded at the
    /// tail with `fill`; the sentinel is never a valid node index. This is
    /// the persisted-mesh convention; internally faces are re-encoded as
    /// offsets plus flat indices.
    pub fn from_padded(
        x: &[f64],
        y: &[f64],
        face_nodes: &[i64],
        stride: usize,
        fill: i64,
    ) -> Result<Self> {
        if stride == 0 || face_nodes.len() % stride != 0 {
            return Err(RegridError::InvalidTopology(format!(
                "face-node table of {} entries is not divisible by stride {}",
                face_nodes.len(),
                stride
            )));
        }
        let nodes = build_nodes(x, y)?;
        let n_node = nodes.len();
        let n_face = face_nodes.len() / stride;

        let mut faces: Vec<Vec<usize>> = Vec::with_capacity(n_face);
        for f in 0..n_face {
            let row = &face_nodes[f * stride..(f + 1) * stride];
            let mut face = Vec::with_capacity(stride);
            let mut padding = false;
            for &entry in row {
                if entry == fill {
                    padding = true;
                    continue;
                }
                if padding {
                    return Err(RegridError::InvalidTopology(format!(
                        "face {} has a vertex after the fill value; padding must \
                         be contiguous at the row tail",
                        f
                    )));
                }
                if entry < 0 || entry as usize >= n_node {
                    return Err(RegridError::InvalidTopology(format!(
                        "face {} references node {} out of range (have {} nodes)",
                        f, entry, n_node
                    )));
                }
                face.push(entry as usize);
            }
            faces.push(face);
        }

        Self::from_faces(nodes, faces)
    }

    /// Build a 2D grid from already-unpacked per-face vertex lists
    pub fn from_faces(nodes: Vec<Point>, mut faces: Vec<Vec<usize>>) -> Result<Self> {
        let n_node = nodes.len();

        // Per-face validation and orientation normalization
        let mut reversed = 0usize;
        for (f, face) in faces.iter_mut().enumerate() {
            if face.len() < 3 {
                return Err(RegridError::InvalidTopology(format!(
                    "face {} has only {} vertices; polygons need at least 3",
                    f,
                    face.len()
                )));
            }
            let mut seen = face.clone();
            seen.sort_unstable();
            if seen.windows(2).any(|w| w[0] == w[1]) {
                return Err(RegridError::InvalidTopology(format!(
                    "face {} repeats a node",
                    f
                )));
            }
            if let Some(&bad) = face.iter().find(|&&n| n >= n_node) {
                return Err(RegridError::InvalidTopology(format!(
                    "face {} references node {} out of range (have {} nodes)",
                    f, bad, n_node
                )));
            }

            let points: Vec<Point> = face.iter().map(|&n| nodes[n]).collect();
            let area = geometry::signed_area(&points);
            if area.abs() <= GEOM_TOL {
                return Err(RegridError::InvalidTopology(format!(
                    "face {} is degenerate (area {:.3e})",
                    f, area
                )));
            }
            if area < 0.0 {
                face.reverse();
                reversed += 1;
            }
        }
        if reversed > 0 {
            log::warn!(
                "normalized {} clockwise face(s) to counter-clockwise order",
                reversed
            );
        }

        // Edge derivation: deduplicate unordered node pairs across all faces
        let mut edge_ids: HashMap<[usize; 2], usize> = HashMap::new();
        let mut edges: Vec<[usize; 2]> = Vec::new();
        let mut edge_faces: Vec<(usize, Option<usize>)> = Vec::new();
        let mut face_edge_lists: Vec<Vec<usize>> = Vec::with_capacity(faces.len());

        for (f, face) in faces.iter().enumerate() {
            let n = face.len();
            let mut face_edge = Vec::with_capacity(n);
            for k in 0..n {
                let a = face[k];
                let b = face[(k + 1) % n];
                let key = if a < b { [a, b] } else { [b, a] };
                let id = match edge_ids.entry(key) {
                    Entry::Occupied(entry) => {
                        let id = *entry.get();
                        match edge_faces[id].1 {
                            None if edge_faces[id].0 != f => edge_faces[id].1 = Some(f),
                            _ => {
                                return Err(RegridError::InvalidTopology(format!(
                                    "edge ({}, {}) is shared by more than two faces",
                                    key[0], key[1]
                                )))
                            }
                        }
                        id
                    }
                    Entry::Vacant(entry) => {
                        let id = edges.len();
                        entry.insert(id);
                        edges.push(key);
                        edge_faces.push((f, None));
                        id
                    }
                };
                face_edge.push(id);
            }
            face_edge_lists.push(face_edge);
        }

        let boundary_edges: Vec<usize> = edge_faces
            .iter()
            .enumerate()
            .filter(|(_, &(_, second))| second.is_none())
            .map(|(e, _)| e)
            .collect();

        // Face-face adjacency across interior edges
        let mut neighbor_lists: Vec<Vec<usize>> = vec![Vec::new(); faces.len()];
        for &(first, second) in &edge_faces {
            if let Some(second) = second {
                neighbor_lists[first].push(second);
                neighbor_lists[second].push(first);
            }
        }

        let face_areas: Vec<f64> = faces
            .iter()
            .map(|face| {
                let points: Vec<Point> = face.iter().map(|&n| nodes[n]).collect();
                geometry::signed_area(&points)
            })
            .collect();
        let face_centroids: Vec<Point> = faces
            .iter()
            .map(|face| {
                let points: Vec<Point> = face.iter().map(|&n| nodes[n]).collect();
                geometry::polygon_centroid(&points)
            })
            .collect();

        log::info!(
            "built polygon grid: {} nodes, {} edges, {} faces ({} boundary edges)",
            n_node,
            edges.len(),
            faces.len(),
            boundary_edges.len()
        );

        Ok(Self {
            nodes,
            faces: FaceConnectivity::from_ragged(&faces),
            edges,
            face_edges: FaceConnectivity::from_ragged(&face_edge_lists),
            edge_faces,
            face_neighbors: FaceConnectivity::from_ragged(&neighbor_lists),
            boundary_edges,
            face_areas,
            face_centroids,
        })
    }

    /// Renumbered copy containing only the faces selected by `mask`
    ///
    /// Returns the new grid and the new-to-old face index map. Nodes not
    /// referenced by any kept face are dropped; the original grid is
    /// untouched.
    pub fn subset(&self, mask: &[bool]) -> Result<(Self, Vec<usize>)> {
        if mask.len() != self.num_faces() {
            return Err(RegridError::DimensionMismatch {
                expected: self.num_faces(),
                found: mask.len(),
            });
        }

        let kept: Vec<usize> = (0..self.num_faces()).filter(|&i| mask[i]).collect();
        let (node_map, x, y) = renumber_nodes(
            &self.nodes,
            kept.iter().flat_map(|&f| self.faces.face(f).iter().copied()),
        );
        let nodes = build_nodes(&x, &y)?;
        let new_faces: Vec<Vec<usize>> = kept
            .iter()
            .map(|&f| self.faces.face(f).iter().map(|n| node_map[n]).collect())
            .collect();

        let grid = Self::from_faces(nodes, new_faces)?;
        Ok((grid, kept))
    }
}

/// Dense renumbering of the nodes referenced by an index stream
///
/// Preserves the original relative order. Returns the old-to-new map and the
/// compacted coordinate arrays.
fn renumber_nodes(
    nodes: &[Point],
    referenced: impl Iterator<Item = usize>,
) -> (HashMap<usize, usize>, Vec<f64>, Vec<f64>) {
    let mut used = vec![false; nodes.len()];
    for n in referenced {
        used[n] = true;
    }

    let mut node_map = HashMap::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    for (old, point) in nodes.iter().enumerate() {
        if used[old] {
            node_map.insert(old, x.len());
            x.push(point.x);
            y.push(point.y);
        }
    }
    (node_map, x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two unit squares sharing the edge (1, 2)
    ///
    /// ```text
    /// 3 --- 2 --- 5
    /// |  0  |  1  |
    /// 0 --- 1 --- 4
    /// ```
    fn two_quads_padded() -> (Vec<f64>, Vec<f64>, Vec<i64>) {
        let x = vec![0.0, 1.0, 1.0, 0.0, 2.0, 2.0];
        let y = vec![0.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let faces = vec![0, 1, 2, 3, 1, 4, 5, 2];
        (x, y, faces)
    }

    #[test]
    fn test_from_padded_two_quads() {
        let (x, y, faces) = two_quads_padded();
        let grid = PolygonGrid::from_padded(&x, &y, &faces, 4, -1).unwrap();

        assert_eq!(grid.num_nodes(), 6);
        assert_eq!(grid.num_faces(), 2);
        // 4 + 4 edges, one shared
        assert_eq!(grid.num_edges(), 7);
        assert_eq!(grid.boundary_edges.len(), 6);

        assert!((grid.face_areas[0] - 1.0).abs() < 1e-12);
        assert!((grid.face_areas[1] - 1.0).abs() < 1e-12);
        assert!((grid.face_centroids[0].x - 0.5).abs() < 1e-12);
        assert!((grid.face_centroids[1].x - 1.5).abs() < 1e-12);

        // Faces are neighbors across the shared edge
        assert_eq!(grid.face_neighbors.face(0), &[1]);
        assert_eq!(grid.face_neighbors.face(1), &[0]);
    }

    #[test]
    fn test_from_padded_with_fill() {
        // A triangle padded to stride 4 next to a quad
        let x = vec![0.0, 1.0, 1.0, 0.0, 2.0];
        let y = vec![0.0, 0.0, 1.0, 1.0, 0.5];
        let faces = vec![0, 1, 2, 3, 1, 4, 2, -1];
        let grid = PolygonGrid::from_padded(&x, &y, &faces, 4, -1).unwrap();

        assert_eq!(grid.num_faces(), 2);
        assert_eq!(grid.faces.node_count(0), 4);
        assert_eq!(grid.faces.node_count(1), 3);
    }

    #[test]
    fn test_fill_in_row_interior_rejected() {
        let x = vec![0.0, 1.0, 1.0, 0.0];
        let y = vec![0.0, 0.0, 1.0, 1.0];
        let faces = vec![0, 1, -1, 3];
        let err = PolygonGrid::from_padded(&x, &y, &faces, 4, -1).unwrap_err();
        assert!(matches!(err, RegridError::InvalidTopology(_)));
    }

    #[test]
    fn test_out_of_range_node_rejected() {
        let x = vec![0.0, 1.0, 1.0];
        let y = vec![0.0, 0.0, 1.0];
        let faces = vec![0, 1, 7];
        let err = PolygonGrid::from_padded(&x, &y, &faces, 3, -1).unwrap_err();
        assert!(matches!(err, RegridError::InvalidTopology(_)));
    }

    #[test]
    fn test_duplicate_node_in_face_rejected() {
        let x = vec![0.0, 1.0, 1.0];
        let y = vec![0.0, 0.0, 1.0];
        let faces = vec![0, 1, 1];
        let err = PolygonGrid::from_padded(&x, &y, &faces, 3, -1).unwrap_err();
        assert!(matches!(err, RegridError::InvalidTopology(_)));
    }

    #[test]
    fn test_non_manifold_rejected() {
        // Three triangles all sharing the edge (0, 1)
        let x = vec![0.0, 1.0, 0.5, 0.5, 0.5];
        let y = vec![0.0, 0.0, 1.0, -1.0, 0.5];
        let faces = vec![0, 1, 2, 0, 3, 1, 0, 1, 4];
        let err = PolygonGrid::from_padded(&x, &y, &faces, 3, -1).unwrap_err();
        match err {
            RegridError::InvalidTopology(msg) => {
                assert!(msg.contains("more than two faces"), "got: {}", msg)
            }
            other => panic!("expected InvalidTopology, got {:?}", other),
        }
    }

    #[test]
    fn test_clockwise_face_normalized() {
        // Clockwise unit square
        let x = vec![0.0, 1.0, 1.0, 0.0];
        let y = vec![0.0, 0.0, 1.0, 1.0];
        let faces = vec![0, 3, 2, 1];
        let grid = PolygonGrid::from_padded(&x, &y, &faces, 4, -1).unwrap();

        // Stored counter-clockwise with positive area
        assert!(grid.face_areas[0] > 0.0);
        let points = grid.face_points(0);
        assert!(geometry::signed_area(&points) > 0.0);
    }

    #[test]
    fn test_degenerate_face_rejected() {
        // Three collinear nodes
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![0.0, 0.0, 0.0];
        let faces = vec![0, 1, 2];
        let err = PolygonGrid::from_padded(&x, &y, &faces, 3, -1).unwrap_err();
        assert!(matches!(err, RegridError::InvalidTopology(_)));
    }

    #[test]
    fn test_subset_renumbers() {
        let (x, y, faces) = two_quads_padded();
        let grid = PolygonGrid::from_padded(&x, &y, &faces, 4, -1).unwrap();

        let (sub, kept) = grid.subset(&[false, true]).unwrap();
        assert_eq!(kept, vec![1]);
        assert_eq!(sub.num_faces(), 1);
        // Only the 4 nodes of face 1 survive
        assert_eq!(sub.num_nodes(), 4);
        assert!((sub.face_areas[0] - 1.0).abs() < 1e-12);
        assert!((sub.face_centroids[0].x - 1.5).abs() < 1e-12);

        // Original grid is unchanged
        assert_eq!(grid.num_faces(), 2);
    }

    #[test]
    fn test_subset_bad_mask_length() {
        let (x, y, faces) = two_quads_padded();
        let grid = PolygonGrid::from_padded(&x, &y, &faces, 4, -1).unwrap();
        let err = grid.subset(&[true]).unwrap_err();
        assert!(matches!(err, RegridError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_network_grid_build() {
        let x = vec![0.0, 1.0, 2.0, 2.0];
        let y = vec![0.0, 0.0, 0.0, 1.0];
        let edges = vec![[0, 1], [1, 2], [2, 3]];
        let grid = NetworkGrid::new(&x, &y, &edges).unwrap();

        assert_eq!(grid.num_edges(), 3);
        assert!((grid.edge_lengths[0] - 1.0).abs() < 1e-12);
        assert!((grid.total_length() - 3.0).abs() < 1e-12);
        // Path endpoints have degree one
        assert_eq!(grid.boundary_nodes, vec![0, 3]);
        assert_eq!(grid.node_edges.face(1), &[0, 1]);
    }

    #[test]
    fn test_network_degenerate_edge_rejected() {
        let x = vec![0.0, 0.0];
        let y = vec![0.0, 0.0];
        let err = NetworkGrid::new(&x, &y, &[[0, 1]]).unwrap_err();
        assert!(matches!(err, RegridError::InvalidTopology(_)));

        let err = NetworkGrid::new(&x, &y, &[[0, 0]]).unwrap_err();
        assert!(matches!(err, RegridError::InvalidTopology(_)));
    }

    #[test]
    fn test_network_subset() {
        let x = vec![0.0, 1.0, 2.0];
        let y = vec![0.0, 0.0, 0.0];
        let edges = vec![[0, 1], [1, 2]];
        let grid = NetworkGrid::new(&x, &y, &edges).unwrap();

        let (sub, kept) = grid.subset(&[true, false]).unwrap();
        assert_eq!(kept, vec![0]);
        assert_eq!(sub.num_edges(), 1);
        assert_eq!(sub.num_nodes(), 2);
    }

    #[test]
    fn test_point_grid_non_finite_rejected() {
        let err = PointGrid::new(&[0.0, f64::NAN], &[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, RegridError::InvalidTopology(_)));
    }
}
