//! Per-grid spatial index construction and broad-phase queries

use crate::mesh::geometry::GEOM_TOL;
use crate::mesh::types::{Grid, Point};
use crate::spatial::bvh::{Aabb, BvhTree};
use kiddo::ImmutableKdTree;

/// Immutable spatial index over one grid's cells
///
/// Built once per grid and read-only afterwards; its lifetime is independent
/// of the grid (cell boxes and coordinates are copied in), but queries only
/// make sense against the grid it was built from. Network and polygon grids
/// get a bounding-volume hierarchy; point grids get a k-d tree.
#[derive(Debug)]
pub enum SpatialIndex {
    /// BVH over cell bounding boxes (1D and 2D grids)
    Cells(BvhTree),
    /// k-d tree over point coordinates (0D grids)
    Points(PointSetIndex),
}

impl SpatialIndex {
    /// Build the index matching the grid's topology kind
    pub fn build(grid: &Grid) -> Self {
        match grid {
            Grid::Points(g) => {
                log::debug!("building k-d tree over {} points", g.num_points());
                SpatialIndex::Points(PointSetIndex::new(&g.points))
            }
            _ => {
                let boxes: Vec<Aabb> =
                    (0..grid.cell_count()).map(|i| grid.cell_bbox(i)).collect();
                SpatialIndex::Cells(BvhTree::build(boxes))
            }
        }
    }

    /// Number of indexed cells
    pub fn len(&self) -> usize {
        match self {
            SpatialIndex::Cells(tree) => tree.len(),
            SpatialIndex::Points(index) => index.len(),
        }
    }

    /// True when no cells are indexed
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Broad phase: all cells whose bounding box intersects the query box
    ///
    /// Over-approximation by design; callers confirm with exact geometry.
    pub fn query_overlaps(&self, query: &Aabb) -> Vec<usize> {
        match self {
            SpatialIndex::Cells(tree) => tree.query_overlaps(query),
            SpatialIndex::Points(index) => index.query_box(query),
        }
    }

    /// Broad phase: all cells whose bounding box contains the point
    pub fn query_point(&self, p: &Point) -> Vec<usize> {
        match self {
            SpatialIndex::Cells(tree) => tree.query_point(p),
            SpatialIndex::Points(index) => index.query_box(&Aabb::from_point(*p)),
        }
    }
}

/// k-d tree index over a 0D point grid
///
/// Coordinates are kept alongside the tree for exact filtering of the
/// radius-query over-approximation.
pub struct PointSetIndex {
    tree: Option<ImmutableKdTree<f64, 2>>,
    points: Vec<Point>,
}

impl std::fmt::Debug for PointSetIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointSetIndex")
            .field("len", &self.points.len())
            .finish()
    }
}

impl PointSetIndex {
    /// Build an immutable k-d tree over the points
    pub fn new(points: &[Point]) -> Self {
        let tree = if points.is_empty() {
            None
        } else {
            let entries: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
            Some(ImmutableKdTree::new_from_slice(&entries))
        };
        Self {
            tree,
            points: points.to_vec(),
        }
    }

    /// Number of indexed points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// All points inside the query box
    ///
    /// Implemented as a radius query around the box center, filtered down to
    /// exact box containment.
    pub fn query_box(&self, query: &Aabb) -> Vec<usize> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        let center = query.center();
        let radius = query.half_diagonal() + GEOM_TOL;
        let mut hits: Vec<usize> = tree
            .within::<kiddo::SquaredEuclidean>(&[center.x, center.y], radius * radius)
            .iter()
            .map(|n| n.item as usize)
            .filter(|&i| query.contains_point(&self.points[i]))
            .collect();
        hits.sort_unstable();
        hits
    }

    /// The lowest-index point within `tolerance` of the query location
    pub fn nearest_within(&self, p: &Point, tolerance: f64) -> Option<usize> {
        let tree = self.tree.as_ref()?;
        tree.within::<kiddo::SquaredEuclidean>(&[p.x, p.y], tolerance * tolerance)
            .iter()
            .map(|n| n.item as usize)
            .min()
    }
}
