//! Point location against a grid and its spatial index

use crate::mesh::geometry::{self, GEOM_TOL};
use crate::mesh::types::{Grid, Point};
use crate::spatial::index::SpatialIndex;

/// Locate each query point in a grid
///
/// Broad phase through the spatial index, then exact confirmation per
/// candidate: point-in-polygon for 2D grids, distance-to-segment within the
/// geometric tolerance for 1D, nearest node within tolerance for 0D. Returns
/// `None` for points contained by no cell.
///
/// Boundary queries can pass the exact test for several cells (a point on a
/// shared edge is inside both neighbors); the lowest cell index wins, so the
/// result is deterministic. The index must have been built from `grid`.
pub fn locate_points(grid: &Grid, index: &SpatialIndex, points: &[Point]) -> Vec<Option<usize>> {
    points.iter().map(|p| locate_point(grid, index, p)).collect()
}

/// Locate a single query point; see [`locate_points`]
pub fn locate_point(grid: &Grid, index: &SpatialIndex, p: &Point) -> Option<usize> {
    match grid {
        Grid::Points(_) => match index {
            SpatialIndex::Points(kd) => kd.nearest_within(p, GEOM_TOL),
            SpatialIndex::Cells(_) => None,
        },
        Grid::Network(g) => index
            .query_point(p)
            .into_iter()
            .filter(|&e| {
                let (a, b) = g.edge_endpoints(e);
                geometry::point_segment_distance(p, &a, &b) <= GEOM_TOL
            })
            .min(),
        Grid::Polygons(g) => index
            .query_point(p)
            .into_iter()
            .filter(|&f| geometry::point_in_polygon(p, &g.face_points(f)))
            .min(),
    }
}
