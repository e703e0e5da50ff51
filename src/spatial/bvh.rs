//! Axis-aligned bounding boxes and the bounding-volume hierarchy
//!
//! The hierarchy is a flat-array binary tree built once per grid by median
//! splits along the longest centroid axis. Leaves hold small runs of cell
//! ids; every query walks boxes top-down and filters against the per-cell
//! boxes, so results are exact at the bounding-box level (narrow-phase
//! geometry stays with the caller). The tree never mutates after
//! construction.

use crate::mesh::geometry::GEOM_TOL;
use crate::mesh::types::Point;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Lower-left corner
    pub min: Point,
    /// Upper-right corner
    pub max: Point,
}

impl Aabb {
    /// Box around a single point
    pub fn from_point(p: Point) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box containing all points
    ///
    /// An empty slice yields an inverted box that intersects nothing.
    pub fn from_points(points: &[Point]) -> Self {
        let mut bbox = Self {
            min: Point::new(f64::INFINITY, f64::INFINITY),
            max: Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        };
        for p in points {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        bbox
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Closed-interval overlap test, padded by the geometric tolerance
    ///
    /// Boxes that merely touch count as intersecting, so shared boundaries
    /// are never missed by the broad phase.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x + GEOM_TOL
            && other.min.x <= self.max.x + GEOM_TOL
            && self.min.y <= other.max.y + GEOM_TOL
            && other.min.y <= self.max.y + GEOM_TOL
    }

    /// Containment test, padded by the geometric tolerance
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x - GEOM_TOL
            && p.x <= self.max.x + GEOM_TOL
            && p.y >= self.min.y - GEOM_TOL
            && p.y <= self.max.y + GEOM_TOL
    }

    /// Center of the box
    pub fn center(&self) -> Point {
        Point::new(
            0.5 * (self.min.x + self.max.x),
            0.5 * (self.min.y + self.max.y),
        )
    }

    /// Half of the box diagonal length
    pub fn half_diagonal(&self) -> f64 {
        0.5 * (self.max - self.min).norm()
    }
}

/// Maximum number of cells per leaf
const LEAF_SIZE: usize = 4;

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    aabb: Aabb,
    /// Child node indices; unused for leaves
    left: usize,
    right: usize,
    /// Item range; `count == 0` marks an internal node
    start: usize,
    count: usize,
}

/// Bounding-volume hierarchy over cell bounding boxes
#[derive(Debug, Clone)]
pub struct BvhTree {
    nodes: Vec<BvhNode>,
    items: Vec<usize>,
    cell_boxes: Vec<Aabb>,
}

impl BvhTree {
    /// Build the hierarchy over one box per cell, O(n log n)
    pub fn build(cell_boxes: Vec<Aabb>) -> Self {
        let mut items: Vec<usize> = (0..cell_boxes.len()).collect();
        let mut nodes = Vec::with_capacity(2 * cell_boxes.len().max(1));
        if !items.is_empty() {
            build_node(&cell_boxes, &mut items, 0, cell_boxes.len(), &mut nodes);
        }
        log::debug!(
            "built BVH: {} cells, {} nodes",
            cell_boxes.len(),
            nodes.len()
        );
        Self {
            nodes,
            items,
            cell_boxes,
        }
    }

    /// Number of indexed cells
    pub fn len(&self) -> usize {
        self.cell_boxes.len()
    }

    /// True when no cells are indexed
    pub fn is_empty(&self) -> bool {
        self.cell_boxes.is_empty()
    }

    /// Bounding box of cell `i`
    pub fn cell_box(&self, i: usize) -> &Aabb {
        &self.cell_boxes[i]
    }

    /// All cells whose bounding box intersects the query box
    ///
    /// Broad phase only: bounding-box overlap over-approximates geometric
    /// overlap, and the caller filters the false positives.
    pub fn query_overlaps(&self, query: &Aabb) -> Vec<usize> {
        let mut result = Vec::new();
        self.walk(
            |node_box| node_box.intersects(query),
            |cell| self.cell_boxes[cell].intersects(query),
            &mut result,
        );
        result
    }

    /// All cells whose bounding box contains the query point
    pub fn query_point(&self, p: &Point) -> Vec<usize> {
        let mut result = Vec::new();
        self.walk(
            |node_box| node_box.contains_point(p),
            |cell| self.cell_boxes[cell].contains_point(p),
            &mut result,
        );
        result
    }

    fn walk(
        &self,
        descend: impl Fn(&Aabb) -> bool,
        accept: impl Fn(usize) -> bool,
        result: &mut Vec<usize>,
    ) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0usize];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            if !descend(&node.aabb) {
                continue;
            }
            if node.count > 0 {
                for &cell in &self.items[node.start..node.start + node.count] {
                    if accept(cell) {
                        result.push(cell);
                    }
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }
}

/// Recursively build the subtree over `items[start..end]`, returning its
/// node index
fn build_node(
    boxes: &[Aabb],
    items: &mut [usize],
    start: usize,
    end: usize,
    nodes: &mut Vec<BvhNode>,
) -> usize {
    let mut aabb = boxes[items[start]];
    for &item in &items[start + 1..end] {
        aabb = aabb.union(&boxes[item]);
    }

    let index = nodes.len();
    nodes.push(BvhNode {
        aabb,
        left: 0,
        right: 0,
        start,
        count: 0,
    });

    let count = end - start;
    if count <= LEAF_SIZE {
        nodes[index].count = count;
        return index;
    }

    // Median split along the axis with the larger centroid spread
    let extent = aabb.max - aabb.min;
    let mid = start + count / 2;
    let key = |item: usize| {
        let c = boxes[item].center();
        if extent.x >= extent.y {
            c.x
        } else {
            c.y
        }
    };
    items[start..end].select_nth_unstable_by(count / 2, |&a, &b| {
        key(a).partial_cmp(&key(b)).unwrap()
    });

    let left = build_node(boxes, items, start, mid, nodes);
    let right = build_node(boxes, items, mid, end, nodes);
    nodes[index].left = left;
    nodes[index].right = right;
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One unit box per cell on an n x n grid
    fn grid_boxes(n: usize) -> Vec<Aabb> {
        let mut boxes = Vec::with_capacity(n * n);
        for j in 0..n {
            for i in 0..n {
                boxes.push(Aabb {
                    min: Point::new(i as f64, j as f64),
                    max: Point::new(i as f64 + 1.0, j as f64 + 1.0),
                });
            }
        }
        boxes
    }

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb {
            min: Point::new(0.0, 0.0),
            max: Point::new(1.0, 1.0),
        };
        let b = Aabb {
            min: Point::new(0.5, 0.5),
            max: Point::new(2.0, 2.0),
        };
        let c = Aabb {
            min: Point::new(1.5, 1.5),
            max: Point::new(2.0, 2.0),
        };

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));

        // Touching boxes count as intersecting
        let touching = Aabb {
            min: Point::new(1.0, 0.0),
            max: Point::new(2.0, 1.0),
        };
        assert!(a.intersects(&touching));
    }

    #[test]
    fn test_bvh_query_overlaps_matches_brute_force() {
        let boxes = grid_boxes(8);
        let tree = BvhTree::build(boxes.clone());

        let query = Aabb {
            min: Point::new(2.3, 3.1),
            max: Point::new(4.7, 5.2),
        };

        let mut expected: Vec<usize> = (0..boxes.len())
            .filter(|&i| boxes[i].intersects(&query))
            .collect();
        let mut found = tree.query_overlaps(&query);
        expected.sort_unstable();
        found.sort_unstable();

        assert_eq!(found, expected);
        assert!(!found.is_empty());
    }

    #[test]
    fn test_bvh_query_point() {
        let boxes = grid_boxes(4);
        let tree = BvhTree::build(boxes);

        // Strictly interior point of one cell
        let hits = tree.query_point(&Point::new(1.5, 2.5));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0], 2 * 4 + 1);

        // A shared corner touches four boxes
        let mut hits = tree.query_point(&Point::new(2.0, 2.0));
        hits.sort_unstable();
        assert_eq!(hits.len(), 4);

        // Outside the grid entirely
        let hits = tree.query_point(&Point::new(-3.0, -3.0));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_bvh_empty() {
        let tree = BvhTree::build(Vec::new());
        assert!(tree.is_empty());
        assert!(tree
            .query_overlaps(&Aabb {
                min: Point::new(0.0, 0.0),
                max: Point::new(1.0, 1.0),
            })
            .is_empty());
    }

    #[test]
    fn test_bvh_single_cell() {
        let tree = BvhTree::build(vec![Aabb {
            min: Point::new(0.0, 0.0),
            max: Point::new(1.0, 1.0),
        }]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.query_point(&Point::new(0.5, 0.5)), vec![0]);
    }
}
