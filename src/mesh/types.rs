//! Core grid data structures

use crate::spatial::Aabb;
use nalgebra::{Point2, Vector2};

/// 2D point type
pub type Point = Point2<f64>;

/// 2D vector type
pub type Vec2 = Vector2<f64>;

/// Ragged face-node connectivity stored as offsets plus flat indices
///
/// Face `i` owns the index range `offsets[i]..offsets[i + 1]`. Offsets are
/// strictly increasing with `offsets[0] == 0`, so every face has at least one
/// vertex and slicing is always in bounds. Construction from the persisted
/// fixed-width convention (padded rows with a fill-value sentinel) happens in
/// [`crate::mesh::topology`]; the sentinel never survives into this structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceConnectivity {
    offsets: Vec<usize>,
    indices: Vec<usize>,
}

impl FaceConnectivity {
    /// Build from per-face index lists
    ///
    /// Callers are responsible for prior validation; this only assembles the
    /// offsets encoding.
    pub(crate) fn from_ragged(faces: &[Vec<usize>]) -> Self {
        let mut offsets = Vec::with_capacity(faces.len() + 1);
        let mut indices = Vec::new();
        offsets.push(0);
        for face in faces {
            indices.extend_from_slice(face);
            offsets.push(indices.len());
        }
        Self { offsets, indices }
    }

    /// Number of faces
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// True when no faces are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node indices of face `i`, in winding order
    pub fn face(&self, i: usize) -> &[usize] {
        &self.indices[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Number of vertices of face `i`
    pub fn node_count(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    /// Iterate over all faces as index slices
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.offsets
            .windows(2)
            .map(move |w| &self.indices[w[0]..w[1]])
    }

    /// Flat view of all indices
    pub fn flat_indices(&self) -> &[usize] {
        &self.indices
    }

    /// Offsets view (length `len() + 1`, strictly increasing)
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

/// 0D grid: a bare set of points
///
/// Cells are the points themselves; the cell measure is defined as 1.0 so
/// that overlay entries against point grids carry a containment count.
#[derive(Debug, Clone)]
pub struct PointGrid {
    /// Point coordinates, addressed by dense index
    pub points: Vec<Point>,
}

/// 1D grid: a network of line segments
///
/// Cells are the edges. All connectivity beyond the edge list is derived at
/// construction and immutable afterwards.
#[derive(Debug, Clone)]
pub struct NetworkGrid {
    /// Node coordinates, addressed by dense index
    pub nodes: Vec<Point>,

    /// Edge-node connectivity (as given, orientation preserved)
    pub edges: Vec<[usize; 2]>,

    /// Length of every edge
    pub edge_lengths: Vec<f64>,

    /// Edges incident to each node, offsets-encoded
    pub node_edges: FaceConnectivity,

    /// Nodes belonging to exactly one edge
    pub boundary_nodes: Vec<usize>,
}

/// 2D grid: a manifold polygonal mesh
///
/// Cells are the faces. Edges and all adjacency tables are derived at
/// construction; faces are stored counter-clockwise (clockwise input is
/// reversed during the build).
#[derive(Debug, Clone)]
pub struct PolygonGrid {
    /// Node coordinates, addressed by dense index
    pub nodes: Vec<Point>,

    /// Face-node connectivity, counter-clockwise
    pub faces: FaceConnectivity,

    /// Deduplicated undirected edges as sorted node pairs
    pub edges: Vec<[usize; 2]>,

    /// Edge ids bounding each face, offsets-encoded (same shape as `faces`)
    pub face_edges: FaceConnectivity,

    /// The one or two faces bordering each edge
    pub edge_faces: Vec<(usize, Option<usize>)>,

    /// Face-face adjacency across shared edges, offsets-encoded
    pub face_neighbors: FaceConnectivity,

    /// Edge ids belonging to exactly one face
    pub boundary_edges: Vec<usize>,

    /// Unsigned area of every face
    pub face_areas: Vec<f64>,

    /// Centroid of every face
    pub face_centroids: Vec<Point>,
}

impl PointGrid {
    /// Number of points
    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}

impl NetworkGrid {
    /// Number of nodes
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges (cells)
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Endpoint coordinates of edge `i`
    pub fn edge_endpoints(&self, i: usize) -> (Point, Point) {
        let [a, b] = self.edges[i];
        (self.nodes[a], self.nodes[b])
    }

    /// Midpoint coordinates of every edge
    pub fn edge_coordinates(&self) -> Vec<Point> {
        self.edges
            .iter()
            .map(|&[a, b]| nalgebra::center(&self.nodes[a], &self.nodes[b]))
            .collect()
    }

    /// Total length of the network
    pub fn total_length(&self) -> f64 {
        self.edge_lengths.iter().sum()
    }
}

impl PolygonGrid {
    /// Number of nodes
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of derived edges
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of faces (cells)
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Vertex coordinates of face `i`, counter-clockwise
    pub fn face_points(&self, i: usize) -> Vec<Point> {
        self.faces.face(i).iter().map(|&n| self.nodes[n]).collect()
    }

    /// Centroid coordinates of every face
    pub fn face_coordinates(&self) -> &[Point] {
        &self.face_centroids
    }

    /// Midpoint coordinates of every derived edge
    pub fn edge_coordinates(&self) -> Vec<Point> {
        self.edges
            .iter()
            .map(|&[a, b]| nalgebra::center(&self.nodes[a], &self.nodes[b]))
            .collect()
    }

    /// Total area of the mesh
    pub fn total_area(&self) -> f64 {
        self.face_areas.iter().sum()
    }
}

/// A grid of one of the supported topology dimensions
///
/// The variant is fixed at construction; all consumers dispatch on it through
/// the capability methods below rather than inspecting concrete types.
#[derive(Debug, Clone)]
pub enum Grid {
    /// 0D point set
    Points(PointGrid),
    /// 1D segment network
    Network(NetworkGrid),
    /// 2D polygonal mesh
    Polygons(PolygonGrid),
}

impl Grid {
    /// Topological dimension: 0, 1, or 2
    pub fn dimension(&self) -> usize {
        match self {
            Grid::Points(_) => 0,
            Grid::Network(_) => 1,
            Grid::Polygons(_) => 2,
        }
    }

    /// Number of cells (points, edges, or faces)
    pub fn cell_count(&self) -> usize {
        match self {
            Grid::Points(g) => g.num_points(),
            Grid::Network(g) => g.num_edges(),
            Grid::Polygons(g) => g.num_faces(),
        }
    }

    /// Intrinsic measure of cell `i`: 1.0 for points, length for edges,
    /// area for faces
    pub fn cell_measure(&self, i: usize) -> f64 {
        match self {
            Grid::Points(_) => 1.0,
            Grid::Network(g) => g.edge_lengths[i],
            Grid::Polygons(g) => g.face_areas[i],
        }
    }

    /// Axis-aligned bounding box of cell `i`
    pub fn cell_bbox(&self, i: usize) -> Aabb {
        match self {
            Grid::Points(g) => Aabb::from_point(g.points[i]),
            Grid::Network(g) => {
                let (a, b) = g.edge_endpoints(i);
                Aabb::from_points(&[a, b])
            }
            Grid::Polygons(g) => Aabb::from_points(&g.face_points(i)),
        }
    }

    /// Bounding box of the whole grid
    pub fn bounds(&self) -> Aabb {
        let points: &[Point] = match self {
            Grid::Points(g) => &g.points,
            Grid::Network(g) => &g.nodes,
            Grid::Polygons(g) => &g.nodes,
        };
        Aabb::from_points(points)
    }
}
