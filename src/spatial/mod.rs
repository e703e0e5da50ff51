//! Spatial indexing: bounding boxes, BVH, and point location

pub mod bvh;
pub mod index;
pub mod locate;

pub use bvh::{Aabb, BvhTree};
pub use index::{PointSetIndex, SpatialIndex};
pub use locate::{locate_point, locate_points};
