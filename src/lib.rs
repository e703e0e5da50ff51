//! Mesh Regrid Library
//!
//! Unstructured mesh topology, spatial overlay, and conservative regridding
//! for 0D point sets, 1D networks, and 2D polygonal meshes.

pub mod config;
pub mod error;
pub mod mesh;
pub mod overlay;
pub mod regrid;
pub mod spatial;

pub use error::{RegridError, Result};
