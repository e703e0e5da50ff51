//! Error types for mesh construction, overlay, and regridding
//!
//! This module defines all error types that can occur during grid
//! construction, overlay computation, and regrid operator application.

use thiserror::Error;

/// Error types for regridding operations
///
/// Structural validation (topology, dimension agreement, method support)
/// happens eagerly at construction time, before any geometry work. Numerical
/// edge cases during clipping are resolved locally via tolerance rules and
/// never surface through this enum.
#[derive(Error, Debug)]
pub enum RegridError {
    /// Mesh topology is invalid or corrupted
    ///
    /// This error occurs when the connectivity data violates expected
    /// constraints: out-of-range node references, a node repeated within a
    /// face, degenerate (zero-measure) cells, or an edge shared by more than
    /// two faces.
    #[error("Invalid mesh topology: {0}")]
    InvalidTopology(String),

    /// Data array's spatial dimension disagrees with the grid's cell count
    ///
    /// Raised when applying a regrid operator to a data array whose trailing
    /// spatial dimension is not the expected cell count (or a multiple of it,
    /// for broadcast application).
    #[error("Dimension mismatch: expected a multiple of {expected} values, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Overlay requested between incompatible topological dimensionalities
    ///
    /// Raised at overlay construction, before any geometry work. A source of
    /// higher dimension than the target has no conservative interpretation.
    #[error(
        "Unsupported overlay combination: {source_dim}-dimensional source onto \
         {target_dim}-dimensional target"
    )]
    UnsupportedCombination { source_dim: usize, target_dim: usize },

    /// Configuration error
    ///
    /// Invalid configuration file format, unknown method or missing-value
    /// policy names, or invalid parameter values.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results with [`RegridError`]
///
/// This type alias is used throughout the codebase for cleaner error handling.
pub type Result<T> = std::result::Result<T, RegridError>;
