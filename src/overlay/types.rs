//! Overlay data types

/// One geometric correspondence between a source and a target cell
///
/// The measure is the intersection area for 2D-2D overlays, the shared
/// length for overlays involving a 1D grid, and a containment count of 1.0
/// when the source is a point set. A full overlay is a sparse correspondence
/// table of these triples, grouped per target cell, with at most one entry
/// per (source, target) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayEntry {
    /// Source cell index
    pub source: usize,

    /// Target cell index
    pub target: usize,

    /// Intersection measure (area, length, or containment count)
    pub measure: f64,
}

impl OverlayEntry {
    /// Create a new overlay entry
    pub fn new(source: usize, target: usize, measure: f64) -> Self {
        Self {
            source,
            target,
            measure,
        }
    }
}

/// Summed intersection measure per target cell
///
/// Diagnostic helper: for a target fully covered by the source, the sum for
/// that target equals the target's own measure within tolerance.
pub fn measure_per_target(entries: &[OverlayEntry], n_target: usize) -> Vec<f64> {
    let mut totals = vec![0.0; n_target];
    for entry in entries {
        totals[entry.target] += entry.measure;
    }
    totals
}
