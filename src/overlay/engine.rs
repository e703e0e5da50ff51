//! Pairwise overlay computation between two grids
//!
//! Broad phase: each target cell queries the source grid's spatial index
//! with its bounding box. Narrow phase: exact clipping through the geometry
//! kernel per candidate. Every target cell is an independent work unit over
//! shared read-only inputs, so the sweep parallelizes without locking and
//! the concatenated output is independent of worker count.

use crate::error::{RegridError, Result};
use crate::mesh::geometry::{self, GEOM_TOL};
use crate::mesh::types::{Grid, NetworkGrid, PointGrid, PolygonGrid};
use crate::overlay::types::OverlayEntry;
use crate::spatial::index::SpatialIndex;
use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Compute all geometric correspondences between two grids
///
/// Supported combinations are dispatched on the topology dimensions before
/// any geometry work; a source of higher dimension than the target fails
/// with [`RegridError::UnsupportedCombination`]. Entries below the
/// degeneracy tolerance are dropped; multiple clip fragments between the
/// same (source, target) pair are summed into one entry. Output is grouped
/// per target cell with no further order guarantee.
///
/// `source_index` must have been built from `source`.
pub fn compute_overlay(
    source: &Grid,
    source_index: &SpatialIndex,
    target: &Grid,
) -> Result<Vec<OverlayEntry>> {
    check_combination(source, target)?;

    let n_target = target.cell_count();
    log::info!(
        "computing {}D-over-{}D overlay: {} source cells, {} target cells",
        source.dimension(),
        target.dimension(),
        source_index.len(),
        n_target
    );

    // Threshold for parallelization (below this, overhead isn't worth it)
    #[cfg(feature = "parallel")]
    const PARALLEL_THRESHOLD: usize = 256;

    #[cfg(feature = "parallel")]
    let per_target: Vec<Vec<OverlayEntry>> = if n_target >= PARALLEL_THRESHOLD {
        (0..n_target)
            .into_par_iter()
            .map(|t| overlay_one_target(source, source_index, target, t))
            .collect()
    } else {
        (0..n_target)
            .map(|t| overlay_one_target(source, source_index, target, t))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let per_target: Vec<Vec<OverlayEntry>> = (0..n_target)
        .map(|t| overlay_one_target(source, source_index, target, t))
        .collect();

    let entries: Vec<OverlayEntry> = per_target.into_iter().flatten().collect();
    log::info!("overlay produced {} entries", entries.len());
    Ok(entries)
}

/// Validate the topology-dimension combination, before any geometry work
fn check_combination(source: &Grid, target: &Grid) -> Result<()> {
    let (s, t) = (source.dimension(), target.dimension());
    if s > t {
        return Err(RegridError::UnsupportedCombination {
            source_dim: s,
            target_dim: t,
        });
    }
    Ok(())
}

/// Overlay entries for one target cell
///
/// Pure over immutable inputs: this is the unit of parallel work.
fn overlay_one_target(
    source: &Grid,
    source_index: &SpatialIndex,
    target: &Grid,
    t: usize,
) -> Vec<OverlayEntry> {
    let bbox = target.cell_bbox(t);
    let candidates = source_index.query_overlaps(&bbox);
    if candidates.is_empty() {
        return Vec::new();
    }

    // Accumulate per source id so clip fragments of the same pair merge;
    // BTreeMap keeps per-target emission deterministic.
    let mut measures: BTreeMap<usize, f64> = BTreeMap::new();

    match (source, target) {
        (Grid::Polygons(sg), Grid::Polygons(tg)) => {
            polygon_over_polygon(sg, tg, t, &candidates, &mut measures)
        }
        (Grid::Network(sg), Grid::Polygons(tg)) => {
            network_over_polygon(sg, tg, t, &candidates, &mut measures)
        }
        (Grid::Network(sg), Grid::Network(tg)) => {
            network_over_network(sg, tg, t, &candidates, &mut measures)
        }
        (Grid::Points(sg), Grid::Polygons(tg)) => {
            points_over_polygon(sg, tg, t, &candidates, &mut measures)
        }
        (Grid::Points(sg), Grid::Network(tg)) => {
            points_over_network(sg, tg, t, &candidates, &mut measures)
        }
        (Grid::Points(sg), Grid::Points(tg)) => {
            points_over_points(sg, tg, t, &candidates, &mut measures)
        }
        // Higher-dimensional sources were rejected by check_combination
        _ => unreachable!("unsupported combination past eager validation"),
    }

    measures
        .into_iter()
        .filter(|&(_, measure)| measure > GEOM_TOL)
        .map(|(s, measure)| OverlayEntry::new(s, t, measure))
        .collect()
}

fn polygon_over_polygon(
    source: &PolygonGrid,
    target: &PolygonGrid,
    t: usize,
    candidates: &[usize],
    measures: &mut BTreeMap<usize, f64>,
) {
    let target_poly = target.face_points(t);
    for &s in candidates {
        let source_poly = source.face_points(s);
        let area: f64 = geometry::clip_polygons(&source_poly, &target_poly)
            .iter()
            .map(|piece| geometry::signed_area(piece).abs())
            .sum();
        if area > 0.0 {
            *measures.entry(s).or_insert(0.0) += area;
        }
    }
}

fn network_over_polygon(
    source: &NetworkGrid,
    target: &PolygonGrid,
    t: usize,
    candidates: &[usize],
    measures: &mut BTreeMap<usize, f64>,
) {
    let target_poly = target.face_points(t);
    for &s in candidates {
        let (p0, p1) = source.edge_endpoints(s);
        let length: f64 = geometry::clip_segment_to_polygon(&p0, &p1, &target_poly)
            .iter()
            .map(|(a, b)| geometry::distance(a, b))
            .sum();
        if length > 0.0 {
            *measures.entry(s).or_insert(0.0) += length;
        }
    }
}

fn network_over_network(
    source: &NetworkGrid,
    target: &NetworkGrid,
    t: usize,
    candidates: &[usize],
    measures: &mut BTreeMap<usize, f64>,
) {
    let (q0, q1) = target.edge_endpoints(t);
    for &s in candidates {
        let (p0, p1) = source.edge_endpoints(s);
        let length = geometry::collinear_overlap_length(&p0, &p1, &q0, &q1);
        if length > 0.0 {
            *measures.entry(s).or_insert(0.0) += length;
        }
    }
}

fn points_over_polygon(
    source: &PointGrid,
    target: &PolygonGrid,
    t: usize,
    candidates: &[usize],
    measures: &mut BTreeMap<usize, f64>,
) {
    let target_poly = target.face_points(t);
    for &s in candidates {
        if geometry::point_in_polygon(&source.points[s], &target_poly) {
            measures.insert(s, 1.0);
        }
    }
}

fn points_over_network(
    source: &PointGrid,
    target: &NetworkGrid,
    t: usize,
    candidates: &[usize],
    measures: &mut BTreeMap<usize, f64>,
) {
    let (a, b) = target.edge_endpoints(t);
    for &s in candidates {
        if geometry::point_segment_distance(&source.points[s], &a, &b) <= GEOM_TOL {
            measures.insert(s, 1.0);
        }
    }
}

fn points_over_points(
    source: &PointGrid,
    target: &PointGrid,
    t: usize,
    candidates: &[usize],
    measures: &mut BTreeMap<usize, f64>,
) {
    let q = target.points[t];
    for &s in candidates {
        if geometry::distance(&source.points[s], &q) <= GEOM_TOL {
            measures.insert(s, 1.0);
        }
    }
}
