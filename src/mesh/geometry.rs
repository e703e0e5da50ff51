//! Geometric primitives for mesh cells
//!
//! Pure, side-effect-free numerical routines. Every containment or
//! coincidence decision goes through the same absolute tolerance
//! [`GEOM_TOL`], so shared boundaries classify consistently across callers.
//! Near-degenerate results (measures below the tolerance) are returned as-is
//! and dropped by callers, never raised as errors.

use crate::mesh::types::{Point, Vec2};

/// Absolute tolerance for geometric classification
pub const GEOM_TOL: f64 = 1e-10;

/// Result of intersecting two line segments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentIntersection {
    /// Segments do not meet
    Disjoint,
    /// Segments cross or touch in a single point
    Point(Point),
    /// Segments are collinear and share a positive-length interval
    Overlap(Point, Point),
}

/// Signed area of a polygon via the shoelace formula
///
/// Positive for counter-clockwise vertex order, negative for clockwise.
pub fn signed_area(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let p = polygon[i];
        let q = polygon[(i + 1) % n];
        twice_area += p.x * q.y - q.x * p.y;
    }
    0.5 * twice_area
}

/// Area-weighted centroid of a polygon
///
/// Falls back to the vertex mean when the polygon is near-degenerate, so a
/// sliver still yields a representative location.
pub fn polygon_centroid(polygon: &[Point]) -> Point {
    let n = polygon.len();
    let area = signed_area(polygon);
    if area.abs() < GEOM_TOL {
        let sum = polygon
            .iter()
            .fold(Vec2::zeros(), |acc, p| acc + p.coords);
        return Point::from(sum / n as f64);
    }
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let p = polygon[i];
        let q = polygon[(i + 1) % n];
        let w = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * w;
        cy += (p.y + q.y) * w;
    }
    let scale = 1.0 / (6.0 * area);
    Point::new(cx * scale, cy * scale)
}

/// Total length of an open polyline
pub fn polyline_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1] - w[0]).norm())
        .sum()
}

/// Distance between two points
pub fn distance(p1: &Point, p2: &Point) -> f64 {
    (p2 - p1).norm()
}

/// Distance from a point to a segment
pub fn point_segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 < GEOM_TOL * GEOM_TOL {
        return distance(p, a);
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    let proj = a + ab * t;
    distance(p, &proj)
}

/// Twice the signed area of triangle (o, a, b)
///
/// Positive when b lies left of the directed line o -> a.
fn cross2(o: &Point, a: &Point, b: &Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// Point-in-polygon test with the boundary counting as inside
///
/// Points within [`GEOM_TOL`] of any polygon edge are classified as
/// contained, so a query on a shared edge is "inside" both neighbors;
/// callers break such ties deterministically.
pub fn point_in_polygon(p: &Point, polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    // Boundary proximity first, so edge/vertex queries never depend on the
    // parity test's handling of grazing rays.
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        if point_segment_distance(p, &a, &b) <= GEOM_TOL {
            return true;
        }
    }

    // Even-odd ray crossing
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > p.y) != (pj.y > p.y) {
            let x_cross = pj.x + (p.y - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Intersect two segments, handling parallel and collinear configurations
pub fn segment_intersection(
    a0: &Point,
    a1: &Point,
    b0: &Point,
    b1: &Point,
) -> SegmentIntersection {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let r = b0 - a0;
    let denom = d1.x * d2.y - d1.y * d2.x;

    let len1 = d1.norm();
    let len2 = d2.norm();
    let t_tol = GEOM_TOL / len1.max(GEOM_TOL);
    let u_tol = GEOM_TOL / len2.max(GEOM_TOL);

    if denom.abs() > GEOM_TOL * len1.max(1.0) * len2.max(1.0) {
        // Proper (non-parallel) configuration
        let t = (r.x * d2.y - r.y * d2.x) / denom;
        let u = (r.x * d1.y - r.y * d1.x) / denom;
        if t >= -t_tol && t <= 1.0 + t_tol && u >= -u_tol && u <= 1.0 + u_tol {
            let t = t.clamp(0.0, 1.0);
            return SegmentIntersection::Point(a0 + d1 * t);
        }
        return SegmentIntersection::Disjoint;
    }

    // Parallel: collinear only if b0 sits on the carrier line of a
    if (d1.x * r.y - d1.y * r.x).abs() > GEOM_TOL * len1.max(1.0) {
        return SegmentIntersection::Disjoint;
    }

    let len1_sq = d1.norm_squared();
    if len1_sq < GEOM_TOL * GEOM_TOL {
        // Segment a is a point
        if point_segment_distance(a0, b0, b1) <= GEOM_TOL {
            return SegmentIntersection::Point(*a0);
        }
        return SegmentIntersection::Disjoint;
    }

    let t0 = (b0 - a0).dot(&d1) / len1_sq;
    let t1 = (b1 - a0).dot(&d1) / len1_sq;
    let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
    let start = lo.max(0.0);
    let end = hi.min(1.0);

    if end - start > t_tol {
        SegmentIntersection::Overlap(a0 + d1 * start, a0 + d1 * end)
    } else if end >= start - t_tol && end >= -t_tol && start <= 1.0 + t_tol {
        let t = (0.5 * (start + end)).clamp(0.0, 1.0);
        SegmentIntersection::Point(a0 + d1 * t)
    } else {
        SegmentIntersection::Disjoint
    }
}

/// Shared length of two collinear segments
///
/// Zero when the segments are not collinear or merely touch in a point.
pub fn collinear_overlap_length(a0: &Point, a1: &Point, b0: &Point, b1: &Point) -> f64 {
    match segment_intersection(a0, a1, b0, b1) {
        SegmentIntersection::Overlap(p, q) => distance(&p, &q),
        _ => 0.0,
    }
}

/// Sub-segments of p0 -> p1 lying inside a polygon
///
/// Splits the segment at every polygon-edge crossing and keeps the intervals
/// whose midpoints are contained. Adjacent kept intervals are merged, so the
/// result holds maximal disjoint sub-segments.
pub fn clip_segment_to_polygon(
    p0: &Point,
    p1: &Point,
    polygon: &[Point],
) -> Vec<(Point, Point)> {
    let dir = p1 - p0;
    let len = dir.norm();
    if len <= GEOM_TOL || polygon.len() < 3 {
        return Vec::new();
    }
    let len_sq = len * len;
    let t_tol = GEOM_TOL / len;

    let mut ts = vec![0.0, 1.0];
    let n = polygon.len();
    for i in 0..n {
        let e0 = polygon[i];
        let e1 = polygon[(i + 1) % n];
        match segment_intersection(p0, p1, &e0, &e1) {
            SegmentIntersection::Point(p) => {
                ts.push(((p - p0).dot(&dir) / len_sq).clamp(0.0, 1.0));
            }
            SegmentIntersection::Overlap(q0, q1) => {
                ts.push(((q0 - p0).dot(&dir) / len_sq).clamp(0.0, 1.0));
                ts.push(((q1 - p0).dot(&dir) / len_sq).clamp(0.0, 1.0));
            }
            SegmentIntersection::Disjoint => {}
        }
    }

    ts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    ts.dedup_by(|a, b| (*a - *b).abs() <= t_tol);

    let mut result: Vec<(Point, Point)> = Vec::new();
    let mut run: Option<(f64, f64)> = None;
    for w in ts.windows(2) {
        let (ta, tb) = (w[0], w[1]);
        let mid = p0 + dir * (0.5 * (ta + tb));
        if point_in_polygon(&mid, polygon) {
            run = match run {
                Some((start, _)) => Some((start, tb)),
                None => Some((ta, tb)),
            };
        } else if let Some((start, end)) = run.take() {
            if (end - start) * len > GEOM_TOL {
                result.push((p0 + dir * start, p0 + dir * end));
            }
        }
    }
    if let Some((start, end)) = run {
        if (end - start) * len > GEOM_TOL {
            result.push((p0 + dir * start, p0 + dir * end));
        }
    }
    result
}

/// Intersection of two simple polygons
///
/// General clip: neither polygon needs to be convex. A convex clip polygon is
/// applied directly; a concave one is decomposed into triangles first and the
/// subject is clipped against each, so the result may be several fragments
/// whose areas sum to the exact intersection area. Fragments below the
/// degeneracy tolerance are dropped.
pub fn clip_polygons(subject: &[Point], clip: &[Point]) -> Vec<Vec<Point>> {
    if subject.len() < 3 || clip.len() < 3 {
        return Vec::new();
    }

    let subject = oriented_ccw(subject);
    let clip = oriented_ccw(clip);

    let mut pieces = Vec::new();
    if is_convex(&clip) {
        push_piece(&mut pieces, clip_convex(&subject, &clip));
    } else {
        for tri in triangulate(&clip) {
            push_piece(&mut pieces, clip_convex(&subject, &tri));
        }
    }
    pieces
}

/// Copy of a polygon with counter-clockwise vertex order
fn oriented_ccw(polygon: &[Point]) -> Vec<Point> {
    if signed_area(polygon) < 0.0 {
        polygon.iter().rev().copied().collect()
    } else {
        polygon.to_vec()
    }
}

/// True when a counter-clockwise polygon has no reflex vertex
fn is_convex(polygon: &[Point]) -> bool {
    let n = polygon.len();
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let c = polygon[(i + 2) % n];
        if cross2(&a, &b, &c) < -GEOM_TOL {
            return false;
        }
    }
    true
}

/// Retain a clip fragment if it carries measurable area
fn push_piece(pieces: &mut Vec<Vec<Point>>, piece: Vec<Point>) {
    let piece = dedup_vertices(piece);
    if piece.len() >= 3 && signed_area(&piece).abs() > GEOM_TOL {
        pieces.push(piece);
    }
}

/// Drop consecutive vertices that coincide within tolerance
fn dedup_vertices(mut polygon: Vec<Point>) -> Vec<Point> {
    polygon.dedup_by(|a, b| distance(a, b) <= GEOM_TOL);
    while polygon.len() > 1 {
        let first = polygon[0];
        let last = polygon[polygon.len() - 1];
        if distance(&first, &last) <= GEOM_TOL {
            polygon.pop();
        } else {
            break;
        }
    }
    polygon
}

/// Sutherland-Hodgman clip of an arbitrary subject against a convex,
/// counter-clockwise clipper
fn clip_convex(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    let mut output = subject.to_vec();
    let n = clip.len();
    for i in 0..n {
        if output.is_empty() {
            break;
        }
        let e0 = clip[i];
        let e1 = clip[(i + 1) % n];
        output = clip_against_halfplane(&output, &e0, &e1);
    }
    output
}

/// Keep the part of a polygon left of the directed edge e0 -> e1
fn clip_against_halfplane(polygon: &[Point], e0: &Point, e1: &Point) -> Vec<Point> {
    let n = polygon.len();
    let mut output = Vec::with_capacity(n + 4);
    for i in 0..n {
        let cur = polygon[i];
        let prev = polygon[(i + n - 1) % n];
        let cur_in = cross2(e0, e1, &cur) >= -GEOM_TOL;
        let prev_in = cross2(e0, e1, &prev) >= -GEOM_TOL;

        if cur_in {
            if !prev_in {
                if let Some(p) = line_crossing(&prev, &cur, e0, e1) {
                    output.push(p);
                }
            }
            output.push(cur);
        } else if prev_in {
            if let Some(p) = line_crossing(&prev, &cur, e0, e1) {
                output.push(p);
            }
        }
    }
    output
}

/// Intersection of segment a0 -> a1 with the infinite carrier line of
/// e0 -> e1
fn line_crossing(a0: &Point, a1: &Point, e0: &Point, e1: &Point) -> Option<Point> {
    let d = a1 - a0;
    let e = e1 - e0;
    let denom = d.x * e.y - d.y * e.x;
    if denom.abs() <= GEOM_TOL * GEOM_TOL {
        return None;
    }
    let r = e0 - a0;
    let t = (r.x * e.y - r.y * e.x) / denom;
    Some(a0 + d * t)
}

/// Ear-clipping triangulation of a simple counter-clockwise polygon
fn triangulate(polygon: &[Point]) -> Vec<Vec<Point>> {
    let mut idx: Vec<usize> = (0..polygon.len()).collect();
    let mut triangles = Vec::with_capacity(polygon.len().saturating_sub(2));

    while idx.len() > 3 {
        let n = idx.len();
        let mut clipped = false;
        for k in 0..n {
            let ia = idx[(k + n - 1) % n];
            let ib = idx[k];
            let ic = idx[(k + 1) % n];
            let (a, b, c) = (polygon[ia], polygon[ib], polygon[ic]);
            if cross2(&a, &b, &c) <= GEOM_TOL {
                // reflex or collinear corner
                continue;
            }
            let blocked = idx.iter().any(|&other| {
                other != ia
                    && other != ib
                    && other != ic
                    && point_in_triangle(&polygon[other], &a, &b, &c)
            });
            if !blocked {
                triangles.push(vec![a, b, c]);
                idx.remove(k);
                clipped = true;
                break;
            }
        }
        if !clipped {
            // Numerically stuck (e.g. collinear runs): fan out the remainder
            // so the decomposition still covers the polygon.
            log::debug!("ear clipping stalled with {} vertices, fanning", idx.len());
            for k in 1..idx.len() - 1 {
                triangles.push(vec![
                    polygon[idx[0]],
                    polygon[idx[k]],
                    polygon[idx[k + 1]],
                ]);
            }
            return triangles;
        }
    }
    if idx.len() == 3 {
        triangles.push(vec![polygon[idx[0]], polygon[idx[1]], polygon[idx[2]]]);
    }
    triangles
}

/// Strict interior test used by the ear check
fn point_in_triangle(p: &Point, a: &Point, b: &Point, c: &Point) -> bool {
    cross2(a, b, p) > GEOM_TOL && cross2(b, c, p) > GEOM_TOL && cross2(c, a, p) > GEOM_TOL
}
