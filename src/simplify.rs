//! Ramer-Douglas-Peucker simplification over multi-ring geometries.
//!
//! Tolerances are degree-space distances. Low-quality mode runs a
//! radial-distance prefilter before RDP and is meant for slider previews;
//! high quality runs RDP on the full ring.

use geo::{Coord, Distance, Haversine, LineString, MultiPolygon, Point, Polygon};
use serde::Serialize;

use crate::geomops;
use crate::tuning::{
    DEVIATION_SAMPLE_LIMIT, TOLERANCE_SEARCH_MAX_DEG, TOLERANCE_SEARCH_MAX_ITERS,
    TOLERANCE_SEARCH_MIN_DEG, TOLERANCE_SEARCH_SLACK,
};
use ringmath::{dist_sq, nearest_point_on_ring, open_len, project_to_segment};

/// Simplify every ring of the geometry with a degree-space tolerance.
///
/// A ring that would drop below 3 open vertices is returned unchanged, and a
/// non-positive tolerance returns the input as is.
pub fn simplify(
    geom: &MultiPolygon<f64>,
    tolerance_deg: f64,
    high_quality: bool,
) -> MultiPolygon<f64> {
    if tolerance_deg <= 0.0 {
        return geom.clone();
    }
    MultiPolygon(
        geom.0
            .iter()
            .map(|poly| {
                Polygon::new(
                    simplify_ring(poly.exterior(), tolerance_deg, high_quality),
                    poly.interiors()
                        .iter()
                        .map(|ls| simplify_ring(ls, tolerance_deg, high_quality))
                        .collect(),
                )
            })
            .collect(),
    )
}

fn simplify_ring(ring: &LineString<f64>, tolerance_deg: f64, high_quality: bool) -> LineString<f64> {
    let closed = ringmath::ensure_closed(&ring.0);
    if open_len(&closed) < 3 {
        return ring.clone();
    }
    let pts = if high_quality {
        closed
    } else {
        radial_prefilter(&closed, tolerance_deg)
    };
    let out = rdp(&pts, tolerance_deg);
    if open_len(&out) < 3 {
        ring.clone()
    } else {
        LineString(out)
    }
}

/// Drop consecutive vertices within the tolerance of the last kept vertex.
/// First and last vertex always survive.
fn radial_prefilter(pts: &[Coord<f64>], tolerance_deg: f64) -> Vec<Coord<f64>> {
    let tol_sq = tolerance_deg * tolerance_deg;
    let mut out = vec![pts[0]];
    for &p in &pts[1..pts.len() - 1] {
        if dist_sq(p, out[out.len() - 1]) > tol_sq {
            out.push(p);
        }
    }
    out.push(pts[pts.len() - 1]);
    out
}

fn rdp(pts: &[Coord<f64>], tolerance_deg: f64) -> Vec<Coord<f64>> {
    if pts.len() < 3 {
        return pts.to_vec();
    }
    let tol_sq = tolerance_deg * tolerance_deg;
    let first = pts[0];
    let last = pts[pts.len() - 1];

    let mut index = 0;
    let mut dmax = 0.0;
    for (i, &p) in pts.iter().enumerate().take(pts.len() - 1).skip(1) {
        let d = dist_sq(p, project_to_segment(p, first, last));
        if d > dmax {
            index = i;
            dmax = d;
        }
    }

    if dmax > tol_sq {
        let mut left = rdp(&pts[..=index], tolerance_deg);
        left.pop();
        left.extend(rdp(&pts[index..], tolerance_deg));
        left
    } else {
        vec![first, last]
    }
}

/// Before/after numbers for one simplification, for the host's preview UI.
#[derive(Debug, Clone, Serialize)]
pub struct SimplifyStats {
    pub original_vertex_count: usize,
    pub simplified_vertex_count: usize,
    pub reduction_percent: f64,
    pub max_deviation_m: f64,
    pub area_change_percent: f64,
}

/// Compare a geometry with its simplified form. Vertex counts are open-form
/// sums over all rings. The deviation metric is the expensive part and is
/// only computed when `include_deviation` is set.
pub fn compute_stats(
    original: &MultiPolygon<f64>,
    simplified: &MultiPolygon<f64>,
    include_deviation: bool,
) -> SimplifyStats {
    let original_vertex_count = geomops::open_vertex_count(original);
    let simplified_vertex_count = geomops::open_vertex_count(simplified);
    let reduction_percent = if original_vertex_count > 0 {
        (1.0 - simplified_vertex_count as f64 / original_vertex_count as f64) * 100.0
    } else {
        0.0
    };

    let old_area = geomops::area_sqm(original);
    let new_area = geomops::area_sqm(simplified);
    let area_change_percent = if old_area > 0.0 {
        (new_area - old_area) / old_area * 100.0
    } else {
        0.0
    };

    let max_deviation_m = if include_deviation {
        max_deviation_m(original, simplified)
    } else {
        0.0
    };

    SimplifyStats {
        original_vertex_count,
        simplified_vertex_count,
        reduction_percent,
        max_deviation_m,
        area_change_percent,
    }
}

/// Max metre distance from sampled original vertices to the nearest edge of
/// the corresponding simplified ring. At most `DEVIATION_SAMPLE_LIMIT`
/// vertices are sampled, evenly strided.
fn max_deviation_m(original: &MultiPolygon<f64>, simplified: &MultiPolygon<f64>) -> f64 {
    let total = geomops::open_vertex_count(original);
    let stride = (total / DEVIATION_SAMPLE_LIMIT).max(1);

    let mut max_m: f64 = 0.0;
    for (pi, ri, ls) in geomops::rings_of(original) {
        let Some(simp) = geomops::ring_at(simplified, pi, ri) else {
            continue;
        };
        let open = open_len(&simp.0);
        if open < 2 {
            continue;
        }
        for (i, &v) in ringmath::open_ring(&ls.0).iter().enumerate() {
            if i % stride != 0 {
                continue;
            }
            if let Some(hit) = nearest_point_on_ring(v, &simp.0, open) {
                max_m = max_m.max(Haversine.distance(Point::from(v), Point::from(hit.point)));
            }
        }
    }
    max_m
}

/// Find a tolerance that simplifies `geom` to roughly `target_vertices`:
/// geometric-midpoint bisection on a log scale, early exit when within
/// ±10% of the target.
pub fn find_tolerance_for_target(
    geom: &MultiPolygon<f64>,
    target_vertices: usize,
    high_quality: bool,
) -> f64 {
    let target = target_vertices.max(3) as f64;
    let mut lo = TOLERANCE_SEARCH_MIN_DEG;
    let mut hi = TOLERANCE_SEARCH_MAX_DEG;
    let mut mid = (lo * hi).sqrt();

    for _ in 0..TOLERANCE_SEARCH_MAX_ITERS {
        mid = (lo * hi).sqrt();
        let count = geomops::open_vertex_count(&simplify(geom, mid, high_quality)) as f64;
        if (count - target).abs() <= target * TOLERANCE_SEARCH_SLACK {
            break;
        }
        if count > target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    mid
}
