//! MultiPolygon helpers shared by the analyser and synchroniser.

use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{BooleanOps, ChamberlainDuquetteArea, LineString, MultiPolygon, Polygon};

/// Spherical unsigned area in square metres.
pub fn area_sqm(geom: &MultiPolygon<f64>) -> f64 {
    geom.0
        .iter()
        .map(|p| p.chamberlain_duquette_unsigned_area())
        .sum()
}

/// Intersection of two geometries, or `None` when the overlay fails.
/// The boolean overlay can still panic on degenerate input; a failed op must
/// cost one contribution, not the whole analysis.
pub fn guarded_intersection(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Option<MultiPolygon<f64>> {
    match catch_unwind(AssertUnwindSafe(|| a.intersection(b))) {
        Ok(out) => Some(out),
        Err(_) => {
            log::warn!("boolean intersection failed, skipping contribution");
            None
        }
    }
}

/// Difference `a - b`, or `None` when the overlay fails.
pub fn guarded_difference(
    a: &MultiPolygon<f64>,
    b: &MultiPolygon<f64>,
) -> Option<MultiPolygon<f64>> {
    match catch_unwind(AssertUnwindSafe(|| a.difference(b))) {
        Ok(out) => Some(out),
        Err(_) => {
            log::warn!("boolean difference failed, skipping contribution");
            None
        }
    }
}

/// Iterate every ring of the geometry with its (polygon, ring) indices.
/// Ring 0 is the exterior; 1.. are holes.
pub fn rings_of(
    geom: &MultiPolygon<f64>,
) -> impl Iterator<Item = (usize, usize, &LineString<f64>)> {
    geom.0.iter().enumerate().flat_map(|(pi, poly)| {
        std::iter::once((pi, 0, poly.exterior())).chain(
            poly.interiors()
                .iter()
                .enumerate()
                .map(move |(ri, ls)| (pi, ri + 1, ls)),
        )
    })
}

/// The ring at (polygon, ring), if it exists.
pub fn ring_at(geom: &MultiPolygon<f64>, poly: usize, ring: usize) -> Option<&LineString<f64>> {
    let p = geom.0.get(poly)?;
    if ring == 0 {
        Some(p.exterior())
    } else {
        p.interiors().get(ring - 1)
    }
}

/// Copy of `geom` with the ring at (polygon, ring) replaced.
/// Returns the input unchanged when the indices do not resolve.
pub fn with_ring_replaced(
    geom: &MultiPolygon<f64>,
    poly: usize,
    ring: usize,
    new_ring: LineString<f64>,
) -> MultiPolygon<f64> {
    let mut out = geom.clone();
    if let Some(p) = out.0.get_mut(poly) {
        let mut exterior = p.exterior().clone();
        let mut interiors = p.interiors().to_vec();
        if ring == 0 {
            exterior = new_ring;
        } else if let Some(slot) = interiors.get_mut(ring - 1) {
            *slot = new_ring;
        } else {
            return out;
        }
        *p = Polygon::new(exterior, interiors);
    }
    out
}

/// Total open-form vertex count across every ring.
pub fn open_vertex_count(geom: &MultiPolygon<f64>) -> usize {
    rings_of(geom).map(|(_, _, ls)| ringmath::open_len(&ls.0)).sum()
}
