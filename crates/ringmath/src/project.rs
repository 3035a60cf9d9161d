//! Point-to-boundary projection in planar degree space.
//!
//! All comparisons use squared distances; nothing here takes a square root
//! except the caller, if it needs one.

use geo::Coord;

/// Squared Euclidean distance in degree space.
#[inline]
pub fn dist_sq(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// Foot of the perpendicular from `p` onto segment `ab`, clamped to the
/// segment endpoints.
pub fn project_to_segment(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Coord {
        x: a.x + t * dx,
        y: a.y + t * dy,
    }
}

/// Nearest point on a ring or polyline to a query point.
#[derive(Debug, Clone, Copy)]
pub struct RingProjection {
    /// Foot of the perpendicular, clamped to the nearest edge.
    pub point: Coord<f64>,
    /// Squared degree distance from the query to `point`.
    pub dist_sq: f64,
    /// Index of the nearest edge; edge `i` runs from vertex `i` to `i + 1`
    /// (modulo the open count, for rings).
    pub edge: usize,
}

/// Nearest point on the closed boundary formed by the first `open` vertices
/// of `ring`; the wrap edge back to vertex 0 counts. `None` when `open < 2`.
pub fn nearest_point_on_ring(
    p: Coord<f64>,
    ring: &[Coord<f64>],
    open: usize,
) -> Option<RingProjection> {
    if open < 2 || ring.len() < open {
        return None;
    }
    let mut best: Option<RingProjection> = None;
    for i in 0..open {
        let foot = project_to_segment(p, ring[i], ring[(i + 1) % open]);
        let d = dist_sq(p, foot);
        if best.map_or(true, |b| d < b.dist_sq) {
            best = Some(RingProjection {
                point: foot,
                dist_sq: d,
                edge: i,
            });
        }
    }
    best
}

/// Same as [`nearest_point_on_ring`] but over an open polyline: no wrap edge.
/// A single-vertex polyline projects onto that vertex.
pub fn nearest_point_on_polyline(p: Coord<f64>, pts: &[Coord<f64>]) -> Option<RingProjection> {
    match pts.len() {
        0 => None,
        1 => Some(RingProjection {
            point: pts[0],
            dist_sq: dist_sq(p, pts[0]),
            edge: 0,
        }),
        _ => {
            let mut best: Option<RingProjection> = None;
            for i in 0..pts.len() - 1 {
                let foot = project_to_segment(p, pts[i], pts[i + 1]);
                let d = dist_sq(p, foot);
                if best.map_or(true, |b| d < b.dist_sq) {
                    best = Some(RingProjection {
                        point: foot,
                        dist_sq: d,
                        edge: i,
                    });
                }
            }
            best
        }
    }
}

/// Squared distance from `p` to the nearest edge of the ring, with the index
/// of that edge.
pub fn point_to_ring_dist_sq(
    p: Coord<f64>,
    ring: &[Coord<f64>],
    open: usize,
) -> Option<(f64, usize)> {
    nearest_point_on_ring(p, ring, open).map(|r| (r.dist_sq, r.edge))
}

/// Index of the ring vertex closest to `p`, over the first `open` vertices.
pub fn nearest_vertex_index(p: Coord<f64>, ring: &[Coord<f64>], open: usize) -> Option<usize> {
    (0..open.min(ring.len())).min_by(|&i, &j| dist_sq(p, ring[i]).total_cmp(&dist_sq(p, ring[j])))
}
