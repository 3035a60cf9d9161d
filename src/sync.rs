//! Boundary synchronisation.
//!
//! Produces a neighbour ring that matches an edited boundary. Displacement
//! is preferred: it is vertex-count-insensitive, leaves off-boundary
//! vertices untouched and avoids straight-line artefacts. Projection is the
//! fallback when only the edited polyline is known. Splicing is a legacy
//! exact-insertion path that destroys the neighbour's vertex density and is
//! never used by the default proposal flow.

use geo::{Coord, Distance, Haversine, LineString, MultiPolygon, Point, Polygon, Rect};

use crate::adjacency::SharedBoundary;
use crate::analysis::PostEditAnalysis;
use crate::geomops;
use crate::tuning::{
    BBOX_PAD_DEG, COORD_JITTER_DEG_SQ, MAX_DISPLACEMENT_DEG_SQ, POOR_JOIN_ANGLE_DEG,
    POOR_JOIN_DISTANCE_M, SHARED_EDGE_TOL_DEG_SQ,
};
use crate::types::{PatchId, PatchSet, Relationship, SnapQuality};
use ringmath::{
    bbox, cyclic_len, ensure_closed, extract_segment, mod_index, nearest_point_on_polyline,
    nearest_point_on_ring, open_ring,
};

/// The two ring vertices where a proposed segment meets the unedited rest.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionPoints {
    pub start: Coord<f64>,
    pub end: Coord<f64>,
}

/// A synchronised boundary for one neighbour, offered to the user.
#[derive(Debug, Clone)]
pub struct BoundaryProposal {
    pub patch_id: PatchId,
    pub code: String,
    pub relationship: Relationship,
    pub adjacency: SharedBoundary,
    pub original_geometry: MultiPolygon<f64>,
    pub proposed_geometry: MultiPolygon<f64>,
    /// The neighbour's shared span before the sync.
    pub original_segment: Vec<Coord<f64>>,
    /// The same span after the sync.
    pub proposed_segment: Vec<Coord<f64>>,
    /// Edited-ring polyline the span was synchronised against.
    pub changed_segment: Vec<Coord<f64>>,
    pub connection_points: ConnectionPoints,
    pub snap_quality: SnapQuality,
}

/// Move every neighbour vertex that lies on the old edited ring by the
/// vector between its projections onto the old and new rings. Returns the
/// updated geometry and how many vertices moved; zero means the caller
/// should fall back to projection.
pub fn sync_by_displacement(
    neighbour: &MultiPolygon<f64>,
    old_ring: &LineString<f64>,
    new_ring: &LineString<f64>,
) -> (MultiPolygon<f64>, usize) {
    let old_open = open_ring(&old_ring.0);
    let new_open = open_ring(&new_ring.0);
    if old_open.len() < 3 || new_open.len() < 3 {
        return (neighbour.clone(), 0);
    }
    let Some(old_bbox) = bbox(old_open) else {
        return (neighbour.clone(), 0);
    };

    let mut displaced = 0usize;
    let moved = MultiPolygon(
        neighbour
            .0
            .iter()
            .map(|poly| {
                Polygon::new(
                    displace_ring(poly.exterior(), old_open, new_open, &old_bbox, &mut displaced),
                    poly.interiors()
                        .iter()
                        .map(|ls| {
                            displace_ring(ls, old_open, new_open, &old_bbox, &mut displaced)
                        })
                        .collect(),
                )
            })
            .collect(),
    );
    (moved, displaced)
}

fn displace_ring(
    ring: &LineString<f64>,
    old_open: &[Coord<f64>],
    new_open: &[Coord<f64>],
    old_bbox: &Rect<f64>,
    displaced: &mut usize,
) -> LineString<f64> {
    let mut out = open_ring(&ring.0).to_vec();
    for v in &mut out {
        // Vertices outside the old ring's padded bbox cannot be shared.
        if v.x < old_bbox.min().x - BBOX_PAD_DEG
            || v.x > old_bbox.max().x + BBOX_PAD_DEG
            || v.y < old_bbox.min().y - BBOX_PAD_DEG
            || v.y > old_bbox.max().y + BBOX_PAD_DEG
        {
            continue;
        }
        let Some(p_old) = nearest_point_on_ring(*v, old_open, old_open.len()) else {
            continue;
        };
        if p_old.dist_sq > SHARED_EDGE_TOL_DEG_SQ {
            continue;
        }
        let Some(p_new) = nearest_point_on_ring(p_old.point, new_open, new_open.len()) else {
            continue;
        };
        let dx = p_new.point.x - p_old.point.x;
        let dy = p_new.point.y - p_old.point.y;
        let mag_sq = dx * dx + dy * dy;
        // A displacement this large is clearly wrong; one this small is noise.
        if mag_sq > MAX_DISPLACEMENT_DEG_SQ || mag_sq < COORD_JITTER_DEG_SQ {
            continue;
        }
        v.x += dx;
        v.y += dy;
        *displaced += 1;
    }
    LineString(ensure_closed(&out))
}

/// Project every vertex of the cyclic span `start..=end` onto the target
/// polyline (reversed first when the windings disagree). The neighbour's
/// vertex count is preserved exactly.
pub fn sync_by_projection(
    ring: &LineString<f64>,
    start: usize,
    end: usize,
    target: &[Coord<f64>],
    reversed: bool,
) -> LineString<f64> {
    let mut open = open_ring(&ring.0).to_vec();
    let n = open.len();
    if n < 3 || target.is_empty() {
        return ring.clone();
    }
    let oriented: Vec<Coord<f64>> = if reversed {
        target.iter().rev().copied().collect()
    } else {
        target.to_vec()
    };

    let count = cyclic_len(start % n, end % n, n);
    for k in 0..count {
        let i = (start + k) % n;
        if let Some(hit) = nearest_point_on_polyline(open[i], &oriented) {
            open[i] = hit.point;
        }
    }
    LineString(ensure_closed(&open))
}

/// Replace the cyclic span `start..=end` with the replacement polyline
/// (reversed when the windings disagree), then re-close. Returns the input
/// unchanged when the result would drop below 3 open vertices.
pub fn splice_ring(
    ring: &LineString<f64>,
    start: usize,
    end: usize,
    replacement: &[Coord<f64>],
    reversed: bool,
) -> LineString<f64> {
    let open = open_ring(&ring.0);
    let n = open.len();
    if n == 0 {
        return ring.clone();
    }
    let count = cyclic_len(start % n, end % n, n);
    let kept = n - count;
    if kept + replacement.len() < 3 {
        return ring.clone();
    }

    let mut out: Vec<Coord<f64>> = Vec::with_capacity(kept + replacement.len());
    if reversed {
        out.extend(replacement.iter().rev());
    } else {
        out.extend_from_slice(replacement);
    }
    for k in 1..=kept {
        out.push(open[(end + k) % n]);
    }
    LineString(ensure_closed(&out))
}

/// Judge how a synchronised span joins the unedited remainder, at both span
/// endpoints: the interior angle at the boundary vertex, and the metre
/// distance to its unedited-side neighbour vertex.
pub fn assess_connection(ring: &LineString<f64>, start: usize, end: usize) -> SnapQuality {
    let open = open_ring(&ring.0);
    let n = open.len();
    if n < 3 {
        return SnapQuality::Poor;
    }
    let start = start % n;
    let end = end % n;
    let joins = [
        (
            open[mod_index(start as isize - 1, n)],
            open[start],
            open[mod_index(start as isize + 1, n)],
        ),
        (
            open[mod_index(end as isize + 1, n)],
            open[end],
            open[mod_index(end as isize - 1, n)],
        ),
    ];
    for (outside, vertex, inside) in joins {
        let angle = interior_angle_deg(outside, vertex, inside);
        let join_m = Haversine.distance(Point::from(outside), Point::from(vertex));
        if angle < POOR_JOIN_ANGLE_DEG || join_m > POOR_JOIN_DISTANCE_M {
            return SnapQuality::Poor;
        }
    }
    SnapQuality::Good
}

fn interior_angle_deg(a: Coord<f64>, v: Coord<f64>, b: Coord<f64>) -> f64 {
    let (ux, uy) = (a.x - v.x, a.y - v.y);
    let (wx, wy) = (b.x - v.x, b.y - v.y);
    let nu = (ux * ux + uy * uy).sqrt();
    let nw = (wx * wx + wy * wy).sqrt();
    if nu == 0.0 || nw == 0.0 {
        return 180.0;
    }
    let cos = ((ux * wx + uy * wy) / (nu * nw)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// One proposal per non-duplicate neighbour in the analysis: displacement
/// when the old edited geometry was captured, projection otherwise or when
/// displacement moved nothing.
pub fn generate_boundary_proposals(
    analysis: &PostEditAnalysis,
    edited_geom: &MultiPolygon<f64>,
    patches: &PatchSet,
    old_edited_geom: Option<&MultiPolygon<f64>>,
) -> Vec<BoundaryProposal> {
    let mut out = Vec::new();

    for info in &analysis.neighbours {
        if info.is_duplicate {
            continue;
        }
        let adj = &info.adjacency;
        let Some(neighbour) = patches.get(&adj.patch_id) else {
            continue;
        };
        let Some(nb_ring) = geomops::ring_at(&neighbour.geometry, adj.poly, adj.ring) else {
            continue;
        };
        let nb_open = open_ring(&nb_ring.0);
        if nb_open.len() < 3 {
            continue;
        }
        let Some(new_ring) = geomops::ring_at(edited_geom, adj.edited_poly, adj.edited_ring)
        else {
            continue;
        };
        let new_open = open_ring(&new_ring.0);
        if new_open.len() < 3 {
            continue;
        }

        let original_segment = extract_segment(nb_open, adj.start, adj.end);
        let changed_segment = extract_segment(new_open, adj.edited_start, adj.edited_end);

        let mut proposed_geometry: Option<MultiPolygon<f64>> = None;
        if let Some(old_geom) = old_edited_geom {
            if let Some(old_ring) = geomops::ring_at(old_geom, adj.edited_poly, adj.edited_ring) {
                let (moved, displaced) =
                    sync_by_displacement(&neighbour.geometry, old_ring, new_ring);
                if displaced > 0 {
                    proposed_geometry = Some(moved);
                } else {
                    log::debug!(
                        "displacement moved nothing for {}, falling back to projection",
                        adj.patch_id
                    );
                }
            }
        }
        let proposed_geometry = proposed_geometry.unwrap_or_else(|| {
            let updated =
                sync_by_projection(nb_ring, adj.start, adj.end, &changed_segment, adj.reversed);
            geomops::with_ring_replaced(&neighbour.geometry, adj.poly, adj.ring, updated)
        });

        let Some(updated_ring) = geomops::ring_at(&proposed_geometry, adj.poly, adj.ring) else {
            continue;
        };
        let updated_open = open_ring(&updated_ring.0);
        if updated_open.is_empty() {
            continue;
        }
        let proposed_segment = extract_segment(updated_open, adj.start, adj.end);
        let connection_points = ConnectionPoints {
            start: updated_open[adj.start % updated_open.len()],
            end: updated_open[adj.end % updated_open.len()],
        };
        let snap_quality = assess_connection(updated_ring, adj.start, adj.end);

        out.push(BoundaryProposal {
            patch_id: adj.patch_id.clone(),
            code: adj.code.clone(),
            relationship: info.relationship,
            adjacency: adj.clone(),
            original_geometry: neighbour.geometry.clone(),
            proposed_geometry,
            original_segment,
            proposed_segment,
            changed_segment,
            connection_points,
            snap_quality,
        });
    }
    out
}
