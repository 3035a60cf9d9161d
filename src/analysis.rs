//! Post-edit analysis.
//!
//! After one patch's geometry changes, classify how every touching neighbour
//! is affected and detect the gap polygon left by an inward edit.
//!
//! Steps:
//! 1. Detect neighbours from the OLD geometry (it still aligns with unedited
//!    neighbours even when the new ring moved beyond τ)
//! 2. Remap edited indices onto the new ring; drop candidates whose
//!    edited-side segment the edit never touched
//! 3. Narrow to the user's refined sub-range when a pre-edit simplified
//!    geometry is supplied
//! 4. Keep the strongest adjacency per neighbour patch
//! 5. Detect duplicates of the old geometry
//! 6. Classify each neighbour against the new geometry
//! 7. Build the gap polygon from the chained differences

use ahash::AHashMap;
use geo::{BoundingRect, Coord, MultiPolygon, Polygon};

use crate::adjacency::{find_adjacent_patches, PatchIndex, SharedBoundary};
use crate::geomops::{self, area_sqm, guarded_difference, guarded_intersection};
use crate::tuning::{
    BBOX_PAD_DEG, COORD_JITTER_DEG_SQ, DUPLICATE_OVERLAP_FRACTION, MIN_GAP_AREA_SQM,
    MIN_OVERLAP_AREA_SQM, NARROW_ANCHOR_VERTICES, SHARED_EDGE_TOL_DEG_SQ,
};
use crate::types::{PatchId, PatchSet, Relationship};
use ringmath::{
    cyclic_contains, cyclic_len, dist_sq, extract_segment, mod_index, nearest_vertex_index,
    open_ring, point_to_ring_dist_sq,
};

/// A neighbour of the edited patch, classified.
#[derive(Debug, Clone)]
pub struct NeighbourInfo {
    pub adjacency: SharedBoundary,
    pub relationship: Relationship,
    pub is_duplicate: bool,
}

/// A patch whose geometry nearly coincides with the edited patch's old
/// geometry. A duplicate need not share a detected segment, so it carries no
/// adjacency record.
#[derive(Debug, Clone)]
pub struct DuplicateInfo {
    pub patch_id: PatchId,
    pub code: String,
    /// Fraction of the smaller area covered by the intersection.
    pub overlap_fraction: f64,
}

/// Everything the UI needs after one patch's geometry changed.
#[derive(Debug, Clone)]
pub struct PostEditAnalysis {
    pub duplicates: Vec<DuplicateInfo>,
    pub neighbours: Vec<NeighbourInfo>,
    pub gap_geometry: Option<MultiPolygon<f64>>,
    pub gap_area_sqm: f64,
}

/// Classify how the edit of `edited_id` from `old_geom` to `new_geom`
/// affected the rest of the patch set.
///
/// `pre_edit_simplified` is the simplified geometry the user started a manual
/// refinement from; when present, each candidate's edited range is narrowed
/// to the sub-range the user actually moved, so a coarse simplified edge does
/// not overwrite fine neighbour vertices far from the edit.
pub fn analyse_post_edit(
    edited_id: &PatchId,
    old_geom: &MultiPolygon<f64>,
    new_geom: &MultiPolygon<f64>,
    patches: &PatchSet,
    pre_edit_simplified: Option<&MultiPolygon<f64>>,
) -> PostEditAnalysis {
    let index = PatchIndex::new(patches);

    // 1. Neighbours of the pre-edit boundary.
    let mut candidates: Vec<SharedBoundary> = Vec::new();
    for (poly, ring, ls) in geomops::rings_of(old_geom) {
        candidates.extend(find_adjacent_patches(
            edited_id, ls, patches, &index, poly, ring,
        ));
    }
    log::debug!(
        "post-edit {edited_id}: {} raw adjacency candidates",
        candidates.len()
    );

    // 2. Remap onto the new ring; drop untouched boundaries.
    let mut remapped: Vec<SharedBoundary> = Vec::new();
    for mut adj in candidates {
        let Some(old_ring) = geomops::ring_at(old_geom, adj.edited_poly, adj.edited_ring) else {
            continue;
        };
        let Some(new_ring) = geomops::ring_at(new_geom, adj.edited_poly, adj.edited_ring) else {
            // The polygon or ring vanished mid-edit; nothing to align against.
            continue;
        };
        let old_open = open_ring(&old_ring.0);
        let new_open = open_ring(&new_ring.0);
        if new_open.len() < 3 {
            continue;
        }
        let old_seg = extract_segment(old_open, adj.edited_start, adj.edited_end);
        let Some(ns) = nearest_vertex_index(old_open[adj.edited_start], new_open, new_open.len())
        else {
            continue;
        };
        let Some(ne) = nearest_vertex_index(old_open[adj.edited_end], new_open, new_open.len())
        else {
            continue;
        };
        adj.edited_start = ns;
        adj.edited_end = ne;
        let new_seg = extract_segment(new_open, ns, ne);
        if segments_equal(&old_seg, &new_seg) {
            continue;
        }
        remapped.push(adj);
    }

    // 3. Narrow to the refined sub-range.
    if let Some(pre) = pre_edit_simplified {
        for adj in &mut remapped {
            narrow_to_user_edit(adj, new_geom, pre, patches);
        }
    }

    // 4. Strongest adjacency per neighbour patch.
    let mut strongest: AHashMap<PatchId, SharedBoundary> = AHashMap::new();
    for adj in remapped {
        match strongest.get(&adj.patch_id) {
            Some(prev) if prev.matched_vertex_count >= adj.matched_vertex_count => {}
            _ => {
                strongest.insert(adj.patch_id.clone(), adj);
            }
        }
    }

    // 5. Duplicates of the old geometry.
    let duplicates = detect_duplicates(edited_id, old_geom, patches, &index);

    // 6. Classify survivors against the new geometry.
    let mut neighbours: Vec<NeighbourInfo> = strongest
        .into_iter()
        .map(|(_, adj)| {
            let is_duplicate = duplicates.iter().any(|d| d.patch_id == adj.patch_id);
            let relationship = if is_duplicate {
                Relationship::Aligned
            } else {
                classify(&adj, new_geom, patches)
            };
            NeighbourInfo {
                adjacency: adj,
                relationship,
                is_duplicate,
            }
        })
        .collect();
    neighbours.sort_by(|a, b| a.adjacency.patch_id.as_str().cmp(b.adjacency.patch_id.as_str()));

    // 7. Gap polygon.
    let (gap_geometry, gap_area_sqm) = detect_gap(edited_id, old_geom, new_geom, patches, &index);

    log::debug!(
        "post-edit {edited_id}: {} neighbours, {} duplicates, gap {:.0} m2",
        neighbours.len(),
        duplicates.len(),
        gap_area_sqm
    );

    PostEditAnalysis {
        duplicates,
        neighbours,
        gap_geometry,
        gap_area_sqm,
    }
}

fn segments_equal(a: &[Coord<f64>], b: &[Coord<f64>]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(&x, &y)| dist_sq(x, y) <= COORD_JITTER_DEG_SQ)
}

/// Relationship of one neighbour to the new geometry.
fn classify(
    adj: &SharedBoundary,
    new_geom: &MultiPolygon<f64>,
    patches: &PatchSet,
) -> Relationship {
    let Some(neighbour) = patches.get(&adj.patch_id) else {
        return Relationship::Aligned;
    };
    let inter = guarded_intersection(&neighbour.geometry, new_geom)
        .map(|g| area_sqm(&g))
        .unwrap_or(0.0);
    if inter > MIN_OVERLAP_AREA_SQM {
        return Relationship::Overlap;
    }
    if inter > 0.0 {
        return Relationship::Aligned;
    }
    // Zero overlap: aligned only while the neighbour's shared span still
    // hugs the new boundary; otherwise the edit retracted away from it.
    let still_touching = (|| {
        let nb_ring = geomops::ring_at(&neighbour.geometry, adj.poly, adj.ring)?;
        let nb_open = open_ring(&nb_ring.0);
        let new_ring = geomops::ring_at(new_geom, adj.edited_poly, adj.edited_ring)?;
        let new_open = open_ring(&new_ring.0);
        let n = nb_open.len();
        if n == 0 || new_open.len() < 3 {
            return None;
        }
        let count = cyclic_len(adj.start, adj.end, n);
        Some((0..count).any(|k| {
            let v = nb_open[(adj.start + k) % n];
            point_to_ring_dist_sq(v, new_open, new_open.len())
                .is_some_and(|(d, _)| d < SHARED_EDGE_TOL_DEG_SQ)
        }))
    })()
    .unwrap_or(false);

    if still_touching {
        Relationship::Aligned
    } else {
        Relationship::Gap
    }
}

/// Patches whose old-geometry overlap covers ≥95% of the smaller area.
/// A zero-area geometry on either side is never a duplicate.
fn detect_duplicates(
    edited_id: &PatchId,
    old_geom: &MultiPolygon<f64>,
    patches: &PatchSet,
    index: &PatchIndex,
) -> Vec<DuplicateInfo> {
    let mut out = Vec::new();
    let old_area = area_sqm(old_geom);
    if old_area == 0.0 {
        return out;
    }
    let Some(rect) = old_geom.bounding_rect() else {
        return out;
    };

    for id in index.candidates(&rect, BBOX_PAD_DEG) {
        if &id == edited_id {
            continue;
        }
        let Some(other) = patches.get(&id) else {
            continue;
        };
        let other_area = area_sqm(&other.geometry);
        if other_area == 0.0 {
            continue;
        }
        let inter = guarded_intersection(old_geom, &other.geometry)
            .map(|g| area_sqm(&g))
            .unwrap_or(0.0);
        let overlap_fraction = inter / old_area.min(other_area);
        if overlap_fraction >= DUPLICATE_OVERLAP_FRACTION {
            out.push(DuplicateInfo {
                patch_id: id.clone(),
                code: other.code.clone(),
                overlap_fraction,
            });
        }
    }
    out
}

/// Area lost by the edit and not occupied by any other patch.
fn detect_gap(
    edited_id: &PatchId,
    old_geom: &MultiPolygon<f64>,
    new_geom: &MultiPolygon<f64>,
    patches: &PatchSet,
    index: &PatchIndex,
) -> (Option<MultiPolygon<f64>>, f64) {
    let mut gap = match guarded_difference(old_geom, new_geom) {
        Some(g) if !g.0.is_empty() => g,
        _ => return (None, 0.0),
    };
    let Some(rect) = old_geom.bounding_rect() else {
        return (None, 0.0);
    };

    // Only bbox-near patches can intersect the lost area, so the chained
    // difference over candidates equals the difference over all patches.
    let occupied: Vec<PatchId> = index
        .candidates(&rect, BBOX_PAD_DEG)
        .into_iter()
        .filter(|id| id != edited_id)
        .collect();
    for id in &occupied {
        let Some(patch) = patches.get(id) else {
            continue;
        };
        if let Some(next) = guarded_difference(&gap, &patch.geometry) {
            gap = next;
        }
        if gap.0.is_empty() {
            return (None, 0.0);
        }
    }

    // Neighbour detection is imperfect: drop slivers and components that
    // still sit on an occupied patch.
    let mut kept: Vec<Polygon<f64>> = Vec::new();
    let mut total = 0.0;
    'component: for poly in gap.0 {
        let comp = MultiPolygon(vec![poly]);
        let comp_area = area_sqm(&comp);
        if comp_area < MIN_GAP_AREA_SQM {
            continue;
        }
        for id in &occupied {
            let Some(patch) = patches.get(id) else {
                continue;
            };
            let covered = guarded_intersection(&comp, &patch.geometry)
                .map(|g| area_sqm(&g))
                .unwrap_or(0.0);
            if covered >= MIN_GAP_AREA_SQM {
                continue 'component;
            }
        }
        total += comp_area;
        kept.extend(comp.0);
    }

    if kept.is_empty() {
        (None, 0.0)
    } else {
        (Some(MultiPolygon(kept)), total)
    }
}

/// Narrow `adj`'s edited span to the sub-range the user moved, padded by
/// anchor vertices, then re-derive the neighbour span from the narrowed
/// endpoints. Any failure keeps the full range.
fn narrow_to_user_edit(
    adj: &mut SharedBoundary,
    new_geom: &MultiPolygon<f64>,
    pre_edit: &MultiPolygon<f64>,
    patches: &PatchSet,
) {
    let Some(new_ring) = geomops::ring_at(new_geom, adj.edited_poly, adj.edited_ring) else {
        return;
    };
    let Some(pre_ring) = geomops::ring_at(pre_edit, adj.edited_poly, adj.edited_ring) else {
        return;
    };
    let new_open = open_ring(&new_ring.0);
    let pre_open = open_ring(&pre_ring.0);
    let n = new_open.len();
    if n < 3 || pre_open.len() < 3 {
        return;
    }

    let Some((cs, ce)) = changed_range(new_open, pre_open) else {
        return;
    };
    let lo = mod_index(cs as isize - NARROW_ANCHOR_VERTICES as isize, n);
    let hi = mod_index(ce as isize + NARROW_ANCHOR_VERTICES as isize, n);
    let Some((s, e)) = cyclic_intersect(adj.edited_start, adj.edited_end, lo, hi, n) else {
        return;
    };
    if (s, e) == (adj.edited_start, adj.edited_end) {
        return;
    }
    adj.edited_start = s;
    adj.edited_end = e;

    let Some(patch) = patches.get(&adj.patch_id) else {
        return;
    };
    let Some(nb_ring) = geomops::ring_at(&patch.geometry, adj.poly, adj.ring) else {
        return;
    };
    let nb_open = open_ring(&nb_ring.0);
    if let (Some(ns), Some(ne)) = (
        nearest_vertex_index(new_open[s], nb_open, nb_open.len()),
        nearest_vertex_index(new_open[e], nb_open, nb_open.len()),
    ) {
        adj.start = ns;
        adj.end = ne;
        adj.matched_vertex_count = cyclic_len(ns, ne, nb_open.len());
    }
}

/// Contiguous cyclic range of new-ring vertices that differ from the
/// pre-edit ring. Index-by-index when counts match, by distance to the
/// pre-edit boundary otherwise. `None` when nothing (or everything) changed.
fn changed_range(new: &[Coord<f64>], pre: &[Coord<f64>]) -> Option<(usize, usize)> {
    let changed: Vec<usize> = if new.len() == pre.len() {
        (0..new.len())
            .filter(|&i| dist_sq(new[i], pre[i]) > COORD_JITTER_DEG_SQ)
            .collect()
    } else {
        (0..new.len())
            .filter(|&i| {
                point_to_ring_dist_sq(new[i], pre, pre.len())
                    .is_none_or(|(d, _)| d > COORD_JITTER_DEG_SQ)
            })
            .collect()
    };
    if changed.is_empty() || changed.len() == new.len() {
        return None;
    }

    // The changed span is the complement of the largest unchanged arc
    // between consecutive changed indices, which also handles wrap.
    let n = new.len();
    let mut best_gap = 0;
    let mut span = (changed[0], changed[changed.len() - 1]);
    for w in 0..changed.len() {
        let cur = changed[w];
        let next = changed[(w + 1) % changed.len()];
        let gap = (next + n - cur) % n;
        if gap > best_gap {
            best_gap = gap;
            span = (next, cur);
        }
    }
    Some(span)
}

/// Longest contiguous run of `a`'s cyclic span that also lies in `b`'s.
fn cyclic_intersect(
    a_start: usize,
    a_end: usize,
    b_start: usize,
    b_end: usize,
    n: usize,
) -> Option<(usize, usize)> {
    let len = cyclic_len(a_start, a_end, n);
    let mut best: Option<(usize, usize)> = None;
    let mut run: Option<(usize, usize)> = None;

    for k in 0..len {
        let i = (a_start + k) % n;
        if cyclic_contains(b_start, b_end, i) {
            run = match run {
                Some((s, _)) => Some((s, i)),
                None => Some((i, i)),
            };
            let candidate = run.unwrap_or((i, i));
            let better = best
                .map(|(s, e)| cyclic_len(candidate.0, candidate.1, n) > cyclic_len(s, e, n))
                .unwrap_or(true);
            if better {
                best = Some(candidate);
            }
        } else {
            run = None;
        }
    }
    best
}
