//! Shared-boundary detection by geometric proximity.
//!
//! Simplification moves vertices by metres and changes their counts, so
//! per-vertex equality cannot recover a shared boundary after an edit.
//! Proximity of one ring's vertices to the other ring's edges can: a
//! neighbour vertex whose squared distance to the edited boundary is below
//! τ² lies in the shared zone regardless of how either ring was resampled.

use geo::{BoundingRect, Coord, LineString, Rect};
use rstar::{RTree, RTreeObject, AABB};
use smallvec::SmallVec;

use crate::geomops;
use crate::tuning::{
    BBOX_PAD_DEG, MIN_SHARED_VERTICES, SHARED_EDGE_TOL_DEG_SQ, WINDING_SAMPLE_LIMIT,
};
use crate::types::{PatchId, PatchSet};
use ringmath::{bbox, bboxes_overlap, cyclic_len, nearest_vertex_index, point_to_ring_dist_sq};

/// One contiguous shared segment between an edited ring and a neighbour ring.
///
/// All indices are open-form vertex indices. A span whose `end` is smaller
/// than its `start` wraps past the end of its ring.
#[derive(Debug, Clone)]
pub struct SharedBoundary {
    /// Neighbour patch id.
    pub patch_id: PatchId,
    /// Neighbour patch code.
    pub code: String,
    /// Polygon index of the shared ring inside the neighbour geometry.
    pub poly: usize,
    /// Ring index inside that polygon (0 = exterior).
    pub ring: usize,
    /// Shared span on the neighbour ring.
    pub start: usize,
    pub end: usize,
    /// Polygon index of the edited ring inside the edited geometry.
    pub edited_poly: usize,
    /// Ring index inside that polygon (0 = exterior).
    pub edited_ring: usize,
    /// Shared span on the edited ring, in the edited ring's forward order;
    /// `reversed` says whether the neighbour walks it the other way.
    pub edited_start: usize,
    pub edited_end: usize,
    /// Whether the neighbour's winding along the span opposes the edited
    /// ring's.
    pub reversed: bool,
    /// Number of neighbour vertices inside the shared zone.
    pub matched_vertex_count: usize,
}

/// A shared span found between two bare rings, before patch bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct SegmentMatch {
    pub start: usize,
    pub end: usize,
    pub edited_start: usize,
    pub edited_end: usize,
    pub reversed: bool,
    pub matched_vertex_count: usize,
}

/// All shared segments between two rings, both taken in open form.
/// Almost every real pair yields zero or one segment, occasionally two.
pub fn shared_segments(
    edited: &[Coord<f64>],
    neighbour: &[Coord<f64>],
) -> SmallVec<[SegmentMatch; 2]> {
    let edited = ringmath::open_ring(edited);
    let neighbour = ringmath::open_ring(neighbour);
    let a_open = edited.len();
    let b_open = neighbour.len();
    let mut out = SmallVec::new();
    if a_open < 3 || b_open < 3 {
        return out;
    }

    // 1. Mark neighbour vertices within τ² of the edited boundary, keeping
    //    the edge each one projects onto.
    let marks: Vec<Option<usize>> = neighbour
        .iter()
        .map(|&v| {
            point_to_ring_dist_sq(v, edited, a_open)
                .filter(|&(d, _)| d < SHARED_EDGE_TOL_DEG_SQ)
                .map(|(_, edge)| edge)
        })
        .collect();

    // 2. Group consecutive marked indices into raw runs.
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for (j, mark) in marks.iter().enumerate() {
        if mark.is_none() {
            continue;
        }
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == j => *end = j,
            _ => runs.push((j, j)),
        }
    }
    // Merge the first and last runs when they touch through the wrap-around;
    // `start > end` then marks the wrap.
    if runs.len() > 1 && runs[0].0 == 0 && runs[runs.len() - 1].1 == b_open - 1 {
        let last = runs.pop().map(|(s, _)| s);
        if let Some(last_start) = last {
            runs[0].0 = last_start;
        }
    }

    for &(start, end) in &runs {
        // 3. Too few vertices in the shared zone.
        let count = cyclic_len(start, end, b_open);
        if count < MIN_SHARED_VERTICES {
            continue;
        }
        // 4. Snap the span endpoints onto the edited ring's vertices.
        let Some(edited_start) = nearest_vertex_index(neighbour[start], edited, a_open) else {
            continue;
        };
        let Some(edited_end) = nearest_vertex_index(neighbour[end], edited, a_open) else {
            continue;
        };
        if edited_start == edited_end {
            continue;
        }
        // 5. Winding vote over the projected edge indices. The edited span
        //    is stored in the edited ring's own forward order, so a reversed
        //    neighbour walk swaps the snapped endpoints.
        let reversed = winding_reversed(&marks, start, count, b_open, a_open);
        let (edited_start, edited_end) = if reversed {
            (edited_end, edited_start)
        } else {
            (edited_start, edited_end)
        };
        out.push(SegmentMatch {
            start,
            end,
            edited_start,
            edited_end,
            reversed,
            matched_vertex_count: count,
        });
    }
    out
}

/// Walk the marked span and count whether projected edge indices tend to
/// advance or retreat modulo the edited open length.
fn winding_reversed(
    marks: &[Option<usize>],
    start: usize,
    count: usize,
    b_open: usize,
    a_open: usize,
) -> bool {
    let step = (count / WINDING_SAMPLE_LIMIT).max(1);
    let mut prev: Option<usize> = None;
    let mut forward = 0u32;
    let mut backward = 0u32;

    for k in (0..count).step_by(step).take(WINDING_SAMPLE_LIMIT) {
        let Some(edge) = marks[(start + k) % b_open] else {
            continue;
        };
        if let Some(p) = prev {
            if edge != p {
                let diff = (edge + a_open - p) % a_open;
                if diff <= a_open / 2 {
                    forward += 1;
                } else {
                    backward += 1;
                }
            }
        }
        prev = Some(edge);
    }
    backward > forward
}

/// Bounding box of one patch, for R-tree candidate lookups.
#[derive(Debug, Clone)]
struct PatchBounds {
    id: PatchId,
    bbox: Rect<f64>,
}

impl RTreeObject for PatchBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// R-tree over patch bounding boxes; both neighbour detection and the
/// duplicate scan pull their candidates from here.
#[derive(Debug)]
pub struct PatchIndex {
    rtree: RTree<PatchBounds>,
}

impl PatchIndex {
    /// Bulk-load the index. Patches with empty geometry are not indexed.
    pub fn new(patches: &PatchSet) -> Self {
        let bounds = patches
            .values()
            .filter_map(|p| {
                p.geometry.bounding_rect().map(|bbox| PatchBounds {
                    id: p.id.clone(),
                    bbox,
                })
            })
            .collect();
        Self {
            rtree: RTree::bulk_load(bounds),
        }
    }

    /// Ids of patches whose padded bbox intersects `rect`, sorted for
    /// deterministic downstream ordering.
    pub fn candidates(&self, rect: &Rect<f64>, pad_deg: f64) -> Vec<PatchId> {
        let search = AABB::from_corners(
            [rect.min().x - pad_deg, rect.min().y - pad_deg],
            [rect.max().x + pad_deg, rect.max().y + pad_deg],
        );
        let mut ids: Vec<PatchId> = self
            .rtree
            .locate_in_envelope_intersecting(&search)
            .map(|b| b.id.clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}

/// Find every patch sharing a boundary with the given edited ring.
///
/// `edited_poly`/`edited_ring_idx` locate the ring inside the edited
/// geometry; they are propagated unchanged into the records.
pub fn find_adjacent_patches(
    edited_id: &PatchId,
    edited_ring: &LineString<f64>,
    patches: &PatchSet,
    index: &PatchIndex,
    edited_poly: usize,
    edited_ring_idx: usize,
) -> Vec<SharedBoundary> {
    let mut out = Vec::new();
    let edited_open = ringmath::open_ring(&edited_ring.0);
    let Some(ring_bbox) = bbox(edited_open) else {
        return out;
    };

    for id in index.candidates(&ring_bbox, BBOX_PAD_DEG) {
        if &id == edited_id {
            continue;
        }
        let Some(patch) = patches.get(&id) else {
            continue;
        };
        for (poly, ring, ls) in geomops::rings_of(&patch.geometry) {
            let nb_open = ringmath::open_ring(&ls.0);
            let Some(nb_bbox) = bbox(nb_open) else {
                continue;
            };
            if !bboxes_overlap(&ring_bbox, &nb_bbox, BBOX_PAD_DEG) {
                continue;
            }
            for m in shared_segments(edited_open, nb_open) {
                out.push(SharedBoundary {
                    patch_id: id.clone(),
                    code: patch.code.clone(),
                    poly,
                    ring,
                    start: m.start,
                    end: m.end,
                    edited_poly,
                    edited_ring: edited_ring_idx,
                    edited_start: m.edited_start,
                    edited_end: m.edited_end,
                    reversed: m.reversed,
                    matched_vertex_count: m.matched_vertex_count,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{patch_set, to_multi, Patch};
    use geo::Polygon;

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn ring_polygon(coords: Vec<Coord<f64>>) -> Polygon<f64> {
        Polygon::new(LineString(ringmath::ensure_closed(&coords)), vec![])
    }

    /// Eastern neighbour of a 2x4 rectangle, with a dense shared west edge.
    fn dense_east_neighbour() -> Vec<Coord<f64>> {
        let mut coords: Vec<Coord<f64>> = (0..9).map(|i| c(2.0, i as f64 * 0.5)).collect();
        coords.push(c(4.0, 4.0));
        coords.push(c(4.0, 0.0));
        coords
    }

    #[test]
    fn shared_edge_detected_after_simplification() {
        // The edited ring keeps only the corners; the neighbour still has the
        // dense pre-simplification west edge.
        let edited = vec![c(0.0, 0.0), c(2.0, 0.0), c(2.0, 4.0), c(0.0, 4.0)];
        let patches = patch_set([
            Patch::new("edited", "E1", None, to_multi(ring_polygon(edited.clone()))),
            Patch::new("east", "N1", None, to_multi(ring_polygon(dense_east_neighbour()))),
        ]);
        let index = PatchIndex::new(&patches);

        let found = find_adjacent_patches(
            &PatchId::from("edited"),
            &LineString(ringmath::ensure_closed(&edited)),
            &patches,
            &index,
            0,
            0,
        );

        assert_eq!(found.len(), 1);
        let adj = &found[0];
        assert_eq!(adj.patch_id.as_str(), "east");
        assert!(adj.matched_vertex_count >= 3);
        assert_eq!((adj.start, adj.end), (0, 8));
        // Neighbour walks the shared edge in the same direction as the
        // edited ring (south to north).
        assert!(!adj.reversed);
    }

    #[test]
    fn too_few_shared_vertices_yield_nothing() {
        let edited = vec![c(0.0, 0.0), c(2.0, 0.0), c(2.0, 4.0), c(0.0, 4.0)];
        // Only two vertices touch the shared edge.
        let neighbour = vec![c(2.0, 0.0), c(2.0, 4.0), c(4.0, 4.0), c(4.0, 0.0)];

        let found = shared_segments(&edited, &neighbour);
        assert!(found.is_empty());
    }

    #[test]
    fn degenerate_rings_are_skipped() {
        let edited = vec![c(0.0, 0.0), c(2.0, 0.0)];
        let neighbour = dense_east_neighbour();

        assert!(shared_segments(&edited, &neighbour).is_empty());
        assert!(shared_segments(&neighbour, &edited).is_empty());
    }

    #[test]
    fn wrap_around_run_is_merged() {
        // Neighbour ring rotated so the shared x=2 vertices straddle the
        // index wrap: start > end in the result.
        let edited = vec![c(0.0, 0.0), c(2.0, 0.0), c(2.0, 4.0), c(0.0, 4.0)];
        let mut neighbour = dense_east_neighbour();
        neighbour.rotate_left(4);

        let found = shared_segments(&edited, &neighbour);
        assert_eq!(found.len(), 1);
        let m = found[0];
        assert!(m.start > m.end);
        assert_eq!(m.matched_vertex_count, 9);
    }

    #[test]
    fn reversed_winding_is_reported() {
        // The edited east edge is dense, so the neighbour's walk crosses
        // several projected edges; walking it north-to-south opposes the
        // edited ring's direction.
        let mut edited: Vec<Coord<f64>> = vec![c(0.0, 0.0)];
        edited.extend((0..9).map(|i| c(2.0, i as f64 * 0.5)));
        edited.push(c(0.0, 4.0));

        let neighbour: Vec<Coord<f64>> = (0..9)
            .map(|i| c(2.0, 4.0 - i as f64 * 0.5))
            .chain([c(4.0, 0.0), c(4.0, 4.0)])
            .collect();

        let found = shared_segments(&edited, &neighbour);
        assert_eq!(found.len(), 1);
        assert!(found[0].reversed);
    }

    #[test]
    fn role_swap_finds_the_same_span() {
        // Both rings carry the same dense shared edge, so swapping roles
        // matches the same vertex count; opposition is mutual.
        let shared: Vec<Coord<f64>> = (0..9).map(|i| c(2.0, i as f64 * 0.5)).collect();
        let mut west = vec![c(0.0, 0.0)];
        west.extend(shared.iter().copied());
        west.push(c(0.0, 4.0));
        let mut east: Vec<Coord<f64>> = shared.iter().rev().copied().collect();
        east.push(c(4.0, 0.0));
        east.push(c(4.0, 4.0));

        let ab = shared_segments(&west, &east);
        let ba = shared_segments(&east, &west);
        assert_eq!(ab.len(), 1);
        assert_eq!(ba.len(), 1);
        assert_eq!(ab[0].matched_vertex_count, ba[0].matched_vertex_count);
        assert_eq!(ab[0].reversed, ba[0].reversed);
    }

    #[test]
    fn far_patches_are_skipped_by_bbox() {
        let edited = vec![c(0.0, 0.0), c(2.0, 0.0), c(2.0, 4.0), c(0.0, 4.0)];
        let patches = patch_set([
            Patch::new("edited", "E1", None, to_multi(ring_polygon(edited.clone()))),
            Patch::new(
                "far",
                "F1",
                None,
                to_multi(ring_polygon(vec![
                    c(50.0, 50.0),
                    c(51.0, 50.0),
                    c(51.0, 51.0),
                    c(50.0, 51.0),
                ])),
            ),
        ]);
        let index = PatchIndex::new(&patches);

        let found = find_adjacent_patches(
            &PatchId::from("edited"),
            &LineString(ringmath::ensure_closed(&edited)),
            &patches,
            &index,
            0,
            0,
        );
        assert!(found.is_empty());
    }
}
