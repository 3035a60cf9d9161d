use geo::Coord;
use ringmath::{
    bbox, bboxes_overlap, dist_sq, ensure_closed, is_closed, nearest_point_on_polyline,
    nearest_point_on_ring, nearest_vertex_index, open_len, open_ring, project_to_segment,
};

fn c(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

/// A unit square shared by several tests, in open form.
fn unit_square() -> Vec<Coord<f64>> {
    vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0)]
}

#[test]
fn open_len_strips_one_closing_vertex() {
    let open = unit_square();
    let closed = ensure_closed(&open);

    assert_eq!(open_len(&open), 4);
    assert_eq!(open_len(&closed), 4);
    assert_eq!(open_ring(&closed), open.as_slice());
}

#[test]
fn ensure_closed_is_idempotent() {
    let open = unit_square();
    let closed = ensure_closed(&open);

    assert!(is_closed(&closed));
    assert_eq!(ensure_closed(&closed), closed);
    assert_eq!(closed.len(), open.len() + 1);
    assert_eq!(closed[0], *closed.last().unwrap());
}

#[test]
fn ensure_closed_on_empty_ring_is_empty() {
    assert!(ensure_closed(&[]).is_empty());
    assert_eq!(open_len(&[]), 0);
}

#[test]
fn bbox_covers_all_vertices() {
    let ring = vec![c(2.0, -1.0), c(5.0, 3.0), c(-4.0, 0.5)];
    let r = bbox(&ring).unwrap();

    assert_eq!(r.min(), c(-4.0, -1.0));
    assert_eq!(r.max(), c(5.0, 3.0));
    assert!(bbox(&[]).is_none());
}

#[test]
fn padded_bboxes_overlap_across_a_small_gap() {
    let a = bbox(&[c(0.0, 0.0), c(1.0, 1.0)]).unwrap();
    let b = bbox(&[c(1.0005, 0.0), c(2.0, 1.0)]).unwrap();

    assert!(!bboxes_overlap(&a, &b, 0.0));
    assert!(bboxes_overlap(&a, &b, 0.001));
}

#[test]
fn projection_clamps_to_segment_endpoints() {
    let a = c(0.0, 0.0);
    let b = c(2.0, 0.0);

    assert_eq!(project_to_segment(c(1.0, 1.0), a, b), c(1.0, 0.0));
    assert_eq!(project_to_segment(c(-3.0, 1.0), a, b), a);
    assert_eq!(project_to_segment(c(9.0, -2.0), a, b), b);
    // Degenerate segment projects onto its single point.
    assert_eq!(project_to_segment(c(5.0, 5.0), a, a), a);
}

#[test]
fn nearest_point_on_ring_uses_the_wrap_edge() {
    let ring = unit_square();
    // Query left of the square: the nearest edge is (0,1) -> (0,0), which is
    // the wrap edge at index 3.
    let hit = nearest_point_on_ring(c(-0.5, 0.5), &ring, 4).unwrap();

    assert_eq!(hit.edge, 3);
    assert_eq!(hit.point, c(0.0, 0.5));
    assert!((hit.dist_sq - 0.25).abs() < 1e-12);
}

#[test]
fn nearest_point_on_ring_rejects_degenerate_input() {
    assert!(nearest_point_on_ring(c(0.0, 0.0), &[c(1.0, 1.0)], 1).is_none());
    assert!(nearest_point_on_ring(c(0.0, 0.0), &[], 0).is_none());
}

#[test]
fn polyline_has_no_wrap_edge() {
    let pts = vec![c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0)];
    // Same query as the ring test; without the wrap edge the nearest point is
    // a corner, not a perpendicular foot.
    let hit = nearest_point_on_polyline(c(-0.5, 0.5), &pts).unwrap();

    assert!(hit.dist_sq > 0.25);
    assert_eq!(dist_sq(hit.point, c(0.0, 0.0)).min(dist_sq(hit.point, c(0.0, 1.0))), 0.0);
}

#[test]
fn nearest_vertex_picks_the_closest_corner() {
    let ring = unit_square();

    assert_eq!(nearest_vertex_index(c(0.9, 0.1), &ring, 4), Some(1));
    assert_eq!(nearest_vertex_index(c(-5.0, -5.0), &ring, 4), Some(0));
    assert_eq!(nearest_vertex_index(c(0.0, 0.0), &[], 0), None);
}
