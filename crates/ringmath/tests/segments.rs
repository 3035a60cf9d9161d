use geo::Coord;
use ringmath::{cyclic_contains, cyclic_len, extract_segment, mod_index};

fn ring(n: usize) -> Vec<Coord<f64>> {
    (0..n)
        .map(|i| Coord {
            x: i as f64,
            y: 0.0,
        })
        .collect()
}

#[test]
fn mod_index_wraps_both_directions() {
    assert_eq!(mod_index(0, 5), 0);
    assert_eq!(mod_index(7, 5), 2);
    assert_eq!(mod_index(-1, 5), 4);
    assert_eq!(mod_index(-6, 5), 4);
    assert_eq!(mod_index(3, 0), 0);
}

#[test]
fn cyclic_len_counts_inclusive_spans() {
    assert_eq!(cyclic_len(1, 3, 8), 3);
    assert_eq!(cyclic_len(6, 1, 8), 4);
    assert_eq!(cyclic_len(4, 4, 8), 1);
    assert_eq!(cyclic_len(0, 7, 8), 8);
}

#[test]
fn cyclic_contains_handles_wrap() {
    assert!(cyclic_contains(1, 3, 2));
    assert!(!cyclic_contains(1, 3, 5));
    assert!(cyclic_contains(6, 1, 7));
    assert!(cyclic_contains(6, 1, 0));
    assert!(!cyclic_contains(6, 1, 4));
}

#[test]
fn extract_segment_forward_span() {
    let r = ring(6);
    let seg = extract_segment(&r, 1, 4);

    assert_eq!(seg.len(), 4);
    assert_eq!(seg[0].x, 1.0);
    assert_eq!(seg[3].x, 4.0);
}

#[test]
fn extract_segment_wraps_past_the_end() {
    let r = ring(6);
    let seg = extract_segment(&r, 4, 1);

    assert_eq!(seg.len(), 4);
    let xs: Vec<f64> = seg.iter().map(|c| c.x).collect();
    assert_eq!(xs, vec![4.0, 5.0, 0.0, 1.0]);
}

#[test]
fn extract_segment_single_vertex_for_every_start() {
    // For any open length and any start, a collapsed span is one vertex.
    for n in 3..10 {
        let r = ring(n);
        for s in 0..n {
            let seg = extract_segment(&r, s, s);
            assert_eq!(seg.len(), 1);
            assert_eq!(seg[0].x, s as f64);
        }
    }
}

#[test]
fn extract_segment_length_matches_cyclic_len() {
    let r = ring(9);
    for s in 0..9 {
        for e in 0..9 {
            assert_eq!(extract_segment(&r, s, e).len(), cyclic_len(s, e, 9));
        }
    }
}

#[test]
fn extract_segment_on_empty_ring_is_empty() {
    assert!(extract_segment(&[], 0, 3).is_empty());
}
