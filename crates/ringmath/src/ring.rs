//! Open/closed ring normalisation and bounding boxes.
//!
//! A ring is an ordered list of positions. The *closed* form repeats the
//! first vertex at the end; the *open* form does not. Algorithms work on the
//! open form and re-close on output, so every function here accepts either.

use geo::{Coord, Rect};

/// Whether the ring repeats its first vertex at the end.
pub fn is_closed(ring: &[Coord<f64>]) -> bool {
    ring.len() >= 2 && ring[0] == ring[ring.len() - 1]
}

/// Vertex count ignoring a trailing closing vertex.
pub fn open_len(ring: &[Coord<f64>]) -> usize {
    if is_closed(ring) {
        ring.len() - 1
    } else {
        ring.len()
    }
}

/// The ring without its closing vertex.
pub fn open_ring(ring: &[Coord<f64>]) -> &[Coord<f64>] {
    &ring[..open_len(ring)]
}

/// Close the ring by appending a copy of the first vertex if needed.
pub fn ensure_closed(ring: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out = ring.to_vec();
    if !ring.is_empty() && !is_closed(ring) {
        out.push(ring[0]);
    }
    out
}

/// Axis-aligned bounding box in degrees. `None` for an empty ring.
pub fn bbox(ring: &[Coord<f64>]) -> Option<Rect<f64>> {
    let first = *ring.first()?;
    let mut min = first;
    let mut max = first;
    for c in &ring[1..] {
        min.x = min.x.min(c.x);
        min.y = min.y.min(c.y);
        max.x = max.x.max(c.x);
        max.y = max.y.max(c.y);
    }
    Some(Rect::new(min, max))
}

/// Minkowski-padded overlap test between two bounding boxes.
pub fn bboxes_overlap(a: &Rect<f64>, b: &Rect<f64>, pad_deg: f64) -> bool {
    a.min().x - pad_deg <= b.max().x
        && a.max().x + pad_deg >= b.min().x
        && a.min().y - pad_deg <= b.max().y
        && a.max().y + pad_deg >= b.min().y
}
