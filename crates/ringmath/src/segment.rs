//! Cyclic index arithmetic and wrap-aware segment extraction.
//!
//! All ring indices are manipulated modulo the open vertex count. A span
//! whose `end` is smaller than its `start` wraps past the end of the ring.

use geo::Coord;

/// Cyclic index into a ring of `n` open vertices; correct for negative `i`.
#[inline]
pub fn mod_index(i: isize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let n = n as isize;
    (((i % n) + n) % n) as usize
}

/// Inclusive vertex count of the cyclic span `start..=end`.
#[inline]
pub fn cyclic_len(start: usize, end: usize, n: usize) -> usize {
    if end >= start {
        end - start + 1
    } else {
        n - start + end + 1
    }
}

/// Whether `i` lies inside the cyclic span `start..=end`.
#[inline]
pub fn cyclic_contains(start: usize, end: usize, i: usize) -> bool {
    if end >= start {
        i >= start && i <= end
    } else {
        i >= start || i <= end
    }
}

/// Vertices of the cyclic span `start..=end` of an open-form ring.
/// `end < start` wraps past the end of the ring.
pub fn extract_segment(ring: &[Coord<f64>], start: usize, end: usize) -> Vec<Coord<f64>> {
    let n = ring.len();
    if n == 0 {
        return Vec::new();
    }
    let start = start % n;
    let end = end % n;
    if end >= start {
        ring[start..=end].to_vec()
    } else {
        let mut out = Vec::with_capacity(n - start + end + 1);
        out.extend_from_slice(&ring[start..]);
        out.extend_from_slice(&ring[..=end]);
        out
    }
}
