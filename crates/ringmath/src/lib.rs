pub mod project;
pub mod ring;
pub mod segment;

pub use project::{
    dist_sq, nearest_point_on_polyline, nearest_point_on_ring, nearest_vertex_index,
    point_to_ring_dist_sq, project_to_segment, RingProjection,
};
pub use ring::{bbox, bboxes_overlap, ensure_closed, is_closed, open_len, open_ring};
pub use segment::{cyclic_contains, cyclic_len, extract_segment, mod_index};
