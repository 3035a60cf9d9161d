#![doc = "Patchsync public API"]

mod adjacency;
mod analysis;
mod geomops;
mod session;
mod simplify;
mod sync;
mod types;

pub mod io;
pub mod tuning;

#[doc(inline)]
pub use types::{
    patch_color, patch_set, to_multi, Patch, PatchId, PatchSet, Relationship, SnapQuality,
};

#[doc(inline)]
pub use simplify::{compute_stats, find_tolerance_for_target, simplify, SimplifyStats};

#[doc(inline)]
pub use adjacency::{
    find_adjacent_patches, shared_segments, PatchIndex, SegmentMatch, SharedBoundary,
};

#[doc(inline)]
pub use analysis::{analyse_post_edit, DuplicateInfo, NeighbourInfo, PostEditAnalysis};

#[doc(inline)]
pub use sync::{
    assess_connection, generate_boundary_proposals, splice_ring, sync_by_displacement,
    sync_by_projection, BoundaryProposal, ConnectionPoints,
};

#[doc(inline)]
pub use session::{EditMode, EditOutcome, EditSession};

#[doc(inline)]
pub use geomops::area_sqm;
