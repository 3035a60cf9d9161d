//! Tolerance constants, single source.
//!
//! All degree-space values assume mid-latitude planar math. Deployments at
//! high latitude or in another coordinate system retune here.

/// τ²: squared degree distance below which a vertex lies on a shared
/// boundary (~22 m at mid latitudes).
pub const SHARED_EDGE_TOL_DEG_SQ: f64 = 4e-8;

/// Minimum neighbour vertices a shared segment must contain.
pub const MIN_SHARED_VERTICES: usize = 3;

/// Minkowski pad for bounding-box candidate tests (~110 m).
pub const BBOX_PAD_DEG: f64 = 0.001;

/// Coordinate jitter floor (deg²): differences below this are no-ops (~1 mm).
pub const COORD_JITTER_DEG_SQ: f64 = 1e-14;

/// Displacements above this are clearly wrong and are skipped (~35 km).
pub const MAX_DISPLACEMENT_DEG_SQ: f64 = 0.1;

/// Gaps smaller than this (m²) are not reported.
pub const MIN_GAP_AREA_SQM: f64 = 100.0;

/// Intersection area (m²) above which a neighbour counts as overlapping.
pub const MIN_OVERLAP_AREA_SQM: f64 = 100.0;

/// A patch covering at least this fraction of the smaller geometry is a
/// duplicate.
pub const DUPLICATE_OVERLAP_FRACTION: f64 = 0.95;

/// Anchor vertices kept on each side of a narrowed edit range.
pub const NARROW_ANCHOR_VERTICES: usize = 3;

/// Projected-edge samples used by the winding vote.
pub const WINDING_SAMPLE_LIMIT: usize = 20;

/// Original vertices sampled for the deviation statistic.
pub const DEVIATION_SAMPLE_LIMIT: usize = 500;

/// Joins with an interior angle below this (degrees) are flagged poor.
pub const POOR_JOIN_ANGLE_DEG: f64 = 30.0;

/// Joins further than this (metres) from the unedited side are flagged poor.
pub const POOR_JOIN_DISTANCE_M: f64 = 5.0;

/// Lower bound of the tolerance bisection, degrees.
pub const TOLERANCE_SEARCH_MIN_DEG: f64 = 1e-7;

/// Upper bound of the tolerance bisection, degrees.
pub const TOLERANCE_SEARCH_MAX_DEG: f64 = 1e-2;

/// Tolerance bisection iteration cap.
pub const TOLERANCE_SEARCH_MAX_ITERS: usize = 20;

/// Early-exit band around the target vertex count (fraction).
pub const TOLERANCE_SEARCH_SLACK: f64 = 0.10;
