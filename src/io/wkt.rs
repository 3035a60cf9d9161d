//! WKT bridge for the persistence boundary.
//!
//! The store keeps patch geometries as `MULTIPOLYGON(((lon lat, …)…)…)`
//! text with `.` decimal separators and closed rings; the transport that
//! carries it is the host's concern.

use anyhow::{anyhow, Result};
use geo::{MultiPolygon, Polygon};
use wkt::{ToWkt, TryFromWkt};

use crate::types::to_multi;

/// Encode a geometry for the patch store. Rings are closed (`Polygon`
/// guarantees closure on construction) and the output carries no trailing
/// whitespace.
pub fn multipolygon_to_wkt(geom: &MultiPolygon<f64>) -> String {
    geom.wkt_string()
}

/// Parse a stored geometry. A bare `POLYGON` is accepted and wrapped, since
/// everything is normalised to MultiPolygon at ingress.
pub fn multipolygon_from_wkt(text: &str) -> Result<MultiPolygon<f64>> {
    if let Ok(mp) = MultiPolygon::try_from_wkt_str(text) {
        return Ok(mp);
    }
    Polygon::try_from_wkt_str(text)
        .map(to_multi)
        .map_err(|e| anyhow!("invalid WKT geometry: {e}"))
}
