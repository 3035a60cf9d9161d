//! Host-facing geometry formats: WKT at the persistence boundary, GeoJSON
//! for import and export.

pub mod geojson;
pub mod wkt;
