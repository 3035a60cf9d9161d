//! GeoJSON adapter.
//!
//! A single FeatureCollection in, a single FeatureCollection out. Geometry
//! coordinates are `[lon, lat]`; `code` and `name` ride in the feature
//! properties. Import degrades per feature: one bad geometry is skipped with
//! a warning instead of failing the whole collection.

use anyhow::{anyhow, bail, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};

use crate::types::{patch_color, to_multi, Patch, PatchId, PatchSet};

/// Export patches as a GeoJSON FeatureCollection, sorted by id so output is
/// stable across runs.
pub fn patches_to_geojson(patches: &PatchSet) -> Value {
    let mut ids: Vec<&PatchId> = patches.keys().collect();
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    let features: Vec<Value> = ids
        .iter()
        .filter_map(|id| patches.get(id))
        .map(|patch| {
            let mut properties = Map::new();
            properties.insert("code".to_string(), json!(patch.code));
            if let Some(name) = &patch.name {
                properties.insert("name".to_string(), json!(name));
            }
            properties.insert("fill".to_string(), json!(patch_color(&patch.id)));
            json!({
                "type": "Feature",
                "id": patch.id.as_str(),
                "geometry": multipolygon_to_geojson(&patch.geometry),
                "properties": properties,
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn multipolygon_to_geojson(geom: &MultiPolygon<f64>) -> Value {
    let polygons: Vec<Vec<Vec<Vec<f64>>>> = geom
        .0
        .iter()
        .map(|poly| {
            std::iter::once(poly.exterior())
                .chain(poly.interiors().iter())
                .map(|ring| ring.coords().map(|c| vec![c.x, c.y]).collect())
                .collect()
        })
        .collect();
    json!({
        "type": "MultiPolygon",
        "coordinates": polygons,
    })
}

/// Import a FeatureCollection of Polygon/MultiPolygon features.
pub fn patches_from_geojson(value: &Value) -> Result<Vec<Patch>> {
    let features = value
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("not a FeatureCollection"))?;

    let mut out = Vec::new();
    for (i, feature) in features.iter().enumerate() {
        let id = feature
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("feature-{i}"));
        let properties = feature.get("properties");
        let code = properties
            .and_then(|p| p.get("code"))
            .and_then(Value::as_str)
            .unwrap_or(&id)
            .to_string();
        let name = properties
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let Some(geometry) = feature.get("geometry") else {
            log::warn!("skipping feature {id}: no geometry");
            continue;
        };
        match geometry_from_geojson(geometry) {
            Ok(geom) => out.push(Patch::new(id.as_str(), code, name, geom)),
            Err(err) => log::warn!("skipping feature {id}: {err}"),
        }
    }
    Ok(out)
}

fn geometry_from_geojson(geometry: &Value) -> Result<MultiPolygon<f64>> {
    let ty = geometry
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let coords = geometry
        .get("coordinates")
        .ok_or_else(|| anyhow!("geometry has no coordinates"))?;

    match ty {
        "Polygon" => Ok(to_multi(polygon_from_coords(coords)?)),
        "MultiPolygon" => {
            let polys = coords
                .as_array()
                .ok_or_else(|| anyhow!("MultiPolygon coordinates must be an array"))?;
            Ok(MultiPolygon(
                polys
                    .iter()
                    .map(polygon_from_coords)
                    .collect::<Result<Vec<_>>>()?,
            ))
        }
        other => bail!("unsupported geometry type {other:?}"),
    }
}

fn polygon_from_coords(value: &Value) -> Result<Polygon<f64>> {
    let rings = value
        .as_array()
        .ok_or_else(|| anyhow!("polygon coordinates must be an array of rings"))?;

    let mut parsed: Vec<LineString<f64>> = Vec::new();
    for ring in rings {
        let positions = ring
            .as_array()
            .ok_or_else(|| anyhow!("ring must be an array of positions"))?;
        let coords = positions
            .iter()
            .map(position_from_value)
            .collect::<Result<Vec<_>>>()?;
        // Degenerate rings are dropped, not an error.
        if ringmath::open_len(&coords) < 3 {
            continue;
        }
        parsed.push(LineString(coords));
    }

    let mut rings = parsed.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| anyhow!("polygon has no usable ring"))?;
    Ok(Polygon::new(exterior, rings.collect()))
}

fn position_from_value(value: &Value) -> Result<Coord<f64>> {
    let pair = value
        .as_array()
        .ok_or_else(|| anyhow!("position must be [lon, lat]"))?;
    let (Some(x), Some(y)) = (
        pair.first().and_then(Value::as_f64),
        pair.get(1).and_then(Value::as_f64),
    ) else {
        bail!("position must contain two numbers");
    };
    if !x.is_finite() || !y.is_finite() {
        bail!("non-finite coordinate");
    }
    Ok(Coord { x, y })
}
