use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ahash::AHashMap;
use geo::{MultiPolygon, Polygon};
use serde::Serialize;

/// Stable opaque key for a patch within a session.
/// Keeps the original id text but avoids repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatchId(Arc<str>);

impl PatchId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatchId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A polygonal region with identity. Patches partition a territory.
#[derive(Debug, Clone)]
pub struct Patch {
    pub id: PatchId,
    /// Short human label shown in lists and proposals.
    pub code: String,
    pub name: Option<String>,
    /// Always a MultiPolygon; single polygons are wrapped at ingress.
    pub geometry: MultiPolygon<f64>,
}

impl Patch {
    pub fn new(
        id: impl Into<PatchId>,
        code: impl Into<String>,
        name: Option<String>,
        geometry: MultiPolygon<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            name,
            geometry,
        }
    }
}

/// A session's view of all patches, keyed by id. Iteration order is
/// arbitrary but stable within a run; nothing downstream depends on it.
pub type PatchSet = AHashMap<PatchId, Patch>;

/// Build a [`PatchSet`] from a list of patches.
pub fn patch_set(patches: impl IntoIterator<Item = Patch>) -> PatchSet {
    patches.into_iter().map(|p| (p.id.clone(), p)).collect()
}

/// How a neighbour's geometry relates to the edited patch after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// The neighbour overlaps the new geometry beyond the overlap floor.
    Overlap,
    /// The edited boundary retracted away from the neighbour.
    Gap,
    /// Boundaries coincide within tolerance.
    Aligned,
}

/// Verdict on how cleanly a proposed segment joins the unedited remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapQuality {
    Good,
    Poor,
}

/// Wrap a single polygon as the one-element MultiPolygon the engine works on.
pub fn to_multi(polygon: Polygon<f64>) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon])
}

/// Deterministic display colour for a patch, hashed from its id.
pub fn patch_color(id: &PatchId) -> String {
    let mut hasher = fnv::FnvHasher::default();
    id.as_str().hash(&mut hasher);
    let hue = hasher.finish() % 360;
    format!("hsl({hue} 70% 50%)")
}
