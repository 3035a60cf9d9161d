//! Stateful edit session over a patch set.
//!
//! The session is the only mutator: it owns the original snapshot, staged
//! geometry changes, new patches and deletions, and derives the working view
//! on demand. Proposals are ephemeral; dirty ids accumulate across
//! modifications and are cleared on commit.

use ahash::{AHashMap, AHashSet};
use anyhow::{anyhow, bail, Result};
use geo::MultiPolygon;

use crate::analysis::{analyse_post_edit, PostEditAnalysis};
use crate::sync::{generate_boundary_proposals, BoundaryProposal};
use crate::types::{Patch, PatchId, PatchSet, Relationship, SnapQuality};

/// What the session is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    View,
    Draw,
    SimplifyPreview,
    SimplifyRefine,
}

/// Result of one apply-edit orchestration.
#[derive(Debug)]
pub struct EditOutcome {
    pub analysis: PostEditAnalysis,
    /// Linked neighbours whose good proposals were applied automatically.
    pub auto_aligned: Vec<PatchId>,
    /// Proposals held back for manual review.
    pub pending: Vec<BoundaryProposal>,
}

#[derive(Debug, Default)]
pub struct EditSession {
    original: PatchSet,
    modified: AHashMap<PatchId, MultiPolygon<f64>>,
    new_patches: Vec<Patch>,
    deleted: AHashSet<PatchId>,
    dirty: AHashSet<PatchId>,
    mode: EditMode,
    selected: Option<PatchId>,
    simplified_preview: Option<MultiPolygon<f64>>,
    linked_neighbours: AHashSet<PatchId>,
}

impl EditSession {
    /// Start a session over the patches loaded from the store.
    pub fn new(patches: impl IntoIterator<Item = Patch>) -> Self {
        Self {
            original: crate::types::patch_set(patches),
            ..Self::default()
        }
    }

    #[inline] pub fn mode(&self) -> EditMode { self.mode }

    #[inline] pub fn selected(&self) -> Option<&PatchId> { self.selected.as_ref() }

    #[inline] pub fn simplified_preview(&self) -> Option<&MultiPolygon<f64>> {
        self.simplified_preview.as_ref()
    }

    /// Ids touched since the last commit, sorted for stable persistence.
    pub fn dirty_ids(&self) -> Vec<PatchId> {
        let mut ids: Vec<PatchId> = self.dirty.iter().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    pub fn select_patch(&mut self, id: Option<PatchId>) {
        self.selected = id;
    }

    pub fn enter_draw_mode(&mut self) {
        self.mode = EditMode::Draw;
    }

    pub fn enter_edit_boundary_mode(&mut self) {
        self.mode = EditMode::SimplifyPreview;
    }

    /// Switch to manual refinement of a simplified geometry. The preview is
    /// kept so the post-edit analysis can narrow to the user's actual edit.
    pub fn enter_refine_mode(&mut self, simplified: MultiPolygon<f64>) {
        self.mode = EditMode::SimplifyRefine;
        self.simplified_preview = Some(simplified);
    }

    pub fn exit_edit_mode(&mut self) {
        self.mode = EditMode::View;
        self.simplified_preview = None;
    }

    /// Neighbours the user chose to keep aligned with the upcoming edit.
    pub fn set_linked_neighbours(&mut self, ids: impl IntoIterator<Item = PatchId>) {
        self.linked_neighbours = ids.into_iter().collect();
    }

    fn exists(&self, id: &PatchId) -> bool {
        (self.original.contains_key(id) && !self.deleted.contains(id))
            || self.new_patches.iter().any(|p| &p.id == id)
    }

    /// Stage a geometry change for an existing patch.
    pub fn update_geometry(&mut self, id: &PatchId, geometry: MultiPolygon<f64>) -> Result<()> {
        if !self.exists(id) {
            bail!("unknown patch {id}");
        }
        self.modified.insert(id.clone(), geometry);
        self.dirty.insert(id.clone());
        Ok(())
    }

    /// Stage a brand-new patch, e.g. one drawn to fill a detected gap.
    pub fn add_new_patch(&mut self, patch: Patch) {
        self.dirty.insert(patch.id.clone());
        self.deleted.remove(&patch.id);
        self.new_patches.push(patch);
    }

    pub fn mark_deleted(&mut self, id: &PatchId) -> Result<()> {
        if !self.exists(id) {
            bail!("unknown patch {id}");
        }
        self.new_patches.retain(|p| &p.id != id);
        self.deleted.insert(id.clone());
        self.dirty.insert(id.clone());
        Ok(())
    }

    /// Forget dirty state, for all ids or just the ones persisted.
    pub fn clear_dirty(&mut self, ids: Option<&[PatchId]>) {
        match ids {
            Some(ids) => {
                for id in ids {
                    self.dirty.remove(id);
                }
            }
            None => self.dirty.clear(),
        }
    }

    /// The derived view `(original - deleted) with modified applied, ∪ new`.
    pub fn working_set(&self) -> PatchSet {
        let mut out: PatchSet = self
            .original
            .iter()
            .filter(|(id, _)| !self.deleted.contains(*id))
            .map(|(id, patch)| {
                let mut patch = patch.clone();
                if let Some(geom) = self.modified.get(id) {
                    patch.geometry = geom.clone();
                }
                (id.clone(), patch)
            })
            .collect();
        for patch in &self.new_patches {
            let mut patch = patch.clone();
            if let Some(geom) = self.modified.get(&patch.id) {
                patch.geometry = geom.clone();
            }
            out.insert(patch.id.clone(), patch);
        }
        out
    }

    /// Apply an approved edit to patch `id`.
    ///
    /// Captures the pre-edit state, stages the new geometry, analyses the
    /// consequences, and auto-applies good proposals for linked neighbours.
    /// Poor proposals are returned for manual review instead of applied.
    pub fn apply_edit(&mut self, id: &PatchId, new_geometry: MultiPolygon<f64>) -> Result<EditOutcome> {
        let pre_edit = self.working_set();
        let old_geometry = pre_edit
            .get(id)
            .map(|p| p.geometry.clone())
            .ok_or_else(|| anyhow!("unknown patch {id}"))?;
        let pre_edit_simplified = if self.mode == EditMode::SimplifyRefine {
            self.simplified_preview.clone()
        } else {
            None
        };

        self.update_geometry(id, new_geometry.clone())?;
        self.exit_edit_mode();

        let mut analysis = analyse_post_edit(
            id,
            &old_geometry,
            &new_geometry,
            &pre_edit,
            pre_edit_simplified.as_ref(),
        );

        let mut auto_aligned = Vec::new();
        let mut pending = Vec::new();
        if !self.linked_neighbours.is_empty() {
            let proposals = generate_boundary_proposals(
                &analysis,
                &new_geometry,
                &pre_edit,
                Some(&old_geometry),
            );
            for proposal in proposals {
                if !self.linked_neighbours.contains(&proposal.patch_id) {
                    continue;
                }
                if proposal.snap_quality == SnapQuality::Good {
                    self.update_geometry(&proposal.patch_id, proposal.proposed_geometry.clone())?;
                    auto_aligned.push(proposal.patch_id.clone());
                } else {
                    pending.push(proposal);
                }
            }
        }
        for nb in &mut analysis.neighbours {
            if auto_aligned.contains(&nb.adjacency.patch_id) {
                nb.relationship = Relationship::Aligned;
            }
        }

        Ok(EditOutcome {
            analysis,
            auto_aligned,
            pending,
        })
    }

    /// Apply the edited geometry verbatim to the duplicates the user
    /// consented to, so near-identical patches follow the edit.
    pub fn apply_to_duplicates(
        &mut self,
        analysis: &PostEditAnalysis,
        geometry: &MultiPolygon<f64>,
        consented: &[PatchId],
    ) -> Result<()> {
        for dup in &analysis.duplicates {
            if consented.contains(&dup.patch_id) {
                self.update_geometry(&dup.patch_id, geometry.clone())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::to_multi;
    use geo::{Coord, LineString, Polygon};

    fn c(x: f64, y: f64) -> Coord<f64> {
        Coord { x, y }
    }

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        to_multi(Polygon::new(
            LineString(vec![
                c(x0, y0),
                c(x0 + size, y0),
                c(x0 + size, y0 + size),
                c(x0, y0 + size),
                c(x0, y0),
            ]),
            vec![],
        ))
    }

    /// Rectangle ring with `n` vertices per side, counter-clockwise from the
    /// south-west corner.
    fn dense_rect(x0: f64, y0: f64, x1: f64, y1: f64, n: usize) -> MultiPolygon<f64> {
        let mut coords = Vec::with_capacity(4 * n + 1);
        for i in 0..n {
            coords.push(c(x0 + (x1 - x0) * i as f64 / n as f64, y0));
        }
        for i in 0..n {
            coords.push(c(x1, y0 + (y1 - y0) * i as f64 / n as f64));
        }
        for i in 0..n {
            coords.push(c(x1 - (x1 - x0) * i as f64 / n as f64, y1));
        }
        for i in 0..n {
            coords.push(c(x0, y1 - (y1 - y0) * i as f64 / n as f64));
        }
        coords.push(coords[0]);
        to_multi(Polygon::new(LineString(coords), vec![]))
    }

    fn three_patch_session() -> EditSession {
        EditSession::new([
            Patch::new("a", "A", Some("Alpha".into()), square(0.0, 0.0, 1.0)),
            Patch::new("b", "B", None, square(1.0, 0.0, 1.0)),
            Patch::new("c", "C", None, square(2.0, 0.0, 1.0)),
        ])
    }

    #[test]
    fn working_set_applies_modifications_and_deletions() {
        let mut session = three_patch_session();
        let b = PatchId::from("b");
        let c_id = PatchId::from("c");

        session.update_geometry(&b, square(1.0, 0.0, 2.0)).unwrap();
        session.mark_deleted(&c_id).unwrap();
        session.add_new_patch(Patch::new("d", "D", None, square(3.0, 0.0, 1.0)));

        let working = session.working_set();
        assert_eq!(working.len(), 3);
        assert!(working.contains_key(&PatchId::from("a")));
        assert!(!working.contains_key(&c_id));
        assert!(working.contains_key(&PatchId::from("d")));
        assert_eq!(working.get(&b).unwrap().geometry, square(1.0, 0.0, 2.0));

        let dirty: Vec<String> = session
            .dirty_ids()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        assert_eq!(dirty, vec!["b", "c", "d"]);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut session = three_patch_session();
        let ghost = PatchId::from("ghost");

        assert!(session.update_geometry(&ghost, square(0.0, 0.0, 1.0)).is_err());
        assert!(session.mark_deleted(&ghost).is_err());
        assert!(session.apply_edit(&ghost, square(0.0, 0.0, 1.0)).is_err());
    }

    #[test]
    fn deleted_patches_cannot_be_updated() {
        let mut session = three_patch_session();
        let c_id = PatchId::from("c");
        session.mark_deleted(&c_id).unwrap();
        assert!(session.update_geometry(&c_id, square(2.0, 0.0, 1.0)).is_err());
    }

    #[test]
    fn clear_dirty_can_be_partial() {
        let mut session = three_patch_session();
        let a = PatchId::from("a");
        let b = PatchId::from("b");
        session.update_geometry(&a, square(0.0, 0.0, 1.5)).unwrap();
        session.update_geometry(&b, square(1.0, 0.0, 1.5)).unwrap();

        session.clear_dirty(Some(&[a.clone()]));
        assert_eq!(session.dirty_ids(), vec![b.clone()]);

        session.clear_dirty(None);
        assert!(session.dirty_ids().is_empty());
    }

    #[test]
    fn refine_mode_keeps_the_preview_until_exit() {
        let mut session = three_patch_session();
        assert_eq!(session.mode(), EditMode::View);

        session.enter_edit_boundary_mode();
        assert_eq!(session.mode(), EditMode::SimplifyPreview);

        session.enter_refine_mode(square(0.0, 0.0, 1.0));
        assert_eq!(session.mode(), EditMode::SimplifyRefine);
        assert!(session.simplified_preview().is_some());

        session.exit_edit_mode();
        assert_eq!(session.mode(), EditMode::View);
        assert!(session.simplified_preview().is_none());
    }

    #[test]
    fn apply_edit_reports_neighbours_without_linking() {
        // 1 km-scale squares; the edit pushes a's east side ~11 m into b.
        let mut session = EditSession::new([
            Patch::new("a", "A", None, dense_rect(0.0, 0.0, 4e-3, 4e-3, 100)),
            Patch::new("b", "B", None, dense_rect(4e-3, 0.0, 8e-3, 4e-3, 100)),
        ]);
        let a = PatchId::from("a");

        let outcome = session
            .apply_edit(&a, dense_rect(0.0, 0.0, 4.1e-3, 4e-3, 100))
            .unwrap();

        assert_eq!(outcome.analysis.neighbours.len(), 1);
        assert_eq!(
            outcome.analysis.neighbours[0].relationship,
            Relationship::Overlap
        );
        assert!(outcome.auto_aligned.is_empty());
        assert!(outcome.pending.is_empty());
        assert_eq!(session.dirty_ids(), vec![a]);
    }

    #[test]
    fn consenting_duplicates_follow_the_edit() {
        let twin_geom = square(0.0, 0.0, 1.0);
        let mut session = EditSession::new([
            Patch::new("a", "A", None, twin_geom.clone()),
            Patch::new("twin", "T", None, twin_geom),
        ]);
        let a = PatchId::from("a");
        let twin = PatchId::from("twin");

        let new_geom = square(0.0, 0.0, 1.2);
        let outcome = session.apply_edit(&a, new_geom.clone()).unwrap();
        assert_eq!(outcome.analysis.duplicates.len(), 1);

        session
            .apply_to_duplicates(&outcome.analysis, &new_geom, &[twin.clone()])
            .unwrap();

        let working = session.working_set();
        assert_eq!(working.get(&twin).unwrap().geometry, new_geom);
    }

    #[test]
    fn apply_edit_auto_aligns_linked_neighbours() {
        // Metre-scale vertex spacing (~4.4 m) so the proposal joins cleanly.
        let mut session = EditSession::new([
            Patch::new("a", "A", None, dense_rect(0.0, 0.0, 4e-3, 4e-3, 100)),
            Patch::new("b", "B", None, dense_rect(4e-3, 0.0, 8e-3, 4e-3, 100)),
        ]);
        let a = PatchId::from("a");
        let b = PatchId::from("b");
        session.set_linked_neighbours([b.clone()]);

        let outcome = session
            .apply_edit(&a, dense_rect(0.0, 0.0, 4.01e-3, 4e-3, 100))
            .unwrap();

        assert_eq!(outcome.auto_aligned, vec![b.clone()]);
        assert!(outcome.pending.is_empty());
        assert_eq!(
            outcome.analysis.neighbours[0].relationship,
            Relationship::Aligned
        );

        // The linked neighbour's shared edge followed the edit.
        let working = session.working_set();
        let moved = &working.get(&b).unwrap().geometry.0[0];
        let west_interior: Vec<&Coord<f64>> = moved
            .exterior()
            .0
            .iter()
            .filter(|v| v.y > 1e-3 && v.y < 3e-3 && v.x < 4.05e-3)
            .collect();
        assert!(!west_interior.is_empty());
        for v in west_interior {
            assert!((v.x - 4.01e-3).abs() < 1e-9, "west vertex at x={}", v.x);
        }
        assert_eq!(session.dirty_ids(), vec![a, b]);
    }
}
