//! Caption Snapshot
//!
//! [`CaptionSet`] is an immutable, cheaply clonable snapshot of the timeline.
//! Applying a mutation never touches the receiver; it returns a
//! [`CompletedMutation`] carrying the dependent corrections and the new
//! snapshot.
//!
//! # Apply pipeline
//!
//! ```text
//! snapshot ──apply primary──▶ primary result ──conform──▶ adjusted
//!                                   │                         │
//!                                   │      dependents ◀───────┘
//!                                   ▼
//!                       apply dependents, clear flags ──▶ new snapshot
//! ```

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, OnceLock};

use super::conform::{self, ConformOptions};
use super::{Mutation, MutationAction};
use crate::{
    captions::{self, AnnotatedCaption, Caption, SpeakerBlock},
    CoreError, CoreResult,
};

// =============================================================================
// Completed Mutation
// =============================================================================

/// A primary mutation together with its cascade and resulting snapshot
#[derive(Clone, Debug)]
pub struct CompletedMutation {
    pub mutation: Mutation,
    /// Corrective `Replace` mutations produced by conformance, in apply order
    pub dependents: Vec<Mutation>,
    pub snapshot: CaptionSet,
}

// =============================================================================
// Caption Set
// =============================================================================

/// Immutable caption snapshot with memoized annotations
#[derive(Clone, Debug, Default)]
pub struct CaptionSet {
    captions: Arc<Vec<Caption>>,
    annotations: Arc<OnceLock<Vec<AnnotatedCaption>>>,
}

impl PartialEq for CaptionSet {
    fn eq(&self, other: &Self) -> bool {
        self.captions == other.captions
    }
}

impl CaptionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps an already conformed sequence
    fn from_conformed(captions: Vec<Caption>) -> Self {
        Self {
            captions: Arc::new(captions),
            annotations: Arc::new(OnceLock::new()),
        }
    }

    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    /// Captions with index, gap sizes and neighbours, computed once per snapshot
    pub fn annotated(&self) -> &[AnnotatedCaption] {
        self.annotations
            .get_or_init(|| conform::annotate(&self.captions))
    }

    pub fn len(&self) -> usize {
        self.captions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captions.is_empty()
    }

    /// Caption at a sorted position
    pub fn get(&self, index: usize) -> Option<&Caption> {
        self.captions.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.captions.iter().position(|c| c.id() == id)
    }

    /// Looks up a caption by id
    pub fn by_id(&self, id: &str) -> CoreResult<&Caption> {
        self.captions
            .iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// Looks up the annotated view of a caption by id
    pub fn view_by_id(&self, id: &str) -> CoreResult<&AnnotatedCaption> {
        let index = self
            .position(id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        self.annotated()
            .get(index)
            .ok_or_else(|| CoreError::Internal(format!("Annotation missing for {}", id)))
    }

    pub fn aggregate_speaker(&self) -> Vec<SpeakerBlock> {
        captions::aggregate_speaker(self.captions.iter())
    }

    pub fn collect_voices(&self) -> BTreeSet<String> {
        captions::collect_voices(self.captions.iter())
    }

    pub fn generate_text(&self, wrap_width: usize) -> String {
        captions::generate_text(self.captions.iter(), wrap_width)
    }

    pub fn to_vtt(&self) -> String {
        captions::export_vtt(&self.captions)
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Completes a mutation against this snapshot.
    ///
    /// Nothing is partially applied: on error the snapshot is unchanged and
    /// no new snapshot exists.
    pub fn apply_mutation(
        &self,
        mutation: Mutation,
        options: &ConformOptions,
    ) -> CoreResult<CompletedMutation> {
        let mut primary = self.captions.to_vec();
        apply_action(&mut primary, mutation.action())?;

        let adjusted = conform::conform(primary.clone(), options);
        let dependents = conform::dependents(&primary, &adjusted)?;

        let mut result = primary;
        for dependent in &dependents {
            apply_action(&mut result, dependent.action())?;
        }
        let result: Vec<Caption> = result
            .into_iter()
            .map(|c| c.with_authoritative(false))
            .collect();

        tracing::debug!(
            mutation_id = %mutation.id(),
            action = %mutation.kind(),
            dependents = dependents.len(),
            captions = result.len(),
            "Completed mutation"
        );

        Ok(CompletedMutation {
            mutation,
            dependents,
            snapshot: Self::from_conformed(result),
        })
    }
}

/// Applies one action in place and restores start order
pub(crate) fn apply_action(captions: &mut Vec<Caption>, action: &MutationAction) -> CoreResult<()> {
    match action {
        MutationAction::Clear => captions.clear(),
        MutationAction::Add { after } => {
            if captions.iter().any(|c| c.id() == after.id()) {
                return Err(CoreError::DuplicateCaption(after.id().to_string()));
            }
            captions.push(after.clone());
        }
        MutationAction::BulkAdd { bulk } => {
            let mut ids: HashSet<&str> = captions.iter().map(Caption::id).collect();
            for caption in bulk {
                if !ids.insert(caption.id()) {
                    return Err(CoreError::DuplicateCaption(caption.id().to_string()));
                }
            }
            captions.extend(bulk.iter().cloned());
        }
        MutationAction::Delete { before } => {
            let index = captions
                .iter()
                .position(|c| c.id() == before.id())
                .ok_or_else(|| CoreError::NotFound(before.id().to_string()))?;
            captions.remove(index);
        }
        MutationAction::Replace { before, after } => {
            let index = captions
                .iter()
                .position(|c| c.id() == before.id())
                .ok_or_else(|| CoreError::NotFound(before.id().to_string()))?;
            if after.id() != before.id() && captions.iter().any(|c| c.id() == after.id()) {
                return Err(CoreError::DuplicateCaption(after.id().to_string()));
            }
            captions[index] = after.clone();
        }
    }
    conform::sort_by_start(captions);
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{make_mutation, ActionKind, MutationRequest};

    fn yay() -> Caption {
        Caption::new("yay", 0.0, 1.0, "yay")
    }

    fn woof() -> Caption {
        Caption::new("woof", 2.0, 3.0, "woof")
    }

    fn bark() -> Caption {
        Caption::new("bark", 0.5, 2.5, "bark")
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn bulk(captions: Vec<Caption>) -> Mutation {
        make_mutation(MutationRequest::new(ActionKind::BulkAdd, "load").with_bulk(captions))
            .unwrap()
    }

    fn loaded(captions: Vec<Caption>) -> CaptionSet {
        CaptionSet::empty()
            .apply_mutation(bulk(captions), &ConformOptions::default())
            .unwrap()
            .snapshot
    }

    #[test]
    fn test_empty_set() {
        let set = CaptionSet::empty();
        assert!(set.is_empty());
        assert!(set.annotated().is_empty());
        assert!(matches!(set.by_id("nope"), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_bulk_add_scenario() {
        let completed = CaptionSet::empty()
            .apply_mutation(bulk(vec![yay(), woof(), bark()]), &ConformOptions::default())
            .unwrap();
        let ids: Vec<_> = completed.snapshot.captions().iter().map(Caption::id).collect();
        assert_eq!(ids, vec!["yay", "bark", "woof"]);
        assert_eq!(completed.dependents.len(), 2);

        let bark = completed.snapshot.by_id("bark").unwrap();
        assert!(approx(bark.start(), 1.001));
        assert_eq!(bark.start_raw(), "00:00:01.001");
        let woof = completed.snapshot.by_id("woof").unwrap();
        assert!(approx(woof.start(), 2.501));
        assert_eq!(woof.start_raw(), "00:00:02.501");
    }

    #[test]
    fn test_add_and_duplicate_add() {
        let set = loaded(vec![yay()]);
        let add = make_mutation(MutationRequest::new(ActionKind::Add, "add").with_after(woof()))
            .unwrap();
        let set = set.apply_mutation(add, &ConformOptions::default()).unwrap().snapshot;
        assert_eq!(set.len(), 2);

        let again =
            make_mutation(MutationRequest::new(ActionKind::Add, "add").with_after(woof())).unwrap();
        let err = set.apply_mutation(again, &ConformOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateCaption(ref id) if id == "woof"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_delete_recomputes_back_size() {
        let set = loaded(vec![yay(), woof()]);
        let delete =
            make_mutation(MutationRequest::new(ActionKind::Delete, "drop").with_before(yay()))
                .unwrap();
        let completed = set.apply_mutation(delete, &ConformOptions::default()).unwrap();

        assert!(completed.dependents.is_empty());
        let annotated = completed.snapshot.annotated();
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].id(), "woof");
        assert_eq!(annotated[0].back_size, 0.0);
        assert!(annotated[0].prev_id.is_none());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let set = loaded(vec![woof()]);
        let delete =
            make_mutation(MutationRequest::new(ActionKind::Delete, "drop").with_before(yay()))
                .unwrap();
        assert!(matches!(
            set.apply_mutation(delete, &ConformOptions::default()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_replace_with_other_id() {
        let set = loaded(vec![yay(), woof()]);
        let replace = make_mutation(
            MutationRequest::new(ActionKind::Replace, "woof is a bark")
                .with_before(woof())
                .with_after(bark()),
        )
        .unwrap();
        let set = set.apply_mutation(replace, &ConformOptions::default()).unwrap().snapshot;
        assert_eq!(set.len(), 2);
        assert!(set.by_id("woof").is_err());
        assert!(approx(set.by_id("bark").unwrap().start(), 1.001));
    }

    #[test]
    fn test_authoritative_replace_shrinks_previous() {
        let set = loaded(vec![yay(), woof()]);
        let moved = woof().with_start(0.5).with_authoritative(true);
        let replace = make_mutation(
            MutationRequest::new(ActionKind::Replace, "new start : test")
                .with_before(woof())
                .with_after(moved),
        )
        .unwrap();
        let completed = set.apply_mutation(replace, &ConformOptions::default()).unwrap();

        assert_eq!(completed.dependents.len(), 1);
        let yay = completed.snapshot.by_id("yay").unwrap();
        let woof = completed.snapshot.by_id("woof").unwrap();
        assert!(approx(yay.end(), woof.start() - 0.001));
        assert!(approx(woof.start(), 0.5));
        assert!(!woof.is_authoritative());
    }

    #[test]
    fn test_clear_empties() {
        let set = loaded(vec![yay(), woof(), bark()]);
        let clear = make_mutation(MutationRequest::new(ActionKind::Clear, "wipe")).unwrap();
        let completed = set.apply_mutation(clear, &ConformOptions::default()).unwrap();
        assert!(completed.snapshot.is_empty());
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_annotations_are_memoized() {
        let set = loaded(vec![yay(), woof()]);
        let first = set.annotated().as_ptr();
        let clone = set.clone();
        assert_eq!(first, clone.annotated().as_ptr());
        assert_eq!(set.view_by_id("woof").unwrap().index, 1);
    }
}
