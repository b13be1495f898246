//! Timeline Conformance
//!
//! Pure functions that turn an arbitrary caption sequence into the canonical
//! one: sorted by start, separated by at least [`MIN_GAP`], every caption at
//! least [`MIN_GAP`] long.
//!
//! # Rules per adjacent pair (prev, current)
//!
//! ```text
//! current.start < prev.end + MIN_GAP ?
//!   ├─ current authoritative, prev stays >= MIN_GAP long
//!   │     → prev.end = current.start - MIN_GAP
//!   └─ otherwise
//!         → current.start = prev.end + MIN_GAP
//! current.end < current.start + MIN_GAP ?
//!         → current.end = current.start + MIN_GAP
//! ```
//!
//! In [`ConformMode::FixedPoint`] adjusted values cascade within a pass and
//! passes repeat until nothing changes. [`ConformMode::SinglePass`] compares
//! each caption against its neighbour as it was before the pass, once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{make_mutation, ActionKind, Mutation, MutationRequest};
use crate::{
    captions::{AnnotatedCaption, Caption},
    CoreResult, MIN_GAP, TIME_EPSILON,
};

/// Note carried by every dependent mutation
pub const CONFORM_NOTE: &str = "conformation adjust";

/// Default safety cap on fixed-point passes
pub const DEFAULT_MAX_PASSES: usize = 16;

// =============================================================================
// Options
// =============================================================================

/// How conformance resolves chained overlaps
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConformMode {
    /// Cascade adjustments and repeat until stable
    #[default]
    FixedPoint,
    /// One pass against pre-pass neighbours (legacy behaviour)
    SinglePass,
}

/// Conformance configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformOptions {
    pub mode: ConformMode,
    pub max_passes: usize,
}

impl Default for ConformOptions {
    fn default() -> Self {
        Self {
            mode: ConformMode::FixedPoint,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl ConformOptions {
    pub fn single_pass() -> Self {
        Self {
            mode: ConformMode::SinglePass,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ConformMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }
}

// =============================================================================
// Conformance
// =============================================================================

/// Stable sort by start time
pub(crate) fn sort_by_start(captions: &mut [Caption]) {
    captions.sort_by(|a, b| a.start().total_cmp(&b.start()));
}

/// Runs one pass in place. Returns true if anything was adjusted.
fn conform_pass(captions: &mut [Caption], mode: ConformMode) -> bool {
    sort_by_start(captions);
    let pre_pass = match mode {
        ConformMode::SinglePass => Some(captions.to_vec()),
        ConformMode::FixedPoint => None,
    };

    let mut changed = false;
    for i in 0..captions.len() {
        if i > 0 {
            let prev_end = match &pre_pass {
                Some(original) => original[i - 1].end(),
                None => captions[i - 1].end(),
            };
            let current = captions[i].clone();

            if current.start() < prev_end + MIN_GAP - TIME_EPSILON {
                let trimmed_end = current.start() - MIN_GAP;
                let prev = &captions[i - 1];
                if current.is_authoritative()
                    && trimmed_end - prev.start() >= MIN_GAP - TIME_EPSILON
                {
                    captions[i - 1] = prev.clone().with_end(trimmed_end);
                } else {
                    captions[i] = current.with_start(prev_end + MIN_GAP);
                }
                changed = true;
            }
        }

        let current = &captions[i];
        if current.end() - current.start() < MIN_GAP - TIME_EPSILON {
            let start = current.start();
            captions[i] = current.clone().with_end(start + MIN_GAP);
            changed = true;
        }
    }
    changed
}

/// Conforms a caption sequence.
///
/// Returns the sorted, adjusted sequence. Authoritative flags are left as
/// they were; clearing them is the snapshot's job.
pub fn conform(mut captions: Vec<Caption>, options: &ConformOptions) -> Vec<Caption> {
    let max_passes = match options.mode {
        ConformMode::SinglePass => 1,
        ConformMode::FixedPoint => options.max_passes.max(1),
    };

    let mut passes = 0;
    let mut stable = false;
    while passes < max_passes {
        passes += 1;
        if !conform_pass(&mut captions, options.mode) {
            stable = true;
            break;
        }
    }

    if !stable && options.mode == ConformMode::FixedPoint {
        tracing::warn!(passes, "Conformance hit the pass cap before settling");
    }
    tracing::trace!(passes, count = captions.len(), "Conformed caption sequence");

    captions
}

/// Builds the dependent `Replace` mutations turning `before` into `after`.
///
/// Captions are matched by id; one mutation per caption whose content
/// changed, in the order of `after`.
pub fn dependents(before: &[Caption], after: &[Caption]) -> CoreResult<Vec<Mutation>> {
    let originals: HashMap<&str, &Caption> = before.iter().map(|c| (c.id(), c)).collect();

    after
        .iter()
        .filter_map(|adjusted| {
            originals
                .get(adjusted.id())
                .filter(|original| !original.content_eq(adjusted))
                .map(|original| (*original, adjusted))
        })
        .map(|(original, adjusted)| {
            make_mutation(
                MutationRequest::new(ActionKind::Replace, CONFORM_NOTE)
                    .with_before(original.clone())
                    .with_after(adjusted.clone().with_authoritative(false)),
            )
        })
        .collect()
}

// =============================================================================
// Annotation
// =============================================================================

/// Computes positional metadata for an already conformed sequence
pub fn annotate(captions: &[Caption]) -> Vec<AnnotatedCaption> {
    captions
        .iter()
        .enumerate()
        .map(|(index, caption)| {
            let prev = index.checked_sub(1).and_then(|i| captions.get(i));
            let next = captions.get(index + 1);

            let back_size = prev.map_or(0.0, |p| (caption.start() - p.end()) * 1000.0);
            let fore_size =
                next.map_or(MIN_GAP, |n| (n.start() - caption.end()).max(MIN_GAP)) * 1000.0;

            AnnotatedCaption {
                caption: caption.clone(),
                index,
                back_size,
                fore_size,
                prev_id: prev.map(|p| p.id().to_string()),
                next_id: next.map(|n| n.id().to_string()),
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
