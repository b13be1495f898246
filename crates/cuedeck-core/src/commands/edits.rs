//! Edit Builders
//!
//! Turn a user intent against the current snapshot into a validated
//! mutation. Every builder looks the target up by id first, so a caption
//! deleted in the meantime surfaces as `NotFound`.

use super::{make_mutation, ActionKind, CaptionSet, Mutation, MutationRequest};
use crate::{captions::Caption, CaptionId, CoreResult, TimeSec, MIN_GAP};

fn replace(
    set: &CaptionSet,
    id: &str,
    note: String,
    edit: impl FnOnce(Caption) -> Caption,
) -> CoreResult<Mutation> {
    let before = set.by_id(id)?.clone();
    let after = edit(before.clone());
    make_mutation(
        MutationRequest::new(ActionKind::Replace, note)
            .with_before(before)
            .with_after(after),
    )
}

/// Moves the start back by the gap to the previous caption
pub fn consume_gap_before(set: &CaptionSet, id: &str) -> CoreResult<Mutation> {
    let gap = set.view_by_id(id)?.back_size / 1000.0;
    replace(set, id, "consume gap before".to_string(), |c| {
        let start = c.start() - gap;
        c.with_start(start)
    })
}

/// Moves the end forward up to the next caption, leaving the minimum gap
pub fn consume_gap_after(set: &CaptionSet, id: &str) -> CoreResult<Mutation> {
    let view = set.view_by_id(id)?;
    let mut gap = view.fore_size / 1000.0;
    if view.next_id.is_some() {
        gap -= MIN_GAP;
    }
    replace(set, id, "consume gap after".to_string(), |c| {
        let end = c.end() + gap;
        c.with_end(end)
    })
}

/// Sets an authoritative start: the previous caption yields instead of this one
pub fn set_start(set: &CaptionSet, id: &str, time: TimeSec, note: &str) -> CoreResult<Mutation> {
    replace(set, id, format!("new start : {}", note), |c| {
        c.with_start(time).with_authoritative(true)
    })
}

pub fn set_end(set: &CaptionSet, id: &str, time: TimeSec, note: &str) -> CoreResult<Mutation> {
    replace(set, id, format!("new end : {}", note), |c| c.with_end(time))
}

pub fn set_text(set: &CaptionSet, id: &str, text: &str, note: &str) -> CoreResult<Mutation> {
    replace(set, id, format!("new text : {}", note), |c| c.with_text(text))
}

pub fn set_voice(set: &CaptionSet, id: &str, voice: &str, note: &str) -> CoreResult<Mutation> {
    replace(set, id, format!("new voice : {}", note), |c| c.with_voice(voice))
}

/// Halves the caption, keeping its start
pub fn cut_in_half(set: &CaptionSet, id: &str) -> CoreResult<Mutation> {
    replace(set, id, "cut in half".to_string(), |c| {
        let end = c.start() + c.duration() / 2.0;
        c.with_end(end)
    })
}

/// Adds an empty caption right after `id`, ending at `until` (or the minimum length)
pub fn insert_after(
    set: &CaptionSet,
    id: &str,
    until: TimeSec,
    note: &str,
) -> CoreResult<Mutation> {
    let anchor = set.by_id(id)?;
    let start = anchor.end() + MIN_GAP;
    let end = until.max(start + MIN_GAP);
    let caption = Caption::create(start, end, "").with_voice(anchor.voice());

    make_mutation(MutationRequest::new(ActionKind::Add, note).with_after(caption))
}

pub fn delete(set: &CaptionSet, id: &str, note: &str) -> CoreResult<Mutation> {
    let before = set.by_id(id)?.clone();
    make_mutation(MutationRequest::new(ActionKind::Delete, note).with_before(before))
}

/// Id of the caption at a sorted position, as shown in listings
pub fn id_at(set: &CaptionSet, index: usize) -> Option<CaptionId> {
    set.get(index).map(|c| c.id().to_string())
}
