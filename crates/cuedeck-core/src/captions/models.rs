//! Caption Data Models
//!
//! Defines the caption value type and its annotated view.
//!
//! # Overview
//!
//! A [`Caption`] is an immutable value: every change produces a new value
//! through one of the `with_*` overrides. Boundary strings (`start_raw`,
//! `end_raw`) are always regenerated from the numeric boundaries.
//!
//! Positional metadata (index, gap sizes, neighbours) is never stored on the
//! caption itself. It lives in [`AnnotatedCaption`], which a snapshot computes
//! from its sorted caption list.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use super::format_timestamp;
use crate::{new_id, CaptionId, TimeMs, TimeSec};

// =============================================================================
// Caption Entry
// =============================================================================

/// A single caption cue with text and timing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "CaptionRecord")]
pub struct Caption {
    id: CaptionId,
    start: TimeSec,
    start_raw: String,
    end: TimeSec,
    end_raw: String,
    align: String,
    voice: String,
    text: String,
    #[serde(skip_serializing_if = "is_false")]
    authoritative: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Wire shape of a caption. Raw strings are accepted but never trusted.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionRecord {
    id: CaptionId,
    start: TimeSec,
    end: TimeSec,
    #[serde(default)]
    align: String,
    #[serde(default)]
    voice: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    authoritative: bool,
}

impl From<CaptionRecord> for Caption {
    fn from(record: CaptionRecord) -> Self {
        Caption::new(&record.id, record.start, record.end, &record.text)
            .with_align(record.align)
            .with_voice(record.voice)
            .with_authoritative(record.authoritative)
    }
}

impl Caption {
    /// Creates a new caption with the given id, timing and text
    pub fn new(id: &str, start: TimeSec, end: TimeSec, text: &str) -> Self {
        Self {
            id: id.to_string(),
            start,
            start_raw: format_timestamp(start),
            end,
            end_raw: format_timestamp(end),
            align: String::new(),
            voice: String::new(),
            text: text.to_string(),
            authoritative: false,
        }
    }

    /// Creates a caption with auto-generated ID
    pub fn create(start: TimeSec, end: TimeSec, text: &str) -> Self {
        Self::new(&new_id(), start, end, text)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start(&self) -> TimeSec {
        self.start
    }

    pub fn end(&self) -> TimeSec {
        self.end
    }

    pub fn start_raw(&self) -> &str {
        &self.start_raw
    }

    pub fn end_raw(&self) -> &str {
        &self.end_raw
    }

    pub fn align(&self) -> &str {
        &self.align
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the start boundary was explicitly set in the pending edit
    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    /// Returns the duration of this caption in seconds
    pub fn duration(&self) -> TimeSec {
        self.end - self.start
    }

    /// Change-detection equality.
    ///
    /// Compares boundaries, their raw strings and the content fields.
    /// Identity and the authoritative flag are ignored.
    pub fn content_eq(&self, other: &Caption) -> bool {
        self.start == other.start
            && self.end == other.end
            && self.start_raw == other.start_raw
            && self.end_raw == other.end_raw
            && self.align == other.align
            && self.voice == other.voice
            && self.text == other.text
    }

    // -------------------------------------------------------------------------
    // Overrides
    // -------------------------------------------------------------------------

    /// Returns a copy with a new start boundary
    pub fn with_start(mut self, start: TimeSec) -> Self {
        self.start = start;
        self.start_raw = format_timestamp(start);
        self
    }

    /// Returns a copy with a new end boundary
    pub fn with_end(mut self, end: TimeSec) -> Self {
        self.end = end;
        self.end_raw = format_timestamp(end);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_align(mut self, align: impl Into<String>) -> Self {
        self.align = align.into();
        self
    }

    pub fn with_authoritative(mut self, authoritative: bool) -> Self {
        self.authoritative = authoritative;
        self
    }

    /// Returns a copy under a freshly generated id
    pub fn duplicate(&self) -> Self {
        Self {
            id: new_id(),
            ..self.clone()
        }
    }

    /// Regenerates both raw strings from the numeric boundaries
    pub(crate) fn normalized(self) -> Self {
        let (start, end) = (self.start, self.end);
        self.with_start(start).with_end(end)
    }
}

// =============================================================================
// Annotated Caption
// =============================================================================

/// A caption bundled with its position in a sorted snapshot.
///
/// Computed from a snapshot, never stored as state.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedCaption {
    #[serde(flatten)]
    pub caption: Caption,
    /// 0-based position in the sorted sequence
    pub index: usize,
    /// Milliseconds between the previous caption's end and this start (0 if first)
    pub back_size: TimeMs,
    /// Milliseconds between this end and the next caption's start (at least 1)
    pub fore_size: TimeMs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_id: Option<CaptionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_id: Option<CaptionId>,
}

impl Deref for AnnotatedCaption {
    type Target = Caption;

    fn deref(&self) -> &Caption {
        &self.caption
    }
}

// =============================================================================
// Tests
// =============================================================================
