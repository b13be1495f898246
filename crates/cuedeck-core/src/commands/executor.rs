//! Caption File / Mutation Log
//!
//! Owns the append-only history of completed mutations. The current timeline
//! is always the snapshot of the last applied entry; undo and redo only move
//! the boundary between applied and undone entries.
//!
//! # Architecture
//!
//! ```text
//!                 apply_mutation
//!   producer ──────────────────────▶ CaptionFile
//!                                     │  current CaptionSet
//!                                     │    └─ apply_mutation ─▶ CompletedMutation
//!                                     │  changes  ◀── push ───────────┘
//!                                     │  undone_changes  (undo / redo)
//!                                     ├─▶ MutationJournal  (optional)
//!                                     └─▶ EventSink        (captions, history)
//! ```

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use super::{edits, CaptionSet, CompletedMutation, ConformOptions, Mutation};
use crate::{
    captions::{AnnotatedCaption, Caption, SpeakerBlock, DEFAULT_WRAP_WIDTH},
    events::{CaptionsChangedEvent, EventSink, HistoryChangedEvent, NullSink, TimelineEvent},
    project::{EntryKind, JournalEntry, MutationJournal},
    settings::EditorSettings,
    CoreError, CoreResult, MutationId, TimeSec,
};

/// Default number of applied entries kept for undo
pub const DEFAULT_MAX_HISTORY: usize = 1000;

/// Caption file shared across threads; the mutex serializes the log
pub type SharedCaptionFile = Arc<Mutex<CaptionFile>>;

// =============================================================================
// Caption File
// =============================================================================

/// Mutation log with undo/redo and change notification
pub struct CaptionFile {
    /// Snapshot below the oldest retained entry
    base: CaptionSet,
    changes: VecDeque<CompletedMutation>,
    undone_changes: Vec<CompletedMutation>,
    /// Every mutation id ever accepted, for duplicate dispatch
    seen_ids: HashSet<MutationId>,
    options: ConformOptions,
    max_history: usize,
    wrap_width: usize,
    sink: Arc<dyn EventSink>,
    journal: Option<MutationJournal>,
}

impl fmt::Debug for CaptionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionFile")
            .field("captions", &self.current().len())
            .field("undo_count", &self.undo_count())
            .field("redo_count", &self.redo_count())
            .field("options", &self.options)
            .field("journal", &self.journal.as_ref().map(MutationJournal::path))
            .finish()
    }
}

impl Default for CaptionFile {
    fn default() -> Self {
        Self::new(Arc::new(NullSink), ConformOptions::default())
    }
}

impl CaptionFile {
    /// Creates an empty caption file publishing to `sink`
    pub fn new(sink: Arc<dyn EventSink>, options: ConformOptions) -> Self {
        Self {
            base: CaptionSet::empty(),
            changes: VecDeque::new(),
            undone_changes: Vec::new(),
            seen_ids: HashSet::new(),
            options,
            max_history: DEFAULT_MAX_HISTORY,
            wrap_width: DEFAULT_WRAP_WIDTH,
            sink,
            journal: None,
        }
    }

    /// Creates an empty caption file configured from settings
    pub fn from_settings(settings: &EditorSettings, sink: Arc<dyn EventSink>) -> Self {
        Self::new(sink, settings.conform_options())
            .with_max_history(settings.history.max_history)
            .with_wrap_width(settings.transcript.wrap_width)
    }

    /// Sets the maximum history size
    pub fn with_max_history(mut self, size: usize) -> Self {
        self.max_history = size.max(1);
        self.trim_history();
        self
    }

    pub fn with_wrap_width(mut self, width: usize) -> Self {
        self.wrap_width = width;
        self
    }

    /// Records every later apply, undo and redo in `journal`
    pub fn with_journal(mut self, journal: MutationJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Wraps the file for cross-thread use
    pub fn into_shared(self) -> SharedCaptionFile {
        Arc::new(Mutex::new(self))
    }

    /// Replays journal entries into this (fresh) file.
    ///
    /// The attached journal, if any, is not written during replay.
    pub fn restore<I>(mut self, entries: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = JournalEntry>,
    {
        let journal = self.journal.take();
        let mut replayed = 0usize;

        for entry in entries {
            match (entry.kind, entry.mutation) {
                (EntryKind::Apply, Some(mutation)) => {
                    self.apply_mutation(mutation)?;
                }
                (EntryKind::Apply, None) => {
                    return Err(CoreError::ValidationError(format!(
                        "Journal entry {} has no mutation",
                        entry.id
                    )));
                }
                (EntryKind::Undo, _) => {
                    self.undo()?;
                }
                (EntryKind::Redo, _) => {
                    self.redo()?;
                }
            }
            replayed += 1;
        }

        self.journal = journal;
        tracing::info!(
            entries = replayed,
            captions = self.current().len(),
            "Restored caption file from journal"
        );
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    fn current(&self) -> &CaptionSet {
        self.changes
            .back()
            .map(|entry| &entry.snapshot)
            .unwrap_or(&self.base)
    }

    /// The current snapshot (cheap clone)
    pub fn snapshot(&self) -> CaptionSet {
        self.current().clone()
    }

    pub fn captions(&self) -> &[Caption] {
        self.current().captions()
    }

    pub fn annotated(&self) -> &[AnnotatedCaption] {
        self.current().annotated()
    }

    pub fn by_id(&self, id: &str) -> CoreResult<&Caption> {
        self.current().by_id(id)
    }

    pub fn options(&self) -> &ConformOptions {
        &self.options
    }

    pub fn aggregate_speaker(&self) -> Vec<SpeakerBlock> {
        self.current().aggregate_speaker()
    }

    pub fn collect_voices(&self) -> BTreeSet<String> {
        self.current().collect_voices()
    }

    /// Transcript text at the configured wrap width
    pub fn generate_text(&self) -> String {
        self.current().generate_text(self.wrap_width)
    }

    pub fn to_vtt(&self) -> String {
        self.current().to_vtt()
    }

    pub fn can_undo(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone_changes.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.changes.len()
    }

    pub fn redo_count(&self) -> usize {
        self.undone_changes.len()
    }

    /// Notes of the applied entries, oldest first
    pub fn history(&self) -> Vec<&str> {
        self.changes.iter().map(|entry| entry.mutation.note()).collect()
    }

    /// The applied entries, oldest first
    pub fn changes(&self) -> impl Iterator<Item = &CompletedMutation> {
        self.changes.iter()
    }

    // -------------------------------------------------------------------------
    // Log Operations
    // -------------------------------------------------------------------------

    /// Completes `mutation` against the current snapshot and appends it.
    ///
    /// A mutation whose id was already accepted is ignored and the current
    /// snapshot is returned unchanged.
    pub fn apply_mutation(&mut self, mutation: Mutation) -> CoreResult<CaptionSet> {
        if self.seen_ids.contains(mutation.id()) {
            tracing::warn!(mutation_id = %mutation.id(), "Ignoring duplicate mutation dispatch");
            return Ok(self.snapshot());
        }

        let completed = self.current().apply_mutation(mutation, &self.options)?;
        if let Some(journal) = &self.journal {
            journal.append(&JournalEntry::apply(completed.mutation.clone()))?;
        }

        tracing::debug!(
            mutation_id = %completed.mutation.id(),
            note = %completed.mutation.note(),
            dependents = completed.dependents.len(),
            "Applied mutation"
        );

        let cause = completed.mutation.note().to_string();
        self.seen_ids.insert(completed.mutation.id().to_string());
        self.changes.push_back(completed);
        self.undone_changes.clear();
        self.trim_history();
        self.publish(&cause);

        Ok(self.snapshot())
    }

    /// Moves the last applied entry onto the redo stack
    pub fn undo(&mut self) -> CoreResult<CaptionSet> {
        if self.changes.is_empty() {
            return Err(CoreError::NothingToUndo);
        }
        self.record(&[JournalEntry::undo()])?;
        self.step_back();
        tracing::info!(undo_count = self.undo_count(), "Undo");
        self.publish("undo");
        Ok(self.snapshot())
    }

    /// Re-appends the most recently undone entry
    pub fn redo(&mut self) -> CoreResult<CaptionSet> {
        if self.undone_changes.is_empty() {
            return Err(CoreError::NothingToRedo);
        }
        self.record(&[JournalEntry::redo()])?;
        self.step_forward();
        tracing::info!(undo_count = self.undo_count(), "Redo");
        self.publish("redo");
        Ok(self.snapshot())
    }

    /// Moves the log boundary so exactly `applied` entries are applied
    pub fn rewind_to(&mut self, applied: usize) -> CoreResult<CaptionSet> {
        let max = self.changes.len() + self.undone_changes.len();
        if applied > max {
            return Err(CoreError::InvalidHistoryIndex {
                index: applied,
                max,
            });
        }

        let current = self.changes.len();
        let entries: Vec<JournalEntry> = if applied < current {
            (applied..current).map(|_| JournalEntry::undo()).collect()
        } else {
            (current..applied).map(|_| JournalEntry::redo()).collect()
        };
        if entries.is_empty() {
            return Ok(self.snapshot());
        }
        self.record(&entries)?;

        while self.changes.len() > applied {
            self.step_back();
        }
        while self.changes.len() < applied {
            self.step_forward();
        }

        tracing::info!(from = current, to = applied, "Rewound history");
        self.publish("rewind");
        Ok(self.snapshot())
    }

    // -------------------------------------------------------------------------
    // Cut Operations
    // -------------------------------------------------------------------------

    /// Ends the previous caption at `time`, then starts this one there
    pub fn cut_to_prev(&mut self, id: &str, time: TimeSec) -> CoreResult<CaptionSet> {
        let prev_id = self.current().view_by_id(id)?.prev_id.clone();
        if let Some(prev_id) = prev_id {
            let mutation =
                edits::set_end(self.current(), &prev_id, time, "cut to prev - end of prev")?;
            self.apply_mutation(mutation)?;
        }
        let mutation =
            edits::set_start(self.current(), id, time, "cut to prev - start of current")?;
        self.apply_mutation(mutation)
    }

    /// Ends this caption at `time`, then starts the next one there
    pub fn cut_to_next(&mut self, id: &str, time: TimeSec) -> CoreResult<CaptionSet> {
        let mutation = edits::set_end(self.current(), id, time, "cut to next - end of current")?;
        self.apply_mutation(mutation)?;

        let next_id = self.current().view_by_id(id)?.next_id.clone();
        match next_id {
            Some(next_id) => {
                let mutation = edits::set_start(
                    self.current(),
                    &next_id,
                    time,
                    "cut to next - start of next",
                )?;
                self.apply_mutation(mutation)
            }
            None => Ok(self.snapshot()),
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn step_back(&mut self) {
        if let Some(entry) = self.changes.pop_back() {
            self.undone_changes.push(entry);
        }
    }

    fn step_forward(&mut self) {
        if let Some(entry) = self.undone_changes.pop() {
            self.changes.push_back(entry);
        }
    }

    fn record(&self, entries: &[JournalEntry]) -> CoreResult<()> {
        match &self.journal {
            Some(journal) => journal.append_batch(entries),
            None => Ok(()),
        }
    }

    fn trim_history(&mut self) {
        while self.changes.len() > self.max_history {
            if let Some(oldest) = self.changes.pop_front() {
                tracing::debug!(
                    mutation_id = %oldest.mutation.id(),
                    "Dropping oldest history entry"
                );
                self.base = oldest.snapshot;
            }
        }
    }

    fn publish(&self, cause: &str) {
        let current = self.current();
        self.sink.publish(TimelineEvent::CaptionsChanged(CaptionsChangedEvent {
            cause: cause.to_string(),
            captions: current.annotated().to_vec(),
            voices: current.collect_voices().into_iter().collect(),
            text: current.generate_text(self.wrap_width),
        }));
        self.sink.publish(TimelineEvent::HistoryChanged(HistoryChangedEvent {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
            undo_count: self.undo_count(),
            redo_count: self.redo_count(),
        }));
    }
}

// =============================================================================
// Tests
// =============================================================================
