//! Timeline Event Emission
//!
//! Subscribers learn about log changes through an injected [`EventSink`].
//! After every apply, undo, redo or rewind the caption file publishes the new
//! caption list, the voice set and the transcript text, followed by the
//! history state.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::captions::AnnotatedCaption;

// =============================================================================
// Event Types
// =============================================================================

/// Event names used by subscribers
pub mod event_names {
    /// Caption list changed
    pub const CAPTIONS_CHANGED: &str = "captions:changed";
    /// Undo/Redo state changed
    pub const HISTORY_CHANGED: &str = "history:changed";
}

/// Caption list payload
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionsChangedEvent {
    /// Note of the mutation (or history step) that caused the change
    pub cause: String,
    pub captions: Vec<AnnotatedCaption>,
    pub voices: Vec<String>,
    /// Flattened, word-wrapped transcript
    pub text: String,
}

/// History (undo/redo) state event payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChangedEvent {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_count: usize,
    pub redo_count: usize,
}

/// Everything a caption file publishes
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum TimelineEvent {
    CaptionsChanged(CaptionsChangedEvent),
    HistoryChanged(HistoryChangedEvent),
}

impl TimelineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CaptionsChanged(_) => event_names::CAPTIONS_CHANGED,
            Self::HistoryChanged(_) => event_names::HISTORY_CHANGED,
        }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Receives published events. Publishing must not fail the caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: TimelineEvent);
}

/// Drops every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: TimelineEvent) {}
}

impl<F> EventSink for F
where
    F: Fn(TimelineEvent) + Send + Sync,
{
    fn publish(&self, event: TimelineEvent) {
        self(event)
    }
}

/// Fans events out over a `tokio` broadcast channel.
///
/// Publishing never blocks; slow receivers observe `Lagged`.
#[derive(Clone, Debug)]
pub struct BroadcastSink {
    sender: broadcast::Sender<TimelineEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimelineEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: TimelineEvent) {
        let name = event.name();
        if self.sender.send(event).is_err() {
            tracing::trace!(event = name, "No subscribers for timeline event");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
