//! cuedeck Core Library
//!
//! Caption timeline engine for the cuedeck subtitle editor.
//! This library stores an ordered sequence of time-ranged captions, applies
//! mutations to it, keeps it conformant (sorted, non-overlapping, gap-annotated)
//! after every edit, and keeps an undoable mutation log.
//!
//! The engine is synchronous and free of UI and audio dependencies.
//! Collaborators feed it [`Mutation`]s built through [`make_mutation`] and
//! receive caption snapshots back through an injected [`EventSink`].

pub mod captions;
pub mod commands;
pub mod events;
pub mod project;
pub mod settings;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

pub use captions::{AnnotatedCaption, Caption};
pub use commands::{
    make_mutation, ActionKind, CaptionFile, CaptionSet, CompletedMutation, ConformMode,
    ConformOptions, Mutation, MutationAction, MutationRequest, SharedCaptionFile,
};
pub use events::{BroadcastSink, EventSink, NullSink, TimelineEvent};
pub use settings::EditorSettings;

#[cfg(test)]
mod tests_destructive;
