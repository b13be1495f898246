//! Mutation Protocol Module
//!
//! Every change to the caption timeline flows through this module:
//! - Mutations are built only by [`make_mutation`]
//! - A [`CaptionSet`] completes a mutation into a new conformed snapshot
//! - A [`CaptionFile`] keeps the undoable log of completed mutations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Mutation Protocol                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  mutation.rs     - Mutation value, actions, make_mutation       │
//! │  conform.rs      - Sort / min-gap / min-duration, annotation    │
//! │  caption_set.rs  - Immutable snapshot, mutation completion      │
//! │  edits.rs        - Edit builders (gaps, start/end, text, ...)   │
//! │  executor.rs     - CaptionFile: log, undo/redo, notification    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod caption_set;
mod conform;
pub mod edits;
mod executor;
mod mutation;

pub use caption_set::{CaptionSet, CompletedMutation};
pub use conform::{
    annotate, conform, dependents, ConformMode, ConformOptions, CONFORM_NOTE, DEFAULT_MAX_PASSES,
};
pub use executor::{CaptionFile, SharedCaptionFile, DEFAULT_MAX_HISTORY};
pub use mutation::{make_mutation, ActionKind, Mutation, MutationAction, MutationRequest};
