//! Caption System Module
//!
//! Provides the caption value type and everything that reads or writes it
//! outside the mutation protocol:
//! - Caption data models (Caption, AnnotatedCaption)
//! - Boundary time format, cue stream ingestion and VTT export
//! - Transcript views (speaker blocks, voices, wrapped text)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Caption System                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  models.rs      - Caption value type and annotated view         │
//! │  formats.rs     - HH:MM:SS.mmm, cue stream reader, VTT export   │
//! │  transcript.rs  - Speaker blocks, voice set, transcript text    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod formats;
mod models;
mod transcript;

// Re-export models
pub use models::{AnnotatedCaption, Caption};

// Re-export format functions
pub use formats::{export_vtt, format_timestamp, parse_timestamp, parse_vtt, CueStream, ParseError};

// Re-export transcript views
pub use transcript::{
    aggregate_speaker, collect_voices, generate_text, SpeakerBlock, DEFAULT_WRAP_WIDTH,
};
