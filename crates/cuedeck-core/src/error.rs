//! cuedeck Error Definitions
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

use super::{CaptionId, TimeSec};
use crate::captions::ParseError;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Mutation Errors
    // =========================================================================
    #[error("Invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("Mutation payload error: {0}")]
    MutationPayloadError(String),

    #[error("Unknown mutation action: {0}")]
    UnknownMutationAction(String),

    #[error("Invalid time: {0} seconds")]
    InvalidTime(TimeSec),

    // =========================================================================
    // Timeline Errors
    // =========================================================================
    #[error("Caption not found: {0}")]
    NotFound(CaptionId),

    #[error("Caption already present: {0}")]
    DuplicateCaption(CaptionId),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    // =========================================================================
    // History Errors
    // =========================================================================
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("History index {index} out of range (0..={max})")]
    InvalidHistoryIndex { index: usize, max: usize },

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Returns true for errors a caller recovers from locally (the target is gone)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
