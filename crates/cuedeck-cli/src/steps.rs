//! Edit steps accepted by `cuedeck edit`.
//!
//! Each step addresses a caption by its sorted index at the time the step
//! runs, e.g. `start:2=00:00:04.250`, `text:0=Hello`, `gap-after:3`, `undo`.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use thiserror::Error;

use cuedeck_core::captions::parse_timestamp;
use cuedeck_core::commands::edits;
use cuedeck_core::{CaptionFile, TimeSec};

/// Errors raised while parsing a step
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("unknown step '{0}'")]
    Unknown(String),
    #[error("step '{0}' needs a caption index")]
    MissingIndex(String),
    #[error("invalid caption index '{0}'")]
    InvalidIndex(String),
    #[error("step '{0}' needs a value after '='")]
    MissingValue(String),
    #[error("invalid time '{0}'")]
    InvalidTime(String),
}

/// One edit applied to a caption file
#[derive(Debug, Clone, PartialEq)]
pub enum EditStep {
    Start { index: usize, time: TimeSec },
    End { index: usize, time: TimeSec },
    Text { index: usize, text: String },
    Voice { index: usize, voice: String },
    GapBefore { index: usize },
    GapAfter { index: usize },
    Half { index: usize },
    Delete { index: usize },
    CutPrev { index: usize, time: TimeSec },
    CutNext { index: usize, time: TimeSec },
    Undo,
    Redo,
}

/// Accepts plain seconds (`4.25`) or `HH:MM:SS.mmm`
fn parse_time(value: &str) -> Result<TimeSec, StepError> {
    let invalid = || StepError::InvalidTime(value.to_string());
    if value.contains(':') {
        return parse_timestamp(value).map_err(|_| invalid());
    }
    match value.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(invalid()),
    }
}

impl FromStr for EditStep {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "undo" => return Ok(Self::Undo),
            "redo" => return Ok(Self::Redo),
            _ => {}
        }

        let (name, rest) = s
            .split_once(':')
            .ok_or_else(|| StepError::Unknown(s.to_string()))?;
        let (index, value) = match rest.split_once('=') {
            Some((index, value)) => (index, Some(value)),
            None => (rest, None),
        };
        if index.is_empty() {
            return Err(StepError::MissingIndex(name.to_string()));
        }
        let index: usize = index
            .parse()
            .map_err(|_| StepError::InvalidIndex(index.to_string()))?;
        let value = || value.ok_or_else(|| StepError::MissingValue(name.to_string()));

        Ok(match name {
            "start" => Self::Start { index, time: parse_time(value()?)? },
            "end" => Self::End { index, time: parse_time(value()?)? },
            "text" => Self::Text { index, text: value()?.to_string() },
            "voice" => Self::Voice { index, voice: value()?.to_string() },
            "gap-before" => Self::GapBefore { index },
            "gap-after" => Self::GapAfter { index },
            "half" => Self::Half { index },
            "delete" => Self::Delete { index },
            "cut-prev" => Self::CutPrev { index, time: parse_time(value()?)? },
            "cut-next" => Self::CutNext { index, time: parse_time(value()?)? },
            other => return Err(StepError::Unknown(other.to_string())),
        })
    }
}

impl EditStep {
    fn index(&self) -> Option<usize> {
        match self {
            Self::Start { index, .. }
            | Self::End { index, .. }
            | Self::Text { index, .. }
            | Self::Voice { index, .. }
            | Self::GapBefore { index }
            | Self::GapAfter { index }
            | Self::Half { index }
            | Self::Delete { index }
            | Self::CutPrev { index, .. }
            | Self::CutNext { index, .. } => Some(*index),
            Self::Undo | Self::Redo => None,
        }
    }

    /// Runs the step against the file's current snapshot
    pub fn apply(&self, file: &mut CaptionFile) -> Result<()> {
        let snapshot = file.snapshot();
        let id = match self.index() {
            Some(index) => edits::id_at(&snapshot, index).ok_or_else(|| {
                anyhow!("no caption at index {} ({} captions)", index, snapshot.len())
            })?,
            None => String::new(),
        };

        let mutation = match self {
            Self::Start { time, .. } => edits::set_start(&snapshot, &id, *time, "cli")?,
            Self::End { time, .. } => edits::set_end(&snapshot, &id, *time, "cli")?,
            Self::Text { text, .. } => edits::set_text(&snapshot, &id, text, "cli")?,
            Self::Voice { voice, .. } => edits::set_voice(&snapshot, &id, voice, "cli")?,
            Self::GapBefore { .. } => edits::consume_gap_before(&snapshot, &id)?,
            Self::GapAfter { .. } => edits::consume_gap_after(&snapshot, &id)?,
            Self::Half { .. } => edits::cut_in_half(&snapshot, &id)?,
            Self::Delete { .. } => edits::delete(&snapshot, &id, "cli delete")?,
            Self::CutPrev { time, .. } => {
                file.cut_to_prev(&id, *time)?;
                return Ok(());
            }
            Self::CutNext { time, .. } => {
                file.cut_to_next(&id, *time)?;
                return Ok(());
            }
            Self::Undo => {
                file.undo()?;
                return Ok(());
            }
            Self::Redo => {
                file.redo()?;
                return Ok(());
            }
        };

        file.apply_mutation(mutation)?;
        Ok(())
    }
}
