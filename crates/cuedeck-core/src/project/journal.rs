//! Mutation Journal
//!
//! Append-only JSONL record of everything done to a caption file. Replaying
//! the journal into a fresh log reproduces the same timeline: dependents are
//! recomputed deterministically, so only primary mutations are written.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{commands::Mutation, new_id, CoreResult, EntryId};

// =============================================================================
// Entry Types
// =============================================================================

/// What happened to the log
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Apply,
    Undo,
    Redo,
}

/// One journal line
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Unique entry ID (ULID)
    pub id: EntryId,
    pub kind: EntryKind,
    /// ISO 8601 timestamp
    pub timestamp: String,
    /// The applied mutation (apply entries only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,
}

impl JournalEntry {
    fn new(kind: EntryKind, mutation: Option<Mutation>) -> Self {
        Self {
            id: new_id(),
            kind,
            timestamp: Utc::now().to_rfc3339(),
            mutation,
        }
    }

    pub fn apply(mutation: Mutation) -> Self {
        Self::new(EntryKind::Apply, Some(mutation))
    }

    pub fn undo() -> Self {
        Self::new(EntryKind::Undo, None)
    }

    pub fn redo() -> Self {
        Self::new(EntryKind::Redo, None)
    }

    /// Parses timestamp as DateTime
    pub fn timestamp_as_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// =============================================================================
// Journal
// =============================================================================

/// Result of reading entries with error handling
#[derive(Debug)]
pub struct ReadResult {
    /// Successfully parsed entries
    pub entries: Vec<JournalEntry>,
    /// Lines that failed to parse (line number, error message)
    pub errors: Vec<(usize, String)>,
}

/// Append-only mutation journal backed by a JSONL file
#[derive(Clone, Debug)]
pub struct MutationJournal {
    path: PathBuf,
}

impl MutationJournal {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Appends a single entry
    pub fn append(&self, entry: &JournalEntry) -> CoreResult<()> {
        self.append_batch(std::slice::from_ref(entry))
    }

    /// Appends several entries with one write
    pub fn append_batch(&self, entries: &[JournalEntry]) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        for entry in entries {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Reads all entries, collecting corrupted lines instead of failing
    pub fn read_all(&self) -> CoreResult<ReadResult> {
        if !self.exists() {
            return Ok(ReadResult {
                entries: vec![],
                errors: vec![],
            });
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        let mut errors = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line_number = line_num + 1;
            match line_result {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<JournalEntry>(trimmed) {
                        Ok(entry) => entries.push(entry),
                        Err(e) => {
                            tracing::warn!(
                                line = line_number,
                                error = %e,
                                "Skipping corrupted journal line"
                            );
                            errors.push((line_number, format!("JSON parse error: {}", e)));
                        }
                    }
                }
                Err(e) => errors.push((line_number, format!("IO error: {}", e))),
            }
        }

        Ok(ReadResult { entries, errors })
    }

    /// Counts non-empty lines
    pub fn count(&self) -> CoreResult<usize> {
        if !self.exists() {
            return Ok(0);
        }

        let reader = BufReader::new(File::open(&self.path)?);
        Ok(reader
            .lines()
            .map_while(Result::ok)
            .filter(|l| !l.trim().is_empty())
            .count())
    }

    /// Rewrites the journal without corrupted lines.
    /// Returns the number of removed lines.
    pub fn compact(&self) -> CoreResult<usize> {
        let read_result = self.read_all()?;
        let error_count = read_result.errors.len();
        if error_count == 0 {
            return Ok(0);
        }

        let temp_path = self.path.with_extension("jsonl.tmp");
        {
            let mut writer = BufWriter::new(File::create(&temp_path)?);
            for entry in &read_result.entries {
                writeln!(writer, "{}", serde_json::to_string(entry)?)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&temp_path, &self.path)?;

        Ok(error_count)
    }
}

// =============================================================================
// Tests
// =============================================================================
