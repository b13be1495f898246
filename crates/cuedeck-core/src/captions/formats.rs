//! Caption Time Format and Cue Stream Reader
//!
//! Supports:
//! - the canonical `HH:MM:SS.mmm` boundary format
//! - chunked ingestion of WebVTT-like cue streams, one mutation per chunk
//! - WebVTT export of a caption list
//!
//! # Example
//!
//! ```rust,ignore
//! use cuedeck_core::captions::CueStream;
//!
//! let mut stream = CueStream::new();
//! file.apply_mutation(stream.begin()?)?;
//! for chunk in chunks {
//!     file.apply_mutation(stream.feed(&chunk)?)?;
//! }
//! if let Some(last) = stream.finish()? {
//!     file.apply_mutation(last)?;
//! }
//! ```

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use super::Caption;
use crate::{
    commands::{make_mutation, ActionKind, Mutation, MutationRequest},
    CoreResult, TimeSec,
};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while reading cues
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Invalid timestamp format
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Invalid cue format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// =============================================================================
// Timestamps
// =============================================================================

/// Formats seconds as `HH:MM:SS.mmm`.
///
/// The value is rounded to whole milliseconds before it is split, so the
/// seconds field never reads `60.000`.
pub fn format_timestamp(seconds: TimeSec) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

fn component_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid component pattern"))
}

/// Parses a `HH:MM:SS.mmm` (or `MM:SS.mmm`) timestamp into seconds.
///
/// Every component must be an unsigned decimal; minutes and seconds above 59
/// are folded in as `h*3600 + m*60 + s`.
pub fn parse_timestamp(ts: &str) -> Result<TimeSec, ParseError> {
    let invalid = || ParseError::InvalidTimestamp(ts.to_string());
    let parts = ts
        .trim()
        .split(':')
        .map(|part| {
            if !component_pattern().is_match(part) {
                return Err(invalid());
            }
            part.parse::<f64>().map_err(|_| invalid())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let seconds = match parts.as_slice() {
        [h, m, s] => h * 3600.0 + m * 60.0 + s,
        [m, s] => m * 60.0 + s,
        _ => return Err(invalid()),
    };

    if !seconds.is_finite() {
        return Err(invalid());
    }
    Ok(seconds)
}

// =============================================================================
// Cue Blocks
// =============================================================================

fn timing_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\S+)\s+-->\s+(\S+)\s*(.*?)\s*$").expect("valid timing pattern")
    })
}

fn voice_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^<v(?:\.[^\s>]*)?\s+([^>]+)>\s*(.*?)(?:</v>)?$").expect("valid voice pattern")
    })
}

/// Parses one blank-line separated block. Blocks without a timing line yield `None`.
fn parse_block(block: &str) -> Result<Option<Caption>, ParseError> {
    let mut lines = block.lines().skip_while(|line| !line.contains("-->"));
    let Some(timing_line) = lines.next() else {
        return Ok(None);
    };

    let timing = timing_pattern().captures(timing_line).ok_or_else(|| {
        ParseError::InvalidFormat(format!("Expected 'start --> end' format: {}", timing_line))
    })?;
    let start = parse_timestamp(&timing[1])?;
    let end = parse_timestamp(&timing[2])?;
    let align = timing[3].to_string();

    let mut voice = String::new();
    let mut text_lines = Vec::new();
    for (i, line) in lines.enumerate() {
        match voice_pattern().captures(line) {
            Some(tagged) if i == 0 => {
                voice = tagged[1].trim().to_string();
                text_lines.push(tagged[2].to_string());
            }
            _ => text_lines.push(line.trim_end_matches("</v>").to_string()),
        }
    }

    Ok(Some(
        Caption::create(start, end, &text_lines.join("\n"))
            .with_voice(voice)
            .with_align(align),
    ))
}

fn split_blocks(content: &str) -> Vec<&str> {
    content
        .split("\n\n")
        .map(|block| block.trim_matches('\n'))
        .filter(|block| !block.trim().is_empty())
        .collect()
}

/// Parses a complete WebVTT-like document into captions (unsorted, unconformed)
pub fn parse_vtt(content: &str) -> CoreResult<Vec<Caption>> {
    let normalized = content.replace("\r\n", "\n");
    let mut captions = Vec::new();
    for block in split_blocks(&normalized) {
        if let Some(caption) = parse_block(block)? {
            captions.push(caption);
        }
    }
    Ok(captions)
}

// =============================================================================
// Cue Stream
// =============================================================================

/// Incremental cue reader.
///
/// Each delivered chunk becomes exactly one `BulkAdd` mutation holding every
/// cue completed by that chunk; a cue cut by the chunk boundary is held over.
#[derive(Debug, Default)]
pub struct CueStream {
    holdover: String,
    chunks: usize,
}

impl CueStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks fed so far
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Starts a stream: resets buffered state and yields the `Clear` mutation
    pub fn begin(&mut self) -> CoreResult<Mutation> {
        self.holdover.clear();
        self.chunks = 0;
        make_mutation(MutationRequest::new(ActionKind::Clear, "load captions"))
    }

    /// Feeds one chunk and yields its `BulkAdd` mutation
    pub fn feed(&mut self, chunk: &str) -> CoreResult<Mutation> {
        let buffer = format!("{}{}", self.holdover, chunk).replace("\r\n", "\n");
        let (complete, rest) = match buffer.rfind("\n\n") {
            Some(pos) => (&buffer[..pos], &buffer[pos + 2..]),
            None => ("", buffer.as_str()),
        };

        let mut bulk = Vec::new();
        for block in split_blocks(complete) {
            if let Some(caption) = parse_block(block)? {
                bulk.push(caption);
            }
        }
        self.holdover = rest.to_string();
        self.chunks += 1;

        tracing::debug!(
            chunk = self.chunks,
            cues = bulk.len(),
            holdover = self.holdover.len(),
            "Parsed cue chunk"
        );

        make_mutation(
            MutationRequest::new(ActionKind::BulkAdd, format!("load chunk {}", self.chunks))
                .with_bulk(bulk),
        )
    }

    /// Ends the stream, flushing a trailing cue that had no closing blank line
    pub fn finish(&mut self) -> CoreResult<Option<Mutation>> {
        let rest = std::mem::take(&mut self.holdover).replace("\r\n", "\n");
        let mut bulk = Vec::new();
        for block in split_blocks(&rest) {
            if let Some(caption) = parse_block(block)? {
                bulk.push(caption);
            }
        }
        if bulk.is_empty() {
            return Ok(None);
        }
        make_mutation(MutationRequest::new(ActionKind::BulkAdd, "load final chunk").with_bulk(bulk))
            .map(Some)
    }
}

// =============================================================================
// Export
// =============================================================================

/// Exports captions to WebVTT, using their canonical raw boundaries
pub fn export_vtt(captions: &[Caption]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for caption in captions {
        output.push_str(caption.start_raw());
        output.push_str(" --> ");
        output.push_str(caption.end_raw());
        if !caption.align().is_empty() {
            output.push(' ');
            output.push_str(caption.align());
        }
        output.push('\n');

        if !caption.voice().is_empty() {
            output.push_str(&format!("<v {}> ", caption.voice()));
        }
        output.push_str(caption.text());
        output.push_str("\n\n");
    }

    let mut output = output.trim_end().to_string();
    output.push('\n');
    output
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::MutationAction;

    const SAMPLE: &str = "WEBVTT\r\n\r\n\
        00:00:01.000 --> 00:00:04.000 align:start\r\n<v Ann> Hello there\r\n\r\n\
        00:00:05.500 --> 00:00:08.000\r\n<v Bob> Second caption\r\n\r\n";

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00.000");
        assert_eq!(format_timestamp(1.0), "00:00:01.000");
        assert_eq!(format_timestamp(1.0 + 0.001), "00:00:01.001");
        assert_eq!(format_timestamp(2.5 + 0.001), "00:00:02.501");
        assert_eq!(format_timestamp(90.0), "00:01:30.000");
        assert_eq!(format_timestamp(5400.25), "01:30:00.250");
        assert_eq!(format_timestamp(36000.0), "10:00:00.000");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:01.500").unwrap(), 1.5);
        assert_eq!(parse_timestamp("00:01:30.000").unwrap(), 90.0);
        assert_eq!(parse_timestamp("01:30:00.000").unwrap(), 5400.0);
        assert_eq!(parse_timestamp("01:23.456").unwrap(), 83.456);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("abc").is_err());
        assert!(parse_timestamp("1:2:3:4").is_err());
        assert!(parse_timestamp("-00:00:01.000").is_err());
        assert!(parse_timestamp("00:01:-5").is_err());
        assert!(parse_timestamp("-0:-0:2").is_err());
        assert!(parse_timestamp("00:00:+3").is_err());
        assert!(parse_timestamp("00:00:1e3").is_err());
        assert!(parse_timestamp("00:00:.5").is_err());
    }

    #[test]
    fn test_parse_timestamp_folds_overflowing_fields() {
        assert_eq!(parse_timestamp("00:00:60.000").unwrap(), 60.0);
        assert_eq!(parse_timestamp("00:75:00").unwrap(), 4500.0);
    }

    #[test]
    fn test_format_timestamp_carries_rounded_seconds() {
        assert_eq!(format_timestamp(59.9996), "00:01:00.000");
        assert_eq!(format_timestamp(3599.9997), "01:00:00.000");
        assert_eq!(format_timestamp(119.99951), "00:02:00.000");
        assert_eq!(format_timestamp(59.9994), "00:00:59.999");
    }

    #[test]
    fn test_parse_vtt_reads_voice_and_align() {
        let captions = parse_vtt(SAMPLE).unwrap();
        assert_eq!(captions.len(), 2);

        assert_eq!(captions[0].start(), 1.0);
        assert_eq!(captions[0].end(), 4.0);
        assert_eq!(captions[0].voice(), "Ann");
        assert_eq!(captions[0].text(), "Hello there");
        assert_eq!(captions[0].align(), "align:start");

        assert_eq!(captions[1].start(), 5.5);
        assert_eq!(captions[1].voice(), "Bob");
        assert_eq!(captions[1].align(), "");
    }

    #[test]
    fn test_parse_vtt_untagged_multiline_with_identifier() {
        let vtt = "WEBVTT\n\nintro\n00:00:00.000 --> 00:00:02.000\nLine one\nLine two\n";
        let captions = parse_vtt(vtt).unwrap();
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].voice(), "");
        assert_eq!(captions[0].text(), "Line one\nLine two");
    }

    #[test]
    fn test_parse_vtt_bad_timestamp() {
        let vtt = "WEBVTT\n\n00:00:xx.000 --> 00:00:02.000\nOops\n";
        assert!(parse_vtt(vtt).is_err());
    }

    #[test]
    fn test_cue_stream_begins_with_clear() {
        let mut stream = CueStream::new();
        let clear = stream.begin().unwrap();
        assert!(matches!(clear.action(), MutationAction::Clear));
    }

    #[test]
    fn test_cue_stream_holds_over_split_cue() {
        let mut stream = CueStream::new();
        stream.begin().unwrap();

        // Cut inside the first cue's text line
        let (first, second) = SAMPLE.split_at(60);
        let m1 = stream.feed(first).unwrap();
        let m2 = stream.feed(second).unwrap();
        let tail = stream.finish().unwrap();

        let count = |m: &Mutation| match m.action() {
            MutationAction::BulkAdd { bulk } => bulk.len(),
            other => panic!("expected bulk add, got {:?}", other),
        };
        assert_eq!(count(&m1), 0);
        assert_eq!(count(&m2), 2);
        assert!(tail.is_none());
        assert_eq!(stream.chunk_count(), 2);
    }

    #[test]
    fn test_cue_stream_finish_flushes_unterminated_cue() {
        let mut stream = CueStream::new();
        stream.begin().unwrap();
        let m = stream
            .feed("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nlast words")
            .unwrap();
        assert!(matches!(m.action(), MutationAction::BulkAdd { bulk } if bulk.is_empty()));

        let tail = stream.finish().unwrap().unwrap();
        match tail.action() {
            MutationAction::BulkAdd { bulk } => assert_eq!(bulk[0].text(), "last words"),
            other => panic!("expected bulk add, got {:?}", other),
        }
    }

    #[test]
    fn test_export_vtt_round_trips() {
        let captions = parse_vtt(SAMPLE).unwrap();
        let vtt = export_vtt(&captions);
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:01.000 --> 00:00:04.000 align:start\n<v Ann> Hello there"));

        let reparsed = parse_vtt(&vtt).unwrap();
        assert_eq!(reparsed.len(), captions.len());
        for (a, b) in reparsed.iter().zip(&captions) {
            assert!(a.content_eq(b));
        }
    }
}
