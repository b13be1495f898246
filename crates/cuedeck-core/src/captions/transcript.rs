//! Transcript Views
//!
//! Read-only views over a caption list: speaker blocks, voice sets and the
//! flattened, word-wrapped transcript text.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::Caption;

/// Default column width of generated transcript text
pub const DEFAULT_WRAP_WIDTH: usize = 72;

/// Consecutive captions spoken by the same voice, merged
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerBlock {
    pub voice: String,
    pub text: String,
}

/// Groups consecutive captions with the same voice (case-insensitive).
///
/// The block keeps the spelling of its first caption's voice; texts are
/// joined with a single space.
pub fn aggregate_speaker<'a, I>(captions: I) -> Vec<SpeakerBlock>
where
    I: IntoIterator<Item = &'a Caption>,
{
    let mut blocks: Vec<SpeakerBlock> = Vec::new();
    for caption in captions {
        match blocks.last_mut() {
            Some(last) if last.voice.to_uppercase() == caption.voice().to_uppercase() => {
                last.text.push(' ');
                last.text.push_str(caption.text());
            }
            _ => blocks.push(SpeakerBlock {
                voice: caption.voice().to_string(),
                text: caption.text().to_string(),
            }),
        }
    }
    blocks
}

/// Returns the distinct, non-empty voice labels, sorted
pub fn collect_voices<'a, I>(captions: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a Caption>,
{
    captions
        .into_iter()
        .map(Caption::voice)
        .filter(|voice| !voice.is_empty())
        .map(str::to_string)
        .collect()
}

/// Renders speaker blocks as `"{voice}: text"` paragraphs wrapped to `width`
pub fn generate_text<'a, I>(captions: I, width: usize) -> String
where
    I: IntoIterator<Item = &'a Caption>,
{
    aggregate_speaker(captions)
        .iter()
        .map(|block| {
            let prefix = if block.voice.is_empty() {
                String::new()
            } else {
                format!("{}: ", block.voice)
            };
            block_indent(&block.text, &prefix, width)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Word-wraps `text` after `prefix`, indenting continuation lines to the prefix width.
///
/// A single word longer than the available width gets a line of its own.
fn block_indent(text: &str, prefix: &str, width: usize) -> String {
    let indent = " ".repeat(prefix.chars().count());
    let available = width.saturating_sub(indent.len()).max(1);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > available && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    format!("{}{}", prefix, lines.join(&format!("\n{}", indent)))
}
