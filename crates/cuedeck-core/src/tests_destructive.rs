//! Destructive and Edge Case Tests for the Timeline Engine
//!
//! These tests push degenerate timelines, hostile payloads and malformed
//! input through the public surface and check that invariants still hold.

use crate::captions::{format_timestamp, parse_timestamp, parse_vtt, CueStream};
use crate::commands::{
    edits, make_mutation, ActionKind, CaptionFile, ConformOptions, MutationRequest,
};
use crate::{Caption, CoreError, MIN_GAP};

fn bulk(captions: Vec<Caption>) -> crate::Mutation {
    make_mutation(MutationRequest::new(ActionKind::BulkAdd, "load").with_bulk(captions)).unwrap()
}

fn assert_conformant(file: &CaptionFile) {
    let annotated = file.annotated();
    for (i, caption) in annotated.iter().enumerate() {
        assert_eq!(caption.index, i);
        assert!(caption.end() - caption.start() >= MIN_GAP - 1e-6, "{:?}", caption);
        if i > 0 {
            assert!(caption.start() >= annotated[i - 1].end() + MIN_GAP - 1e-6);
        }
    }
}

#[test]
fn test_destructive_identical_captions() {
    // Twenty captions on exactly the same span
    let captions = (0..20)
        .map(|i| Caption::new(&format!("c{}", i), 5.0, 5.0, "same"))
        .collect();
    let mut file = CaptionFile::default();
    file.apply_mutation(bulk(captions)).unwrap();

    assert_eq!(file.captions().len(), 20);
    assert_conformant(&file);
    // Stable sort keeps input order
    assert_eq!(file.captions()[0].id(), "c0");
    assert_eq!(file.captions()[19].id(), "c19");
}

#[test]
fn test_destructive_inverted_caption() {
    // End before start is repaired by pushing the end
    let mut file = CaptionFile::default();
    file.apply_mutation(bulk(vec![Caption::new("x", 10.0, 2.0, "backwards")]))
        .unwrap();
    let x = file.by_id("x").unwrap();
    assert_eq!(x.start(), 10.0);
    assert!((x.end() - 10.001).abs() < 1e-9);
}

#[test]
fn test_destructive_deep_cascade_within_pass_cap() {
    // One long caption swallowing a hundred short ones
    let mut captions = vec![Caption::new("long", 0.0, 1000.0, "long")];
    captions.extend(
        (0..100).map(|i| Caption::new(&format!("s{}", i), i as f64, i as f64 + 0.5, "short")),
    );

    let mut file = CaptionFile::default();
    file.apply_mutation(bulk(captions)).unwrap();
    assert_conformant(&file);
}

#[test]
fn test_destructive_single_pass_reports_no_panic() {
    let captions = (0..10)
        .map(|i| Caption::new(&format!("s{}", i), 0.0, 100.0 - i as f64, "nested"))
        .collect();
    let mut file = CaptionFile::new(
        std::sync::Arc::new(crate::NullSink),
        ConformOptions::single_pass(),
    );
    file.apply_mutation(bulk(captions)).unwrap();
    assert_eq!(file.captions().len(), 10);
}

#[test]
fn test_destructive_bulk_with_internal_duplicate_ids() {
    let mut file = CaptionFile::default();
    let result = file.apply_mutation(bulk(vec![
        Caption::new("dup", 0.0, 1.0, "a"),
        Caption::new("dup", 2.0, 3.0, "b"),
    ]));
    assert!(matches!(result, Err(CoreError::DuplicateCaption(_))));
    assert!(file.captions().is_empty());
    assert!(!file.can_undo());
}

#[test]
fn test_destructive_empty_bulk() {
    let mut file = CaptionFile::default();
    file.apply_mutation(bulk(vec![])).unwrap();
    assert!(file.captions().is_empty());
    assert_eq!(file.undo_count(), 1);
}

#[test]
fn test_destructive_huge_and_tiny_times() {
    assert_eq!(format_timestamp(0.0004), "00:00:00.000");
    assert_eq!(format_timestamp(359_999.999), "99:59:59.999");
    assert_eq!(format_timestamp(360_000.0), "100:00:00.000");
    assert!(parse_timestamp("100:00:00.000").is_ok());

    let infinite = make_mutation(
        MutationRequest::new(ActionKind::Add, "inf")
            .with_after(Caption::create(f64::INFINITY, 1.0, "")),
    );
    assert!(matches!(infinite, Err(CoreError::InvalidTime(_))));
}

#[test]
fn test_destructive_edit_deleted_caption() {
    let mut file = CaptionFile::default();
    file.apply_mutation(bulk(vec![Caption::new("gone", 0.0, 1.0, "bye")]))
        .unwrap();
    let stale = file.snapshot();
    let delete = edits::delete(&stale, "gone", "drop").unwrap();
    file.apply_mutation(delete).unwrap();

    // A builder run against a stale snapshot still fails at apply time
    let late = edits::set_text(&stale, "gone", "hello", "late").unwrap();
    let err = file.apply_mutation(late).unwrap_err();
    assert!(err.is_not_found());
    assert!(file.by_id("gone").unwrap_err().is_not_found());
}

#[test]
fn test_destructive_malformed_cue_streams() {
    // Garbage without timing lines is skipped
    assert!(parse_vtt("just some\n\nwords here").unwrap().is_empty());

    // A timing line with an unparsable end fails the whole chunk
    let mut stream = CueStream::new();
    stream.begin().unwrap();
    assert!(stream.feed("00:00:01.000 --> soon\ntext\n\n").is_err());

    // Unicode text survives
    let captions = parse_vtt("00:00:01.000 --> 00:00:02.000\n<v Zoë> ¿Qué tal? 字幕\n").unwrap();
    assert_eq!(captions[0].voice(), "Zoë");
    assert_eq!(captions[0].text(), "¿Qué tal? 字幕");
}

#[test]
fn test_destructive_undo_redo_storm() {
    let mut file = CaptionFile::default();
    file.apply_mutation(bulk(vec![Caption::new("a", 0.0, 1.0, "a")]))
        .unwrap();
    for i in 0..50 {
        let edit = edits::set_end(&file.snapshot(), "a", 1.0 + i as f64, "grow").unwrap();
        file.apply_mutation(edit).unwrap();
    }
    for _ in 0..51 {
        file.undo().unwrap();
    }
    assert!(file.undo().is_err());
    for _ in 0..51 {
        file.redo().unwrap();
    }
    assert!(file.redo().is_err());
    assert_eq!(file.by_id("a").unwrap().end(), 50.0);
}
