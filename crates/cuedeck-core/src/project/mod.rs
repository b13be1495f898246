//! Project Persistence Module
//!
//! Durable records of editing sessions.

mod journal;

pub use journal::{EntryKind, JournalEntry, MutationJournal, ReadResult};
