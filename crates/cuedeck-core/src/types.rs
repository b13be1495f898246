//! cuedeck Core Type Definitions
//!
//! Defines fundamental types and constants used throughout the engine.

// =============================================================================
// ID Types
// =============================================================================

/// Caption unique identifier (ULID)
pub type CaptionId = String;

/// Mutation unique identifier (ULID)
pub type MutationId = String;

/// Journal entry unique identifier (ULID)
pub type EntryId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Time in milliseconds (floating point), used for gap sizes
pub type TimeMs = f64;

/// Minimum gap between adjacent captions, and minimum caption duration
pub const MIN_GAP: TimeSec = 0.001;

/// Absorbs float noise when comparing boundaries against [`MIN_GAP`]
pub(crate) const TIME_EPSILON: TimeSec = 1e-9;

/// Generates a fresh ULID string
pub(crate) fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Returns true if the value can be used as a caption boundary
pub(crate) fn is_valid_time_sec(value: TimeSec) -> bool {
    value.is_finite() && value >= 0.0
}
