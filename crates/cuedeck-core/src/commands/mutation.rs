//! Mutation Definition
//!
//! A mutation is an immutable, identified request for one change to the
//! caption timeline. The only way to build one is [`make_mutation`], which
//! validates the request and normalizes the caption payload.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    captions::Caption, is_valid_time_sec, new_id, CoreError, CoreResult, MutationId,
};

// =============================================================================
// Action Types
// =============================================================================

/// Mutation action tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Clear,
    Replace,
    Add,
    Delete,
    BulkAdd,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Replace => "replace",
            Self::Add => "add",
            Self::Delete => "delete",
            Self::BulkAdd => "bulkAdd",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(Self::Clear),
            "replace" => Ok(Self::Replace),
            "add" => Ok(Self::Add),
            "delete" => Ok(Self::Delete),
            "bulkAdd" | "bulk_add" => Ok(Self::BulkAdd),
            other => Err(CoreError::UnknownMutationAction(other.to_string())),
        }
    }
}

/// Mutation action with its payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MutationAction {
    /// Remove every caption
    Clear,
    /// Swap the caption with `before`'s id for `after`
    Replace { before: Caption, after: Caption },
    /// Insert one caption
    Add { after: Caption },
    /// Remove the caption with `before`'s id
    Delete { before: Caption },
    /// Insert many captions at once
    BulkAdd { bulk: Vec<Caption> },
}

impl MutationAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Clear => ActionKind::Clear,
            Self::Replace { .. } => ActionKind::Replace,
            Self::Add { .. } => ActionKind::Add,
            Self::Delete { .. } => ActionKind::Delete,
            Self::BulkAdd { .. } => ActionKind::BulkAdd,
        }
    }

    /// Captions this action introduces into the timeline
    fn incoming(&self) -> Vec<&Caption> {
        match self {
            Self::Clear | Self::Delete { .. } => vec![],
            Self::Replace { after, .. } | Self::Add { after } => vec![after],
            Self::BulkAdd { bulk } => bulk.iter().collect(),
        }
    }
}

// =============================================================================
// Mutation Request
// =============================================================================

/// Partial mutation, as assembled by a producer before validation
#[derive(Clone, Debug, Default)]
pub struct MutationRequest {
    pub action: Option<ActionKind>,
    pub note: Option<String>,
    pub before: Option<Caption>,
    pub after: Option<Caption>,
    pub bulk: Option<Vec<Caption>>,
}

impl MutationRequest {
    pub fn new(action: ActionKind, note: impl Into<String>) -> Self {
        Self {
            action: Some(action),
            note: Some(note.into()),
            ..Default::default()
        }
    }

    pub fn with_before(mut self, before: Caption) -> Self {
        self.before = Some(before);
        self
    }

    pub fn with_after(mut self, after: Caption) -> Self {
        self.after = Some(after);
        self
    }

    pub fn with_bulk(mut self, bulk: Vec<Caption>) -> Self {
        self.bulk = Some(bulk);
        self
    }
}

// =============================================================================
// Mutation
// =============================================================================

/// A validated, immutable change request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "MutationRecord")]
pub struct Mutation {
    id: MutationId,
    /// RFC 3339 timestamp
    timestamp: String,
    note: String,
    #[serde(flatten)]
    action: MutationAction,
}

/// Wire shape of a mutation; re-validated on the way in
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationRecord {
    id: MutationId,
    timestamp: String,
    note: String,
    #[serde(flatten)]
    action: MutationAction,
}

impl TryFrom<MutationRecord> for Mutation {
    type Error = CoreError;

    fn try_from(record: MutationRecord) -> Result<Self, Self::Error> {
        let note = require_note(Some(record.note))?;
        validate_times(&record.action)?;
        Ok(Self {
            id: record.id,
            timestamp: record.timestamp,
            note,
            action: record.action,
        })
    }
}

impl Mutation {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Parses timestamp as DateTime
    pub fn timestamp_as_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn action(&self) -> &MutationAction {
        &self.action
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Builds the semantic inverse (before and after swapped).
    ///
    /// `Clear` and `BulkAdd` have no well-defined inverse and yield `None`.
    pub fn inverse(&self) -> CoreResult<Option<Mutation>> {
        let request = match &self.action {
            MutationAction::Replace { before, after } => {
                MutationRequest::new(ActionKind::Replace, self.note.clone())
                    .with_before(after.clone())
                    .with_after(before.clone())
            }
            MutationAction::Add { after } => {
                MutationRequest::new(ActionKind::Delete, self.note.clone())
                    .with_before(after.clone())
            }
            MutationAction::Delete { before } => {
                MutationRequest::new(ActionKind::Add, self.note.clone()).with_after(before.clone())
            }
            MutationAction::Clear | MutationAction::BulkAdd { .. } => return Ok(None),
        };
        make_mutation(request).map(Some)
    }
}

// =============================================================================
// Construction
// =============================================================================

fn require_note(note: Option<String>) -> CoreResult<String> {
    note.filter(|n| !n.trim().is_empty())
        .ok_or_else(|| CoreError::InvalidMutation("Mutation requires note".to_string()))
}

fn require<T>(value: Option<T>, kind: ActionKind, field: &str) -> CoreResult<T> {
    value.ok_or_else(|| {
        CoreError::MutationPayloadError(format!("{} mutation requires '{}'", kind, field))
    })
}

fn validate_times(action: &MutationAction) -> CoreResult<()> {
    for caption in action.incoming() {
        for value in [caption.start(), caption.end()] {
            if !is_valid_time_sec(value) {
                return Err(CoreError::InvalidTime(value));
            }
        }
    }
    Ok(())
}

/// Validates a partial mutation and builds the immutable [`Mutation`].
///
/// Fails with `InvalidMutation` when the action or note is missing and with
/// `MutationPayloadError` when the payload does not fit the action. The raw
/// boundary strings of incoming captions are regenerated, never trusted.
pub fn make_mutation(request: MutationRequest) -> CoreResult<Mutation> {
    let MutationRequest {
        action,
        note,
        before,
        after,
        bulk,
    } = request;

    let kind =
        action.ok_or_else(|| CoreError::InvalidMutation("Mutation requires action".to_string()))?;
    let note = require_note(note)?;

    let action = match kind {
        ActionKind::Clear => MutationAction::Clear,
        ActionKind::Replace => MutationAction::Replace {
            before: require(before, kind, "before")?,
            after: require(after, kind, "after")?.normalized(),
        },
        ActionKind::Add => MutationAction::Add {
            after: require(after, kind, "after")?.normalized(),
        },
        ActionKind::Delete => MutationAction::Delete {
            before: require(before, kind, "before")?,
        },
        ActionKind::BulkAdd => MutationAction::BulkAdd {
            bulk: require(bulk, kind, "bulk")?
                .into_iter()
                .map(Caption::normalized)
                .collect(),
        },
    };
    validate_times(&action)?;

    Ok(Mutation {
        id: new_id(),
        timestamp: Utc::now().to_rfc3339(),
        note,
        action,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn yay() -> Caption {
        Caption::new("yay", 0.0, 1.0, "yay")
    }

    #[test]
    fn test_make_mutation_requires_action() {
        let request = MutationRequest {
            note: Some("no action".to_string()),
            after: Some(yay()),
            ..Default::default()
        };
        let err = make_mutation(request).unwrap_err();
        assert!(matches!(err, CoreError::InvalidMutation(_)));
    }

    #[test]
    fn test_make_mutation_requires_note() {
        let missing = MutationRequest {
            action: Some(ActionKind::Clear),
            ..Default::default()
        };
        assert!(matches!(
            make_mutation(missing).unwrap_err(),
            CoreError::InvalidMutation(_)
        ));

        let blank = MutationRequest::new(ActionKind::Clear, "   ");
        assert!(matches!(
            make_mutation(blank).unwrap_err(),
            CoreError::InvalidMutation(_)
        ));
    }

    #[test]
    fn test_make_mutation_payload_errors() {
        let replace = MutationRequest::new(ActionKind::Replace, "swap").with_before(yay());
        assert!(matches!(
            make_mutation(replace).unwrap_err(),
            CoreError::MutationPayloadError(_)
        ));

        let delete = MutationRequest::new(ActionKind::Delete, "drop");
        assert!(matches!(
            make_mutation(delete).unwrap_err(),
            CoreError::MutationPayloadError(_)
        ));

        let add = MutationRequest::new(ActionKind::Add, "add");
        assert!(matches!(
            make_mutation(add).unwrap_err(),
            CoreError::MutationPayloadError(_)
        ));
    }

    #[test]
    fn test_make_mutation_rejects_invalid_times() {
        let add = MutationRequest::new(ActionKind::Add, "bad")
            .with_after(Caption::create(-1.0, 1.0, "negative"));
        assert!(matches!(
            make_mutation(add).unwrap_err(),
            CoreError::InvalidTime(_)
        ));

        let bulk = MutationRequest::new(ActionKind::BulkAdd, "bad")
            .with_bulk(vec![yay(), Caption::create(0.0, f64::NAN, "nan")]);
        assert!(make_mutation(bulk).is_err());
    }

    #[test]
    fn test_make_mutation_assigns_id_and_timestamp() {
        let a = make_mutation(MutationRequest::new(ActionKind::Add, "one").with_after(yay()))
            .unwrap();
        let b = make_mutation(MutationRequest::new(ActionKind::Add, "one").with_after(yay()))
            .unwrap();
        assert_ne!(a.id(), b.id());
        assert!(a.timestamp_as_datetime().is_some());
        assert_eq!(a.kind(), ActionKind::Add);
        assert_eq!(a.note(), "one");
    }

    #[test]
    fn test_action_kind_from_str() {
        assert_eq!("bulkAdd".parse::<ActionKind>().unwrap(), ActionKind::BulkAdd);
        assert_eq!("replace".parse::<ActionKind>().unwrap(), ActionKind::Replace);
        let err = "frobnicate".parse::<ActionKind>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownMutationAction(ref s) if s == "frobnicate"));
    }

    #[test]
    fn test_inverse_swaps_payload() {
        let before = yay();
        let after = yay().with_text("nay");
        let replace = make_mutation(
            MutationRequest::new(ActionKind::Replace, "edit")
                .with_before(before.clone())
                .with_after(after.clone()),
        )
        .unwrap();

        let inverse = replace.inverse().unwrap().unwrap();
        match inverse.action() {
            MutationAction::Replace { before: b, after: a } => {
                assert_eq!(b.text(), "nay");
                assert_eq!(a.text(), "yay");
            }
            other => panic!("expected replace, got {:?}", other),
        }

        let add = make_mutation(MutationRequest::new(ActionKind::Add, "add").with_after(yay()))
            .unwrap();
        assert_eq!(add.inverse().unwrap().unwrap().kind(), ActionKind::Delete);

        let clear = make_mutation(MutationRequest::new(ActionKind::Clear, "wipe")).unwrap();
        assert!(clear.inverse().unwrap().is_none());
    }

    #[test]
    fn test_mutation_serialization_round_trip() {
        let mutation = make_mutation(
            MutationRequest::new(ActionKind::Replace, "edit")
                .with_before(yay())
                .with_after(yay().with_end(2.0)),
        )
        .unwrap();

        let json = serde_json::to_string(&mutation).unwrap();
        assert!(json.contains("\"action\":\"replace\""));
        let parsed: Mutation = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, mutation);
    }

    #[test]
    fn test_mutation_deserialization_validates() {
        let json = r#"{"id":"m1","timestamp":"2024-01-01T00:00:00Z","note":"","action":"clear"}"#;
        assert!(serde_json::from_str::<Mutation>(json).is_err());

        let json =
            r#"{"id":"m1","timestamp":"2024-01-01T00:00:00Z","note":"x","action":"explode"}"#;
        assert!(serde_json::from_str::<Mutation>(json).is_err());
    }
}
