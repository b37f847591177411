//! Reviewer expansion: one synthetic unit event per requested reviewer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::literal::parse_literal;
use crate::{DisplayNames, Event, MergedRecord};

/// A validated entry from a record's requested-reviewers field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewerRef {
    pub login: String,
}

/// What decoding a requested-reviewers field produced.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DecodeOutcome {
    /// Field missing or blank.
    Absent,
    /// Not a list in JSON or Python-literal form.
    Malformed,
    Decoded { accepted: usize, skipped: usize },
}

/// Decode a requested-reviewers field into validated reviewer entries.
///
/// Anything that is not a list yields no entries; list items without a
/// usable `login` are dropped individually.
pub fn decode_reviewers(field: Option<&str>) -> Vec<ReviewerRef> {
    decode_reviewers_with_outcome(field).0
}

pub fn decode_reviewers_with_outcome(field: Option<&str>) -> (Vec<ReviewerRef>, DecodeOutcome) {
    let text = match field.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return (Vec::new(), DecodeOutcome::Absent),
    };

    let parsed = match serde_json::from_str::<Value>(text) {
        Ok(value) => Ok(value),
        Err(_) => parse_literal(text),
    };
    let items = match parsed {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            debug!("requested reviewers is not a list: {:?}", text);
            return (Vec::new(), DecodeOutcome::Malformed);
        }
        Err(err) => {
            debug!("undecodable requested reviewers ({}): {:?}", err, text);
            return (Vec::new(), DecodeOutcome::Malformed);
        }
    };

    let total = items.len();
    let reviewers: Vec<ReviewerRef> = items.iter().filter_map(reviewer_from_value).collect();
    let outcome = DecodeOutcome::Decoded {
        accepted: reviewers.len(),
        skipped: total - reviewers.len(),
    };
    (reviewers, outcome)
}

fn reviewer_from_value(value: &Value) -> Option<ReviewerRef> {
    let login = value.as_object()?.get("login")?.as_str()?.trim();
    if login.is_empty() {
        return None;
    }
    Some(ReviewerRef {
        login: login.to_string(),
    })
}

/// Synthetic reviewer events for a merged record, each worth exactly one.
pub fn expand_reviewers(merged: &MergedRecord<'_>, names: &DisplayNames) -> Vec<Event> {
    decode_reviewers(merged.record.requested_reviewers.as_deref())
        .into_iter()
        .map(|reviewer| merged.to_event(names.resolve(&reviewer.login).to_string(), 1.0))
        .collect()
}
