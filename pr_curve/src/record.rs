//! Raw pull-request rows as exported from the hosting service.
//!
//! Every field is optional. Numeric cells are decoded leniently: a value that
//! does not fit becomes `None` instead of failing the whole row. Identifier
//! and text cells are kept verbatim, only blanks become `None`.

use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    /// Per-repository PR number; exports usually carry it next to `id`.
    #[serde(default, deserialize_with = "lenient_text")]
    pub number: Option<String>,
    #[serde(default, deserialize_with = "verbatim_text")]
    pub merged_at: Option<String>,
    #[serde(default, rename = "base.repo.name", deserialize_with = "verbatim_text")]
    pub repo_name: Option<String>,
    #[serde(default, rename = "user.login", deserialize_with = "verbatim_text")]
    pub account: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub additions: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub deletions: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub review_comment_count: Option<f64>,
    #[serde(default, deserialize_with = "verbatim_text")]
    pub requested_reviewers: Option<String>,
}

impl RawRecord {
    pub fn additions_or_zero(&self) -> f64 {
        self.additions.unwrap_or(0.0)
    }

    pub fn deletions_or_zero(&self) -> f64 {
        self.deletions.unwrap_or(0.0)
    }

    pub fn comments_or_zero(&self) -> f64 {
        self.review_comment_count.unwrap_or(0.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextLike {
    Text(String),
    Integer(i64),
    Float(f64),
    Other(IgnoredAny),
}

/// Parse a numeric cell; blanks, `nan` and non-finite values count as missing.
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberLike>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberLike::Number(v)) if v.is_finite() => Some(v),
        Some(NumberLike::Text(s)) => parse_number(&s),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<TextLike>::deserialize(deserializer)?;
    Ok(match value {
        Some(TextLike::Text(s)) if !s.trim().is_empty() => Some(s),
        Some(TextLike::Integer(v)) => Some(v.to_string()),
        Some(TextLike::Float(v)) if v.is_finite() => Some(v.to_string()),
        _ => None,
    })
}

/// Text cells taken as written, with no numeric or boolean guessing.
fn verbatim_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_export_row_from_json() {
        let row: RawRecord = serde_json::from_value(serde_json::json!({
            "number": 42,
            "merged_at": "2025-01-10T09:00:00Z",
            "base.repo.name": "space-intelligence",
            "user.login": "alice",
            "additions": 12,
            "deletions": "3",
            "review_comment_count": null,
            "requested_reviewers": "[]"
        }))
        .unwrap();
        assert_eq!(row.id, None);
        assert_eq!(row.number.as_deref(), Some("42"));
        assert_eq!(row.repo_name.as_deref(), Some("space-intelligence"));
        assert_eq!(row.account.as_deref(), Some("alice"));
        assert_eq!(row.additions, Some(12.0));
        assert_eq!(row.deletions, Some(3.0));
        assert_eq!(row.review_comment_count, None);
        assert_eq!(row.comments_or_zero(), 0.0);
    }

    #[test]
    fn invalid_fields_become_missing() {
        let row: RawRecord = serde_json::from_value(serde_json::json!({
            "merged_at": "",
            "additions": "lots",
            "deletions": true,
            "review_comment_count": "nan"
        }))
        .unwrap();
        assert_eq!(row.merged_at, None);
        assert_eq!(row.additions, None);
        assert_eq!(row.deletions, None);
        assert_eq!(row.review_comment_count, None);
        assert_eq!(row.additions_or_zero(), 0.0);
    }

    #[test]
    fn missing_columns_default() {
        let row: RawRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(row, RawRecord::default());
    }
}
