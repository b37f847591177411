//! Record normalizer: filters raw rows and derives their calendar position.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Category, Event, RawRecord};

/// Additions above this are treated as export errors, not real changes.
pub const DEFAULT_MAX_ADDITIONS: f64 = 30_000.0;

pub const DEFAULT_EXCLUDED_ACCOUNTS: &[&str] = &["dp-actions[bot]"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NormalizeRules {
    pub max_additions: f64,
    pub excluded_accounts: BTreeSet<String>,
}

impl Default for NormalizeRules {
    fn default() -> Self {
        Self {
            max_additions: DEFAULT_MAX_ADDITIONS,
            excluded_accounts: DEFAULT_EXCLUDED_ACCOUNTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Why a record did not contribute to a request.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ExcludedAccount,
    Outlier,
    MissingSize,
    CategoryNotSelected,
    Unmerged,
    BadTimestamp,
    OtherYear,
    MissingAccount,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::ExcludedAccount => "excluded_account",
            SkipReason::Outlier => "outlier",
            SkipReason::MissingSize => "missing_size",
            SkipReason::CategoryNotSelected => "category_not_selected",
            SkipReason::Unmerged => "unmerged",
            SkipReason::BadTimestamp => "bad_timestamp",
            SkipReason::OtherYear => "other_year",
            SkipReason::MissingAccount => "missing_account",
        }
    }
}

/// A record that merged inside the selection, with its derived calendar fields.
#[derive(Clone, Debug)]
pub struct MergedRecord<'a> {
    pub record: &'a RawRecord,
    pub merged_at: DateTime<FixedOffset>,
    pub year: i32,
    pub day_of_year: u32,
    pub category: Category,
}

impl MergedRecord<'_> {
    pub fn to_event(&self, group_key: String, weight: f64) -> Event {
        Event {
            merged_at: self.merged_at,
            year: self.year,
            day_of_year: self.day_of_year,
            category: self.category,
            group_key,
            weight,
        }
    }
}

pub fn normalize<'a>(
    record: &'a RawRecord,
    selection: &BTreeSet<Category>,
    rules: &NormalizeRules,
) -> Result<MergedRecord<'a>, SkipReason> {
    if let Some(account) = record.account.as_deref() {
        if rules.excluded_accounts.contains(account.trim()) {
            return Err(SkipReason::ExcludedAccount);
        }
    }

    // An unknown size cannot pass the sanity bound.
    let Some(additions) = record.additions else {
        trace!("dropping record {:?} without a size", record.id);
        return Err(SkipReason::MissingSize);
    };
    if additions > rules.max_additions {
        trace!("dropping outlier record {:?}", record.id);
        return Err(SkipReason::Outlier);
    }

    let category = Category::from_repo_name(record.repo_name.as_deref());
    if !selection.contains(&category) {
        return Err(SkipReason::CategoryNotSelected);
    }

    let raw = match record.merged_at.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(SkipReason::Unmerged),
    };
    let merged_at = match parse_timestamp(raw) {
        Some(ts) => ts,
        None => {
            trace!("unparseable merge timestamp {:?} on {:?}", raw, record.id);
            return Err(SkipReason::BadTimestamp);
        }
    };

    Ok(MergedRecord {
        record,
        merged_at,
        year: merged_at.year(),
        day_of_year: merged_at.ordinal(),
        category,
    })
}

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse a merge timestamp, keeping whatever UTC offset it carries.
///
/// Timestamps without an offset are read as UTC wall-clock time.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(text, fmt) {
            return Some(ts);
        }
    }
    let utc = FixedOffset::east_opt(0)?;
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return utc.from_local_datetime(&naive).single();
        }
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
    utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all() -> BTreeSet<Category> {
        Category::ALL.iter().copied().collect()
    }

    fn merged(at: &str) -> RawRecord {
        RawRecord {
            merged_at: Some(at.to_string()),
            repo_name: Some("space-intelligence".into()),
            account: Some("alice".into()),
            additions: Some(10.0),
            ..RawRecord::default()
        }
    }

    #[test]
    fn derives_calendar_fields() {
        let record = merged("2024-12-31T23:00:00Z");
        let m = normalize(&record, &all(), &NormalizeRules::default()).unwrap();
        assert_eq!(m.year, 2024);
        assert_eq!(m.day_of_year, 366);
        assert_eq!(m.category, Category::SpaceIntelligence);
    }

    #[test]
    fn calendar_follows_timestamp_offset() {
        // Already Jan 2nd in UTC.
        let record = merged("2025-01-01T23:30:00-05:00");
        let m = normalize(&record, &all(), &NormalizeRules::default()).unwrap();
        assert_eq!(m.day_of_year, 1);
    }

    #[test]
    fn unmerged_and_bad_timestamps_are_skipped() {
        let mut record = merged("");
        record.merged_at = None;
        let rules = NormalizeRules::default();
        assert_eq!(normalize(&record, &all(), &rules).unwrap_err(), SkipReason::Unmerged);

        let record = merged("   ");
        assert_eq!(normalize(&record, &all(), &rules).unwrap_err(), SkipReason::Unmerged);

        let record = merged("yesterday-ish");
        assert_eq!(normalize(&record, &all(), &rules).unwrap_err(), SkipReason::BadTimestamp);
    }

    #[test]
    fn drops_bots_outliers_and_unselected() {
        let rules = NormalizeRules::default();

        let mut bot = merged("2025-02-01T00:00:00Z");
        bot.account = Some("dp-actions[bot]".into());
        assert_eq!(normalize(&bot, &all(), &rules).unwrap_err(), SkipReason::ExcludedAccount);

        let mut huge = merged("2025-02-01T00:00:00Z");
        huge.additions = Some(30_001.0);
        assert_eq!(normalize(&huge, &all(), &rules).unwrap_err(), SkipReason::Outlier);

        let mut at_bound = merged("2025-02-01T00:00:00Z");
        at_bound.additions = Some(30_000.0);
        assert!(normalize(&at_bound, &all(), &rules).is_ok());

        let mut unknown_size = merged("2025-02-01T00:00:00Z");
        unknown_size.additions = None;
        assert_eq!(
            normalize(&unknown_size, &all(), &rules).unwrap_err(),
            SkipReason::MissingSize
        );

        let only_plugins: BTreeSet<_> = [Category::QgisPlugins].into_iter().collect();
        let record = merged("2025-02-01T00:00:00Z");
        assert_eq!(
            normalize(&record, &only_plugins, &rules).unwrap_err(),
            SkipReason::CategoryNotSelected
        );
    }

    #[test]
    fn parses_common_export_formats() {
        for text in [
            "2025-03-04T05:06:07Z",
            "2025-03-04T05:06:07+00:00",
            "2025-03-04 05:06:07+00:00",
            "2025-03-04T05:06:07",
            "2025-03-04 05:06:07",
            "2025-03-04",
        ] {
            let ts = parse_timestamp(text).unwrap_or_else(|| panic!("failed on {}", text));
            assert_eq!(ts.ordinal(), 63, "{}", text);
        }
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("2025-13-40").is_none());
    }
}
