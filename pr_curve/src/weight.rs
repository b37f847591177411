use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::RawRecord;

/// How much a single merged record contributes to its group's running total.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WeightMetric {
    #[default]
    #[serde(alias = "pr_count")]
    Count,
    LinesAdded,
    NetLines,
    Comments,
}

impl WeightMetric {
    pub const ALL: [WeightMetric; 4] = [
        WeightMetric::Count,
        WeightMetric::LinesAdded,
        WeightMetric::NetLines,
        WeightMetric::Comments,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            WeightMetric::Count => "count",
            WeightMetric::LinesAdded => "lines_added",
            WeightMetric::NetLines => "net_lines",
            WeightMetric::Comments => "comments",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WeightMetric::Count => "PRs",
            WeightMetric::LinesAdded => "Lines Added",
            WeightMetric::NetLines => "Net Lines Added",
            WeightMetric::Comments => "Comments",
        }
    }

    /// Only net lines can shrink a running total.
    pub fn is_monotonic(&self) -> bool {
        !matches!(self, WeightMetric::NetLines)
    }

    /// Resolve a metric name, falling back to `count` for anything unknown.
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim() {
            "count" | "pr_count" => WeightMetric::Count,
            "lines_added" => WeightMetric::LinesAdded,
            "net_lines" => WeightMetric::NetLines,
            "comments" => WeightMetric::Comments,
            other => {
                warn!("unknown weight metric '{}', using count", other);
                WeightMetric::Count
            }
        }
    }
}

impl fmt::Display for WeightMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Weight of one record under `metric`. Missing numeric fields count as zero.
pub fn weight(record: &RawRecord, metric: WeightMetric) -> f64 {
    match metric {
        WeightMetric::Count => 1.0,
        WeightMetric::LinesAdded => record.additions_or_zero(),
        WeightMetric::NetLines => record.additions_or_zero() - record.deletions_or_zero(),
        WeightMetric::Comments => record.comments_or_zero() + 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(additions: Option<f64>, deletions: Option<f64>, comments: Option<f64>) -> RawRecord {
        RawRecord {
            additions,
            deletions,
            review_comment_count: comments,
            ..RawRecord::default()
        }
    }

    #[test]
    fn metrics_use_their_fields() {
        let record = sized(Some(120.0), Some(20.0), Some(4.0));
        assert_eq!(weight(&record, WeightMetric::Count), 1.0);
        assert_eq!(weight(&record, WeightMetric::LinesAdded), 120.0);
        assert_eq!(weight(&record, WeightMetric::NetLines), 100.0);
        assert_eq!(weight(&record, WeightMetric::Comments), 5.0);
    }

    #[test]
    fn missing_fields_count_as_zero() {
        let record = sized(None, None, None);
        assert_eq!(weight(&record, WeightMetric::LinesAdded), 0.0);
        assert_eq!(weight(&record, WeightMetric::NetLines), 0.0);
        assert_eq!(weight(&record, WeightMetric::Comments), 1.0);

        let shrink = sized(Some(5.0), Some(8.0), None);
        assert_eq!(weight(&shrink, WeightMetric::NetLines), -3.0);
    }

    #[test]
    fn unknown_metric_falls_back_to_count() {
        assert_eq!(WeightMetric::parse_lenient("pr_count"), WeightMetric::Count);
        assert_eq!(WeightMetric::parse_lenient("net_lines"), WeightMetric::NetLines);
        assert_eq!(WeightMetric::parse_lenient("stars"), WeightMetric::Count);
    }

    #[test]
    fn serde_accepts_dashboard_names() {
        let metric: WeightMetric = serde_json::from_str("\"pr_count\"").unwrap();
        assert_eq!(metric, WeightMetric::Count);
        assert_eq!(serde_json::to_string(&WeightMetric::LinesAdded).unwrap(), "\"lines_added\"");
    }
}
