//! Cumulative pull-request activity curves.
//!
//! Turns a log of merged pull-request records into per-group running totals
//! (by calendar year, contributor or reviewer) and samples them into ordered
//! animation frames for a rendering layer.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub mod dataset;
pub mod frames;
pub mod labels;
mod literal;
pub mod names;
pub mod normalize;
pub mod record;
pub mod request;
pub mod reviewers;
pub mod series;
pub mod weight;

pub use dataset::{Category, Dataset};
pub use frames::{
    assemble_frames, rank_top_n, Frame, FramePoint, DEFAULT_DAY_STRIDE, DEFAULT_TOP_N,
};
pub use labels::{title_prefix, AnimationLabels, MONTH_TICKS};
pub use names::DisplayNames;
pub use normalize::{normalize, parse_timestamp, MergedRecord, NormalizeRules, SkipReason};
pub use record::RawRecord;
pub use request::CurveRequest;
pub use reviewers::{
    decode_reviewers, decode_reviewers_with_outcome, expand_reviewers, DecodeOutcome, ReviewerRef,
};
pub use series::{build_series, CumulativePoint, CumulativeSeries, Event, GroupingDimension};
pub use weight::{weight, WeightMetric};

#[derive(Error, Debug)]
pub enum CurveError {
    #[error("unknown grouping dimension: {0}")]
    UnknownDimension(String),
    #[error("day stride must be a positive integer, got {0}")]
    InvalidStride(u32),
    #[error("a year is required for the {0} view")]
    MissingYear(&'static str),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("failed to decode display-name table: {0}")]
    NameTable(String),
    #[error("cumulative series for '{group}' has no point at day {day}")]
    SeriesGap { group: String, day: u32 },
}

/// Per-request accounting of how input records were consumed.
#[derive(Clone, Debug, Default, Serialize)]
pub struct EventStats {
    pub records_seen: usize,
    pub records_used: usize,
    pub events: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
}

impl EventStats {
    fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_insert(0) += 1;
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Everything a renderer needs to draw one animated view.
#[derive(Clone, Debug, Serialize)]
pub struct Animation {
    pub request: CurveRequest,
    pub labels: AnimationLabels,
    /// Per-group running totals, ascending by group key.
    pub series: Vec<CumulativeSeries>,
    pub frames: Vec<Frame>,
    /// Groups carrying a persistent label, best first.
    pub top_labels: Vec<String>,
    pub max_day: u32,
    pub max_value: f64,
    pub stats: EventStats,
}

impl Animation {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn series_for(&self, group_key: &str) -> Option<&CumulativeSeries> {
        self.series
            .binary_search_by(|s| s.group_key.as_str().cmp(group_key))
            .ok()
            .map(|idx| &self.series[idx])
    }
}

/// Derive the events a request aggregates over.
///
/// Records that are unmerged, excluded, outliers or outside the selection are
/// tallied in the returned stats and otherwise ignored.
pub fn collect_events(
    records: &[RawRecord],
    names: &DisplayNames,
    rules: &NormalizeRules,
    request: &CurveRequest,
) -> (Vec<Event>, EventStats) {
    let mut stats = EventStats::default();
    let mut events = Vec::new();

    for record in records {
        stats.records_seen += 1;
        let merged = match normalize(record, &request.dataset_selection, rules) {
            Ok(merged) => merged,
            Err(reason) => {
                stats.skip(reason);
                continue;
            }
        };

        if request.dimension != GroupingDimension::Year && Some(merged.year) != request.year {
            stats.skip(SkipReason::OtherYear);
            continue;
        }

        match request.dimension {
            GroupingDimension::Year => {
                let key = merged.year.to_string();
                events.push(merged.to_event(key, weight(record, request.weight_metric)));
            }
            GroupingDimension::Contributor => {
                let Some(account) = record.account.as_deref().filter(|a| !a.trim().is_empty())
                else {
                    stats.skip(SkipReason::MissingAccount);
                    continue;
                };
                let key = names.resolve(account.trim()).to_string();
                events.push(merged.to_event(key, weight(record, request.weight_metric)));
            }
            GroupingDimension::Reviewer => {
                let expanded = expand_reviewers(&merged, names);
                if expanded.is_empty() {
                    continue;
                }
                events.extend(expanded);
            }
        }
        stats.records_used += 1;
    }

    stats.events = events.len();
    (events, stats)
}

/// Run one request end to end: normalize, expand, accumulate, assemble.
pub fn compute_animation(
    records: &[RawRecord],
    names: &DisplayNames,
    rules: &NormalizeRules,
    request: &CurveRequest,
) -> Result<Animation, CurveError> {
    request.validate()?;
    let labels = AnimationLabels::for_request(request);

    if request.dataset_selection.is_empty() {
        debug!("empty dataset selection, nothing to draw");
        return Ok(Animation {
            request: request.clone(),
            labels,
            series: Vec::new(),
            frames: Vec::new(),
            top_labels: Vec::new(),
            max_day: 0,
            max_value: 0.0,
            stats: EventStats::default(),
        });
    }

    let (events, stats) = collect_events(records, names, rules, request);
    debug!(
        "{} events from {} records ({} skipped)",
        stats.events,
        stats.records_seen,
        stats.total_skipped()
    );

    let grouped = build_series(&events);
    let frames = assemble_frames(&grouped, request.day_stride, request.top_n)?;
    let top_labels = rank_top_n(&grouped, request.top_n);
    let max_day = grouped.values().map(|s| s.max_day()).max().unwrap_or(0);
    let max_value = grouped
        .values()
        .map(|s| s.peak_value())
        .fold(0.0_f64, f64::max);

    Ok(Animation {
        request: request.clone(),
        labels,
        series: grouped.into_values().collect(),
        frames,
        top_labels,
        max_day,
        max_value,
        stats,
    })
}

/// Distinct merge years present in the records for the given selection.
pub fn available_years(
    records: &[RawRecord],
    selection: &BTreeSet<Category>,
    rules: &NormalizeRules,
) -> BTreeSet<i32> {
    records
        .iter()
        .filter_map(|r| normalize(r, selection, rules).ok())
        .map(|m| m.year)
        .collect()
}
