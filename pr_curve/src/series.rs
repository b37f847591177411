//! Cumulative series builder.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use ndarray::Array1;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::{Category, CurveError};

/// Largest day-of-year, reached on Dec 31st of a leap year.
pub const MAX_DAY_OF_YEAR: u32 = 366;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GroupingDimension {
    Year,
    Contributor,
    Reviewer,
}

impl GroupingDimension {
    pub fn id(&self) -> &'static str {
        match self {
            GroupingDimension::Year => "year",
            GroupingDimension::Contributor => "contributor",
            GroupingDimension::Reviewer => "reviewer",
        }
    }

    pub fn needs_year(&self) -> bool {
        !matches!(self, GroupingDimension::Year)
    }
}

impl fmt::Display for GroupingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for GroupingDimension {
    type Err = CurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "year" => Ok(GroupingDimension::Year),
            "contributor" | "user" => Ok(GroupingDimension::Contributor),
            "reviewer" => Ok(GroupingDimension::Reviewer),
            other => Err(CurveError::UnknownDimension(other.to_string())),
        }
    }
}

/// A weighted, calendar-positioned unit of activity attributed to one group.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Event {
    pub merged_at: DateTime<FixedOffset>,
    pub year: i32,
    pub day_of_year: u32,
    pub category: Category,
    pub group_key: String,
    pub weight: f64,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct CumulativePoint {
    pub day_of_year: u32,
    pub cumulative_value: f64,
}

/// Running total of one group for every day from 1 through its last active day.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CumulativeSeries {
    pub group_key: String,
    #[serde(rename = "values", serialize_with = "serialize_totals")]
    totals: Array1<f64>,
}

fn serialize_totals<S: Serializer>(totals: &Array1<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(totals.iter())
}

impl CumulativeSeries {
    /// Prefix-sum per-day weight buckets; `daily[i]` holds day `i + 1`.
    fn from_daily(group_key: String, daily: Vec<f64>) -> Self {
        let mut totals = Array1::from_vec(daily);
        let mut running = 0.0;
        for value in totals.iter_mut() {
            running += *value;
            *value = running;
        }
        Self { group_key, totals }
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn max_day(&self) -> u32 {
        self.totals.len() as u32
    }

    pub fn final_value(&self) -> f64 {
        self.values().last().copied().unwrap_or(0.0)
    }

    /// Largest running total; differs from the final value only for shrinking metrics.
    pub fn peak_value(&self) -> f64 {
        self.totals.iter().copied().fold(f64::MIN, f64::max).max(0.0)
    }

    pub fn value_at(&self, day: u32) -> Option<f64> {
        if day == 0 {
            return None;
        }
        self.totals.get(day as usize - 1).copied()
    }

    pub fn point(&self, day: u32) -> Option<CumulativePoint> {
        self.value_at(day).map(|cumulative_value| CumulativePoint {
            day_of_year: day,
            cumulative_value,
        })
    }

    pub fn points(&self) -> impl Iterator<Item = CumulativePoint> + '_ {
        self.totals
            .iter()
            .enumerate()
            .map(|(idx, &cumulative_value)| CumulativePoint {
                day_of_year: idx as u32 + 1,
                cumulative_value,
            })
    }

    pub fn values(&self) -> &[f64] {
        self.totals.as_slice().unwrap_or(&[])
    }
}

/// Group events by key and accumulate each group over days `1..=max_day`.
///
/// Groups are keyed (and therefore ordered) by ascending group key. Events
/// with a day outside `1..=366` cannot come from a real calendar date and
/// are ignored.
pub fn build_series(events: &[Event]) -> BTreeMap<String, CumulativeSeries> {
    let mut daily: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for event in events {
        let day = event.day_of_year;
        if day == 0 || day > MAX_DAY_OF_YEAR {
            warn!("ignoring event for '{}' on day {}", event.group_key, day);
            continue;
        }
        let buckets = daily.entry(event.group_key.as_str()).or_default();
        if buckets.len() < day as usize {
            buckets.resize(day as usize, 0.0);
        }
        buckets[day as usize - 1] += event.weight;
    }

    daily
        .into_iter()
        .map(|(key, buckets)| {
            let key = key.to_string();
            (key.clone(), CumulativeSeries::from_daily(key, buckets))
        })
        .collect()
}
