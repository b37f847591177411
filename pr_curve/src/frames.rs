//! Frame assembler: samples cumulative series into animation snapshots.

use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::{CumulativeSeries, CurveError};

pub const DEFAULT_DAY_STRIDE: u32 = 2;
pub const DEFAULT_TOP_N: usize = 7;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FramePoint {
    pub group_key: String,
    pub day_of_year: u32,
    pub cumulative_value: f64,
    pub show_label: bool,
    /// The group went quiet before this frame and holds its final value.
    pub carried: bool,
}

/// Snapshot of every group at one sampled day.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Frame {
    pub day: u32,
    pub points: Vec<FramePoint>,
}

impl Frame {
    /// Frame name used by animation players.
    pub fn name(&self) -> String {
        self.day.to_string()
    }

    pub fn point(&self, group_key: &str) -> Option<&FramePoint> {
        self.points.iter().find(|p| p.group_key == group_key)
    }
}

/// Rank groups by final cumulative value (descending, ties by key) and keep the first `n`.
pub fn rank_top_n(series: &BTreeMap<String, CumulativeSeries>, n: usize) -> Vec<String> {
    let mut ranked: Vec<&CumulativeSeries> = series.values().collect();
    ranked.sort_by(|a, b| {
        OrderedFloat(b.final_value())
            .cmp(&OrderedFloat(a.final_value()))
            .then_with(|| a.group_key.cmp(&b.group_key))
    });
    ranked
        .into_iter()
        .take(n)
        .map(|s| s.group_key.clone())
        .collect()
}

/// Sample every group at days `1, 1 + stride, ...` up to the latest active day.
///
/// Groups whose activity ended earlier are carried forward at their final
/// value. The labelled set is decided once and is the same in every frame.
pub fn assemble_frames(
    series: &BTreeMap<String, CumulativeSeries>,
    day_stride: u32,
    top_n: usize,
) -> Result<Vec<Frame>, CurveError> {
    if day_stride == 0 {
        return Err(CurveError::InvalidStride(day_stride));
    }
    let global_max = series.values().map(|s| s.max_day()).max().unwrap_or(0);
    if global_max == 0 {
        return Ok(Vec::new());
    }

    let labelled: BTreeSet<String> = rank_top_n(series, top_n).into_iter().collect();
    let mut frames = Vec::with_capacity((global_max / day_stride + 1) as usize);

    for day in (1..=global_max).step_by(day_stride as usize) {
        let mut points = Vec::with_capacity(series.len());
        for group in series.values() {
            let carried = day > group.max_day();
            let sample_day = if carried { group.max_day() } else { day };
            let point = match group.point(sample_day) {
                Some(point) => point,
                None => {
                    debug_assert!(false, "series '{}' missing day {}", group.group_key, sample_day);
                    return Err(CurveError::SeriesGap {
                        group: group.group_key.clone(),
                        day: sample_day,
                    });
                }
            };
            points.push(FramePoint {
                group_key: group.group_key.clone(),
                day_of_year: point.day_of_year,
                cumulative_value: point.cumulative_value,
                show_label: labelled.contains(&group.group_key),
                carried,
            });
        }
        frames.push(Frame { day, points });
    }

    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_series, parse_timestamp, Category, Event};

    fn event(key: &str, day: u32, weight: f64) -> Event {
        Event {
            merged_at: parse_timestamp("2025-01-01T00:00:00Z").unwrap(),
            year: 2025,
            day_of_year: day,
            category: Category::MapperTemplate,
            group_key: key.to_string(),
            weight,
        }
    }

    #[test]
    fn samples_every_stride_up_to_global_max() {
        let series = build_series(&[event("a", 9, 1.0), event("b", 4, 1.0)]);
        let frames = assemble_frames(&series, 2, 7).unwrap();
        let days: Vec<u32> = frames.iter().map(|f| f.day).collect();
        assert_eq!(days, vec![1, 3, 5, 7, 9]);

        let every_day = assemble_frames(&series, 1, 7).unwrap();
        assert_eq!(every_day.len(), 9);
        assert_eq!(every_day.last().unwrap().day, 9);

        // The last sampled day may fall short of the global max.
        let sparse = assemble_frames(&series, 4, 7).unwrap();
        let days: Vec<u32> = sparse.iter().map(|f| f.day).collect();
        assert_eq!(days, vec![1, 5, 9]);
    }

    #[test]
    fn finished_groups_carry_forward() {
        let series = build_series(&[event("early", 3, 2.0), event("late", 11, 1.0)]);
        let frames = assemble_frames(&series, 2, 7).unwrap();
        for frame in &frames {
            let early = frame.point("early").unwrap();
            if frame.day > 3 {
                assert!(early.carried);
                assert_eq!(early.day_of_year, 3);
                assert_eq!(early.cumulative_value, 2.0);
            } else {
                assert!(!early.carried);
                assert_eq!(early.day_of_year, frame.day);
            }
            assert_eq!(frame.points.len(), 2);
        }
    }

    #[test]
    fn top_n_is_fixed_and_tie_broken_by_key() {
        let series = build_series(&[
            event("carol", 2, 5.0),
            event("bob", 8, 5.0),
            event("alice", 1, 1.0),
            event("dave", 3, 9.0),
        ]);
        assert_eq!(rank_top_n(&series, 3), vec!["dave", "bob", "carol"]);
        assert_eq!(rank_top_n(&series, 10).len(), 4);
        assert!(rank_top_n(&series, 0).is_empty());

        let frames = assemble_frames(&series, 1, 2).unwrap();
        for frame in &frames {
            let labelled: Vec<_> = frame
                .points
                .iter()
                .filter(|p| p.show_label)
                .map(|p| p.group_key.as_str())
                .collect();
            assert_eq!(labelled, vec!["bob", "dave"]);
        }
    }

    #[test]
    fn rejects_zero_stride_and_handles_empty_input() {
        let series = build_series(&[event("a", 1, 1.0)]);
        assert!(matches!(
            assemble_frames(&series, 0, 7),
            Err(CurveError::InvalidStride(0))
        ));
        assert!(assemble_frames(&BTreeMap::new(), 2, 7).unwrap().is_empty());
    }
}
