use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::frames::{DEFAULT_DAY_STRIDE, DEFAULT_TOP_N};
use crate::{Category, CurveError, GroupingDimension, WeightMetric};

/// Parameters of one aggregation request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CurveRequest {
    pub dataset_selection: BTreeSet<Category>,
    pub dimension: GroupingDimension,
    /// Ignored by the reviewer view, where every event weighs one.
    pub weight_metric: WeightMetric,
    pub year: Option<i32>,
    pub top_n: usize,
    pub day_stride: u32,
}

impl Default for CurveRequest {
    fn default() -> Self {
        Self {
            dataset_selection: Category::ALL.iter().copied().collect(),
            dimension: GroupingDimension::Year,
            weight_metric: WeightMetric::Count,
            year: None,
            top_n: DEFAULT_TOP_N,
            day_stride: DEFAULT_DAY_STRIDE,
        }
    }
}

impl CurveRequest {
    pub fn year_comparison(selection: BTreeSet<Category>, metric: WeightMetric) -> Self {
        Self {
            dataset_selection: selection,
            weight_metric: metric,
            ..Self::default()
        }
    }

    pub fn contributors(selection: BTreeSet<Category>, year: i32, metric: WeightMetric) -> Self {
        Self {
            dataset_selection: selection,
            dimension: GroupingDimension::Contributor,
            weight_metric: metric,
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn reviewers(selection: BTreeSet<Category>, year: i32) -> Self {
        Self {
            dataset_selection: selection,
            dimension: GroupingDimension::Reviewer,
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CurveError> {
        if self.day_stride == 0 {
            return Err(CurveError::InvalidStride(self.day_stride));
        }
        if self.dimension.needs_year() && self.year.is_none() {
            return Err(CurveError::MissingYear(self.dimension.id()));
        }
        Ok(())
    }

    /// SHA-256 of the canonical JSON form, for matching results to requests.
    pub fn fingerprint(&self) -> Result<String, CurveError> {
        let bytes =
            serde_json::to_vec(self).map_err(|e| CurveError::InvalidParameter(e.to_string()))?;
        let digest = Sha256::digest(&bytes);
        let mut out = String::with_capacity(digest.len() * 2);
        for b in digest {
            let _ = write!(&mut out, "{:02x}", b);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dashboard() {
        let request = CurveRequest::default();
        assert_eq!(request.top_n, 7);
        assert_eq!(request.day_stride, 2);
        assert_eq!(request.dataset_selection.len(), 3);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn user_views_need_a_year() {
        let mut request = CurveRequest::reviewers(BTreeSet::new(), 2025);
        assert!(request.validate().is_ok());
        request.year = None;
        assert!(matches!(request.validate(), Err(CurveError::MissingYear("reviewer"))));
    }

    #[test]
    fn fingerprint_tracks_parameters() {
        let a = CurveRequest::contributors(BTreeSet::new(), 2025, WeightMetric::Count);
        let mut b = a.clone();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.weight_metric = WeightMetric::Comments;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let request: CurveRequest =
            serde_json::from_str(r#"{"dimension": "contributor", "year": 2024}"#).unwrap();
        assert_eq!(request.dimension, GroupingDimension::Contributor);
        assert_eq!(request.year, Some(2024));
        assert_eq!(request.day_stride, 2);
    }
}
