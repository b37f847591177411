//! Human-readable text for the rendering layer.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{Category, CurveRequest, GroupingDimension};

/// Day-of-year positions of month starts, with a closing tick on day 365.
pub const MONTH_TICKS: [(u32, &str); 13] = [
    (1, "Jan"),
    (32, "Feb"),
    (60, "Mar"),
    (91, "Apr"),
    (121, "May"),
    (152, "Jun"),
    (182, "Jul"),
    (213, "Aug"),
    (244, "Sep"),
    (274, "Oct"),
    (305, "Nov"),
    (335, "Dec"),
    (365, "Dec"),
];

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AnimationLabels {
    pub title: String,
    pub x_axis_title: String,
    pub y_axis_title: String,
    /// Per-frame playback delay suggested for this view.
    pub frame_duration_ms: u32,
}

impl AnimationLabels {
    pub fn for_request(request: &CurveRequest) -> Self {
        let prefix = title_prefix(&request.dataset_selection);
        let year = request
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "all years".to_string());
        let (title, y_axis_title, frame_duration_ms) = match request.dimension {
            GroupingDimension::Year => (
                format!("Cumulative {} through the year", prefix),
                format!("Cumulative {}", request.weight_metric.label()),
                100,
            ),
            GroupingDimension::Contributor => (
                format!(
                    "Cumulative {} PRs by User ({})",
                    selection_names(&request.dataset_selection),
                    year
                ),
                format!("Cumulative {}", request.weight_metric.label()),
                160,
            ),
            GroupingDimension::Reviewer => (
                format!(
                    "Cumulative {} Reviews by User ({})",
                    selection_names(&request.dataset_selection),
                    year
                ),
                "Cumulative Reviews".to_string(),
                160,
            ),
        };
        Self {
            title,
            x_axis_title: "Month".to_string(),
            y_axis_title,
            frame_duration_ms,
        }
    }
}

fn selection_names(selection: &BTreeSet<Category>) -> String {
    if selection.is_empty() {
        return "No Data".to_string();
    }
    selection
        .iter()
        .map(|c| c.display_name())
        .collect::<Vec<_>>()
        .join(" + ")
}

/// "Mapper Template + QGIS Plugins PRs", or "No Data" for an empty selection.
pub fn title_prefix(selection: &BTreeSet<Category>) -> String {
    if selection.is_empty() {
        return "No Data".to_string();
    }
    format!("{} PRs", selection_names(selection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeightMetric;

    fn selection(categories: &[Category]) -> BTreeSet<Category> {
        categories.iter().copied().collect()
    }

    #[test]
    fn prefix_joins_selected_buckets() {
        assert_eq!(title_prefix(&BTreeSet::new()), "No Data");
        assert_eq!(
            title_prefix(&selection(&[Category::SpaceIntelligence])),
            "Space Intelligence PRs"
        );
        assert_eq!(
            title_prefix(&selection(&[Category::QgisPlugins, Category::MapperTemplate])),
            "Mapper Template + QGIS Plugins PRs"
        );
    }

    #[test]
    fn titles_per_view() {
        let sel = selection(&[Category::SpaceIntelligence]);

        let year = AnimationLabels::for_request(&CurveRequest::year_comparison(
            sel.clone(),
            WeightMetric::NetLines,
        ));
        assert_eq!(year.title, "Cumulative Space Intelligence PRs through the year");
        assert_eq!(year.y_axis_title, "Cumulative Net Lines Added");
        assert_eq!(year.frame_duration_ms, 100);

        let users = AnimationLabels::for_request(&CurveRequest::contributors(
            sel.clone(),
            2025,
            WeightMetric::Count,
        ));
        assert_eq!(users.title, "Cumulative Space Intelligence PRs by User (2025)");
        assert_eq!(users.y_axis_title, "Cumulative PRs");

        let reviews = AnimationLabels::for_request(&CurveRequest::reviewers(sel, 2025));
        assert_eq!(reviews.title, "Cumulative Space Intelligence Reviews by User (2025)");
        assert_eq!(reviews.y_axis_title, "Cumulative Reviews");
        assert_eq!(reviews.frame_duration_ms, 160);
    }
}
