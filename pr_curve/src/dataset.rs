use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    compute_animation, Animation, CurveError, CurveRequest, DisplayNames, NormalizeRules, RawRecord,
};

/// Source bucket a record belongs to, derived from its base repository name.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    MapperTemplate,
    SpaceIntelligence,
    QgisPlugins,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::MapperTemplate,
        Category::SpaceIntelligence,
        Category::QgisPlugins,
    ];

    /// Known repositories get their own bucket; everything else is a plugin repo.
    pub fn from_repo_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some("mapper-project-template") => Category::MapperTemplate,
            Some("space-intelligence") => Category::SpaceIntelligence,
            _ => Category::QgisPlugins,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Category::MapperTemplate => "mapper_template",
            Category::SpaceIntelligence => "space_intelligence",
            Category::QgisPlugins => "qgis_plugins",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::MapperTemplate => "Mapper Template",
            Category::SpaceIntelligence => "Space Intelligence",
            Category::QgisPlugins => "QGIS Plugins",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Category {
    type Err = CurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.id() == s.trim())
            .ok_or_else(|| CurveError::InvalidParameter(format!("unknown dataset '{}'", s)))
    }
}

/// Records loaded once at start-up, shared read-only by every request.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub records: Vec<RawRecord>,
    pub names: DisplayNames,
    pub rules: NormalizeRules,
}

impl Dataset {
    pub fn new(records: Vec<RawRecord>, names: DisplayNames, rules: NormalizeRules) -> Self {
        Self {
            records,
            names,
            rules,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn animate(&self, request: &CurveRequest) -> Result<Animation, CurveError> {
        compute_animation(&self.records, &self.names, &self.rules, request)
    }

    pub fn years(&self, selection: &BTreeSet<Category>) -> BTreeSet<i32> {
        crate::available_years(&self.records, selection, &self.rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_names_map_to_buckets() {
        assert_eq!(
            Category::from_repo_name(Some("mapper-project-template")),
            Category::MapperTemplate
        );
        assert_eq!(
            Category::from_repo_name(Some("space-intelligence")),
            Category::SpaceIntelligence
        );
        assert_eq!(
            Category::from_repo_name(Some("qgis-raster-tools")),
            Category::QgisPlugins
        );
        assert_eq!(Category::from_repo_name(None), Category::QgisPlugins);
    }

    #[test]
    fn category_ids_round_trip_through_text() {
        for category in Category::ALL {
            assert_eq!(category.id().parse::<Category>().unwrap(), category);
        }
        assert!("space".parse::<Category>().is_err());
    }

    #[test]
    fn dataset_is_shareable_across_threads() {
        fn assert_sync<T: Sync + Send>() {}
        assert_sync::<Dataset>();
    }
}
