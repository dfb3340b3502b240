#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Year, month and category filtering for incident collections.
//!
//! A [`FilterState`] holds three explicit inclusion sets. An empty set
//! means "nothing selected" and hides everything; there is no implicit
//! "no filter" mode. States are replaced wholesale on every change (see
//! [`FilterAction`]) rather than mutated in place, so a new state compares
//! unequal to the old one exactly when the selection changed.

mod action;
pub mod feed;
mod vocabulary;

use std::collections::BTreeSet;

use chrono::Datelike as _;
use incident_map_incident_models::IncidentPoint;
use serde::{Deserialize, Serialize};

pub use action::FilterAction;
pub use vocabulary::{FilterVocabulary, is_all_months_selected};

/// Zero-based month indices, January through December.
pub const ALL_MONTHS: [u32; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

/// The user's current selection along the three filter dimensions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "FilterStateSnapshot")]
pub struct FilterState {
    years: BTreeSet<i32>,
    months: BTreeSet<u32>,
    categories: BTreeSet<String>,
}

impl FilterState {
    /// Builds a state from explicit selections. Month indices above 11 are
    /// discarded.
    #[must_use]
    pub fn new<C: Into<String>>(
        years: impl IntoIterator<Item = i32>,
        months: impl IntoIterator<Item = u32>,
        categories: impl IntoIterator<Item = C>,
    ) -> Self {
        Self {
            years: years.into_iter().collect(),
            months: valid_months(months),
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    /// Selects every year and category in `vocabulary` and all twelve
    /// months.
    #[must_use]
    pub fn select_all(vocabulary: &FilterVocabulary) -> Self {
        Self::new(
            vocabulary.years().iter().copied(),
            ALL_MONTHS,
            vocabulary.categories().iter().cloned(),
        )
    }

    /// Selected years.
    #[must_use]
    pub const fn years(&self) -> &BTreeSet<i32> {
        &self.years
    }

    /// Selected zero-based months.
    #[must_use]
    pub const fn months(&self) -> &BTreeSet<u32> {
        &self.months
    }

    /// Selected categories.
    #[must_use]
    pub const fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    /// Returns a copy with the year set replaced.
    #[must_use]
    pub fn with_years(&self, years: BTreeSet<i32>) -> Self {
        Self {
            years,
            ..self.clone()
        }
    }

    /// Returns a copy with the month set replaced.
    #[must_use]
    pub fn with_months(&self, months: BTreeSet<u32>) -> Self {
        Self {
            months: valid_months(months),
            ..self.clone()
        }
    }

    /// Returns a copy with the category set replaced.
    #[must_use]
    pub fn with_categories(&self, categories: BTreeSet<String>) -> Self {
        Self {
            categories,
            ..self.clone()
        }
    }

    /// Whether any dimension has nothing selected, which hides every point.
    #[must_use]
    pub fn selects_nothing(&self) -> bool {
        self.years.is_empty() || self.months.is_empty() || self.categories.is_empty()
    }

    /// Whether `incident` passes all three dimensions.
    ///
    /// Incidents without a parsable timestamp never match.
    #[must_use]
    pub fn matches(&self, incident: &IncidentPoint) -> bool {
        let Some(occurred_at) = incident.occurred_at() else {
            return false;
        };

        self.years.contains(&occurred_at.year())
            && self.months.contains(&occurred_at.month0())
            && self.categories.contains(incident.category())
    }
}

/// Wire form of [`FilterState`]. Missing sets are empty.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FilterStateSnapshot {
    years: BTreeSet<i32>,
    months: BTreeSet<u32>,
    categories: BTreeSet<String>,
}

impl From<FilterStateSnapshot> for FilterState {
    fn from(snapshot: FilterStateSnapshot) -> Self {
        Self::new(snapshot.years, snapshot.months, snapshot.categories)
    }
}

fn valid_months(months: impl IntoIterator<Item = u32>) -> BTreeSet<u32> {
    months.into_iter().filter(|m| *m < 12).collect()
}

/// Returns the incidents that pass `filters`.
///
/// If any of the three sets is empty the result is empty.
#[must_use]
pub fn apply_filters(points: &[IncidentPoint], filters: &FilterState) -> Vec<IncidentPoint> {
    if filters.selects_nothing() {
        log::trace!("Filter selects nothing; hiding {} points", points.len());
        return Vec::new();
    }

    points
        .iter()
        .filter(|p| filters.matches(p))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use incident_map_incident_models::IncidentId;

    use super::*;

    fn sample() -> Vec<IncidentPoint> {
        vec![
            IncidentPoint::new(1, 45.5, -73.6)
                .with_category("Vol")
                .with_timestamp("2024-01-15T10:00:00Z"),
            IncidentPoint::new(2, 45.5, -73.6)
                .with_category("Méfait")
                .with_timestamp("2024-06-01"),
            IncidentPoint::new(3, 45.5, -73.6).with_timestamp("2023-12-31T23:00:00Z"),
            IncidentPoint::new(4, 45.5, -73.6).with_category("Vol"),
            IncidentPoint::new(5, 45.5, -73.6)
                .with_category("Vol")
                .with_timestamp("not a date"),
        ]
    }

    fn ids(points: &[IncidentPoint]) -> Vec<IncidentId> {
        points.iter().map(|p| p.id.clone()).collect()
    }

    fn everything() -> FilterState {
        FilterState::new(
            [2023, 2024],
            ALL_MONTHS,
            ["Vol", "Méfait", "Unknown"],
        )
    }

    #[test]
    fn empty_year_set_shows_nothing() {
        let filters = FilterState::new([], ALL_MONTHS, ["Vol"]);
        assert!(apply_filters(&sample(), &filters).is_empty());
    }

    #[test]
    fn empty_category_set_shows_nothing() {
        let filters = FilterState::new([2024], ALL_MONTHS, Vec::<String>::new());
        assert!(apply_filters(&sample(), &filters).is_empty());
    }

    #[test]
    fn empty_month_set_shows_nothing() {
        let filters = FilterState::new([2024], [], ["Vol"]);
        assert!(apply_filters(&sample(), &filters).is_empty());
    }

    #[test]
    fn full_selection_drops_only_undated_points() {
        let out = apply_filters(&sample(), &everything());
        assert_eq!(ids(&out), vec![1.into(), 2.into(), 3.into()]);
    }

    #[test]
    fn missing_category_matches_unknown() {
        let filters = FilterState::new([2023], [11], ["Unknown"]);
        let out = apply_filters(&sample(), &filters);
        assert_eq!(ids(&out), vec![3.into()]);
    }

    #[test]
    fn months_are_zero_based() {
        let january = FilterState::new([2024], [0], ["Vol", "Méfait"]);
        assert_eq!(ids(&apply_filters(&sample(), &january)), vec![1.into()]);

        let june = FilterState::new([2024], [5], ["Vol", "Méfait"]);
        assert_eq!(ids(&apply_filters(&sample(), &june)), vec![2.into()]);
    }

    #[test]
    fn out_of_range_months_are_discarded() {
        let filters = FilterState::new([2024], [12, 40], ["Vol"]);
        assert!(filters.months().is_empty());
        assert!(filters.selects_nothing());
    }

    #[test]
    fn enlarging_a_set_never_shrinks_the_result() {
        let narrow = FilterState::new([2024], [0], ["Vol"]);
        let wider_year = narrow.with_years([2023, 2024].into());
        let wider_month = narrow.with_months(ALL_MONTHS.into());
        let wider_category = narrow.with_categories(["Vol".to_string(), "Unknown".to_string()].into());

        let base = apply_filters(&sample(), &narrow);
        for wider in [wider_year, wider_month, wider_category] {
            let out = apply_filters(&sample(), &wider);
            assert!(out.len() >= base.len());
            for p in &base {
                assert!(out.contains(p));
            }
        }
    }

    #[test]
    fn replacement_changes_equality() {
        let a = everything();
        let b = a.with_years(BTreeSet::from([2024]));
        assert_ne!(a, b);
        assert_eq!(a, a.with_years(a.years().clone()));
    }

    #[test]
    fn serializes_as_sorted_arrays() {
        let value = serde_json::to_value(FilterState::new([2024, 2023], [3], ["b", "a"])).unwrap();
        assert_eq!(value["years"], serde_json::json!([2023, 2024]));
        assert_eq!(value["categories"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn deserializing_discards_out_of_range_months() {
        let filters: FilterState = serde_json::from_value(serde_json::json!({
            "years": [2024],
            "months": [15, 2],
            "categories": ["Vol"],
        }))
        .unwrap();
        assert_eq!(filters.months(), &BTreeSet::from([2]));

        let filters: FilterState =
            serde_json::from_value(serde_json::json!({ "months": [15] })).unwrap();
        assert!(filters.months().is_empty());
        assert!(filters.selects_nothing());
        assert!(apply_filters(&sample(), &filters).is_empty());
    }
}
