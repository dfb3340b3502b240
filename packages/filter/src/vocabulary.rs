//! Filter options derived from the latest dataset.

use std::collections::BTreeSet;

use chrono::Datelike as _;
use incident_map_incident_models::IncidentPoint;
use serde::{Deserialize, Serialize};

use crate::{ALL_MONTHS, FilterState};

/// The years and categories a user can pick from.
///
/// Built from the latest (global) collection only, so switching to the
/// near dataset never changes the available options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterVocabulary {
    years: Vec<i32>,
    categories: Vec<String>,
}

impl FilterVocabulary {
    /// Collects distinct years (newest first) and categories (sorted)
    /// from `incidents`. Undated incidents contribute no year.
    #[must_use]
    pub fn from_incidents(incidents: &[IncidentPoint]) -> Self {
        let mut years = BTreeSet::new();
        let mut categories = BTreeSet::new();

        for incident in incidents {
            if let Some(occurred_at) = incident.occurred_at() {
                years.insert(occurred_at.year());
            }
            categories.insert(incident.category().to_string());
        }

        Self {
            years: years.into_iter().rev().collect(),
            categories: categories.into_iter().collect(),
        }
    }

    /// Available years, newest first.
    #[must_use]
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Available categories, sorted.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Whether the state selects exactly the available years.
    #[must_use]
    pub fn is_all_years_selected(&self, state: &FilterState) -> bool {
        !self.years.is_empty()
            && state.years().len() == self.years.len()
            && self.years.iter().all(|y| state.years().contains(y))
    }

    /// Whether the state selects exactly the available categories.
    #[must_use]
    pub fn is_all_categories_selected(&self, state: &FilterState) -> bool {
        !self.categories.is_empty()
            && state.categories().len() == self.categories.len()
            && self.categories.iter().all(|c| state.categories().contains(c))
    }
}

/// Whether all twelve months are selected.
#[must_use]
pub fn is_all_months_selected(state: &FilterState) -> bool {
    state.months().len() == ALL_MONTHS.len() && ALL_MONTHS.iter().all(|m| state.months().contains(m))
}
