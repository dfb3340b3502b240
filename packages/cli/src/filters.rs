//! Turning filter flags into a [`FilterState`].

use clap::Args;
use incident_map_filter::{FilterAction, FilterState, FilterVocabulary};

/// Filter flags shared by `frame` and `feed`.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Years to include (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub years: Vec<i32>,

    /// Months to include, 1-12 (comma separated)
    #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u32).range(1..=12))]
    pub months: Vec<u32>,

    /// Categories to include (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Start from every available year, month and category; explicit
    /// lists above then narrow a dimension
    #[arg(long)]
    pub all: bool,
}

impl FilterArgs {
    /// Builds the filter state. Dimensions without a value are empty
    /// unless `--all` was given.
    #[must_use]
    pub fn to_state(&self, vocabulary: &FilterVocabulary) -> FilterState {
        let mut state = FilterState::default();
        if self.all {
            state = state.reduce(&FilterAction::SelectAll, vocabulary);
        }

        if !self.years.is_empty() {
            state = state.with_years(self.years.iter().copied().collect());
        }
        if !self.months.is_empty() {
            state = state.with_months(self.months.iter().map(|m| m - 1).collect());
        }
        if !self.categories.is_empty() {
            state = state.with_categories(self.categories.iter().cloned().collect());
        }

        if state.selects_nothing() {
            log::warn!(
                "A filter dimension is empty, so nothing will be shown (pass --all or list years, months and categories)"
            );
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use incident_map_incident_models::IncidentPoint;

    use super::*;

    fn vocabulary() -> FilterVocabulary {
        FilterVocabulary::from_incidents(&[
            IncidentPoint::new(1, 45.5, -73.6)
                .with_category("Vol")
                .with_timestamp("2024-03-01"),
            IncidentPoint::new(2, 45.5, -73.6)
                .with_category("Méfait")
                .with_timestamp("2023-03-01"),
        ])
    }

    #[test]
    fn no_flags_selects_nothing() {
        assert!(FilterArgs::default().to_state(&vocabulary()).selects_nothing());
    }

    #[test]
    fn all_then_narrow() {
        let args = FilterArgs {
            years: vec![2024],
            months: vec![1, 12],
            all: true,
            ..FilterArgs::default()
        };
        let state = args.to_state(&vocabulary());
        assert_eq!(state.years().len(), 1);
        assert!(state.months().contains(&0));
        assert!(state.months().contains(&11));
        assert_eq!(state.months().len(), 2);
        assert_eq!(state.categories().len(), 2);
    }
}
