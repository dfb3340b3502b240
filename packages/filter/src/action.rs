//! Reducer-style transitions for [`FilterState`].

use std::collections::BTreeSet;

use crate::{ALL_MONTHS, FilterState, FilterVocabulary, is_all_months_selected};

/// A user interaction with the filter panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAction {
    /// Adds the year if absent, removes it otherwise.
    ToggleYear(i32),
    /// Adds the zero-based month if absent, removes it otherwise.
    ToggleMonth(u32),
    /// Adds the category if absent, removes it otherwise.
    ToggleCategory(String),
    /// Clears the years if all are selected, selects all otherwise.
    ToggleAllYears,
    /// Clears the months if all twelve are selected, selects all otherwise.
    ToggleAllMonths,
    /// Clears the categories if all are selected, selects all otherwise.
    ToggleAllCategories,
    /// Selects every available value in every dimension.
    SelectAll,
    /// Empties every dimension ("show none").
    ClearAll,
}

impl FilterState {
    /// Computes the state that follows `action`.
    ///
    /// "All" toggles compare against the full `vocabulary` and write
    /// either the whole vocabulary or the empty set, never a partial one.
    #[must_use]
    pub fn reduce(&self, action: &FilterAction, vocabulary: &FilterVocabulary) -> Self {
        match action {
            FilterAction::ToggleYear(year) => self.with_years(toggled(self.years(), *year)),
            FilterAction::ToggleMonth(month) => {
                if *month >= 12 {
                    log::debug!("Ignoring toggle of invalid month index {month}");
                    return self.clone();
                }
                self.with_months(toggled(self.months(), *month))
            }
            FilterAction::ToggleCategory(category) => {
                self.with_categories(toggled(self.categories(), category.clone()))
            }
            FilterAction::ToggleAllYears => {
                if vocabulary.is_all_years_selected(self) {
                    self.with_years(BTreeSet::new())
                } else {
                    self.with_years(vocabulary.years().iter().copied().collect())
                }
            }
            FilterAction::ToggleAllMonths => {
                if is_all_months_selected(self) {
                    self.with_months(BTreeSet::new())
                } else {
                    self.with_months(ALL_MONTHS.into())
                }
            }
            FilterAction::ToggleAllCategories => {
                if vocabulary.is_all_categories_selected(self) {
                    self.with_categories(BTreeSet::new())
                } else {
                    self.with_categories(vocabulary.categories().iter().cloned().collect())
                }
            }
            FilterAction::SelectAll => Self::select_all(vocabulary),
            FilterAction::ClearAll => Self::default(),
        }
    }
}

fn toggled<T: Ord + Clone>(set: &BTreeSet<T>, value: T) -> BTreeSet<T> {
    let mut next = set.clone();
    if !next.remove(&value) {
        next.insert(value);
    }
    next
}
