use std::sync::Arc;

use crate::data::compare::{compare, Comparison};
use crate::data::filter::{filtered_indices, FilterSpec, FilteredView, NumericRange};
use crate::data::model::{Category, NumericField, Table};
use crate::report::{build_report, DashboardReport, ReportOptions};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One user's selection state over a shared table, independent of rendering.
///
/// The table is shared read-only; filters, visible rows and the comparison
/// selection belong to this session alone.
#[derive(Debug, Clone)]
pub struct Session {
    table: Arc<Table>,

    /// Per-dimension filter selections.
    pub filters: FilterSpec,

    /// Indices of listings passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Ad ids chosen for side-by-side comparison, in selection order.
    pub compare_ids: Vec<String>,
}

impl Session {
    /// Start with everything selected.
    pub fn new(table: Arc<Table>) -> Self {
        let filters = FilterSpec::all(&table);
        let visible_indices = filtered_indices(&table, &filters);
        Self {
            table,
            filters,
            visible_indices,
            compare_ids: Vec::new(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Recompute `visible_indices` after filter change.
    pub fn refilter(&mut self) {
        self.visible_indices = filtered_indices(&self.table, &self.filters);
        log::debug!(
            "{} of {} listings visible",
            self.visible_indices.len(),
            self.table.len()
        );
    }

    pub fn view(&self) -> FilteredView<'_> {
        FilteredView::from_indices(&self.table, self.visible_indices.clone())
    }

    /// Overlay a partial spec (e.g. from a file) and refilter.
    pub fn apply(&mut self, spec: FilterSpec) {
        self.filters.merge(spec);
        self.refilter();
    }

    /// Toggle a single value in a category's selection.
    pub fn toggle_filter_value(&mut self, category: Category, value: &str) {
        let selected = self.filters.categories.entry(category).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    /// Select all values in a category.
    pub fn select_all(&mut self, category: Category) {
        let all_vals = self
            .table
            .unique_values
            .get(&category)
            .cloned()
            .unwrap_or_default();
        self.filters.categories.insert(category, all_vals);
        self.refilter();
    }

    /// Deselect all values in a category.
    pub fn select_none(&mut self, category: Category) {
        self.filters.categories.insert(category, Default::default());
        self.refilter();
    }

    pub fn set_range(&mut self, field: NumericField, range: NumericRange) {
        self.filters.set_range(field, range);
        self.refilter();
    }

    /// Widen a numeric range back to the table's bounds.
    pub fn reset_range(&mut self, field: NumericField) {
        match self.table.bounds(field) {
            Some(bounds) => self.filters.set_range(field, bounds),
            None => {
                self.filters.ranges.remove(&field);
            }
        }
        self.refilter();
    }

    pub fn set_comparison<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compare_ids = ids.into_iter().map(Into::into).collect();
    }

    pub fn comparison(&self) -> Comparison<'_> {
        compare(&self.view(), self.compare_ids.as_slice())
    }

    pub fn report(&self, options: &ReportOptions) -> DashboardReport<'_> {
        build_report(&self.view(), self.compare_ids.as_slice(), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::compare::ComparisonState;
    use crate::data::test_support::{listing, table};

    fn session() -> Session {
        Session::new(Arc::new(table(vec![
            listing("a", "Cairo", "Apartment", 100.0, 10.0, Some(1), Some(1)),
            listing("b", "Giza", "Villa", 500.0, 50.0, Some(4), Some(3)),
            listing("c", "Cairo", "Villa", 300.0, 30.0, Some(3), Some(2)),
        ])))
    }

    #[test]
    fn starts_with_everything_visible() {
        let s = session();
        assert_eq!(s.visible_indices, vec![0, 1, 2]);
    }

    #[test]
    fn toggling_a_value_twice_restores_the_view() {
        let mut s = session();
        s.toggle_filter_value(Category::City, "Giza");
        assert_eq!(s.visible_indices, vec![0, 2]);
        s.toggle_filter_value(Category::City, "Giza");
        assert_eq!(s.visible_indices, vec![0, 1, 2]);
    }

    #[test]
    fn select_none_then_all() {
        let mut s = session();
        s.select_none(Category::PropertyType);
        assert!(s.view().is_empty());
        s.select_all(Category::PropertyType);
        assert_eq!(s.view().len(), 3);
    }

    #[test]
    fn range_set_and_reset() {
        let mut s = session();
        s.set_range(NumericField::Price, NumericRange::new(200.0, 400.0));
        assert_eq!(s.visible_indices, vec![2]);
        s.reset_range(NumericField::Price);
        assert_eq!(s.visible_indices, vec![0, 1, 2]);
    }

    #[test]
    fn sessions_do_not_share_selection_state() {
        let shared = session();
        let mut other = Session::new(Arc::clone(&shared.table));
        other.select_none(Category::City);
        assert!(other.view().is_empty());
        assert_eq!(shared.view().len(), 3);
    }

    #[test]
    fn comparison_resolves_against_visible_rows() {
        let mut s = session();
        s.set_comparison(["a", "c"]);
        assert_eq!(s.comparison().state, ComparisonState::Ready);

        s.toggle_filter_value(Category::City, "Cairo");
        assert_eq!(s.comparison().state, ComparisonState::InsufficientSelection);
    }
}
