use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::model::{Category, Listing, NumericField, Table};

/// Numeric dimensions that get a range slider by default.
pub const RANGE_FIELDS: [NumericField; 4] = [
    NumericField::Price,
    NumericField::Area,
    NumericField::Bedrooms,
    NumericField::Bathrooms,
];

// ---------------------------------------------------------------------------
// NumericRange
// ---------------------------------------------------------------------------

/// Inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl fmt::Display for NumericRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

impl FromStr for NumericRange {
    type Err = String;

    /// Parses `MIN..MAX`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once("..")
            .ok_or_else(|| format!("expected MIN..MAX, got '{s}'"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("'{part}' is not a finite number"))
        };
        let (min, max) = (parse(lo)?, parse(hi)?);
        if min > max {
            return Err(format!("range start {min} is greater than end {max}"));
        }
        Ok(NumericRange::new(min, max))
    }
}

// ---------------------------------------------------------------------------
// FilterSpec – the current selection state
// ---------------------------------------------------------------------------

/// Allowed values per categorical column and inclusive ranges per numeric
/// column. Dimensions absent from the spec do not constrain anything; a
/// present but empty category set admits nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub categories: BTreeMap<Category, BTreeSet<String>>,
    #[serde(default)]
    pub ranges: BTreeMap<NumericField, NumericRange>,
}

impl FilterSpec {
    /// Everything selected: every category value and the full range of
    /// each default numeric dimension.
    ///
    /// A dimension with no values anywhere in the table has no bounds and
    /// therefore no range clause, so it constrains nothing. A dimension with
    /// some values gets a range that rejects the rows missing it.
    pub fn all(table: &Table) -> Self {
        let categories = Category::ALL
            .iter()
            .map(|&c| (c, table.unique_values.get(&c).cloned().unwrap_or_default()))
            .collect();
        let ranges = RANGE_FIELDS
            .iter()
            .filter_map(|&f| table.bounds(f).map(|r| (f, r)))
            .collect();
        FilterSpec { categories, ranges }
    }

    pub fn select<I, S>(&mut self, category: Category, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .insert(category, values.into_iter().map(Into::into).collect());
    }

    pub fn set_range(&mut self, field: NumericField, range: NumericRange) {
        self.ranges.insert(field, range);
    }

    /// Overlay `other`: every dimension it mentions replaces ours.
    pub fn merge(&mut self, other: FilterSpec) {
        self.categories.extend(other.categories);
        self.ranges.extend(other.ranges);
    }

    /// Whether a listing satisfies every clause.
    ///
    /// A listing whose value is missing on a constrained numeric dimension
    /// does not pass.
    pub fn matches(&self, listing: &Listing) -> bool {
        let categories_ok = self
            .categories
            .iter()
            .all(|(&category, allowed)| allowed.contains(listing.category(category)));
        categories_ok
            && self.ranges.iter().all(|(&field, range)| {
                listing
                    .numeric(field)
                    .is_some_and(|value| range.contains(value))
            })
    }
}

// ---------------------------------------------------------------------------
// FilteredView
// ---------------------------------------------------------------------------

/// Rows of a [`Table`] passing a filter, in table order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a Table,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// The whole table, unfiltered.
    pub fn all(table: &'a Table) -> Self {
        Self {
            table,
            indices: (0..table.len()).collect(),
        }
    }

    /// Wrap precomputed row indices. Out-of-range indices are dropped.
    pub fn from_indices(table: &'a Table, mut indices: Vec<usize>) -> Self {
        indices.retain(|&i| i < table.len());
        Self { table, indices }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn listings(&self) -> impl Iterator<Item = &'a Listing> + '_ {
        let table = self.table;
        self.indices.iter().map(move |&i| &table.listings[i])
    }

    /// First listing with the given id.
    pub fn find(&self, ad_id: &str) -> Option<&'a Listing> {
        self.listings().find(|l| l.ad_id == ad_id)
    }

    /// Narrow this view further. Filtering a view by the spec that
    /// produced it returns the same rows.
    pub fn filter(&self, spec: &FilterSpec) -> FilteredView<'a> {
        let table = self.table;
        let indices = self
            .indices
            .iter()
            .copied()
            .filter(|&i| spec.matches(&table.listings[i]))
            .collect();
        FilteredView { table, indices }
    }
}

/// Return indices of listings that pass every clause of `spec`.
pub fn filtered_indices(table: &Table, spec: &FilterSpec) -> Vec<usize> {
    table
        .listings
        .iter()
        .enumerate()
        .filter(|(_, listing)| spec.matches(listing))
        .map(|(i, _)| i)
        .collect()
}

/// Apply `spec` to the whole table.
pub fn filter<'a>(table: &'a Table, spec: &FilterSpec) -> FilteredView<'a> {
    FilteredView {
        table,
        indices: filtered_indices(table, spec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{listing, table};

    fn sample() -> Table {
        table(vec![
            listing("A", "Cairo", "Apartment", 100.0, 10.0, Some(2), Some(1)),
            listing("B", "Giza", "Villa", 200.0, 20.0, Some(4), Some(3)),
            listing("C", "Cairo", "Villa", 150.0, 15.0, None, Some(2)),
            listing("D", "Alexandria", "Apartment", 120.0, 12.0, Some(1), Some(1)),
        ])
    }

    fn ids(view: &FilteredView<'_>) -> Vec<String> {
        view.listings().map(|l| l.ad_id.clone()).collect()
    }

    #[test]
    fn price_range_example() {
        let t = table(vec![
            listing("A", "X", "T", 100.0, 10.0, None, None),
            listing("B", "X", "T", 200.0, 20.0, None, None),
        ]);
        let mut spec = FilterSpec::default();
        spec.set_range(NumericField::Price, NumericRange::new(100.0, 150.0));
        assert_eq!(ids(&filter(&t, &spec)), vec!["A"]);
    }

    #[test]
    fn all_spec_keeps_rows_with_complete_range_fields() {
        let t = sample();
        let view = filter(&t, &FilterSpec::all(&t));
        // C has no bedrooms, so the default bedrooms range rejects it.
        assert_eq!(ids(&view), vec!["A", "B", "D"]);
    }

    #[test]
    fn all_spec_skips_dimensions_with_no_values() {
        let t = table(vec![
            listing("A", "Cairo", "Apartment", 100.0, 10.0, None, Some(1)),
            listing("B", "Giza", "Villa", 200.0, 20.0, None, None),
        ]);
        let spec = FilterSpec::all(&t);
        assert!(!spec.ranges.contains_key(&NumericField::Bedrooms));
        assert!(spec.ranges.contains_key(&NumericField::Bathrooms));
        assert_eq!(ids(&filter(&t, &spec)), vec!["A"]);
    }

    #[test]
    fn empty_category_set_shows_nothing() {
        let t = sample();
        let mut spec = FilterSpec::all(&t);
        spec.select(Category::City, Vec::<String>::new());
        assert!(filter(&t, &spec).is_empty());
    }

    #[test]
    fn categories_or_within_and_across() {
        let t = sample();
        let mut spec = FilterSpec::default();
        spec.select(Category::City, ["Cairo", "Giza"]);
        spec.select(Category::PropertyType, ["Villa"]);
        assert_eq!(ids(&filter(&t, &spec)), vec!["B", "C"]);
    }

    #[test]
    fn degenerate_range_matches_exact_values_only() {
        let t = sample();
        let mut spec = FilterSpec::default();
        spec.set_range(NumericField::Area, NumericRange::new(15.0, 15.0));
        assert_eq!(ids(&filter(&t, &spec)), vec!["C"]);
    }

    #[test]
    fn range_excluding_everything_is_empty() {
        let t = sample();
        let mut spec = FilterSpec::default();
        spec.set_range(NumericField::Price, NumericRange::new(1e9, 2e9));
        assert!(filter(&t, &spec).is_empty());
    }

    #[test]
    fn filter_is_sound_complete_and_idempotent() {
        let t = sample();
        let mut spec = FilterSpec::default();
        spec.select(Category::PropertyType, ["Apartment", "Villa"]);
        spec.set_range(NumericField::Price, NumericRange::new(110.0, 200.0));

        let view = filter(&t, &spec);
        assert!(view.listings().all(|l| spec.matches(l)));
        let passing = t.listings.iter().filter(|l| spec.matches(l)).count();
        assert_eq!(view.len(), passing);

        let again = view.filter(&spec);
        assert_eq!(again.indices(), view.indices());
    }

    #[test]
    fn merge_replaces_mentioned_dimensions_only() {
        let t = sample();
        let mut spec = FilterSpec::all(&t);
        let mut overlay = FilterSpec::default();
        overlay.select(Category::City, ["Giza"]);
        spec.merge(overlay);

        assert_eq!(spec.categories[&Category::City].len(), 1);
        assert_eq!(spec.categories[&Category::PropertyType].len(), 2);
        assert!(spec.ranges.contains_key(&NumericField::Price));
    }

    #[test]
    fn range_parsing() {
        let r: NumericRange = "100..2500.5".parse().unwrap();
        assert_eq!(r, NumericRange::new(100.0, 2500.5));
        assert!("5..1".parse::<NumericRange>().is_err());
        assert!("abc".parse::<NumericRange>().is_err());
        assert!("1..x".parse::<NumericRange>().is_err());
    }

    #[test]
    fn spec_round_trips_through_json() {
        let json = r#"{
            "categories": { "city": ["Cairo"], "rent": ["no"] },
            "ranges": { "price": { "min": 0, "max": 500 } }
        }"#;
        let spec: FilterSpec = serde_json::from_str(json).unwrap();
        assert!(spec.categories[&Category::City].contains("Cairo"));
        assert!(spec.categories.contains_key(&Category::ListingKind));
        assert_eq!(spec.ranges[&NumericField::Price], NumericRange::new(0.0, 500.0));
    }
}
