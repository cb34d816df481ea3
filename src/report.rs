use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::aggregate::{
    correlation_matrix, group_mean, histogram, summary, top_n_by, top_n_counts, CorrelationMatrix,
    GroupStat, HistogramBin, Summary, ValueCount,
};
use crate::data::compare::{compare, Comparison};
use crate::data::filter::{FilteredView, NumericRange, RANGE_FIELDS};
use crate::data::model::{Category, Listing, NumericField, Table};

pub const DEFAULT_BINS: usize = 50;
pub const DEFAULT_TOP_CITIES: usize = 15;
pub const DEFAULT_TOP_EXPENSIVE: usize = 20;

/// Columns of the correlation heatmap.
pub const CORRELATION_FIELDS: [NumericField; 6] = [
    NumericField::LogPrice,
    NumericField::Area,
    NumericField::Bedrooms,
    NumericField::Bathrooms,
    NumericField::Rooms,
    NumericField::PricePerArea,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub bins: usize,
    pub top_cities: usize,
    pub top_expensive: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            top_cities: DEFAULT_TOP_CITIES,
            top_expensive: DEFAULT_TOP_EXPENSIVE,
        }
    }
}

/// Informational states a presentation layer shows instead of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    NoListings,
    InsufficientComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub unreadable_rows: usize,
    pub coercion_warnings: usize,
}

/// Everything the dashboard shows for one filter state, as plain data.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport<'a> {
    pub dataset: DatasetInfo,
    pub summary: Summary,
    pub price_histogram: Vec<HistogramBin>,
    pub mean_price_by_type: Vec<GroupStat>,
    pub top_cities: Vec<ValueCount>,
    pub correlation: CorrelationMatrix,
    pub most_expensive: Vec<&'a Listing>,
    pub comparison: Comparison<'a>,
    pub notices: Vec<Notice>,
}

pub fn build_report<'a, S: AsRef<str>>(
    view: &FilteredView<'a>,
    compare_ids: &[S],
    options: &ReportOptions,
) -> DashboardReport<'a> {
    let load = &view.table().report;
    let comparison = compare(view, compare_ids);

    let mut notices = Vec::new();
    if view.is_empty() {
        notices.push(Notice::NoListings);
    }
    if !comparison.is_ready() {
        notices.push(Notice::InsufficientComparison);
    }

    DashboardReport {
        dataset: DatasetInfo {
            rows_read: load.rows_read,
            rows_kept: load.rows_kept,
            rows_dropped: load.rows_dropped,
            unreadable_rows: load.unreadable_rows,
            coercion_warnings: load.warnings.len(),
        },
        summary: summary(view),
        price_histogram: histogram(view, NumericField::Price, options.bins),
        mean_price_by_type: group_mean(view, Category::PropertyType, NumericField::Price),
        top_cities: top_n_counts(view, Category::City, options.top_cities),
        correlation: correlation_matrix(view, &CORRELATION_FIELDS),
        most_expensive: top_n_by(view, NumericField::Price, options.top_expensive),
        comparison,
        notices,
    }
}

/// Choices for building selection widgets: the distinct values of every
/// category and the bounds of every range dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOptions<'a> {
    pub categories: BTreeMap<Category, Vec<&'a str>>,
    pub ranges: BTreeMap<NumericField, NumericRange>,
}

pub fn dataset_options(table: &Table) -> DatasetOptions<'_> {
    DatasetOptions {
        categories: Category::ALL
            .iter()
            .map(|&c| (c, table.options(c)))
            .collect(),
        ranges: RANGE_FIELDS
            .iter()
            .filter_map(|&f| table.bounds(f).map(|r| (f, r)))
            .collect(),
    }
}
