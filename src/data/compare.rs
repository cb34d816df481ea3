use std::collections::HashSet;

use serde::Serialize;

use super::filter::FilteredView;
use super::model::{Listing, NumericField};

/// Axes of the multi-axis comparison plot, in order.
pub const COMPARISON_AXES: [NumericField; 5] = [
    NumericField::Price,
    NumericField::Area,
    NumericField::Bedrooms,
    NumericField::Bathrooms,
    NumericField::Rooms,
];

/// A comparison needs at least this many resolved listings.
pub const MIN_COMPARISON: usize = 2;

/// Above this many listings the axis profiles are not produced.
pub const MAX_PLOTTED: usize = 5;

const LABEL_CHARS: usize = 12;

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonState {
    /// Fewer than two selected ids resolved against the view.
    InsufficientSelection,
    Ready,
}

/// One listing projected onto [`COMPARISON_AXES`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisProfile {
    pub ad_id: String,
    /// `ad_id` shortened for legends.
    pub label: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison<'a> {
    pub state: ComparisonState,
    /// Resolved listings in selection order.
    pub listings: Vec<&'a Listing>,
    /// Present only when the comparison is ready and small enough to plot.
    pub profiles: Option<Vec<AxisProfile>>,
}

impl Comparison<'_> {
    pub fn is_ready(&self) -> bool {
        self.state == ComparisonState::Ready
    }
}

/// Look up `ids` in `view`, in the order given. Ids not in the view, and
/// repeats of an id already resolved, are skipped.
pub fn resolve_comparison<'a, S: AsRef<str>>(view: &FilteredView<'a>, ids: &[S]) -> Vec<&'a Listing> {
    let mut seen: HashSet<&str> = HashSet::new();
    ids.iter()
        .map(|id| id.as_ref())
        .filter(|id| seen.insert(*id))
        .filter_map(|id| view.find(id))
        .collect()
}

/// Resolve `ids` and build plot data when there are 2..=5 listings.
pub fn compare<'a, S: AsRef<str>>(view: &FilteredView<'a>, ids: &[S]) -> Comparison<'a> {
    let listings = resolve_comparison(view, ids);

    if listings.len() < MIN_COMPARISON {
        log::debug!(
            "comparison needs {MIN_COMPARISON} listings, {} of {} ids resolved",
            listings.len(),
            ids.len()
        );
        return Comparison {
            state: ComparisonState::InsufficientSelection,
            listings,
            profiles: None,
        };
    }

    let profiles = (listings.len() <= MAX_PLOTTED)
        .then(|| listings.iter().map(|l| project(l)).collect());

    Comparison {
        state: ComparisonState::Ready,
        listings,
        profiles,
    }
}

pub fn project(listing: &Listing) -> AxisProfile {
    AxisProfile {
        ad_id: listing.ad_id.clone(),
        label: listing.ad_id.chars().take(LABEL_CHARS).collect(),
        values: COMPARISON_AXES.iter().map(|&f| listing.numeric(f)).collect(),
    }
}
