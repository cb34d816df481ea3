use std::collections::HashMap;

use serde::Serialize;

use super::filter::FilteredView;
use super::model::{Category, Listing, NumericField};

// ---------------------------------------------------------------------------
// Result shapes
// ---------------------------------------------------------------------------

/// Headline figures. `None` means "no data", never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_listings: usize,
    pub average_price: Option<f64>,
    pub median_area: Option<f64>,
    pub average_price_per_m2: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub group: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Half-open `[lower, upper)` bin; the last bin also includes `upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Symmetric Pearson correlation matrix; `values[i][j]` pairs
/// `fields[i]` with `fields[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub fields: Vec<NumericField>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    fn undefined(fields: &[NumericField]) -> Self {
        Self {
            fields: fields.to_vec(),
            values: vec![vec![None; fields.len()]; fields.len()],
        }
    }

    pub fn get(&self, a: NumericField, b: NumericField) -> Option<f64> {
        let i = self.fields.iter().position(|&f| f == a)?;
        let j = self.fields.iter().position(|&f| f == b)?;
        self.values[i][j]
    }
}

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

fn values(view: &FilteredView<'_>, field: NumericField) -> Vec<f64> {
    view.listings().filter_map(|l| l.numeric(field)).collect()
}

pub fn count(view: &FilteredView<'_>) -> usize {
    view.len()
}

/// Arithmetic mean of the non-missing values of `field`.
pub fn mean(view: &FilteredView<'_>, field: NumericField) -> Option<f64> {
    mean_of(&values(view, field))
}

/// Running mean, so large finite inputs cannot overflow an intermediate sum.
fn mean_of(vals: &[f64]) -> Option<f64> {
    if vals.is_empty() {
        return None;
    }
    let m = vals
        .iter()
        .enumerate()
        .fold(0.0, |m, (i, &v)| m + (v - m) / (i + 1) as f64);
    m.is_finite().then_some(m)
}

/// Median of the non-missing values; even counts average the middle pair.
pub fn median(view: &FilteredView<'_>, field: NumericField) -> Option<f64> {
    let mut vals = values(view, field);
    if vals.is_empty() {
        return None;
    }
    vals.sort_by(f64::total_cmp);
    let mid = vals.len() / 2;
    if vals.len() % 2 == 0 {
        Some(vals[mid - 1] / 2.0 + vals[mid] / 2.0)
    } else {
        Some(vals[mid])
    }
}

pub fn summary(view: &FilteredView<'_>) -> Summary {
    Summary {
        total_listings: count(view),
        average_price: mean(view, NumericField::Price),
        median_area: median(view, NumericField::Area),
        average_price_per_m2: mean(view, NumericField::PricePerArea),
    }
}

/// Mean of `value` per distinct `group`, highest first. Ties keep the order
/// in which groups first appear; groups with no values are left out.
pub fn group_mean(
    view: &FilteredView<'_>,
    group: Category,
    value: NumericField,
) -> Vec<GroupStat> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();

    for listing in view.listings() {
        let key = listing.category(group);
        let vals = groups.entry(key).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        if let Some(v) = listing.numeric(value) {
            vals.push(v);
        }
    }

    let mut stats: Vec<GroupStat> = order
        .into_iter()
        .filter_map(|key| {
            mean_of(&groups[key]).map(|value| GroupStat {
                group: key.to_string(),
                value,
            })
        })
        .collect();
    // Stable sort preserves first-seen order among equal means.
    stats.sort_by(|a, b| b.value.total_cmp(&a.value));
    stats
}

/// The `n` most frequent values of `field`, most frequent first. Ties keep
/// first-seen order.
pub fn top_n_counts(view: &FilteredView<'_>, field: Category, n: usize) -> Vec<ValueCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for listing in view.listings() {
        let key = listing.category(field);
        *counts.entry(key).or_insert_with(|| {
            order.push(key);
            0
        }) += 1;
    }

    let mut ranked: Vec<ValueCount> = order
        .into_iter()
        .map(|key| ValueCount {
            value: key.to_string(),
            count: counts[key],
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    ranked
}

/// The `n` listings with the largest `field`, descending. Listings missing
/// the field are skipped.
pub fn top_n_by<'a>(view: &FilteredView<'a>, field: NumericField, n: usize) -> Vec<&'a Listing> {
    let mut ranked: Vec<(f64, &'a Listing)> = view
        .listings()
        .filter_map(|l| l.numeric(field).map(|v| (v, l)))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().take(n).map(|(_, l)| l).collect()
}

/// Upper bound on histogram bins; larger requests are clamped.
pub const MAX_BINS: usize = 1_000;

/// Equal-width histogram over the non-missing values of `field`.
pub fn histogram(view: &FilteredView<'_>, field: NumericField, bins: usize) -> Vec<HistogramBin> {
    let vals = values(view, field);
    if vals.is_empty() || bins == 0 {
        return Vec::new();
    }
    let bins = bins.min(MAX_BINS);
    let lo = vals.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if (hi - lo).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: lo,
            upper: hi,
            count: vals.len(),
        }];
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &vals {
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count,
        })
        .collect()
}

/// Pairwise Pearson correlation over rows where every requested field is
/// present. Fewer than two such rows gives an all-`None` matrix; a field
/// with zero variance correlates as `None`.
pub fn correlation_matrix(view: &FilteredView<'_>, fields: &[NumericField]) -> CorrelationMatrix {
    let rows: Vec<Vec<f64>> = view
        .listings()
        .filter_map(|l| fields.iter().map(|&f| l.numeric(f)).collect::<Option<Vec<f64>>>())
        .collect();

    if rows.len() < 2 {
        return CorrelationMatrix::undefined(fields);
    }

    let k = fields.len();
    let means: Vec<f64> = (0..k)
        .map(|j| {
            rows.iter()
                .enumerate()
                .fold(0.0, |m, (i, r)| m + (r[j] - m) / (i + 1) as f64)
        })
        .collect();

    let mut values = vec![vec![None; k]; k];
    for i in 0..k {
        for j in i..k {
            let (mut cov, mut var_i, mut var_j) = (0.0, 0.0, 0.0);
            for r in &rows {
                let di = r[i] - means[i];
                let dj = r[j] - means[j];
                cov += di * dj;
                var_i += di * di;
                var_j += dj * dj;
            }
            let denom = (var_i * var_j).sqrt();
            let coef = (denom > 0.0 && denom.is_finite())
                .then(|| cov / denom)
                .filter(|c| c.is_finite())
                .map(|c| c.clamp(-1.0, 1.0));
            values[i][j] = coef;
            values[j][i] = coef;
        }
    }

    CorrelationMatrix {
        fields: fields.to_vec(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter, FilterSpec, NumericRange};
    use crate::data::model::Table;
    use crate::data::test_support::{listing, table};

    fn empty_view(t: &Table) -> FilteredView<'_> {
        let mut spec = FilterSpec::default();
        spec.select(Category::City, Vec::<String>::new());
        filter(t, &spec)
    }

    #[test]
    fn worked_example() {
        let t = table(vec![
            listing("A", "X", "T", 100.0, 10.0, None, None),
            listing("B", "X", "T", 200.0, 20.0, None, None),
        ]);
        let mut spec = FilterSpec::default();
        spec.set_range(NumericField::Price, NumericRange::new(100.0, 150.0));
        let view = filter(&t, &spec);

        assert_eq!(count(&view), 1);
        assert_eq!(mean(&view, NumericField::Price), Some(100.0));
        assert_eq!(median(&view, NumericField::Area), Some(10.0));
    }

    #[test]
    fn empty_view_reports_no_data() {
        let t = table(vec![listing("A", "X", "T", 100.0, 10.0, Some(1), Some(1))]);
        let view = empty_view(&t);

        assert_eq!(count(&view), 0);
        assert_eq!(mean(&view, NumericField::Price), None);
        assert_eq!(median(&view, NumericField::Area), None);
        assert!(group_mean(&view, Category::PropertyType, NumericField::Price).is_empty());
        assert!(top_n_counts(&view, Category::City, 15).is_empty());
        assert!(histogram(&view, NumericField::Price, 50).is_empty());

        let s = summary(&view);
        assert_eq!(s.total_listings, 0);
        assert_eq!(s.average_price_per_m2, None);
    }

    #[test]
    fn median_averages_middle_pair() {
        let t = table(vec![
            listing("A", "X", "T", 1.0, 40.0, None, None),
            listing("B", "X", "T", 1.0, 10.0, None, None),
            listing("C", "X", "T", 1.0, 30.0, None, None),
            listing("D", "X", "T", 1.0, 20.0, None, None),
        ]);
        assert_eq!(median(&FilteredView::all(&t), NumericField::Area), Some(25.0));
    }

    #[test]
    fn mean_skips_missing_values() {
        let t = table(vec![
            listing("A", "X", "T", 1.0, 1.0, Some(2), None),
            listing("B", "X", "T", 1.0, 1.0, None, None),
            listing("C", "X", "T", 1.0, 1.0, Some(4), None),
        ]);
        let view = FilteredView::all(&t);
        assert_eq!(mean(&view, NumericField::Bedrooms), Some(3.0));
        assert_eq!(mean(&view, NumericField::Rooms), None);
    }

    #[test]
    fn group_mean_sorted_with_first_seen_tie_break() {
        let t = table(vec![
            listing("1", "X", "Studio", 100.0, 1.0, None, None),
            listing("2", "X", "Villa", 300.0, 1.0, None, None),
            listing("3", "X", "Duplex", 200.0, 1.0, None, None),
            listing("4", "X", "Apartment", 200.0, 1.0, None, None),
            listing("5", "X", "Studio", 100.0, 1.0, None, None),
        ]);
        let view = FilteredView::all(&t);
        let stats = group_mean(&view, Category::PropertyType, NumericField::Price);
        let groups: Vec<_> = stats.iter().map(|s| s.group.as_str()).collect();
        assert_eq!(groups, vec!["Villa", "Duplex", "Apartment", "Studio"]);
        assert_eq!(stats[0].value, 300.0);

        let again = group_mean(&view, Category::PropertyType, NumericField::Price);
        assert_eq!(
            serde_json::to_string(&stats).unwrap(),
            serde_json::to_string(&again).unwrap()
        );
    }

    #[test]
    fn top_n_counts_truncates_and_breaks_ties_by_first_seen() {
        let t = table(vec![
            listing("1", "Giza", "T", 1.0, 1.0, None, None),
            listing("2", "Cairo", "T", 1.0, 1.0, None, None),
            listing("3", "Alexandria", "T", 1.0, 1.0, None, None),
            listing("4", "Cairo", "T", 1.0, 1.0, None, None),
            listing("5", "Alexandria", "T", 1.0, 1.0, None, None),
            listing("6", "Giza", "T", 1.0, 1.0, None, None),
            listing("7", "Cairo", "T", 1.0, 1.0, None, None),
        ]);
        let top = top_n_counts(&FilteredView::all(&t), Category::City, 2);
        assert_eq!(
            top,
            vec![
                ValueCount { value: "Cairo".into(), count: 3 },
                ValueCount { value: "Giza".into(), count: 2 },
            ]
        );
    }

    #[test]
    fn top_n_by_price_descending() {
        let t = table(vec![
            listing("a", "X", "T", 5.0, 1.0, None, None),
            listing("b", "X", "T", 9.0, 1.0, None, None),
            listing("c", "X", "T", 7.0, 1.0, None, None),
        ]);
        let view = FilteredView::all(&t);
        let ids: Vec<_> = top_n_by(&view, NumericField::Price, 2)
            .into_iter()
            .map(|l| l.ad_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn top_n_by_keeps_table_order_on_ties() {
        let t = table(vec![
            listing("a", "X", "T", 5.0, 1.0, None, None),
            listing("b", "X", "T", 9.0, 1.0, None, None),
            listing("c", "X", "T", 5.0, 1.0, None, None),
            listing("d", "X", "T", 5.0, 1.0, None, None),
        ]);
        let view = FilteredView::all(&t);
        let ids: Vec<_> = top_n_by(&view, NumericField::Price, 3)
            .into_iter()
            .map(|l| l.ad_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn huge_finite_values_do_not_overflow() {
        let t = table(vec![
            listing("a", "X", "T", 1.7e308, 1.0, Some(1), Some(1)),
            listing("b", "X", "T", 1.7e308, 2.0, Some(2), Some(1)),
        ]);
        let view = FilteredView::all(&t);
        assert_eq!(mean(&view, NumericField::Price), Some(1.7e308));
        assert_eq!(median(&view, NumericField::Price), Some(1.7e308));

        let stats = group_mean(&view, Category::PropertyType, NumericField::Price);
        assert_eq!(stats[0].value, 1.7e308);

        let m = correlation_matrix(&view, &[NumericField::Price, NumericField::Area]);
        assert!(m.values.iter().flatten().flatten().all(|c| c.is_finite()));
    }

    #[test]
    fn oversized_bin_request_is_clamped() {
        let t = table(vec![
            listing("a", "X", "T", 1.0, 1.0, None, None),
            listing("b", "X", "T", 2.0, 1.0, None, None),
        ]);
        let bins = histogram(&FilteredView::all(&t), NumericField::Price, usize::MAX);
        assert_eq!(bins.len(), MAX_BINS);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert_eq!(bins[MAX_BINS - 1].upper, 2.0);
    }

    #[test]
    fn histogram_puts_max_in_last_bin() {
        let t = table(
            [0.0, 1.0, 2.5, 5.0, 10.0]
                .iter()
                .enumerate()
                .map(|(i, &p)| listing(&i.to_string(), "X", "T", p, 1.0, None, None))
                .collect(),
        );
        let bins = histogram(&FilteredView::all(&t), NumericField::Price, 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 3);
        assert_eq!(bins[1].count, 2);
        assert_eq!(bins[1].upper, 10.0);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
    }

    #[test]
    fn histogram_of_constant_values_is_one_bin() {
        let t = table(vec![
            listing("a", "X", "T", 7.0, 1.0, None, None),
            listing("b", "X", "T", 7.0, 1.0, None, None),
        ]);
        let bins = histogram(&FilteredView::all(&t), NumericField::Price, 10);
        assert_eq!(bins, vec![HistogramBin { lower: 7.0, upper: 7.0, count: 2 }]);
    }

    #[test]
    fn correlation_of_single_row_is_undefined() {
        let t = table(vec![listing("A", "X", "T", 100.0, 10.0, Some(1), Some(1))]);
        let fields = [NumericField::Price, NumericField::Area];
        let m = correlation_matrix(&FilteredView::all(&t), &fields);
        assert_eq!(m.values, vec![vec![None, None], vec![None, None]]);
    }

    #[test]
    fn correlation_detects_linear_relations() {
        let t = table(vec![
            listing("a", "X", "T", 100.0, 10.0, Some(1), Some(3)),
            listing("b", "X", "T", 200.0, 20.0, Some(2), Some(2)),
            listing("c", "X", "T", 300.0, 30.0, Some(3), Some(1)),
            listing("d", "X", "T", 400.0, 40.0, None, Some(1)),
        ]);
        let fields = [
            NumericField::Price,
            NumericField::Area,
            NumericField::Bedrooms,
            NumericField::Bathrooms,
        ];
        let m = correlation_matrix(&FilteredView::all(&t), &fields);

        let close = |v: Option<f64>, want: f64| (v.unwrap() - want).abs() < 1e-12;
        assert!(close(m.get(NumericField::Price, NumericField::Area), 1.0));
        assert!(close(m.get(NumericField::Price, NumericField::Bathrooms), -1.0));
        assert!(close(m.get(NumericField::Bedrooms, NumericField::Bedrooms), 1.0));
        for i in 0..fields.len() {
            for j in 0..fields.len() {
                assert_eq!(m.values[i][j], m.values[j][i]);
            }
        }
    }

    #[test]
    fn zero_variance_correlates_as_undefined() {
        let t = table(vec![
            listing("a", "X", "T", 100.0, 10.0, None, None),
            listing("b", "X", "T", 200.0, 10.0, None, None),
        ]);
        let fields = [NumericField::Price, NumericField::Area];
        let m = correlation_matrix(&FilteredView::all(&t), &fields);
        assert_eq!(m.get(NumericField::Price, NumericField::Area), None);
        assert_eq!(m.get(NumericField::Area, NumericField::Area), None);
        assert_eq!(m.get(NumericField::Price, NumericField::Price), Some(1.0));
    }
}
