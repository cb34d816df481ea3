use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::filter::NumericRange;
use crate::error::CoercionWarning;

// ---------------------------------------------------------------------------
// Cell – a single raw value before schema coercion
// ---------------------------------------------------------------------------

/// A dynamically-typed source value. CSV cells arrive as `Text`, JSON and
/// parquet cells keep their native type until the schema coerces them.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    #[default]
    Null,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Null => Ok(()),
        }
    }
}

impl Cell {
    /// Wrap a raw CSV field; blank fields are missing. Text is kept as
    /// written, surrounding whitespace included; only numeric reads trim.
    pub fn from_field(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Null
        } else {
            Cell::Text(s.to_string())
        }
    }

    /// Interpret the value as a finite number.
    ///
    /// `Ok(None)` means the cell was empty; `Err` carries the reason the
    /// value could not be read as a number.
    pub fn to_number(&self) -> Result<Option<f64>, &'static str> {
        let v = match self {
            Cell::Null => return Ok(None),
            Cell::Integer(i) => *i as f64,
            Cell::Float(v) => *v,
            Cell::Text(s) => s.trim().parse::<f64>().map_err(|_| "not a number")?,
            Cell::Bool(_) => return Err("boolean where a number was expected"),
        };
        if v.is_finite() {
            Ok(Some(v))
        } else {
            Err("not a finite number")
        }
    }

    /// Categorical text; missing cells become the empty string.
    pub fn into_category(self) -> String {
        match self {
            Cell::Text(s) => s,
            Cell::Null => String::new(),
            other => other.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// Categorical columns a listing can be filtered or grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "city")]
    City,
    #[serde(rename = "type")]
    PropertyType,
    #[serde(rename = "rent")]
    ListingKind,
    #[serde(rename = "furnished")]
    Furnished,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::City,
        Category::PropertyType,
        Category::ListingKind,
        Category::Furnished,
    ];

    /// Source column name.
    pub fn column(self) -> &'static str {
        match self {
            Category::City => "city",
            Category::PropertyType => "type",
            Category::ListingKind => "rent",
            Category::Furnished => "furnished",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Numeric columns, raw and derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NumericField {
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "area")]
    Area,
    #[serde(rename = "bedrooms")]
    Bedrooms,
    #[serde(rename = "bathrooms")]
    Bathrooms,
    #[serde(rename = "level")]
    Level,
    #[serde(rename = "rooms")]
    Rooms,
    #[serde(rename = "price_per_m2")]
    PricePerArea,
    #[serde(rename = "log_price")]
    LogPrice,
}

impl NumericField {
    pub fn column(self) -> &'static str {
        match self {
            NumericField::Price => "price",
            NumericField::Area => "area",
            NumericField::Bedrooms => "bedrooms",
            NumericField::Bathrooms => "bathrooms",
            NumericField::Level => "level",
            NumericField::Rooms => "rooms",
            NumericField::PricePerArea => "price_per_m2",
            NumericField::LogPrice => "log_price",
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// Listing – one row of the dataset
// ---------------------------------------------------------------------------

/// Schema-validated fields of a listing, before derived columns exist.
#[derive(Debug, Clone, Default)]
pub struct RawListing {
    pub ad_id: String,
    pub city: String,
    pub property_type: String,
    pub rent: String,
    pub furnished: String,
    pub price: f64,
    pub area: f64,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub level: Option<i32>,
}

impl RawListing {
    /// Compute the derived columns. `area` must be positive.
    pub fn into_listing(self) -> Listing {
        let rooms = self
            .bedrooms
            .zip(self.bathrooms)
            .and_then(|(bed, bath)| bed.checked_add(bath));
        Listing {
            price_per_area: self.price / self.area,
            log_price: self.price.ln_1p(),
            rooms,
            ad_id: self.ad_id,
            city: self.city,
            property_type: self.property_type,
            rent: self.rent,
            furnished: self.furnished,
            price: self.price,
            area: self.area,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            level: self.level,
        }
    }
}

/// One real-estate ad. Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub ad_id: String,
    pub city: String,
    #[serde(rename = "type")]
    pub property_type: String,
    pub rent: String,
    pub furnished: String,
    pub price: f64,
    pub area: f64,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub level: Option<i32>,
    pub rooms: Option<u32>,
    #[serde(rename = "price_per_m2")]
    pub price_per_area: f64,
    pub log_price: f64,
}

impl Listing {
    pub fn category(&self, category: Category) -> &str {
        match category {
            Category::City => &self.city,
            Category::PropertyType => &self.property_type,
            Category::ListingKind => &self.rent,
            Category::Furnished => &self.furnished,
        }
    }

    /// Value of a numeric column, `None` when missing.
    pub fn numeric(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::Price => Some(self.price),
            NumericField::Area => Some(self.area),
            NumericField::Bedrooms => self.bedrooms.map(f64::from),
            NumericField::Bathrooms => self.bathrooms.map(f64::from),
            NumericField::Level => self.level.map(f64::from),
            NumericField::Rooms => self.rooms.map(f64::from),
            NumericField::PricePerArea => Some(self.price_per_area),
            NumericField::LogPrice => Some(self.log_price),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadReport – what happened while loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    /// Data rows seen in the source, readable or not.
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows dropped because price or area was missing.
    pub rows_dropped: usize,
    /// Rows the reader could not decode at all.
    pub unreadable_rows: usize,
    pub warnings: Vec<CoercionWarning>,
}

// ---------------------------------------------------------------------------
// Table – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed category indices.
/// Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub listings: Vec<Listing>,
    /// For each categorical column the sorted set of unique values.
    pub unique_values: BTreeMap<Category, BTreeSet<String>>,
    pub report: LoadReport,
}

impl Table {
    /// Build category indices from the loaded listings.
    pub fn from_listings(listings: Vec<Listing>) -> Self {
        let mut unique_values: BTreeMap<Category, BTreeSet<String>> = Category::ALL
            .iter()
            .map(|&c| (c, BTreeSet::new()))
            .collect();

        for listing in &listings {
            for category in Category::ALL {
                unique_values
                    .entry(category)
                    .or_default()
                    .insert(listing.category(category).to_string());
            }
        }

        let report = LoadReport {
            rows_read: listings.len(),
            rows_kept: listings.len(),
            ..LoadReport::default()
        };

        Table {
            listings,
            unique_values,
            report,
        }
    }

    pub fn with_report(mut self, report: LoadReport) -> Self {
        self.report = report;
        self
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Sorted distinct values of a categorical column.
    pub fn options(&self, category: Category) -> Vec<&str> {
        self.unique_values
            .get(&category)
            .map(|vals| vals.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Smallest and largest non-missing value of a numeric column.
    pub fn bounds(&self, field: NumericField) -> Option<NumericRange> {
        self.listings
            .iter()
            .filter_map(|l| l.numeric(field))
            .fold(None, |acc: Option<NumericRange>, v| {
                Some(match acc {
                    None => NumericRange::new(v, v),
                    Some(r) => NumericRange::new(r.min.min(v), r.max.max(v)),
                })
            })
    }
}
