use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeStringArray,
    StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Cell, Listing, LoadReport, RawListing, Table};
use crate::error::{CoercionWarning, DataLoadError};

/// Columns every source must provide, in the order cells are assembled.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "ad_id",
    "city",
    "type",
    "rent",
    "furnished",
    "price",
    "area",
    "bedrooms",
    "bathrooms",
    "level",
];

const AD_ID: usize = 0;
const CITY: usize = 1;
const TYPE: usize = 2;
const RENT: usize = 3;
const FURNISHED: usize = 4;
const PRICE: usize = 5;
const AREA: usize = 6;
const BEDROOMS: usize = 7;
const BATHROOMS: usize = 8;
const LEVEL: usize = 9;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a listings dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, at least the [`REQUIRED_COLUMNS`]
/// * `.json`    – `[{ "ad_id": "...", "price": 1000, ... }, ...]`
/// * `.parquet` – one column per field, scalar types only
pub fn load(path: &Path) -> Result<Table, DataLoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => Err(DataLoadError::UnsupportedFormat {
            path: path.to_path_buf(),
            ext: other.to_string(),
        }),
    }?;

    let report = &table.report;
    log::info!(
        "Loaded {}: {} rows read, {} kept, {} dropped, {} unreadable",
        path.display(),
        report.rows_read,
        report.rows_kept,
        report.rows_dropped,
        report.unreadable_rows
    );
    if report.rows_dropped > 0 || report.unreadable_rows > 0 {
        log::warn!(
            "{}: {} rows lacked a usable price or area, {} could not be decoded",
            path.display(),
            report.rows_dropped,
            report.unreadable_rows
        );
    }
    Ok(table)
}

fn open(path: &Path) -> Result<File, DataLoadError> {
    File::open(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            DataLoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DataLoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Row assembly – shared by every format
// ---------------------------------------------------------------------------

/// Turns raw cells into listings, applying the coercion rules and
/// recording what was lost along the way.
#[derive(Default)]
struct TableBuilder {
    listings: Vec<Listing>,
    report: LoadReport,
}

impl TableBuilder {
    fn unreadable(&mut self, row: usize, reason: impl std::fmt::Display) {
        log::debug!("row {row}: skipped, {reason}");
        self.report.rows_read += 1;
        self.report.unreadable_rows += 1;
    }

    /// `cells` is indexed like [`REQUIRED_COLUMNS`].
    fn push(&mut self, row: usize, mut cells: Vec<Cell>) {
        self.report.rows_read += 1;
        cells.resize(REQUIRED_COLUMNS.len(), Cell::Null);

        let price = self.number(row, PRICE, &cells[PRICE], |v| v >= 0.0, "negative price");
        let area = self.number(row, AREA, &cells[AREA], |v| v > 0.0, "area must be positive");
        let bedrooms = self.count(row, BEDROOMS, &cells[BEDROOMS]);
        let bathrooms = self.count(row, BATHROOMS, &cells[BATHROOMS]);
        let level = self
            .number(
                row,
                LEVEL,
                &cells[LEVEL],
                |v| is_integral(v) && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX),
                "level is not a 32-bit whole number",
            )
            .map(|v| v as i32);

        let (Some(price), Some(area)) = (price, area) else {
            self.report.rows_dropped += 1;
            return;
        };

        let mut take = |idx: usize| std::mem::take(&mut cells[idx]).into_category();
        let raw = RawListing {
            ad_id: take(AD_ID),
            city: take(CITY),
            property_type: take(TYPE),
            rent: take(RENT),
            furnished: take(FURNISHED),
            price,
            area,
            bedrooms,
            bathrooms,
            level,
        };
        self.listings.push(raw.into_listing());
        self.report.rows_kept += 1;
    }

    /// Coerce a numeric cell; invalid values become missing with a warning.
    fn number(
        &mut self,
        row: usize,
        column: usize,
        cell: &Cell,
        valid: impl Fn(f64) -> bool,
        invalid_reason: &'static str,
    ) -> Option<f64> {
        match cell.to_number() {
            Ok(Some(v)) if valid(v) => Some(v),
            Ok(Some(_)) => {
                self.warn(row, column, cell, invalid_reason);
                None
            }
            Ok(None) => None,
            Err(reason) => {
                self.warn(row, column, cell, reason);
                None
            }
        }
    }

    fn count(&mut self, row: usize, column: usize, cell: &Cell) -> Option<u32> {
        self.number(
            row,
            column,
            cell,
            |v| v >= 0.0 && is_integral(v) && v <= f64::from(u32::MAX),
            "not a non-negative whole number",
        )
        .map(|v| v as u32)
    }

    fn warn(&mut self, row: usize, column: usize, cell: &Cell, reason: &'static str) {
        let warning = CoercionWarning {
            row,
            column: REQUIRED_COLUMNS[column],
            value: cell.to_string(),
            reason,
        };
        log::debug!(
            "row {}: '{}' = {:?} treated as missing ({})",
            warning.row,
            warning.column,
            warning.value,
            warning.reason
        );
        self.report.warnings.push(warning);
    }

    fn finish(self) -> Table {
        Table::from_listings(self.listings).with_report(self.report)
    }
}

fn is_integral(v: f64) -> bool {
    v.fract() == 0.0
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, at least the
/// [`REQUIRED_COLUMNS`] in any order. Extra columns (including previously
/// exported derived columns) are ignored and recomputed.
fn load_csv(path: &Path) -> Result<Table, DataLoadError> {
    read_csv(open(path)?, path)
}

/// Parse CSV from any reader; `path` is only used for error context.
pub fn read_csv<R: io::Read>(source: R, path: &Path) -> Result<Table, DataLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(source);
    let headers = reader
        .headers()
        .map_err(|source| DataLoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let positions = REQUIRED_COLUMNS
        .iter()
        .map(|&column| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or_else(|| DataLoadError::MissingColumn {
                    path: path.to_path_buf(),
                    column,
                })
        })
        .collect::<Result<Vec<usize>, _>>()?;

    let mut builder = TableBuilder::default();

    for (row_no, result) in reader.records().enumerate() {
        let row = row_no + 1;
        let record = match result {
            Ok(record) => record,
            Err(source) if source.is_io_error() => {
                return Err(DataLoadError::Csv {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                builder.unreadable(row, e);
                continue;
            }
        };

        let cells = positions
            .iter()
            .map(|&idx| record.get(idx).map(Cell::from_field).unwrap_or_default())
            .collect();
        builder.push(row, cells);
    }

    Ok(builder.finish())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "ad_id": "a1", "city": "Cairo", "price": 1500000, "area": 120, ... },
///   ...
/// ]
/// ```
///
/// A key missing from an object is a missing value; a non-object entry is
/// an unreadable row.
fn load_json(path: &Path) -> Result<Table, DataLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => DataLoadError::NotFound {
            path: path.to_path_buf(),
        },
        _ => DataLoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let root: JsonValue = serde_json::from_str(&text).map_err(|source| DataLoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let records = root.as_array().ok_or_else(|| DataLoadError::Malformed {
        path: path.to_path_buf(),
        detail: "expected a top-level JSON array of records".to_string(),
    })?;

    let mut builder = TableBuilder::default();

    for (i, rec) in records.iter().enumerate() {
        let row = i + 1;
        let Some(obj) = rec.as_object() else {
            builder.unreadable(row, "record is not a JSON object");
            continue;
        };
        let cells = REQUIRED_COLUMNS
            .iter()
            .map(|&column| obj.get(column).map(json_to_cell).unwrap_or_default())
            .collect();
        builder.push(row, cells);
    }

    Ok(builder.finish())
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::from_field(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Cell::Bool(*b),
        JsonValue::Null => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one scalar column per field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table, DataLoadError> {
    let parquet_err = |source: parquet::errors::ParquetError| DataLoadError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let file = open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(parquet_err)?
        .build()
        .map_err(parquet_err)?;

    let mut builder = TableBuilder::default();
    let mut row = 0;

    for batch_result in reader {
        let batch = batch_result.map_err(|source| DataLoadError::Arrow {
            path: path.to_path_buf(),
            source,
        })?;
        let schema = batch.schema();

        let columns = REQUIRED_COLUMNS
            .iter()
            .map(|&column| {
                schema
                    .index_of(column)
                    .map(|idx| batch.column(idx).clone())
                    .map_err(|_| DataLoadError::MissingColumn {
                        path: path.to_path_buf(),
                        column,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for batch_row in 0..batch.num_rows() {
            row += 1;
            let cells = columns
                .iter()
                .map(|col| arrow_to_cell(col, batch_row))
                .collect();
            builder.push(row, cells);
        }
    }

    Ok(builder.finish())
}

/// Extract a single value from an Arrow column at a given row.
fn arrow_to_cell(col: &Arc<dyn Array>, row: usize) -> Cell {
    if col.is_null(row) {
        return Cell::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| Cell::from_field(a.value(row)))
            .unwrap_or_default(),
        DataType::LargeUtf8 => any
            .downcast_ref::<LargeStringArray>()
            .map(|a| Cell::from_field(a.value(row)))
            .unwrap_or_default(),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| Cell::Integer(i64::from(a.value(row))))
            .unwrap_or_default(),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| Cell::Integer(a.value(row)))
            .unwrap_or_default(),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| Cell::Float(f64::from(a.value(row))))
            .unwrap_or_default(),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| Cell::Float(a.value(row)))
            .unwrap_or_default(),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| Cell::Bool(a.value(row)))
            .unwrap_or_default(),
        other => Cell::Text(format!("{other:?}")),
    }
}
