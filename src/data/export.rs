use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::filter::FilteredView;
use super::model::Listing;
use crate::error::ExportError;

/// Write listings as CSV: header row, then one row per listing including
/// the derived columns. Missing values are empty cells.
///
/// Returns the number of rows written.
pub fn export_csv<'a, I, W>(listings: I, writer: W) -> Result<usize, ExportError>
where
    I: IntoIterator<Item = &'a Listing>,
    W: Write,
{
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut count = 0;
    for listing in listings {
        csv_writer.serialize(listing)?;
        count += 1;
    }
    if count == 0 {
        // serialize() emits the header with the first row; an empty export
        // still needs one.
        csv_writer.write_record(EXPORT_HEADER)?;
    }

    csv_writer.flush().map_err(ExportError::Flush)?;
    Ok(count)
}

/// Column order of [`export_csv`].
pub const EXPORT_HEADER: [&str; 13] = [
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
    "rooms",
    "price_per_m2",
    "log_price",
];

/// Export a filtered view to a UTF-8 CSV file.
pub fn export_csv_path(view: &FilteredView<'_>, path: &Path) -> Result<usize, ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let count = export_csv(view.listings(), file)?;
    log::info!("Exported {count} listings to {}", path.display());
    Ok(count)
}
