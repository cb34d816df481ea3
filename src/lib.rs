//! Core of a real-estate listings dashboard: load a listings table once,
//! filter it per session, and derive summaries, charts data and
//! side-by-side comparisons as plain serialisable values.

pub mod data;
pub mod error;
pub mod report;
pub mod state;

pub use data::filter::{filter, FilterSpec, FilteredView, NumericRange};
pub use data::model::{Category, Listing, NumericField, Table};
pub use error::{CoercionWarning, DataLoadError, ExportError};
pub use state::Session;
