/// Data layer: core types, loading, filtering and the derived views.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + coerce → Table   (memoised by cache)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec → FilteredView (row indices)
///   └──────────┘
///      │     │
///      ▼     ▼
///  aggregate  compare        export → CSV
/// ```

pub mod aggregate;
pub mod cache;
pub mod compare;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
