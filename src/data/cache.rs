use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::loader;
use super::model::Table;
use crate::error::DataLoadError;

/// Loaded tables keyed by canonical path. A path is parsed once; later
/// loads hand out the same shared, read-only table.
#[derive(Debug, Default)]
pub struct DatasetCache {
    tables: HashMap<PathBuf, Arc<Table>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Arc<Table>, DataLoadError> {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        if let Some(table) = self.tables.get(&key) {
            log::debug!("dataset cache hit: {}", key.display());
            return Ok(Arc::clone(table));
        }

        log::debug!("dataset cache miss: {}", key.display());
        let table = Arc::new(loader::load(path)?);
        self.tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
