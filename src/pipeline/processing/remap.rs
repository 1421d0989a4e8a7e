use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, error};

use crate::constants::{REMAP_MAPPING_COLUMN, REMAP_VALUE_COLUMN};
use crate::error::{PrepError, Result};
use crate::ingest::read_csv;
use crate::types::CellValue;

/// Lookup table replacing raw label values with canonical labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelRemapping {
    entries: HashMap<String, CellValue>,
}

impl LabelRemapping {
    /// Read a `value,mapping` CSV file. Later rows win when a value repeats.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            error!(
                "The CSV file cannot be found at the provided directory: {}",
                path.display()
            );
            return Err(PrepError::MappingFileNotFound(path.to_path_buf()));
        }

        let table = read_csv(path).map_err(|e| {
            PrepError::MappingParse(format!("{}: {}", path.display(), e)).logged()
        })?;

        let value_col = table.column(REMAP_VALUE_COLUMN).map_err(|_| missing_column(path))?;
        let mapping_col = table
            .column(REMAP_MAPPING_COLUMN)
            .map_err(|_| missing_column(path))?;

        let mut entries = HashMap::new();
        for ((_, value), (_, mapping)) in value_col.iter().zip(mapping_col.iter()) {
            if let Some(key) = value.key() {
                entries.insert(key, mapping.clone());
            }
        }
        debug!("Loaded {} label remappings from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CellValue>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical label for `value`; `None` when the table has no usable entry.
    pub fn lookup(&self, value: &CellValue) -> Option<&CellValue> {
        value
            .key()
            .and_then(|k| self.entries.get(&k))
            .filter(|mapped| !mapped.is_null())
    }
}

fn missing_column(path: &Path) -> PrepError {
    PrepError::MappingParse(format!(
        "{} must have '{}' and '{}' columns",
        path.display(),
        REMAP_VALUE_COLUMN,
        REMAP_MAPPING_COLUMN
    ))
    .logged()
}
