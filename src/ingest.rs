use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::error::{PrepError, Result};
use crate::types::{infer_column, CellValue};

/// Load the first CSV file (in name order) found directly under `directory`.
pub fn load_data(directory: &Path) -> Result<Dataset> {
    let source = first_csv(directory)?;
    let data = read_csv(&source)?;
    info!(
        "Data successfully loaded from {} ({} rows)",
        source.display(),
        data.len()
    );
    crate::metrics::rows_loaded(data.len());
    Ok(data)
}

fn first_csv(directory: &Path) -> Result<PathBuf> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read directory {}: {}", directory.display(), e);
            return Err(PrepError::SourceNotFound(directory.to_path_buf()).logged());
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| PrepError::SourceNotFound(directory.to_path_buf()).logged())
}

/// Read a headed CSV file into a dataset, inferring each column's type.
///
/// Rows are indexed by their position among the data rows, starting at 0.
pub fn read_csv(path: &Path) -> Result<Dataset> {
    let parse_error = |e: csv::Error| {
        PrepError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
        .logged()
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => PrepError::SourceNotFound(path.to_path_buf()).logged(),
            _ => parse_error(e),
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(PrepError::EmptyData(path.to_path_buf()).logged());
    }

    let mut raw: Vec<csv::StringRecord> = Vec::new();
    for record in reader.records() {
        raw.push(record.map_err(parse_error)?);
    }
    if raw.is_empty() {
        return Err(PrepError::EmptyData(path.to_path_buf()).logged());
    }

    let columns: Vec<Vec<CellValue>> = (0..headers.len())
        .map(|col| {
            let fields: Vec<&str> = raw.iter().map(|r| r.get(col).unwrap_or("")).collect();
            infer_column(&fields)
        })
        .collect();

    let rows = (0..raw.len())
        .map(|row| columns.iter().map(|col| col[row].clone()).collect())
        .collect();

    Dataset::from_rows(headers, rows)
}
