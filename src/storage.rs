use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::Result;

/// Destination for rows removed during cleaning, kept for manual review.
pub trait AuditSink {
    /// Persist `rows`, returning a description of where they went.
    fn record(&self, rows: &Dataset) -> Result<String>;
}

/// Writes audit rows to `<dir>/<YYYY-MM-DD>_<suffix>.csv`, overwriting same-day files.
pub struct CsvAuditSink {
    dir: PathBuf,
    suffix: String,
}

impl CsvAuditSink {
    pub fn new(dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn duplicates(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, "duplicates")
    }

    pub fn outliers(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, "outliers")
    }

    /// Path of today's audit file.
    pub fn current_path(&self) -> PathBuf {
        dated_path(&self.dir, &self.suffix)
    }
}

impl AuditSink for CsvAuditSink {
    fn record(&self, rows: &Dataset) -> Result<String> {
        fs::create_dir_all(&self.dir)?;
        let path = self.current_path();
        write_csv(&path, rows)?;
        debug!("Wrote {} audit rows to {}", rows.len(), path.display());
        Ok(path.to_string_lossy().to_string())
    }
}

/// In-memory audit sink for development/testing
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    records: Arc<Mutex<Vec<Dataset>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every batch recorded so far, oldest first.
    pub fn recorded(&self) -> Vec<Dataset> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, rows: &Dataset) -> Result<String> {
        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push(rows.clone());
        Ok(format!("memory[{}]", records.len() - 1))
    }
}

/// `<dir>/<today>_<suffix>.csv` using the local date.
pub fn dated_path(dir: &Path, suffix: &str) -> PathBuf {
    let today = Local::now().date_naive().format("%Y-%m-%d");
    dir.join(format!("{today}_{suffix}.csv"))
}

/// Write a dataset as a headed CSV file. Missing values become empty fields.
pub fn write_csv(path: &Path, data: &Dataset) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(data.columns())?;
    for row in data.rows() {
        writer.write_record(row.cells.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::read_csv;
    use crate::types::CellValue;
    use tempfile::tempdir;

    fn rows() -> Dataset {
        Dataset::from_rows(
            vec!["f".to_string(), "t".to_string()],
            vec![
                vec!["same".into(), "a".into()],
                vec!["same".into(), CellValue::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn csv_sink_writes_dated_file() {
        let dir = tempdir().unwrap();
        let sink = CsvAuditSink::duplicates(dir.path().join("dupes"));
        let location = sink.record(&rows()).unwrap();

        let path = PathBuf::from(&location);
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("_duplicates.csv"));
        let reread = read_csv(&path).unwrap();
        assert_eq!(reread.len(), 2);
        assert_eq!(reread.column("t").unwrap().get(1), Some(&CellValue::Null));
    }

    #[test]
    fn same_day_rerun_overwrites() {
        let dir = tempdir().unwrap();
        let sink = CsvAuditSink::outliers(dir.path());
        sink.record(&rows()).unwrap();
        let single = Dataset::from_rows(
            vec!["f".to_string(), "t".to_string()],
            vec![vec!["only".into(), "b".into()]],
        )
        .unwrap();
        sink.record(&single).unwrap();

        let reread = read_csv(&sink.current_path()).unwrap();
        assert_eq!(reread.len(), 1);
    }

    #[test]
    fn memory_sink_keeps_batches() {
        let sink = InMemoryAuditSink::new();
        sink.record(&rows()).unwrap();
        sink.record(&rows()).unwrap();
        assert_eq!(sink.recorded().len(), 2);
    }
}
