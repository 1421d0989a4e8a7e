use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::RowIndex;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("{name} must be {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} not found in dataset columns")]
    ColumnNotFound(String),

    #[error("Dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Label remapping file not found: {}", .0.display())]
    MappingFileNotFound(PathBuf),

    #[error("Label remapping could not be parsed: {0}")]
    MappingParse(String),

    #[error("Could not save {sink} for auditing: {source}")]
    AuditWrite {
        sink: String,
        #[source]
        source: Box<PrepError>,
    },

    #[error("Data integrity check failed: {0}")]
    DataIntegrity(String),

    #[error("No CSV source found at: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("File {} is empty", .0.display())]
    EmptyData(PathBuf),

    #[error("Parser error for file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Requested row indices are absent from the source view: {missing:?}")]
    IndexMismatch { missing: Vec<RowIndex> },

    #[error("Labels without a remapping entry: {0:?}")]
    UnmappedLabel(Vec<String>),

    #[error("Stopword resource unavailable: {0}")]
    StopwordResource(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl PrepError {
    /// Emits the error on the log trail and hands it back for returning.
    pub fn logged(self) -> Self {
        tracing::error!("{}", self);
        self
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
