pub mod config;
pub mod constants;
pub mod dataset;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod training;
pub mod types;

pub use config::Config;
pub use error::{PrepError, Result};
pub use pipeline::{Pipeline, PreparedData};
