//! Pipeline counters, recorded through the `metrics` facade.
//!
//! The binary installs a Prometheus recorder and writes a text-format snapshot when the
//! run ends. Embedding applications may install their own recorder instead.

use std::fs;
use std::path::Path;

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

use crate::error::Result;

/// Install the global Prometheus recorder. `None` if another recorder is already set.
pub fn install_recorder() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Prometheus recorder not installed: {}", e);
            None
        }
    }
}

/// Write the current counter values in Prometheus text format.
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, handle.render())?;
    info!("Metrics snapshot written to {}", path.display());
    Ok(())
}

pub fn rows_loaded(n: usize) {
    counter!("textprep_rows_loaded_total").increment(n as u64);
}

/// Rows dropped by a stage, labelled with the reason.
pub fn rows_removed(stage: &'static str, reason: &'static str, n: usize) {
    counter!("textprep_rows_removed_total", "stage" => stage, "reason" => reason)
        .increment(n as u64);
}

pub fn audit_write_failed(sink: &'static str) {
    counter!("textprep_audit_write_failures_total", "sink" => sink).increment(1);
}

pub fn texts_cleaned(n: usize) {
    counter!("textprep_texts_cleaned_total").increment(n as u64);
}
