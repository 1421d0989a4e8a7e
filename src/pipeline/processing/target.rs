use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::constants::DEFAULT_IMBALANCE_THRESHOLD;
use crate::dataset::{Dataset, LabelColumn, Series};
use crate::error::{PrepError, Result};
use crate::pipeline::processing::remap::LabelRemapping;
use crate::pipeline::processing::validators::check_data_integrity;
use crate::types::CellValue;

/// Handling of target values that have no entry in the remapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedLabelPolicy {
    /// Remove the row and warn with the number of rows removed.
    #[default]
    Drop,
    /// Keep the raw value.
    Keep,
    /// Fail with `UnmappedLabel`.
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetOptions {
    /// Labels excluded from the output, compared trimmed and lowercased.
    pub ignored_values: Option<Vec<String>>,
    pub remap: bool,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            ignored_values: None,
            remap: true,
        }
    }
}

/// Extracts and cleans the classification target.
#[derive(Debug, Clone)]
pub struct TargetFormatter {
    remap_source: Option<PathBuf>,
    unmapped: UnmappedLabelPolicy,
    imbalance_threshold: f64,
}

impl Default for TargetFormatter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TargetFormatter {
    pub fn new(remap_source: Option<PathBuf>) -> Self {
        Self {
            remap_source,
            unmapped: UnmappedLabelPolicy::default(),
            imbalance_threshold: DEFAULT_IMBALANCE_THRESHOLD,
        }
    }

    pub fn with_unmapped_policy(mut self, policy: UnmappedLabelPolicy) -> Self {
        self.unmapped = policy;
        self
    }

    pub fn with_imbalance_threshold(mut self, threshold: f64) -> Self {
        self.imbalance_threshold = threshold;
        self
    }

    pub fn format(
        &self,
        dataset: &Dataset,
        target_name: &str,
        options: &TargetOptions,
    ) -> Result<LabelColumn> {
        if !dataset.has_column(target_name) {
            return Err(PrepError::ColumnNotFound(target_name.to_string()).logged());
        }

        let remap_source = match (&self.remap_source, options.remap) {
            (None, true) => {
                return Err(PrepError::Configuration(
                    "No path specified for label remappings.".to_string(),
                )
                .logged());
            }
            (Some(path), true) => Some(path),
            (_, false) => None,
        };

        if target_name.trim().is_empty() {
            return Err(PrepError::InvalidArgument(
                "target_name must be a non-empty string".to_string(),
            )
            .logged());
        }

        let present = dataset.drop_missing(target_name)?;
        if present.is_empty() {
            return Err(PrepError::EmptyDataset(format!(
                "every value of {target_name} is missing"
            ))
            .logged());
        }
        let mut target = present.column(target_name)?;

        if let Some(path) = remap_source {
            let remapping = LabelRemapping::load(path)?;
            target = self.remap(target, &remapping)?;
        }

        let target = target.map(normalize_label);

        let ignored: HashSet<String> = options
            .ignored_values
            .iter()
            .flatten()
            .map(|v| v.trim().to_lowercase())
            .collect();
        let before = target.len();
        let target = target.filter(|value| match value.as_str() {
            Some(label) => !ignored.contains(label),
            None => true,
        });
        if before != target.len() {
            info!(
                "Excluded {} rows with ignored labels from {}",
                before - target.len(),
                target_name
            );
        }

        let report = check_data_integrity(&target, self.imbalance_threshold)?;
        debug!("Target class counts: {:?}", report.class_counts);

        Ok(target.map(|value| match value {
            CellValue::String(label) => label,
            other => other.to_string(),
        }))
    }

    fn remap(
        &self,
        target: Series<CellValue>,
        remapping: &LabelRemapping,
    ) -> Result<Series<CellValue>> {
        let unmapped: BTreeSet<String> = target
            .values()
            .filter(|value| remapping.lookup(value).is_none())
            .filter_map(CellValue::key)
            .collect();

        if unmapped.is_empty() {
            return Ok(target.map(|value| remapping.lookup(&value).cloned().unwrap_or(value)));
        }

        match self.unmapped {
            UnmappedLabelPolicy::Reject => {
                Err(PrepError::UnmappedLabel(unmapped.into_iter().collect()).logged())
            }
            UnmappedLabelPolicy::Keep => {
                debug!("Keeping {} unmapped label values as-is", unmapped.len());
                Ok(target.map(|value| remapping.lookup(&value).cloned().unwrap_or(value)))
            }
            UnmappedLabelPolicy::Drop => {
                let before = target.len();
                let kept = target
                    .filter(|value| remapping.lookup(value).is_some())
                    .map(|value| remapping.lookup(&value).cloned().unwrap_or(value));
                warn!(
                    "Dropped {} rows whose labels have no remapping entry: {:?}",
                    before - kept.len(),
                    unmapped
                );
                crate::metrics::rows_removed("target", "unmapped", before - kept.len());
                Ok(kept)
            }
        }
    }
}

fn normalize_label(value: CellValue) -> CellValue {
    match value {
        CellValue::String(label) => CellValue::String(label.trim().to_lowercase()),
        other => other,
    }
}
