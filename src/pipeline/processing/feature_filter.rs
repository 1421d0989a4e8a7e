use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;
use tracing::{info, warn};

use crate::constants::OUTLIER_STD_DEVIATIONS;
use crate::dataset::{Dataset, RowIndex};
use crate::error::{PrepError, Result};
use crate::pipeline::processing::validators::check_type;
use crate::storage::AuditSink;
use crate::types::ValueKind;

/// What to do when an audit file cannot be written.
///
/// Applies to both the duplicate and the outlier sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditPolicy {
    /// Log the failure and keep cleaning.
    #[default]
    BestEffort,
    /// Abort with `AuditWrite`.
    Strict,
}

/// Switches for the feature filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Persist every occurrence of each duplicated feature value.
    pub keep_duplicates_for_audit: bool,
    /// Drop rows whose feature length lies outside mean ± 3σ.
    pub remove_outliers: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            keep_duplicates_for_audit: true,
            remove_outliers: true,
        }
    }
}

/// Inclusive length range accepted by outlier removal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthBounds {
    pub mean: f64,
    pub std_dev: f64,
    pub lower: f64,
    pub upper: f64,
}

impl LengthBounds {
    pub fn contains(&self, length: usize) -> bool {
        let length = length as f64;
        length >= self.lower && length <= self.upper
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterReport {
    pub missing_removed: usize,
    pub duplicates_removed: usize,
    pub outliers_removed: usize,
    /// Bounds used for outlier removal, when it ran with enough rows.
    pub bounds: Option<LengthBounds>,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub dataset: Dataset,
    pub report: FilterReport,
}

/// Removes rows with missing, duplicated or abnormally sized feature text.
pub struct FeatureFilter<'a> {
    duplicate_sink: &'a dyn AuditSink,
    outlier_sink: &'a dyn AuditSink,
    policy: AuditPolicy,
}

impl<'a> FeatureFilter<'a> {
    pub fn new(
        duplicate_sink: &'a dyn AuditSink,
        outlier_sink: &'a dyn AuditSink,
        policy: AuditPolicy,
    ) -> Self {
        Self {
            duplicate_sink,
            outlier_sink,
            policy,
        }
    }

    /// Narrow `data` to rows whose feature value is present, the first of its
    /// duplicates, and (optionally) of non-outlying length.
    pub fn apply(
        &self,
        data: &Dataset,
        features_name: &str,
        options: FilterOptions,
    ) -> Result<FilterOutcome> {
        if !data.has_column(features_name) {
            return Err(PrepError::ColumnNotFound(features_name.to_string()).logged());
        }

        let present = data.drop_missing(features_name)?;
        if present.is_empty() {
            return Err(PrepError::EmptyDataset(format!(
                "no rows left after removing missing {features_name} values. Check your data or processing steps."
            ))
            .logged());
        }

        let mut report = FilterReport {
            missing_removed: data.len() - present.len(),
            ..FilterReport::default()
        };

        let features = present.column(features_name)?;
        let mut texts: Vec<(RowIndex, &str)> = Vec::with_capacity(features.len());
        for (index, value) in features.iter() {
            check_type(value, ValueKind::String, features_name)?;
            texts.push((*index, value.as_str().unwrap_or_default()));
        }

        let (repeats, all_occurrences) = find_duplicates(&texts);
        report.duplicates_removed = repeats.len();
        info!("{} duplicate records have been removed.", repeats.len());

        if options.keep_duplicates_for_audit {
            let audit = present.select(&all_occurrences);
            self.write_audit(self.duplicate_sink, "duplicates", &audit)?;
        }

        let mut working = present.exclude(&repeats);

        if options.remove_outliers {
            let texts: Vec<(RowIndex, &str)> = texts
                .into_iter()
                .filter(|(i, _)| !repeats.contains(i))
                .collect();

            if let Some(bounds) = length_bounds(&texts) {
                let outliers: BTreeSet<RowIndex> = texts
                    .iter()
                    .filter(|(_, text)| !bounds.contains(text.chars().count()))
                    .map(|(i, _)| *i)
                    .collect();

                self.write_audit(self.outlier_sink, "outliers", &working.select(&outliers))?;
                working = working.exclude(&outliers);
                report.outliers_removed = outliers.len();
                report.bounds = Some(bounds);
                info!(
                    "{} rows were removed due to length exceeding {} standard deviations.",
                    outliers.len(),
                    OUTLIER_STD_DEVIATIONS
                );
            } else {
                warn!("Fewer than two rows remain; skipping outlier removal");
            }
        }

        crate::metrics::rows_removed("feature_filter", "missing", report.missing_removed);
        crate::metrics::rows_removed("feature_filter", "duplicate", report.duplicates_removed);
        crate::metrics::rows_removed("feature_filter", "outlier", report.outliers_removed);

        Ok(FilterOutcome {
            dataset: working,
            report,
        })
    }

    fn write_audit(&self, sink: &dyn AuditSink, name: &'static str, rows: &Dataset) -> Result<()> {
        match sink.record(rows) {
            Ok(location) => {
                info!("Saved {} {} rows for auditing to {}", rows.len(), name, location);
                Ok(())
            }
            Err(e) => {
                crate::metrics::audit_write_failed(name);
                match self.policy {
                    AuditPolicy::BestEffort => {
                        warn!("Failed to save {}. Error: {}", name, e);
                        Ok(())
                    }
                    AuditPolicy::Strict => Err(PrepError::AuditWrite {
                        sink: name.to_string(),
                        source: Box::new(e),
                    }
                    .logged()),
                }
            }
        }
    }
}

/// Split rows into later repeats of a value and every occurrence of a repeated value.
fn find_duplicates(texts: &[(RowIndex, &str)]) -> (BTreeSet<RowIndex>, BTreeSet<RowIndex>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, text) in texts {
        *counts.entry(*text).or_insert(0) += 1;
    }

    let mut seen: HashMap<&str, RowIndex> = HashMap::new();
    let mut repeats = BTreeSet::new();
    let mut all_occurrences = BTreeSet::new();
    for (index, text) in texts {
        if counts[text] > 1 {
            all_occurrences.insert(*index);
        }
        if seen.insert(*text, *index).is_some() {
            repeats.insert(*index);
        }
    }
    (repeats, all_occurrences)
}

/// Mean ± 3 sample standard deviations of the character length.
///
/// `None` when fewer than two rows make the deviation undefined.
pub fn length_bounds(texts: &[(RowIndex, &str)]) -> Option<LengthBounds> {
    if texts.len() < 2 {
        return None;
    }
    let lengths: Vec<f64> = texts
        .iter()
        .map(|(_, t)| t.chars().count() as f64)
        .collect();
    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<f64>() / n;
    let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    Some(LengthBounds {
        mean,
        std_dev,
        lower: mean - OUTLIER_STD_DEVIATIONS * std_dev,
        upper: mean + OUTLIER_STD_DEVIATIONS * std_dev,
    })
}
