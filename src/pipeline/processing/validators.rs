use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::dataset::Series;
use crate::error::{PrepError, Result};
use crate::types::{CellValue, ValueKind};

/// Fail with `TypeMismatch` unless `value` is of kind `expected`.
pub fn check_type(value: &CellValue, expected: ValueKind, name: &str) -> Result<()> {
    if value.kind() != expected {
        return Err(PrepError::TypeMismatch {
            name: name.to_string(),
            expected: expected.to_string(),
            found: value.kind().to_string(),
        }
        .logged());
    }
    Ok(())
}

/// Inferred element type of a series, ignoring missing values.
///
/// One of `string`, `integer`, `floating`, `boolean`, `mixed` or `empty`.
pub fn infer_kind(series: &Series<CellValue>) -> &'static str {
    let kinds: BTreeSet<&'static str> = series
        .values()
        .filter(|v| !v.is_null())
        .map(|v| match v.kind() {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "floating",
            ValueKind::Bool => "boolean",
            ValueKind::Null => "empty",
        })
        .collect();

    match kinds.len() {
        0 => "empty",
        1 => kinds.into_iter().next().unwrap_or("empty"),
        _ if kinds.iter().all(|k| *k == "integer" || *k == "floating") => "floating",
        _ => "mixed",
    }
}

/// Outcome of a successful integrity check.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityReport {
    pub class_counts: BTreeMap<String, usize>,
    pub smallest_class_proportion: f64,
    /// The smallest class fell below the imbalance threshold.
    pub imbalanced: bool,
}

/// Check that a label series is usable for classification.
///
/// Fails with `DataIntegrity` when the values are not all strings or when only one
/// distinct value remains. A minority class below `imbalance_threshold` of the
/// data is reported and logged as a warning but does not fail the check.
pub fn check_data_integrity(
    series: &Series<CellValue>,
    imbalance_threshold: f64,
) -> Result<IntegrityReport> {
    let data_type = infer_kind(series);
    if data_type != "string" {
        return Err(PrepError::DataIntegrity(format!(
            "Data is of type {data_type}. Data type should be \"string\"."
        ))
        .logged());
    }

    let mut class_counts = BTreeMap::new();
    for label in series.values().filter_map(CellValue::as_str) {
        *class_counts.entry(label.to_string()).or_insert(0usize) += 1;
    }

    if class_counts.len() == 1 {
        return Err(PrepError::DataIntegrity(format!(
            "Values in {} appear identical.",
            series.name()
        ))
        .logged());
    }

    let report = check_data_imbalance(class_counts, imbalance_threshold);
    Ok(report)
}

fn check_data_imbalance(class_counts: BTreeMap<String, usize>, threshold: f64) -> IntegrityReport {
    let total: usize = class_counts.values().sum();
    let smallest = class_counts.values().copied().min().unwrap_or(0);
    let smallest_class_proportion = if total == 0 {
        0.0
    } else {
        smallest as f64 / total as f64
    };

    let imbalanced = smallest_class_proportion < threshold;
    if imbalanced {
        warn!(
            "The dataset is highly imbalanced. The smallest class represents only {:.2}% of the data. \
             Consider using techniques for handling imbalanced data.",
            smallest_class_proportion * 100.0
        );
    }

    IntegrityReport {
        class_counts,
        smallest_class_proportion,
        imbalanced,
    }
}
