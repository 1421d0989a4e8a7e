use std::collections::BTreeSet;

use tracing::{info, instrument};

use crate::config::Config;
use crate::constants::DEFAULT_STOPWORDS_LANGUAGE;
use crate::dataset::{Dataset, LabelColumn, RowIndex, TextColumn};
use crate::error::{PrepError, Result};
use crate::ingest::load_data;
use crate::pipeline::processing::feature_filter::{FeatureFilter, FilterOptions};
use crate::pipeline::processing::stopwords::{StopwordSource, StopwordStore};
use crate::pipeline::processing::target::{TargetFormatter, TargetOptions};
use crate::pipeline::processing::text::TextNormalizer;
use crate::storage::{AuditSink, CsvAuditSink};
use crate::training::{StagingTrainer, Trainer, TrainingArtifact, TrainingSetup};

/// Cleaned feature text and labels sharing exactly the same row indices.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedData {
    pub features: TextColumn,
    pub target: LabelColumn,
}

impl PreparedData {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Runs filtering, target formatting and text cleaning in order, then trains.
pub struct Pipeline {
    config: Config,
    duplicate_sink: Box<dyn AuditSink>,
    outlier_sink: Box<dyn AuditSink>,
    stopwords: StopwordStore,
    trainer: Box<dyn Trainer>,
    setup: TrainingSetup,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        let source = match &config.stopwords_url {
            Some(url) if !url.trim().is_empty() => StopwordSource::Remote(url.clone()),
            _ => StopwordSource::Bundled,
        };
        Self {
            duplicate_sink: Box::new(CsvAuditSink::duplicates(&config.duplicate_data)),
            outlier_sink: Box::new(CsvAuditSink::outliers(&config.outliers)),
            stopwords: StopwordStore::new(&config.stopwords_dir, DEFAULT_STOPWORDS_LANGUAGE, source),
            trainer: Box::new(StagingTrainer::new(
                config.staging_dir.clone(),
                &config.features_name,
                &config.target_name,
            )),
            setup: TrainingSetup::default(),
            config,
        }
    }

    pub fn with_audit_sinks(
        mut self,
        duplicate_sink: Box<dyn AuditSink>,
        outlier_sink: Box<dyn AuditSink>,
    ) -> Self {
        self.duplicate_sink = duplicate_sink;
        self.outlier_sink = outlier_sink;
        self
    }

    pub fn with_trainer(mut self, trainer: Box<dyn Trainer>) -> Self {
        self.trainer = trainer;
        self
    }

    /// Produce the aligned feature/label pair from a loaded dataset.
    #[instrument(skip_all, fields(rows = dataset.len()))]
    pub fn prepare(&self, dataset: &Dataset) -> Result<PreparedData> {
        let config = &self.config;

        let filter = FeatureFilter::new(
            self.duplicate_sink.as_ref(),
            self.outlier_sink.as_ref(),
            config.audit_policy,
        );
        let filtered = filter.apply(
            dataset,
            &config.features_name,
            FilterOptions {
                keep_duplicates_for_audit: config.save_duplicates,
                remove_outliers: config.remove_outliers,
            },
        )?;

        let formatter = TargetFormatter::new(config.label_remappings.clone())
            .with_unmapped_policy(config.unmapped_labels)
            .with_imbalance_threshold(config.imbalance_threshold);
        let target = formatter.format(
            &filtered.dataset,
            &config.target_name,
            &TargetOptions {
                ignored_values: Some(config.ignored_values.clone()),
                remap: config.remap_target,
            },
        )?;

        let features = filtered.dataset.column(&config.features_name)?;
        let normalizer = TextNormalizer::new(self.stopwords.load()?)?;
        let text = normalizer.clean(&features, &target.indices())?;

        let prepared = align(text, target)?;
        info!(
            "Prepared {} rows ({} missing, {} duplicates, {} outliers removed)",
            prepared.len(),
            filtered.report.missing_removed,
            filtered.report.duplicates_removed,
            filtered.report.outliers_removed
        );
        Ok(prepared)
    }

    /// Load the configured input, prepare it and hand it to the trainer.
    pub fn run(&self) -> Result<TrainingArtifact> {
        let dataset = load_data(&self.config.input_data)?;
        let prepared = self.prepare(&dataset)?;
        self.trainer.train(&prepared, &self.setup)
    }
}

/// Keep the rows present in both views, in ascending index order.
///
/// Every target row must have cleaned text.
fn align(text: TextColumn, target: LabelColumn) -> Result<PreparedData> {
    let text_ids = text.index_set();
    let missing: Vec<RowIndex> = target
        .indices()
        .into_iter()
        .filter(|i| !text_ids.contains(i))
        .collect();
    if !missing.is_empty() {
        return Err(PrepError::IndexMismatch { missing }.logged());
    }

    let shared: BTreeSet<RowIndex> = text_ids
        .intersection(&target.index_set())
        .copied()
        .collect();
    let ordered: Vec<RowIndex> = shared.into_iter().collect();

    Ok(PreparedData {
        features: text.restrict(&ordered)?,
        target: target.restrict(&ordered)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Series;

    fn column(name: &str, entries: &[(RowIndex, &str)]) -> Series<String> {
        Series::from_entries(
            name,
            entries.iter().map(|(i, v)| (*i, v.to_string())).collect(),
        )
    }

    #[test]
    fn align_sorts_and_intersects() {
        let text = column("review", &[(4, "d"), (0, "a"), (2, "c")]);
        let target = column("rating", &[(0, "good"), (4, "bad")]);

        let prepared = align(text, target).unwrap();
        assert_eq!(prepared.features.indices(), vec![0, 4]);
        assert_eq!(prepared.target.indices(), vec![0, 4]);
        assert_eq!(prepared.features.get(4).map(String::as_str), Some("d"));
    }

    #[test]
    fn align_requires_text_for_every_label() {
        let text = column("review", &[(0, "a")]);
        let target = column("rating", &[(0, "good"), (1, "bad")]);
        match align(text, target).unwrap_err() {
            PrepError::IndexMismatch { missing } => assert_eq!(missing, vec![1]),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
