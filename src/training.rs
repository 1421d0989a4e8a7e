use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::error::{PrepError, Result};
use crate::pipeline::orchestrator::PreparedData;
use crate::storage::dated_path;

/// Hyper-parameter grid searched for the random forest classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub n_estimators: Vec<u32>,
    /// `None` grows trees until their leaves are pure.
    pub max_depth: Vec<Option<u32>>,
    pub min_samples_split: Vec<u32>,
    pub min_samples_leaf: Vec<u32>,
}

impl ParamGrid {
    /// Number of parameter combinations in the grid.
    pub fn combinations(&self) -> usize {
        self.n_estimators.len()
            * self.max_depth.len()
            * self.min_samples_split.len()
            * self.min_samples_leaf.len()
    }
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![20, 50, 80, 100],
            max_depth: vec![None, Some(10), Some(20)],
            min_samples_split: vec![2, 4],
            min_samples_leaf: vec![1, 2],
        }
    }
}

/// Nested cross-validation strategy handed to a [`Trainer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSetup {
    pub seed: u64,
    pub inner_folds: usize,
    pub outer_folds: usize,
    pub shuffle: bool,
    pub grid: ParamGrid,
}

impl Default for TrainingSetup {
    fn default() -> Self {
        Self {
            seed: 42,
            inner_folds: 3,
            outer_folds: 10,
            shuffle: true,
            grid: ParamGrid::default(),
        }
    }
}

/// What a training run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingArtifact {
    pub rows: usize,
    pub class_counts: BTreeMap<String, usize>,
    /// File holding the aligned training pair, if it was written.
    pub staged_to: Option<PathBuf>,
}

/// Consumes the prepared pair. Model fitting lives behind this seam.
pub trait Trainer {
    fn train(&self, data: &PreparedData, setup: &TrainingSetup) -> Result<TrainingArtifact>;
}

/// Checks the prepared pair and stages it on disk for an external trainer.
pub struct StagingTrainer {
    staging_dir: Option<PathBuf>,
    features_name: String,
    target_name: String,
}

impl StagingTrainer {
    pub fn new(
        staging_dir: Option<PathBuf>,
        features_name: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Self {
        Self {
            staging_dir,
            features_name: features_name.into(),
            target_name: target_name.into(),
        }
    }

    fn stage(&self, dir: &Path, data: &PreparedData) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dated_path(dir, "training");
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["index", self.features_name.as_str(), self.target_name.as_str()])?;
        for ((index, text), (_, label)) in data.features.iter().zip(data.target.iter()) {
            writer.write_record([index.to_string().as_str(), text.as_str(), label.as_str()])?;
        }
        writer.flush()?;
        Ok(path)
    }
}

impl Trainer for StagingTrainer {
    #[instrument(skip_all, fields(rows = data.features.len()))]
    fn train(&self, data: &PreparedData, setup: &TrainingSetup) -> Result<TrainingArtifact> {
        if data.features.len() != data.target.len() {
            return Err(PrepError::Training(format!(
                "features have {} rows but target has {}",
                data.features.len(),
                data.target.len()
            ))
            .logged());
        }
        if data.features.indices() != data.target.indices() {
            return Err(PrepError::Training(
                "features and target are not aligned by row index".to_string(),
            )
            .logged());
        }

        let class_counts = data.target.value_counts();
        info!(
            "Training set ready: {} rows, {} classes, {} grid combinations, {}x{} folds, seed {}",
            data.features.len(),
            class_counts.len(),
            setup.grid.combinations(),
            setup.outer_folds,
            setup.inner_folds,
            setup.seed
        );

        let staged_to = match &self.staging_dir {
            Some(dir) => {
                let path = self.stage(dir, data)?;
                info!("Training data staged to {}", path.display());
                Some(path)
            }
            None => None,
        };

        Ok(TrainingArtifact {
            rows: data.features.len(),
            class_counts,
            staged_to,
        })
    }
}
