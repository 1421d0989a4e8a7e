use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::json;
use tempfile::tempdir;
use textprep::config::Config;
use textprep::ingest::read_csv;
use textprep::storage::{dated_path, InMemoryAuditSink};
use textprep::training::{Trainer, TrainingArtifact, TrainingSetup};
use textprep::{Pipeline, PrepError, PreparedData};

fn write_config(root: &Path, overrides: serde_json::Value) -> Result<Config> {
    let mut doc = json!({
        "input_data": root.join("input"),
        "duplicate_data": root.join("audit/duplicates"),
        "outliers": root.join("audit/outliers"),
        "label_remappings": null,
        "features_name": "f",
        "target_name": "t",
        "stopwords_dir": root.join("nltk_data"),
        "staging_dir": root.join("staging"),
        "remap_target": false
    });
    if let (Some(base), Some(extra)) = (doc.as_object_mut(), overrides.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    let path = root.join("config.json");
    fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
    Ok(Config::load(&path)?)
}

fn write_input(root: &Path, body: &str) -> Result<()> {
    let input = root.join("input");
    fs::create_dir_all(&input)?;
    fs::write(input.join("reviews.csv"), body)?;
    Ok(())
}

const THREE_ROWS: &str = "f,t\nGreat price!!,Good\nGreat price!!,Bad\nterrible,Other\n";

#[test]
fn single_surviving_class_fails_integrity() -> Result<()> {
    let temp_dir = tempdir()?;
    write_input(temp_dir.path(), THREE_ROWS)?;
    let config = write_config(temp_dir.path(), json!({}))?;

    let err = Pipeline::new(config).run().unwrap_err();
    assert!(matches!(err, PrepError::DataIntegrity(_)), "got {err:?}");
    Ok(())
}

#[test]
fn end_to_end_run_aligns_and_stages() -> Result<()> {
    let temp_dir = tempdir()?;
    let root = temp_dir.path();
    write_input(root, &format!("{THREE_ROWS}awful service,Bad\n"))?;
    let config = write_config(root, json!({}))?;

    let artifact = Pipeline::new(config).run()?;
    assert_eq!(artifact.rows, 2);

    let staged = artifact.staged_to.expect("staging dir is configured");
    assert_eq!(staged, dated_path(&root.join("staging"), "training"));
    assert_eq!(
        fs::read_to_string(&staged)?,
        "index,f,t\n0,great price,good\n3,aw servic,bad\n"
    );

    // Both occurrences of the duplicated review are kept for auditing.
    let duplicates = read_csv(&dated_path(&root.join("audit/duplicates"), "duplicates"))?;
    assert_eq!(duplicates.len(), 2);
    assert!(dated_path(&root.join("audit/outliers"), "outliers").exists());

    assert!(root.join("nltk_data/corpora/stopwords/english").is_file());
    Ok(())
}

#[test]
fn prepare_uses_injected_sinks() -> Result<()> {
    let temp_dir = tempdir()?;
    let root = temp_dir.path();
    let config = write_config(root, json!({ "ignored_values": [" other "] }))?;
    let data = textprep::dataset::Dataset::from_rows(
        vec!["f".into(), "t".into()],
        vec![
            vec!["Great price!!".into(), "Good".into()],
            vec!["Great price!!".into(), "Bad".into()],
            vec!["terrible".into(), "OTHER".into()],
            vec!["awful service".into(), "Bad".into()],
        ],
    )?;

    let duplicates = InMemoryAuditSink::new();
    let outliers = InMemoryAuditSink::new();
    let pipeline = Pipeline::new(config)
        .with_audit_sinks(Box::new(duplicates.clone()), Box::new(outliers.clone()));

    let prepared = pipeline.prepare(&data)?;
    assert_eq!(prepared.features.indices(), vec![0, 3]);
    assert_eq!(prepared.target.get(0).map(String::as_str), Some("good"));
    assert_eq!(prepared.target.get(3).map(String::as_str), Some("bad"));
    assert_eq!(prepared.features.get(0).map(String::as_str), Some("great price"));

    let recorded = duplicates.recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].indices(), vec![0, 1]);
    assert_eq!(outliers.recorded().len(), 1);
    assert!(!root.join("audit").exists());
    Ok(())
}

/// Keeps the pair it was handed so the test can inspect it.
#[derive(Clone, Default)]
struct CapturingTrainer {
    seen: Arc<Mutex<Option<PreparedData>>>,
}

impl Trainer for CapturingTrainer {
    fn train(&self, data: &PreparedData, _setup: &TrainingSetup) -> textprep::Result<TrainingArtifact> {
        if let Ok(mut seen) = self.seen.lock() {
            *seen = Some(data.clone());
        }
        Ok(TrainingArtifact {
            rows: data.len(),
            class_counts: data.target.value_counts(),
            staged_to: None,
        })
    }
}

#[test]
fn remapping_runs_before_normalization() -> Result<()> {
    let temp_dir = tempdir()?;
    let root = temp_dir.path();
    fs::write(
        root.join("remap.csv"),
        "value,mapping\nExcellent,Good\nAwful,Bad\nNeutral,Other\n",
    )?;
    write_input(
        root,
        "f,t\nlovely stay,Excellent\nrude staff,Awful\ncold room,Meh\nnice view,Excellent\nso so stay,Neutral\n",
    )?;
    let config = write_config(
        root,
        json!({
            "label_remappings": root.join("remap.csv"),
            "remap_target": true,
            "staging_dir": ""
        }),
    )?;

    let trainer = CapturingTrainer::default();
    let artifact = Pipeline::new(config)
        .with_trainer(Box::new(trainer.clone()))
        .run()?;
    assert_eq!(artifact.rows, 3);
    assert_eq!(artifact.class_counts["good"], 2);
    assert_eq!(artifact.class_counts["bad"], 1);
    assert_eq!(artifact.staged_to, None);

    // "Meh" has no mapping and is dropped; "Neutral" maps onto the ignored "Other".
    let seen = trainer.seen.lock().unwrap().clone().expect("trainer was called");
    assert_eq!(seen.target.indices(), vec![0, 1, 3]);
    assert!(seen.target.values().all(|label| label != "other"));
    assert_eq!(seen.features.get(1).map(String::as_str), Some("rude staff"));
    Ok(())
}

#[test]
fn all_missing_features_is_empty_dataset() -> Result<()> {
    let temp_dir = tempdir()?;
    write_input(temp_dir.path(), "f,t\n,Good\n,Bad\n")?;
    let config = write_config(temp_dir.path(), json!({}))?;

    let err = Pipeline::new(config).run().unwrap_err();
    assert!(matches!(err, PrepError::EmptyDataset(_)), "got {err:?}");
    Ok(())
}

#[test]
fn missing_input_directory_is_source_not_found() -> Result<()> {
    let temp_dir = tempdir()?;
    let config = write_config(temp_dir.path(), json!({}))?;

    let err = Pipeline::new(config).run().unwrap_err();
    assert!(matches!(err, PrepError::SourceNotFound(_)), "got {err:?}");
    Ok(())
}

#[test]
fn strict_audit_policy_fails_on_unwritable_sink() -> Result<()> {
    let temp_dir = tempdir()?;
    let root = temp_dir.path();
    write_input(root, &format!("{THREE_ROWS}awful service,Bad\n"))?;
    // A plain file where the audit directory should be.
    fs::write(root.join("blocked"), "")?;
    let config = write_config(
        root,
        json!({ "duplicate_data": root.join("blocked"), "audit_policy": "strict" }),
    )?;

    let err = Pipeline::new(config.clone()).run().unwrap_err();
    assert!(matches!(err, PrepError::AuditWrite { .. }), "got {err:?}");

    let mut lenient = config;
    lenient.audit_policy = Default::default();
    assert_eq!(Pipeline::new(lenient).run()?.rows, 2);
    Ok(())
}
