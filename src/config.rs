use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::constants;
use crate::error::{PrepError, Result};
use crate::pipeline::processing::feature_filter::AuditPolicy;
use crate::pipeline::processing::target::UnmappedLabelPolicy;

const PLACEHOLDER_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Settings for one pipeline run, loaded once and never modified afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the input CSV file.
    pub input_data: PathBuf,
    /// Directory for the dated duplicate audit file.
    pub duplicate_data: PathBuf,
    /// Directory for the dated outlier audit file.
    pub outliers: PathBuf,
    /// Two-column `value,mapping` CSV; absent or empty when not configured.
    #[serde(default, deserialize_with = "optional_path")]
    pub label_remappings: Option<PathBuf>,
    pub features_name: String,
    pub target_name: String,

    #[serde(default = "default_stopwords_dir")]
    pub stopwords_dir: PathBuf,
    #[serde(default)]
    pub stopwords_url: Option<String>,
    /// Where the staging trainer writes the aligned pair, if anywhere.
    #[serde(default, deserialize_with = "optional_path")]
    pub staging_dir: Option<PathBuf>,

    #[serde(default = "default_imbalance_threshold")]
    pub imbalance_threshold: f64,
    #[serde(default = "default_ignored_values")]
    pub ignored_values: Vec<String>,
    #[serde(default = "default_true")]
    pub remap_target: bool,
    #[serde(default = "default_true")]
    pub save_duplicates: bool,
    #[serde(default = "default_true")]
    pub remove_outliers: bool,
    #[serde(default)]
    pub audit_policy: AuditPolicy,
    #[serde(default)]
    pub unmapped_labels: UnmappedLabelPolicy,
}

fn default_stopwords_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_STOPWORDS_DIR)
}

fn default_imbalance_threshold() -> f64 {
    constants::DEFAULT_IMBALANCE_THRESHOLD
}

fn default_ignored_values() -> Vec<String> {
    vec![constants::DEFAULT_IGNORED_VALUE.to_string()]
}

fn default_true() -> bool {
    true
}

fn optional_path<'de, D>(deserializer: D) -> std::result::Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from))
}

impl Config {
    /// Load the configuration document at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PrepError::Configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
            .logged()
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| PrepError::Configuration(format!("Invalid config document: {e}")).logged())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.imbalance_threshold) {
            return Err(PrepError::Configuration(format!(
                "imbalance_threshold must be within [0, 1], got {}",
                self.imbalance_threshold
            ))
            .logged());
        }
        if self.features_name.trim().is_empty() {
            return Err(PrepError::Configuration("features_name is blank".to_string()).logged());
        }
        Ok(())
    }
}

/// Render `template_path` into `output_path`, replacing `${VAR}` placeholders in
/// every string value with the environment variable of that name.
///
/// Placeholders whose variable is unset are left as written.
pub fn update_config(template_path: &Path, output_path: &Path) -> Result<()> {
    let template = fs::read_to_string(template_path).map_err(|e| {
        PrepError::Configuration(format!(
            "Failed to read config template '{}': {}",
            template_path.display(),
            e
        ))
        .logged()
    })?;
    let document: Value = serde_json::from_str(&template)?;
    let rendered = substitute_env(document)?;

    if output_path.exists() {
        match fs::remove_file(output_path) {
            Ok(()) => info!("Existing {} deleted", output_path.display()),
            Err(e) => warn!(
                "Failed to delete existing {}: {}. Check environment vars are correct.",
                output_path.display(),
                e
            ),
        }
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(&rendered)?;
    fs::write(output_path, body).map_err(|e| {
        PrepError::Configuration(format!(
            "Error saving to {}: {}",
            output_path.display(),
            e
        ))
        .logged()
    })?;
    info!("Configuration updated and saved to {}", output_path.display());
    Ok(())
}

/// Replace `${VAR}` placeholders in all string values of a JSON document.
pub fn substitute_env(value: Value) -> Result<Value> {
    let placeholder = Regex::new(PLACEHOLDER_PATTERN)?;
    Ok(substitute_with(value, &placeholder))
}

fn substitute_with(value: Value, placeholder: &Regex) -> Value {
    match value {
        Value::String(s) => Value::String(expand_placeholders(&s, placeholder)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| substitute_with(v, placeholder))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, substitute_with(v, placeholder)))
                .collect(),
        ),
        other => other,
    }
}

fn expand_placeholders(text: &str, placeholder: &Regex) -> String {
    placeholder
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            match env::var(name) {
                Ok(value) => value,
                Err(_) => {
                    warn!("Environment variable {} is not set; keeping placeholder", name);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}
