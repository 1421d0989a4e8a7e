use std::sync::Arc;

use porter_stemmer::stem;
use regex::Regex;
use tracing::info;

use crate::dataset::{RowIndex, Series, TextColumn};
use crate::error::{PrepError, Result};
use crate::pipeline::processing::stopwords::StopwordSet;
use crate::pipeline::processing::validators::check_type;
use crate::types::{CellValue, ValueKind};

/// Punctuation and every run of digits.
const NOISE_PATTERN: &str = r"[^\w\s]|\d+";

/// Turns raw feature text into lowercase, stopword-free, stemmed tokens.
pub struct TextNormalizer {
    stopwords: Arc<StopwordSet>,
    noise: Regex,
}

impl TextNormalizer {
    pub fn new(stopwords: Arc<StopwordSet>) -> Result<Self> {
        Ok(Self {
            stopwords,
            noise: Regex::new(NOISE_PATTERN)?,
        })
    }

    /// Lowercase and strip punctuation and digits.
    pub fn basic_clean(&self, text: &str) -> String {
        self.noise.replace_all(&text.to_lowercase(), "").into_owned()
    }

    /// `basic_clean`, then drop stopwords and reduce each token with the Porter stemmer.
    pub fn clean_text(&self, text: &str) -> String {
        let cleaned = self.basic_clean(text);
        cleaned
            .split_whitespace()
            .filter(|token| !self.stopwords.contains(token))
            .map(stem)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Clean the feature values for exactly `ids`, in that order.
    pub fn clean(&self, features: &Series<CellValue>, ids: &[RowIndex]) -> Result<TextColumn> {
        let selected = features.restrict(ids).map_err(PrepError::logged)?;

        let mut entries = Vec::with_capacity(selected.len());
        for (index, value) in selected.iter() {
            check_type(value, ValueKind::String, selected.name())?;
            let text = value.as_str().unwrap_or_default();
            entries.push((*index, self.clean_text(text)));
        }

        info!("Cleaned {} texts from {}", entries.len(), selected.name());
        crate::metrics::texts_cleaned(entries.len());
        Ok(Series::from_entries(selected.name(), entries))
    }
}
