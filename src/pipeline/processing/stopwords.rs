use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{PrepError, Result};

const BUNDLED_ENGLISH: &str = include_str!("../../../resources/stopwords/english.txt");

/// Where a missing stopword list is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopwordSource {
    /// The English list shipped with the crate.
    Bundled,
    /// Plain-text list, one word per line.
    Remote(String),
}

/// A set of words removed from text before stemming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    pub fn parse(text: &str) -> Self {
        Self {
            words: text
                .lines()
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_lowercase)
                .collect(),
        }
    }

    pub fn bundled_english() -> Self {
        Self::parse(BUNDLED_ENGLISH)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// On-disk stopword cache laid out as `<cache_dir>/corpora/stopwords/<language>`.
///
/// The list is fetched the first time it is needed and reused afterwards.
#[derive(Debug)]
pub struct StopwordStore {
    cache_dir: PathBuf,
    language: String,
    source: StopwordSource,
    loaded: OnceCell<Arc<StopwordSet>>,
}

impl StopwordStore {
    pub fn new(cache_dir: impl Into<PathBuf>, language: impl Into<String>, source: StopwordSource) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            language: language.into(),
            source,
            loaded: OnceCell::new(),
        }
    }

    pub fn resource_path(&self) -> PathBuf {
        self.cache_dir
            .join("corpora")
            .join("stopwords")
            .join(&self.language)
    }

    /// Make sure the list exists on disk and return its path.
    ///
    /// A partially written file is never visible: the list goes to a temporary
    /// sibling first and is renamed into place.
    pub fn ensure_present(&self) -> Result<PathBuf> {
        let path = self.resource_path();
        if path.is_file() {
            info!("Using existing stopwords at {}", path.display());
            return Ok(path);
        }

        info!("Stopwords not found at {}; fetching", path.display());
        let text = self.fetch()?;
        if StopwordSet::parse(&text).is_empty() {
            return Err(
                PrepError::StopwordResource(format!("empty stopword list for {}", self.language))
                    .logged(),
            );
        }

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let staging = parent.join(format!(".{}.{}.tmp", self.language, std::process::id()));
        fs::write(&staging, text)?;
        fs::rename(&staging, &path)?;
        info!("Stopwords saved to {}", path.display());
        Ok(path)
    }

    /// Stopwords for this store's language, read from disk at most once.
    pub fn load(&self) -> Result<Arc<StopwordSet>> {
        self.loaded
            .get_or_try_init(|| {
                let path = self.ensure_present()?;
                let set = StopwordSet::parse(&fs::read_to_string(&path)?);
                debug!("Loaded {} stopwords from {}", set.len(), path.display());
                Ok::<_, PrepError>(Arc::new(set))
            })
            .map(Arc::clone)
    }

    fn fetch(&self) -> Result<String> {
        match &self.source {
            StopwordSource::Bundled if self.language == "english" => Ok(BUNDLED_ENGLISH.to_string()),
            StopwordSource::Bundled => Err(PrepError::StopwordResource(format!(
                "no bundled stopwords for {}",
                self.language
            ))
            .logged()),
            StopwordSource::Remote(url) => download(url),
        }
    }
}

fn download(url: &str) -> Result<String> {
    let unavailable =
        |e: reqwest::Error| PrepError::StopwordResource(format!("download from {url} failed: {e}")).logged();
    let response = reqwest::blocking::get(url).map_err(unavailable)?;
    let response = response.error_for_status().map_err(unavailable)?;
    response.text().map_err(unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bundled_english_list() {
        let set = StopwordSet::bundled_english();
        assert_eq!(set.len(), 179);
        assert!(set.contains("the"));
        assert!(set.contains("wouldn't"));
        assert!(!set.contains("price"));
    }

    #[test]
    fn ensure_present_writes_cache_once() {
        let dir = tempdir().unwrap();
        let store = StopwordStore::new(dir.path(), "english", StopwordSource::Bundled);

        let path = store.ensure_present().unwrap();
        assert_eq!(path, dir.path().join("corpora/stopwords/english"));
        assert!(path.is_file());

        fs::write(&path, "custom\n").unwrap();
        store.ensure_present().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "custom\n");

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn load_reads_disk_only_once() {
        let dir = tempdir().unwrap();
        let store = StopwordStore::new(dir.path(), "english", StopwordSource::Bundled);

        let first = store.load().unwrap();
        fs::remove_file(store.resource_path()).unwrap();
        let second = store.load().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!store.resource_path().exists());
    }

    #[test]
    fn uses_existing_cache_for_any_language() {
        let dir = tempdir().unwrap();
        let store = StopwordStore::new(dir.path(), "pirate", StopwordSource::Bundled);
        let path = store.resource_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "Arr\nye\n\n").unwrap();

        let set = store.load().unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("arr"));
    }

    #[test]
    fn unknown_bundled_language_fails() {
        let dir = tempdir().unwrap();
        let store = StopwordStore::new(dir.path(), "klingon", StopwordSource::Bundled);
        assert!(matches!(
            store.ensure_present(),
            Err(PrepError::StopwordResource(_))
        ));
    }
}
