//! Content cache for generated wikis
//!
//! One human-readable JSON file per (repository, model) pair. Writes go to a
//! temporary file in the same directory which is then renamed over the
//! target, so a reader sees either the old entry or the new one.

use crate::error::CacheError;
use crate::wiki::markup::{parse_recovering, parse_strict, to_structure_document};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Identifies a cached wiki
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Repository name (without owner)
    pub repository: String,
    pub model_id: String,
}

impl CacheKey {
    pub fn new(repository: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            model_id: model_id.into(),
        }
    }

    /// `{repository}__{model_id}` with path separators in the model id replaced
    pub fn stem(&self) -> String {
        format!("{}__{}", self.repository, safe_model_id(&self.model_id))
    }

    /// `{stem}.json`
    pub fn file_name(&self) -> String {
        format!("{}.json", self.stem())
    }
}

/// Model id usable as a single path component
pub fn safe_model_id(model_id: &str) -> String {
    model_id.replace('/', "_")
}

/// Everything produced for one repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub file_tree: String,
    pub readme: String,
    /// Repaired structure markup
    pub xml: String,
    /// Page title to markdown body
    pub pages: BTreeMap<String, String>,
}

impl CacheEntry {
    /// Pages as `(title, body)` in the order the structure lists them
    ///
    /// Pages the structure does not mention follow in title order, as does
    /// everything when `xml` cannot be parsed.
    pub fn ordered_pages(&self) -> Vec<(&str, &str)> {
        let mut ordered = Vec::with_capacity(self.pages.len());
        let mut seen = HashSet::new();

        let root = parse_strict(&self.xml)
            .ok()
            .or_else(|| parse_recovering(&self.xml));
        if let Some(root) = root {
            for page in to_structure_document(&root).pages() {
                if let Some((title, body)) = self.pages.get_key_value(&page.title)
                    && seen.insert(title.as_str())
                {
                    ordered.push((title.as_str(), body.as_str()));
                }
            }
        }

        for (title, body) in &self.pages {
            if seen.insert(title.as_str()) {
                ordered.push((title.as_str(), body.as_str()));
            }
        }
        ordered
    }
}

/// Directory of cached wikis
#[derive(Debug, Clone)]
pub struct WikiCache {
    dir: PathBuf,
}

impl WikiCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the file for `key`
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Load the entry for `key`, or `None` if nothing is cached
    pub fn load(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.path_for(key);
        if !path.exists() {
            tracing::debug!("No cached wiki at {:?}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| CacheError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let entry: CacheEntry =
            serde_json::from_str(&content).map_err(|e| CacheError::ParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            "Loaded cached wiki for {} ({} pages)",
            key.repository,
            entry.pages.len()
        );
        Ok(Some(entry))
    }

    /// Atomically replace the entry for `key`
    pub fn save(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| CacheError::DirectoryCreationFailed(e.to_string()))?;

        let path = self.path_for(key);
        let save_failed = |reason: String| CacheError::SaveFailed {
            path: path.display().to_string(),
            reason,
        };

        let content =
            serde_json::to_string_pretty(entry).map_err(|e| save_failed(e.to_string()))?;

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|e| save_failed(e.to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| save_failed(e.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| save_failed(e.to_string()))?;
        temp.persist(&path)
            .map_err(|e| save_failed(e.error.to_string()))?;

        tracing::debug!("Saved cached wiki to {:?}", path);
        Ok(())
    }

    /// Delete the entry for `key`; returns whether one existed
    pub fn remove(&self, key: &CacheKey) -> Result<bool, CacheError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Removed cached wiki {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::SaveFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
