//! Analysis result cache
//!
//! Analysis is slow, so results are memoized under a key made from the file
//! name and its modification time. Editing a file invalidates its entry.

use super::TrackRecord;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Cache key: `<file name>_<modification time in seconds>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a file on disk
    pub fn for_path(path: &Path) -> std::io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        let mtime = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self::from_parts(&name, mtime))
    }

    pub fn from_parts(name: &str, mtime_secs: f64) -> Self {
        Self(format!("{}_{}", name, mtime_secs))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Load/store contract for memoized analysis results
pub trait AnalysisCache {
    /// Cached record for `key`, if any
    fn load(&self, key: &CacheKey) -> Option<TrackRecord>;

    /// Remember `record` under `key`
    fn store(&mut self, key: CacheKey, record: TrackRecord);

    /// Persist pending entries
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Process-local cache, used in tests and when no cache file is configured
#[derive(Debug, Default)]
pub struct MemoryAnalysisCache {
    entries: HashMap<CacheKey, TrackRecord>,
}

impl MemoryAnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AnalysisCache for MemoryAnalysisCache {
    fn load(&self, key: &CacheKey) -> Option<TrackRecord> {
        self.entries.get(key).cloned()
    }

    fn store(&mut self, key: CacheKey, record: TrackRecord) {
        self.entries.insert(key, record);
    }
}

/// Cache persisted as a JSON object mapping keys to records
#[derive(Debug)]
pub struct JsonAnalysisCache {
    path: PathBuf,
    entries: HashMap<String, TrackRecord>,
    dirty: bool,
}

impl JsonAnalysisCache {
    /// Open the cache file
    ///
    /// A missing file gives an empty cache. An unreadable or corrupt file is
    /// logged and also gives an empty cache, which is rewritten on flush.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = if path.exists() {
            match Self::read_entries(&path) {
                Ok(entries) => {
                    log::info!("Loaded {} cached analyses from {:?}", entries.len(), path);
                    entries
                }
                Err(e) => {
                    log::warn!("Analysis cache unusable, starting empty: {:#}", e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Self {
            path,
            entries,
            dirty: false,
        }
    }

    fn read_entries(path: &Path) -> Result<HashMap<String, TrackRecord>> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis cache {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse analysis cache {:?}", path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AnalysisCache for JsonAnalysisCache {
    fn load(&self, key: &CacheKey) -> Option<TrackRecord> {
        self.entries.get(key.as_str()).cloned()
    }

    fn store(&mut self, key: CacheKey, record: TrackRecord) {
        self.entries.insert(key.0, record);
        self.dirty = true;
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize analysis cache")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write analysis cache {:?}", self.path))?;
        self.dirty = false;
        log::debug!("Flushed {} cache entries to {:?}", self.entries.len(), self.path);
        Ok(())
    }
}
