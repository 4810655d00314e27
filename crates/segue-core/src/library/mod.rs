//! Track library
//!
//! A library is an ordered list of [`TrackRecord`]s produced by an external
//! analyzer. Records are immutable once analyzed and are stored as a JSON array.

mod analyzer;
mod cache;
mod sidecar;

pub use analyzer::{analyze_library, scan_audio_files, TrackAnalyzer};
pub use cache::{AnalysisCache, CacheKey, JsonAnalysisCache, MemoryAnalysisCache};
pub use sidecar::SidecarAnalyzer;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Analysis result for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Opaque identity, usually the audio file path
    #[serde(rename = "path")]
    pub id: String,
    /// Display name
    pub name: String,
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Camelot code such as `8A` (conventional names are accepted too)
    pub key: String,
    /// Loudness proxy (RMS), non-negative
    pub energy: f64,
    /// Length in seconds
    pub duration: f64,
}

impl TrackRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        bpm: f64,
        key: impl Into<String>,
        energy: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bpm,
            key: key.into(),
            energy,
            duration,
        }
    }

    /// Whether the record has a usable tempo and a parseable key
    pub fn is_well_formed(&self) -> bool {
        self.bpm.is_finite()
            && self.bpm > 0.0
            && crate::music::CamelotKey::parse(&self.key).is_some()
    }
}

/// Load a library from a JSON array of track records
///
/// Records with an unusable tempo or key are kept (they score as unmixable)
/// but logged.
pub fn load_library(path: &Path) -> Result<Vec<TrackRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read library file {:?}", path))?;
    let tracks: Vec<TrackRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse library file {:?}", path))?;

    for track in tracks.iter().filter(|t| !t.is_well_formed()) {
        log::warn!(
            "Track '{}' has tempo {} and key '{}'; it will be treated as unmixable",
            track.name,
            track.bpm,
            track.key
        );
    }

    log::info!("Loaded {} tracks from {:?}", tracks.len(), path);
    Ok(tracks)
}

/// Save a library as a pretty-printed JSON array
pub fn save_library(tracks: &[TrackRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }
    let json = serde_json::to_string_pretty(tracks).context("Failed to serialize library")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write library file {:?}", path))?;
    log::info!("Saved {} tracks to {:?}", tracks.len(), path);
    Ok(())
}
