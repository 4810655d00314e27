//! Sidecar-file analyzer
//!
//! Reads tempo, key and energy from a `<name>.json` file written next to each
//! WAV by an external detector, and measures the duration from the WAV header.
//!
//! ```json
//! { "bpm": 124.0, "key": "8A", "energy": 0.21 }
//! ```

use super::{TrackAnalyzer, TrackRecord};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Sidecar {
    bpm: f64,
    key: String,
    #[serde(default)]
    energy: f64,
    name: Option<String>,
}

/// [`TrackAnalyzer`] backed by JSON sidecar files
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarAnalyzer;

impl TrackAnalyzer for SidecarAnalyzer {
    fn analyze(&self, path: &Path) -> Result<TrackRecord> {
        let sidecar_path = path.with_extension("json");
        let contents = std::fs::read_to_string(&sidecar_path)
            .with_context(|| format!("No analysis sidecar at {:?}", sidecar_path))?;
        let sidecar: Sidecar = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid analysis sidecar {:?}", sidecar_path))?;

        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV {:?}", path))?;
        let spec = reader.spec();
        let duration = reader.duration() as f64 / spec.sample_rate.max(1) as f64;

        let name = sidecar.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Ok(TrackRecord::new(
            path.to_string_lossy(),
            name,
            sidecar.bpm,
            sidecar.key,
            sidecar.energy,
            duration,
        ))
    }
}
