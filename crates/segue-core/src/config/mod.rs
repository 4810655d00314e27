//! Application configuration
//!
//! One YAML file holds every section; missing sections and fields take their
//! defaults.
//!
//! ```yaml
//! engine:
//!   crossfade_secs: 4.0
//!   master_gain: 0.8
//!   soft_limit: true
//! solver:
//!   max_starts: 5
//!   max_iterations: 1000
//!   harmonic_tolerance: 0.08
//! player:
//!   poll_interval_ms: 100
//!   end_of_tour: play_out
//! audio:
//!   buffer_size: default
//! library_path: /home/dj/music/library.json
//! ```
//!
//! Paths are used as written; `~` is not expanded.

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{default_analysis_cache_path, default_config_path};

use crate::audio::AudioConfig;
use crate::compat::CompatibilityModel;
use crate::engine::EngineConfig;
use crate::player::PlayerConfig;
use crate::tour::SolverConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoDjConfig {
    pub engine: EngineConfig,
    pub solver: SolverConfig,
    pub player: PlayerConfig,
    pub audio: AudioConfig,
    /// Track library JSON used when none is given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,
    /// Overrides [`default_analysis_cache_path`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_cache_path: Option<PathBuf>,
}

impl AutoDjConfig {
    /// Compatibility model with the configured tempo tolerance
    pub fn compatibility_model(&self) -> CompatibilityModel {
        CompatibilityModel::with_tolerance(self.solver.harmonic_tolerance)
    }

    pub fn analysis_cache_path(&self) -> PathBuf {
        self.analysis_cache_path
            .clone()
            .unwrap_or_else(default_analysis_cache_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::EndOfTour;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "engine:\n  crossfade_secs: 8.0\nplayer:\n  end_of_tour: loop\n";
        let config: AutoDjConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.engine.crossfade_secs, 8.0);
        assert_eq!(config.engine.master_gain, EngineConfig::default().master_gain);
        assert_eq!(config.player.end_of_tour, EndOfTour::Loop);
        assert_eq!(config.solver, SolverConfig::default());
        assert!(config.library_path.is_none());
    }

    #[test]
    fn test_library_path_is_taken_verbatim() {
        let yaml = "player:\n  poll_interval_ms: 100\nlibrary_path: /home/dj/music/library.json\n";
        let config: AutoDjConfig = serde_yaml::from_str(yaml).unwrap();
        let path = config.library_path.unwrap();
        assert!(path.is_absolute());
        assert_eq!(path, PathBuf::from("/home/dj/music/library.json"));

        let tilde: AutoDjConfig = serde_yaml::from_str("library_path: ~/library.json\n").unwrap();
        assert_eq!(tilde.library_path, Some(PathBuf::from("~/library.json")));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = AutoDjConfig::default();
        config.solver.max_starts = 3;
        config.library_path = Some(PathBuf::from("/music/library.json"));
        config.analysis_cache_path = Some(dir.path().join("cache.json"));
        save_config(&config, &path).unwrap();

        let loaded: AutoDjConfig = load_config(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.analysis_cache_path(), dir.path().join("cache.json"));
    }

    #[test]
    fn test_compatibility_model_uses_solver_tolerance() {
        let mut config = AutoDjConfig::default();
        config.solver.harmonic_tolerance = 0.04;
        assert_eq!(config.compatibility_model().harmonic_tolerance, 0.04);
    }
}
