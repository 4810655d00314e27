//! Default file locations

use std::path::PathBuf;

const APP_DIR: &str = "segue";

/// `~/.config/segue/config.yaml` (platform config dir)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(APP_DIR)
        .join("config.yaml")
}

/// Analysis cache next to other per-user data
pub fn default_analysis_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(APP_DIR)
        .join("analysis_cache.json")
}
