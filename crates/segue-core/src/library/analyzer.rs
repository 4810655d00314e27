//! Library analysis driver
//!
//! Tempo/key/energy detection is provided by an external [`TrackAnalyzer`];
//! this module only walks the files, consults the cache and skips failures.

use super::{AnalysisCache, CacheKey, TrackRecord};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Produces a [`TrackRecord`] for one audio file
pub trait TrackAnalyzer {
    fn analyze(&self, path: &Path) -> Result<TrackRecord>;
}

/// Analyze every path, in order, memoizing results in `cache`
///
/// Paths that cannot be analyzed are logged and skipped. The cache is flushed
/// once at the end; a failed flush is logged and does not discard results.
pub fn analyze_library(
    paths: &[PathBuf],
    analyzer: &dyn TrackAnalyzer,
    cache: &mut dyn AnalysisCache,
) -> Vec<TrackRecord> {
    let mut tracks = Vec::with_capacity(paths.len());
    let mut cache_hits = 0usize;

    for path in paths {
        let key = match CacheKey::for_path(path) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Skipping {:?}: {}", path, e);
                continue;
            }
        };

        if let Some(mut record) = cache.load(&key) {
            cache_hits += 1;
            record.id = path.to_string_lossy().into_owned();
            tracks.push(record);
            continue;
        }

        match analyzer.analyze(path) {
            Ok(record) => {
                log::info!(
                    "Analyzed '{}': {:.1} BPM, key {}, energy {:.3}",
                    record.name,
                    record.bpm,
                    record.key,
                    record.energy
                );
                cache.store(key, record.clone());
                tracks.push(record);
            }
            Err(e) => log::warn!("Failed to analyze {:?}: {:#}", path, e),
        }
    }

    if let Err(e) = cache.flush() {
        log::warn!("Failed to save analysis cache: {:#}", e);
    }

    log::info!(
        "Analyzed {} of {} files ({} from cache)",
        tracks.len(),
        paths.len(),
        cache_hits
    );
    tracks
}

/// List the WAV files directly inside `dir`, sorted by name
///
/// Hidden files are ignored.
pub fn scan_audio_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("Failed to read directory {:?}", dir))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let hidden = path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true);
            let wav = path
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("wav"))
                .unwrap_or(false);
            wav && !hidden
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryAnalysisCache;
    use std::cell::Cell;
    use tempfile::TempDir;

    /// Analyzer that derives everything from the file name and counts calls
    struct NameAnalyzer {
        calls: Cell<usize>,
    }

    impl TrackAnalyzer for NameAnalyzer {
        fn analyze(&self, path: &Path) -> Result<TrackRecord> {
            self.calls.set(self.calls.get() + 1);
            let name = path.file_stem().unwrap().to_string_lossy().into_owned();
            if name.starts_with("broken") {
                anyhow::bail!("cannot decode");
            }
            Ok(TrackRecord::new(
                path.to_string_lossy(),
                name,
                120.0,
                "8A",
                0.2,
                60.0,
            ))
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"RIFF").unwrap();
        path
    }

    #[test]
    fn test_analyze_library_skips_failures_and_uses_cache() {
        let temp = TempDir::new().unwrap();
        let paths = vec![
            touch(temp.path(), "one.wav"),
            touch(temp.path(), "broken.wav"),
            temp.path().join("missing.wav"),
            touch(temp.path(), "two.wav"),
        ];
        let analyzer = NameAnalyzer { calls: Cell::new(0) };
        let mut cache = MemoryAnalysisCache::new();

        let first = analyze_library(&paths, &analyzer, &mut cache);
        let names: Vec<_> = first.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(analyzer.calls.get(), 3);
        assert_eq!(cache.len(), 2);

        let second = analyze_library(&paths, &analyzer, &mut cache);
        assert_eq!(second, first);
        // Only the broken file is retried
        assert_eq!(analyzer.calls.get(), 4);
    }

    #[test]
    fn test_cache_hit_takes_current_path_as_id() {
        let temp = TempDir::new().unwrap();
        let path = touch(temp.path(), "moved.wav");
        let mut cache = MemoryAnalysisCache::new();
        let stale = TrackRecord::new("/old/crate/moved.wav", "moved", 124.0, "5A", 0.3, 90.0);
        cache.store(CacheKey::for_path(&path).unwrap(), stale);
        let analyzer = NameAnalyzer { calls: Cell::new(0) };

        let tracks = analyze_library(&[path.clone()], &analyzer, &mut cache);

        assert_eq!(analyzer.calls.get(), 0);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, path.to_string_lossy());
        assert_eq!(tracks[0].bpm, 124.0);
    }

    #[test]
    fn test_scan_audio_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "b.wav");
        touch(temp.path(), "a.WAV");
        touch(temp.path(), ".hidden.wav");
        touch(temp.path(), "notes.txt");
        std::fs::create_dir(temp.path().join("dir.wav")).unwrap();

        let files = scan_audio_files(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.WAV", "b.wav"]);
    }
}
