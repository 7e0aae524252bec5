//! The implementation of the regis cache, for persisting the resolved
//! tool and library paths in between processes.
//!
//! The cache is a plain JSON file mapping the logical name of a
//! requirement to the absolute paths it resolved to on a previous run.
//! Entries are consulted before any search or download happens, and a
//! cached path only counts while it still exists on disk: entries whose
//! paths are gone are stale, get reported and are re-resolved from
//! scratch

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use color_eyre::{eyre::Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils;
use crate::utils::constants::error_messages;

/// Standalone utility to load a [`PathCache`] from the file system.
///
/// A missing cache file (first run, or the installation dir was wiped)
/// yields an empty cache. When `clean` is requested, whatever was
/// persisted is discarded and the run starts from an empty cache too
pub fn load(cache_file_path: &Path, clean: bool) -> Result<PathCache> {
    if clean && cache_file_path.exists() {
        std::fs::remove_file(cache_file_path)
            .with_context(|| error_messages::FAILURE_CLEANING_CACHE)?;
    }

    let cache: PathCache = utils::fs::load_and_deserialize(&cache_file_path)
        .with_context(|| error_messages::FAILURE_LOADING_CACHE)?;

    log::debug!(
        "Loaded {} cached entries from {cache_file_path:?}",
        cache.entries.len()
    );

    Ok(cache)
}

/// Standalone utility to persist the cache to the file system, stamping
/// the moment of the run
pub fn save(cache: &mut PathCache, cache_file_path: &Path) -> Result<()> {
    if let Some(parent) = cache_file_path.parent() {
        utils::fs::create_directory(parent)?;
    }

    cache.last_run = Utc::now();
    utils::fs::serialize_object_to_file(cache_file_path, cache)
        .with_context(|| error_messages::FAILURE_SAVING_CACHE)
}

/// Persisted mapping of logical component name to the absolute paths it
/// resolved to. Insertion order is kept, so the file on disk stays in
/// manifest order and diffs nicely
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct PathCache {
    pub last_run: DateTime<Utc>,
    pub entries: IndexMap<String, Vec<PathBuf>>,
}

impl PathCache {
    /// Returns the cached paths for `name` only when every one of them
    /// still exists on disk. A stale entry is removed and reported as a
    /// miss, so the caller re-resolves it
    pub fn valid_entry(&mut self, name: &str) -> Option<&[PathBuf]> {
        let stale_path = self
            .entries
            .get(name)?
            .iter()
            .find(|path| !path.exists())
            .cloned();

        if let Some(stale_path) = stale_path {
            log::error!("Error: path cached, but path doesn't exist: {stale_path:?}");
            self.entries.shift_remove(name);
            return None;
        }

        self.entries.get(name).map(Vec::as_slice)
    }

    /// Replaces the entry for `name` with the freshly resolved paths
    pub fn insert(&mut self, name: &str, paths: Vec<PathBuf>) {
        self.entries.insert(name.to_owned(), paths);
    }

    pub fn entry(&self, name: &str) -> Option<&[PathBuf]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// The single path cached for `name`, for the tools, which always
    /// resolve to exactly one executable
    pub fn single_path(&self, name: &str) -> Option<&Path> {
        self.entries
            .get(name)
            .and_then(|paths| paths.first())
            .map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cache_round_trips_through_the_file_system() -> Result<()> {
        let temp = tempdir()?;
        let cache_file = temp.path().join("tool_paths.json");

        let mut cache = PathCache::default();
        cache.insert("ninja_path", vec![temp.path().join("ninja")]);
        cache.insert(
            "windows_sdk",
            vec![temp.path().join("include"), temp.path().join("lib")],
        );
        save(&mut cache, &cache_file)?;

        let reloaded = load(&cache_file, false)?;
        assert_eq!(reloaded.entries, cache.entries);
        assert_eq!(reloaded.last_run, cache.last_run);

        Ok(())
    }

    #[test]
    fn test_missing_cache_file_yields_an_empty_cache() -> Result<()> {
        let temp = tempdir()?;
        let cache = load(&temp.path().join("nope.json"), false)?;
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn test_clean_discards_the_persisted_entries() -> Result<()> {
        let temp = tempdir()?;
        let cache_file = temp.path().join("tool_paths.json");

        let mut cache = PathCache::default();
        cache.insert("ninja_path", vec![temp.path().join("ninja")]);
        save(&mut cache, &cache_file)?;

        let cleaned = load(&cache_file, true)?;
        assert!(cleaned.is_empty());
        assert!(!cache_file.exists());

        Ok(())
    }

    #[test]
    fn test_stale_entries_are_detected_and_removed() -> Result<()> {
        let temp = tempdir()?;
        crate::utils::fs::create_file(temp.path(), "ninja", b"")?;

        let mut cache = PathCache::default();
        cache.insert("ninja_path", vec![temp.path().join("ninja")]);
        cache.insert("gone_tool", vec![temp.path().join("gone")]);

        // The existing path is a hit, the vanished one is a miss and the
        // entry disappears from the cache altogether
        assert!(cache.valid_entry("ninja_path").is_some());
        assert!(cache.valid_entry("gone_tool").is_none());
        assert!(cache.entry("gone_tool").is_none());

        Ok(())
    }

    #[test]
    fn test_entry_with_one_stale_path_is_a_full_miss() -> Result<()> {
        let temp = tempdir()?;
        let include = temp.path().join("include");
        crate::utils::fs::create_directory(&include)?;

        let mut cache = PathCache::default();
        cache.insert("sdk", vec![include, temp.path().join("lib")]);

        assert!(cache.valid_entry("sdk").is_none());

        Ok(())
    }
}
