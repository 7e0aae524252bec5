//! Resolution of the declared tool/library requirements against the
//! persisted paths cache, the `PATH` environment entries and the regis
//! install directory.
//!
//! Resolution is a two phase affair. [`check_installed`] is the
//! pre-download pass: cache first (existence verified), then a search
//! over the allowed locations. Whatever is still missing afterwards gets
//! downloaded by the fetcher, and [`install`] re-resolves it below the
//! install directory and records the result back into the cache

use crate::cache::PathCache;
use crate::domain::requirement::{Requirement, SearchDirs};

/// Outcome of a resolution pass over a set of requirements: the ones
/// that couldn't be resolved, in manifest order. Every resolved one is
/// already recorded in the [`PathCache`] handed to the pass
#[derive(Debug)]
pub struct Resolution<'a, R: Requirement> {
    pub missing: Vec<&'a R>,
}

impl<'a, R: Requirement> Resolution<'a, R> {
    pub fn all_resolved(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks which of the `requirements` are already present, either
/// through a still-valid cache entry or by searching `search_dirs`.
///
/// Freshly found paths are recorded into `cache`; stale cache entries
/// are dropped and re-resolved as if never seen. Requirements that are
/// only partially found (a library with some of its directories present)
/// count as missing: the installer re-resolves all their targets after
/// the download, rather than patching up a half-filled entry
pub fn check_installed<'a, R: Requirement>(
    requirements: &'a [R],
    cache: &mut PathCache,
    search_dirs: &SearchDirs,
) -> Resolution<'a, R> {
    let mut missing = Vec::new();

    for requirement in requirements {
        let name = requirement.config_name();

        if let Some(cached_paths) = cache.valid_entry(name) {
            if requirement.is_satisfied_by(cached_paths) {
                for path in cached_paths {
                    log::info!("{name} found at {path:?}");
                }
                continue;
            }
            // Cached, existing, but no longer covering the requirement
            // (the manifest grew a new candidate path). Re-resolve
            log::warn!("cached entry for {name} no longer satisfies the manifest");
        }

        let outcome = requirement.locate(search_dirs);
        if outcome.fully_resolved() {
            for path in &outcome.found {
                log::info!("{name} found at {path:?}");
            }
            cache.insert(name, outcome.found);
        } else {
            for target in &outcome.missing {
                log::warn!("\t-{target}");
            }
            missing.push(requirement);
        }
    }

    Resolution { missing }
}

/// Re-resolves the requirements that were missing before the download,
/// this time with a recursive walk below the install directory, and
/// records the found paths into the cache.
///
/// A requirement still missing at this point means the archive didn't
/// contain what the manifest promised; that is logged as an error per
/// item, and the aggregate result is only `true` when every single one
/// resolved
pub fn install<R: Requirement>(
    missing: &[&R],
    cache: &mut PathCache,
    install_dir: &std::path::Path,
) -> bool {
    let mut all_installed = true;

    for requirement in missing {
        let name = requirement.config_name();
        log::info!("looking for {name} in {install_dir:?}");

        let outcome = requirement.locate_installed(install_dir);
        if outcome.fully_resolved() {
            for path in &outcome.found {
                log::info!("{name} found at {path:?}");
            }
            cache.insert(name, outcome.found);
        } else {
            log::error!("failed to install {name}");
            for target in &outcome.missing {
                log::error!("\t-{target}");
            }
            all_installed = false;
        }
    }

    all_installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file::requirements::{LibRequirement, ToolRequirement};
    use crate::utils;
    use color_eyre::Result;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn tool(stem: &'static str, subdir: &'static str) -> ToolRequirement<'static> {
        ToolRequirement {
            config_name: stem,
            stem,
            path: subdir,
            archive_name: "Tools",
            num_zip_files: 1,
            extension: Some(""),
        }
    }

    #[test]
    fn test_cache_hit_skips_the_search() -> Result<()> {
        let temp = tempdir()?;
        utils::fs::create_file(temp.path(), "ninja", b"")?;

        let requirements = [tool("ninja", "ninja")];
        let mut cache = PathCache::default();
        cache.insert("ninja", vec![temp.path().join("ninja")]);

        // Search dirs that can't possibly resolve anything: a hit here
        // proves the cache answered
        let search_dirs = SearchDirs {
            env_paths: vec![],
            install_dir: PathBuf::from("/nowhere"),
        };

        let resolution = check_installed(&requirements, &mut cache, &search_dirs);
        assert!(resolution.all_resolved());

        Ok(())
    }

    #[test]
    fn test_stale_cache_entry_is_re_resolved_from_disk() -> Result<()> {
        let temp = tempdir()?;
        let install_dir = temp.path().join("tools");
        let ninja_dir = install_dir.join("ninja");
        utils::fs::create_directory(&ninja_dir)?;
        utils::fs::create_file(&ninja_dir, "ninja", b"")?;

        let requirements = [tool("ninja", "ninja")];
        let mut cache = PathCache::default();
        // Points at a path that no longer exists: stale
        cache.insert("ninja", vec![temp.path().join("old").join("ninja")]);

        let search_dirs = SearchDirs {
            env_paths: vec![],
            install_dir,
        };

        let resolution = check_installed(&requirements, &mut cache, &search_dirs);
        assert!(resolution.all_resolved());
        assert_eq!(
            cache.entry("ninja"),
            Some(vec![ninja_dir.join("ninja")].as_slice())
        );

        Ok(())
    }

    #[test]
    fn test_unresolved_requirements_are_reported_missing() -> Result<()> {
        let temp = tempdir()?;
        let requirements = [tool("ninja", "ninja"), tool("sharpmake", "sharpmake")];
        let mut cache = PathCache::default();

        let search_dirs = SearchDirs {
            env_paths: vec![],
            install_dir: temp.path().to_path_buf(),
        };

        let resolution = check_installed(&requirements, &mut cache, &search_dirs);
        assert_eq!(resolution.missing.len(), 2);
        assert!(cache.is_empty());

        Ok(())
    }

    #[test]
    fn test_partially_found_lib_counts_as_missing() -> Result<()> {
        let temp = tempdir()?;
        utils::fs::create_directory(&temp.path().join("sdk").join("include"))?;

        let requirements = [LibRequirement {
            config_name: "sdk",
            paths: vec!["sdk/include", "sdk/lib"],
            archive_name: "Sdk",
            num_zip_files: 1,
        }];
        let mut cache = PathCache::default();

        let search_dirs = SearchDirs {
            env_paths: vec![],
            install_dir: temp.path().to_path_buf(),
        };

        let resolution = check_installed(&requirements, &mut cache, &search_dirs);
        assert_eq!(resolution.missing.len(), 1);
        // Half-resolved requirements never pollute the cache
        assert!(cache.entry("sdk").is_none());

        Ok(())
    }

    #[test]
    fn test_install_records_found_paths_and_flags_failures() -> Result<()> {
        let temp = tempdir()?;
        let install_dir = temp.path().to_path_buf();
        let ninja_dir = install_dir.join("ninja").join("bin");
        utils::fs::create_directory(&ninja_dir)?;
        utils::fs::create_file(&ninja_dir, "ninja", b"")?;

        let present = tool("ninja", "ninja");
        let absent = tool("sharpmake", "sharpmake");
        let mut cache = PathCache::default();

        // The recursive install walk finds the tool even nested deeper
        // than its declared subdir
        assert!(!install(&[&present, &absent], &mut cache, &install_dir));
        assert_eq!(
            cache.entry("ninja"),
            Some(vec![ninja_dir.join("ninja")].as_slice())
        );
        assert!(cache.entry("sharpmake").is_none());

        Ok(())
    }
}
