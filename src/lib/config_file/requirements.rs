use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::requirement::{LocateOutcome, Requirement, SearchDirs};
use crate::utils;
use crate::utils::constants::EXECUTABLE_EXTENSION;

/// One entry of `required_tools.json`: an external executable the engine
/// pipeline shells out to (ninja, the project generator, the clang
/// tooling binaries...)
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ToolRequirement<'a> {
    /// Logical name the tool is cached and looked up under
    pub config_name: &'a str,
    /// Filename of the executable, without extension
    pub stem: &'a str,
    /// Subdirectory of the tools install dir where the extracted archive
    /// places this tool
    pub path: &'a str,
    pub archive_name: &'a str,
    pub num_zip_files: usize,
    /// Explicit executable extension. When absent, the platform default
    /// applies: `.exe` on Windows, none elsewhere
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<&'a str>,
}

impl<'a> ToolRequirement<'a> {
    /// The filename to search for, stem plus the effective extension
    pub fn filename(&self) -> String {
        format!(
            "{}{}",
            self.stem,
            self.extension.unwrap_or(EXECUTABLE_EXTENSION)
        )
    }
}

impl<'a> Requirement for ToolRequirement<'a> {
    fn config_name(&self) -> &str {
        self.config_name
    }

    fn archive_name(&self) -> &str {
        self.archive_name
    }

    fn num_archive_parts(&self) -> usize {
        self.num_zip_files
    }

    fn is_satisfied_by(&self, cached_paths: &[PathBuf]) -> bool {
        // A tool resolves to exactly one executable
        matches!(cached_paths, [path] if path.is_file())
    }

    fn locate(&self, search_dirs: &SearchDirs) -> LocateOutcome {
        let filename = self.filename();

        let mut candidates = search_dirs.env_paths.clone();
        candidates.push(search_dirs.install_dir.join(self.path));

        match utils::fs::find_file_in_paths(&filename, &candidates) {
            Some(abs_path) => LocateOutcome {
                found: vec![abs_path],
                missing: vec![],
            },
            None => LocateOutcome {
                found: vec![],
                missing: vec![filename],
            },
        }
    }

    fn locate_installed(&self, install_dir: &Path) -> LocateOutcome {
        let filename = self.filename();

        match utils::fs::find_file_in_dir(&install_dir.join(self.path), &filename) {
            Some(abs_path) => LocateOutcome {
                found: vec![abs_path],
                missing: vec![],
            },
            None => LocateOutcome {
                found: vec![],
                missing: vec![filename],
            },
        }
    }
}

/// One entry of `required_libs.json`: an external library distribution
/// (SDK, standard library...) that resolves to a set of directories, one
/// per candidate relative path. The requirement is only satisfied when
/// every candidate resolved
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct LibRequirement<'a> {
    pub config_name: &'a str,
    /// Relative directories that must all exist below one of the search
    /// locations
    pub paths: Vec<&'a str>,
    pub archive_name: &'a str,
    pub num_zip_files: usize,
}

impl<'a> LibRequirement<'a> {
    fn locate_in(&self, base_dirs: &[PathBuf]) -> LocateOutcome {
        let mut outcome = LocateOutcome::default();

        for relative in &self.paths {
            match utils::fs::find_directory_in_paths(relative, base_dirs) {
                Some(abs_path) => outcome.found.push(abs_path),
                None => outcome.missing.push((*relative).to_owned()),
            }
        }

        outcome
    }
}

impl<'a> Requirement for LibRequirement<'a> {
    fn config_name(&self) -> &str {
        self.config_name
    }

    fn archive_name(&self) -> &str {
        self.archive_name
    }

    fn num_archive_parts(&self) -> usize {
        self.num_zip_files
    }

    fn is_satisfied_by(&self, cached_paths: &[PathBuf]) -> bool {
        // Every candidate relative path must be covered by a cached
        // directory that still exists on disk
        self.paths.iter().all(|relative| {
            cached_paths
                .iter()
                .any(|cached| cached.ends_with(relative) && cached.is_dir())
        })
    }

    fn locate(&self, search_dirs: &SearchDirs) -> LocateOutcome {
        let mut candidates = search_dirs.env_paths.clone();
        candidates.push(search_dirs.install_dir.clone());
        self.locate_in(&candidates)
    }

    fn locate_installed(&self, install_dir: &Path) -> LocateOutcome {
        self.locate_in(&[install_dir.to_path_buf()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::Result;
    use tempfile::tempdir;

    fn ninja_requirement() -> ToolRequirement<'static> {
        ToolRequirement {
            config_name: "ninja_path",
            stem: "ninja",
            path: "ninja",
            archive_name: "Ninja",
            num_zip_files: 1,
            extension: Some(""),
        }
    }

    #[test]
    fn test_tool_locate_hits_the_install_subdir() -> Result<()> {
        let temp = tempdir()?;
        let tool_dir = temp.path().join("ninja");
        utils::fs::create_directory(&tool_dir)?;
        utils::fs::create_file(&tool_dir, "ninja", b"")?;

        let search_dirs = SearchDirs {
            env_paths: vec![],
            install_dir: temp.path().to_path_buf(),
        };

        let outcome = ninja_requirement().locate(&search_dirs);
        assert!(outcome.fully_resolved());
        assert_eq!(outcome.found, vec![tool_dir.join("ninja")]);

        Ok(())
    }

    #[test]
    fn test_tool_locate_reports_the_missing_filename() {
        let search_dirs = SearchDirs {
            env_paths: vec![],
            install_dir: PathBuf::from("/definitely/not/there"),
        };

        let outcome = ninja_requirement().locate(&search_dirs);
        assert!(!outcome.fully_resolved());
        assert_eq!(outcome.missing, vec!["ninja".to_owned()]);
    }

    #[test]
    fn test_tool_cached_entry_requires_existing_file() -> Result<()> {
        let temp = tempdir()?;
        utils::fs::create_file(temp.path(), "ninja", b"")?;
        let tool = ninja_requirement();

        assert!(tool.is_satisfied_by(&[temp.path().join("ninja")]));
        assert!(!tool.is_satisfied_by(&[temp.path().join("gone")]));
        assert!(!tool.is_satisfied_by(&[]));

        Ok(())
    }

    #[test]
    fn test_lib_requires_every_candidate_path() -> Result<()> {
        let temp = tempdir()?;
        let include = temp.path().join("sdk").join("include");
        utils::fs::create_directory(&include)?;

        let lib = LibRequirement {
            config_name: "sdk",
            paths: vec!["sdk/include", "sdk/lib"],
            archive_name: "Sdk",
            num_zip_files: 1,
        };

        let outcome = lib.locate_installed(temp.path());
        assert_eq!(outcome.found, vec![include.clone()]);
        assert_eq!(outcome.missing, vec!["sdk/lib".to_owned()]);

        // Partial coverage is not enough for a cache hit either
        assert!(!lib.is_satisfied_by(&[include.clone()]));

        utils::fs::create_directory(&temp.path().join("sdk").join("lib"))?;
        assert!(lib.is_satisfied_by(&[include, temp.path().join("sdk").join("lib")]));

        Ok(())
    }
}
