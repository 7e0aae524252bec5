//! The read-only model of the engine repository a regis process works
//! against: the located root plus the parsed workspace settings, with
//! every derived path computed in a single place

use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, eyre::Context, Result};

use crate::config_file::settings::WorkspaceSettings;
use crate::utils::constants::{self, dir_names, error_messages, file_names};

/// Locates the root of the engine repository by walking up from `start`
/// until a directory holding the root marker file is found.
///
/// Every other path regis touches is derived from this one, so failing
/// here aborts the run before anything gets created or deleted
pub fn find_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(constants::ROOT_MARKER).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| eyre!(error_messages::ROOT_MARKER_NOT_FOUND))
}

/// Assembles the [`WorkspaceModel`] for an already located engine root
pub fn load<'a>(root: PathBuf, settings: WorkspaceSettings<'a>) -> WorkspaceModel<'a> {
    WorkspaceModel { root, settings }
}

#[derive(Debug)]
pub struct WorkspaceModel<'a> {
    pub root: PathBuf,
    pub settings: WorkspaceSettings<'a>,
}

impl<'a> WorkspaceModel<'a> {
    /// `<root>/<intermediate>`, where every generated artifact lands
    pub fn intermediate_dir(&self) -> PathBuf {
        self.root.join(self.settings.intermediate_folder)
    }

    /// `<root>/build`, the checked-in folder holding config and the
    /// generator sources
    pub fn build_dir(&self) -> PathBuf {
        self.root.join(self.settings.build_folder)
    }

    pub fn config_dir(&self) -> PathBuf {
        self.build_dir().join(dir_names::CONFIG)
    }

    pub fn tools_install_dir(&self) -> PathBuf {
        self.intermediate_dir().join(self.settings.tools_folder)
    }

    pub fn libs_install_dir(&self) -> PathBuf {
        self.intermediate_dir().join(self.settings.libs_folder)
    }

    pub fn tool_paths_cache_file(&self) -> PathBuf {
        self.tools_install_dir()
            .join(file_names::TOOL_PATHS_CACHE)
    }

    pub fn lib_paths_cache_file(&self) -> PathBuf {
        self.libs_install_dir().join(file_names::LIB_PATHS_CACHE)
    }

    pub fn tools_manifest_file(&self) -> PathBuf {
        self.config_dir().join(file_names::TOOLS_MANIFEST)
    }

    pub fn libs_manifest_file(&self) -> PathBuf {
        self.config_dir().join(file_names::LIBS_MANIFEST)
    }

    /// `<root>/<intermediate>/<build>`, where the generated ninja files
    /// and the build byproducts live
    pub fn intermediate_build_dir(&self) -> PathBuf {
        self.intermediate_dir().join(self.settings.build_folder)
    }

    pub fn intermediate_tests_dir(&self) -> PathBuf {
        self.intermediate_dir().join(self.settings.tests_folder)
    }

    pub fn coverage_dir(&self) -> PathBuf {
        self.intermediate_dir().join(self.settings.coverage_folder)
    }

    pub fn build_projects_file(&self) -> PathBuf {
        self.intermediate_build_dir()
            .join(self.settings.build_projects_filename)
    }

    /// The engine version as stored in the root marker file
    pub fn engine_version(&self) -> Result<String> {
        let marker = self.root.join(constants::ROOT_MARKER);
        let raw = std::fs::read_to_string(&marker)
            .with_context(|| format!("Could not read the engine version from {marker:?}"))?;
        Ok(raw.lines().next().unwrap_or_default().trim().to_owned())
    }
}
