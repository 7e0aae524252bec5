//! The setup pipeline: prepares a freshly cloned engine repository for
//! development by making sure every external tool and library the build
//! needs is present, downloading whatever is missing.
//!
//! Tools and libraries run through the exact same pipeline, they only
//! differ in their manifest, cache file and install directory:
//!
//! 1. resolve against the paths cache / `PATH` / the install dir
//! 2. download the archives of whatever is still missing (skipped in
//!    light mode)
//! 3. extract, re-resolve below the install dir, record into the cache
//! 4. persist the cache
//!
//! The run only reports success when every requirement of every
//! manifest resolved

mod git_hooks;

use std::path::Path;

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};

use crate::cache;
use crate::config_file;
use crate::domain::requirement::{Requirement, SearchDirs};
use crate::fetcher;
use crate::resolver;
use crate::utils;
use crate::utils::constants::{dir_names, error_messages};
use crate::workspace::WorkspaceModel;

/// Runs the full setup. `clean` wipes the intermediate directory and the
/// configured misc entries first; `light` reports missing requirements
/// without downloading anything
pub fn run(workspace: &WorkspaceModel, clean: bool, light: bool) -> Result<()> {
    if clean {
        clean_workspace(workspace)?;
    }

    log::info!("Checking if tools are installed");
    let raw_tools = std::fs::read_to_string(workspace.tools_manifest_file())
        .with_context(|| error_messages::READ_MANIFEST_FILE)?;
    let tools = config_file::tools_from_str(&raw_tools)?;
    let tools_resolved = setup_requirements(
        &tools,
        &workspace.tool_paths_cache_file(),
        &workspace.tools_install_dir(),
        workspace.settings.archive_mirror,
        light,
        "tools",
    )?;

    log::info!("Checking if libs are installed");
    let raw_libs = std::fs::read_to_string(workspace.libs_manifest_file())
        .with_context(|| error_messages::READ_MANIFEST_FILE)?;
    let libs = config_file::libs_from_str(&raw_libs)?;
    let libs_resolved = setup_requirements(
        &libs,
        &workspace.lib_paths_cache_file(),
        &workspace.libs_install_dir(),
        workspace.settings.archive_mirror,
        light,
        "libs",
    )?;

    git_hooks::install(workspace)?;

    if tools_resolved && libs_resolved {
        Ok(())
    } else {
        Err(eyre!(error_messages::REQUIREMENTS_NOT_SATISFIED))
    }
}

/// Reports the resolution state of every manifest without downloading or
/// persisting anything
pub fn query(workspace: &WorkspaceModel) -> Result<()> {
    let raw_tools = std::fs::read_to_string(workspace.tools_manifest_file())
        .with_context(|| error_messages::READ_MANIFEST_FILE)?;
    let tools = config_file::tools_from_str(&raw_tools)?;
    query_requirements(
        &tools,
        &workspace.tool_paths_cache_file(),
        &workspace.tools_install_dir(),
        "tools",
    )?;

    let raw_libs = std::fs::read_to_string(workspace.libs_manifest_file())
        .with_context(|| error_messages::READ_MANIFEST_FILE)?;
    let libs = config_file::libs_from_str(&raw_libs)?;
    query_requirements(
        &libs,
        &workspace.lib_paths_cache_file(),
        &workspace.libs_install_dir(),
        "libs",
    )?;

    Ok(())
}

/// The shared resolution/download/install pipeline for one kind of
/// requirement. Returns whether every requirement ended up resolved
fn setup_requirements<R: Requirement>(
    requirements: &[R],
    cache_file: &Path,
    install_dir: &Path,
    mirror: &str,
    light: bool,
    kind: &str,
) -> Result<bool> {
    let mut paths_cache = cache::load(cache_file, false)?;

    let search_dirs = SearchDirs {
        env_paths: utils::fs::env_paths(),
        install_dir: install_dir.to_path_buf(),
    };

    let resolution = resolver::check_installed(requirements, &mut paths_cache, &search_dirs);

    let all_resolved = if resolution.all_resolved() {
        log::info!("All {kind} found");
        true
    } else if light {
        log::info!(
            "Some {kind} weren't found, but setup is in light mode, no {kind} will get downloaded"
        );
        false
    } else {
        log::warn!("{kind} that weren't found:");
        for requirement in &resolution.missing {
            log::warn!("\t-{}", requirement.config_name());
        }

        let zips_dir = install_dir.join(dir_names::ZIPS);
        fetcher::download_archives(&resolution.missing, &zips_dir, mirror)?;
        fetcher::unpack_archives(&zips_dir, install_dir)?;

        let installed = resolver::install(&resolution.missing, &mut paths_cache, install_dir);
        if installed {
            // The parts only get purged after a fully successful
            // install; a broken one keeps them around for the resumed
            // download to skip
            fetcher::purge_downloads(&zips_dir)?;
        }
        installed
    };

    cache::save(&mut paths_cache, cache_file)?;

    Ok(all_resolved)
}

fn query_requirements<R: Requirement>(
    requirements: &[R],
    cache_file: &Path,
    install_dir: &Path,
    kind: &str,
) -> Result<()> {
    log::info!("--------------------------------");

    let mut paths_cache = cache::load(cache_file, false)?;
    let search_dirs = SearchDirs {
        env_paths: utils::fs::env_paths(),
        install_dir: install_dir.to_path_buf(),
    };

    // The cache mutations stay in memory: query never writes back
    let resolution = resolver::check_installed(requirements, &mut paths_cache, &search_dirs);

    if resolution.all_resolved() {
        log::info!("All {kind} found");
    } else {
        log::warn!("{kind} still to be installed:");
        for requirement in &resolution.missing {
            log::warn!("\t-{}", requirement.config_name());
        }
    }

    Ok(())
}

/// Removes everything a previous run generated: the intermediate
/// directory, the configured misc folders and the generated files in the
/// engine root whose name contains one of the misc extensions
fn clean_workspace(workspace: &WorkspaceModel) -> Result<()> {
    log::info!("cleaning intermediates");

    let intermediate_dir = workspace.intermediate_dir();
    if intermediate_dir.exists() {
        log::info!("Cleaning {intermediate_dir:?}");
        utils::fs::delete_directory(&intermediate_dir)?;
    }

    for misc_folder in &workspace.settings.misc_folders {
        let misc_path = workspace.root.join(misc_folder);
        if misc_path.exists() {
            log::info!("Cleaning {misc_path:?}");
            utils::fs::delete_directory(&misc_path)?;
        }
    }

    let root_entries = std::fs::read_dir(&workspace.root)
        .with_context(|| format!("Could not list the engine root {:?}", workspace.root))?;
    for entry in root_entries.filter_map(Result::ok) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().to_string();
        if workspace
            .settings
            .misc_extensions
            .iter()
            .any(|extension| filename.contains(extension))
        {
            log::info!("Cleaning {path:?}");
            std::fs::remove_file(&path)
                .with_context(|| format!("Could not remove the generated file {path:?}"))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file;
    use crate::utils::constants::SETTINGS_FILE_MOCK;
    use crate::utils::test::scaffold_minimal_workspace;
    use crate::workspace;
    use color_eyre::Result;
    use tempfile::tempdir;

    fn workspace_in(root: &Path, raw_settings: &'static str) -> Result<crate::workspace::WorkspaceModel<'static>> {
        let settings = config_file::settings_from_str(raw_settings)?;
        Ok(workspace::load(root.to_path_buf(), settings))
    }

    #[test]
    fn test_clean_wipes_intermediates_misc_folders_and_generated_files() -> Result<()> {
        let temp = tempdir()?;
        scaffold_minimal_workspace(temp.path())?;
        let workspace = workspace_in(temp.path(), SETTINGS_FILE_MOCK)?;

        utils::fs::create_directory(&temp.path().join(".rex").join("tools"))?;
        utils::fs::create_directory(&temp.path().join(".vscode"))?;
        utils::fs::create_file(temp.path(), "rex.nsln", b"")?;
        utils::fs::create_file(temp.path(), "readme.md", b"")?;

        clean_workspace(&workspace)?;

        assert!(!temp.path().join(".rex").exists());
        assert!(!temp.path().join(".vscode").exists());
        assert!(!temp.path().join("rex.nsln").exists());
        // Non-generated files in the root are left alone
        assert!(temp.path().join("readme.md").exists());
        // The checked-in config folder is never touched by a clean
        assert!(workspace.tools_manifest_file().exists());

        Ok(())
    }

    #[test]
    fn test_light_setup_reports_missing_without_downloading() -> Result<()> {
        let temp = tempdir()?;
        scaffold_minimal_workspace(temp.path())?;
        let workspace = workspace_in(temp.path(), SETTINGS_FILE_MOCK)?;

        // Nothing is installed in the scaffold, so a light run must fail
        // the aggregate check but leave no downloads behind
        let result = run(&workspace, false, true);
        assert!(result.is_err());
        assert!(!workspace.tools_install_dir().join("zips").exists());

        // The cache file is still persisted (empty), stamped by the run
        assert!(workspace.tool_paths_cache_file().exists());

        Ok(())
    }

    #[test]
    fn test_setup_resolves_everything_already_on_disk() -> Result<()> {
        let temp = tempdir()?;
        scaffold_minimal_workspace(temp.path())?;
        let workspace = workspace_in(temp.path(), SETTINGS_FILE_MOCK)?;

        // Pre-install every manifest entry at its expected location
        let tools_dir = workspace.tools_install_dir();
        utils::fs::create_directory(&tools_dir.join("ninja"))?;
        utils::fs::create_file(
            &tools_dir.join("ninja"),
            &format!("ninja{}", crate::utils::constants::EXECUTABLE_EXTENSION),
            b"",
        )?;
        utils::fs::create_directory(&tools_dir.join("sharpmake"))?;
        utils::fs::create_file(
            &tools_dir.join("sharpmake"),
            "Sharpmake.Application.exe",
            b"",
        )?;

        let libs_dir = workspace.libs_install_dir();
        utils::fs::create_directory(&libs_dir.join("Windows Kits").join("10").join("Include"))?;
        utils::fs::create_directory(&libs_dir.join("Windows Kits").join("10").join("Lib"))?;

        run(&workspace, false, true)?;

        // Both caches carry the resolved entries now
        let tool_cache = cache::load(&workspace.tool_paths_cache_file(), false)?;
        assert!(tool_cache.single_path("ninja_path").is_some());
        assert!(tool_cache.single_path("sharpmake_path").is_some());

        let lib_cache = cache::load(&workspace.lib_paths_cache_file(), false)?;
        assert_eq!(lib_cache.entry("windows_sdk").map(<[_]>::len), Some(2));

        Ok(())
    }
}
