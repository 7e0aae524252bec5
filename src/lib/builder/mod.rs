//! The build pipeline: drives ninja over the generated build files.
//!
//! The native build itself is ninja's business. regis only locates the
//! right `.ninja` file for the requested project/config/compiler triple,
//! shells out to the ninja executable resolved during setup, scans its
//! output for failed edges and keeps the build-projects registry up to
//! date so the launch pipeline knows what was produced where

use std::path::{Path, PathBuf};
use std::time::Instant;

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use indexmap::IndexMap;

use crate::cache::PathCache;
use crate::cli::input::NativeCompiler;
use crate::cli::output::arguments::Arguments;
use crate::cli::output::executors::{self, EnvVars, FailureScanner};
use crate::utils;
use crate::utils::constants::{error_messages, tool_names};
use crate::workspace::WorkspaceModel;

/// The registry the build phase writes and the launch phase reads:
/// project -> config -> compiler -> produced executables. All keys are
/// stored lowercase
pub type BuildProjectsRegistry = IndexMap<String, IndexMap<String, IndexMap<String, Vec<PathBuf>>>>;

pub fn load_registry(registry_file: &Path) -> Result<BuildProjectsRegistry> {
    utils::fs::load_and_deserialize(&registry_file)
        .with_context(|| format!("Error loading the build projects registry {registry_file:?}"))
}

/// What the caller asked the build pipeline to do
#[derive(Debug)]
pub struct BuildRequest {
    pub project: String,
    pub config: String,
    pub compiler: NativeCompiler,
    pub clean: bool,
    pub build: bool,
}

/// Runs the requested build. Every matching ninja file is driven
/// independently and the aggregate fails when any of them failed
pub fn run(
    workspace: &WorkspaceModel,
    tool_paths: &PathCache,
    request: &BuildRequest,
) -> Result<()> {
    log::info!(
        "Building {} - {} - {}",
        request.project,
        request.config,
        request.compiler
    );

    let ninja = tool_paths
        .single_path(tool_names::NINJA)
        .ok_or_else(|| eyre!(error_messages::TOOL_NOT_IN_CACHE))
        .with_context(|| format!("While resolving {}", tool_names::NINJA))?;

    let ninja_files = find_ninja_files(workspace, request)?;
    if ninja_files.is_empty() {
        return Err(eyre!(
            "No build files found for \"{} - {} - {}\". Did you generate the project first?",
            request.project,
            request.config,
            request.compiler
        ));
    }

    let start = Instant::now();
    let mut failed = false;

    for ninja_file in &ninja_files {
        if request.clean {
            clean_ninja_file(ninja, ninja_file)?;
        }

        if request.build {
            let ok = build_ninja_file(ninja, ninja_file)?;
            if ok {
                register_build_outputs(workspace, request, ninja_file)?;
            } else {
                log::error!("Failed to build {ninja_file:?}");
            }
            failed |= !ok;
        }
    }

    log::info!("Build took {:.4} seconds", start.elapsed().as_secs_f64());

    if failed {
        Err(eyre!("Build failed"))
    } else {
        log::info!("Build successful");
        Ok(())
    }
}

/// The generator names its build files
/// `<project>.<config>.<compiler>.ninja`, somewhere below the
/// intermediate build folder
fn find_ninja_files(workspace: &WorkspaceModel, request: &BuildRequest) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/**/{}.{}.{}.ninja",
        workspace.intermediate_build_dir().display(),
        request.project.to_lowercase(),
        request.config.to_lowercase(),
        request.compiler,
    );

    collect_glob(&pattern)
}

pub(crate) fn collect_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Ill-formed file pattern: {pattern}"))?
        .filter_map(Result::ok)
        .collect();
    files.sort();
    Ok(files)
}

fn clean_ninja_file(ninja: &Path, ninja_file: &Path) -> Result<()> {
    let mut arguments = Arguments::new();
    arguments.create_and_push("-f");
    arguments.create_and_push(ninja_file);
    arguments.create_and_push("-t");
    arguments.create_and_push("clean");

    let status = executors::execute_command(ninja, &arguments, &EnvVars::default(), None)?;
    if !status.success() {
        return Err(eyre!("Failed to clean {ninja_file:?}"));
    }
    Ok(())
}

fn build_ninja_file(ninja: &Path, ninja_file: &Path) -> Result<bool> {
    let mut arguments = Arguments::new();
    arguments.create_and_push("-f");
    arguments.create_and_push(ninja_file);

    let run = executors::execute_command_scanning(
        ninja,
        &arguments,
        &EnvVars::default(),
        &FailureScanner::ninja(),
    )?;

    Ok(run.success())
}

/// Records the executables this build produced into the registry. The
/// produced binaries land below the folder of the driven ninja file, so
/// that's where they are discovered
fn register_build_outputs(
    workspace: &WorkspaceModel,
    request: &BuildRequest,
    ninja_file: &Path,
) -> Result<()> {
    let output_root = ninja_file
        .parent()
        .ok_or_else(|| eyre!("The ninja file {ninja_file:?} has no parent folder"))?;

    let produced: Vec<PathBuf> = walkdir::WalkDir::new(output_root)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| utils::fs::is_executable(path))
        .collect();

    if produced.is_empty() {
        log::debug!("No executables produced below {output_root:?}");
        return Ok(());
    }

    let registry_file = workspace.build_projects_file();
    let mut registry = load_registry(&registry_file)?;

    registry
        .entry(request.project.to_lowercase())
        .or_default()
        .entry(request.config.to_lowercase())
        .or_default()
        .insert(request.compiler.to_string(), produced);

    if let Some(parent) = registry_file.parent() {
        utils::fs::create_directory(parent)?;
    }
    utils::fs::serialize_object_to_file(&registry_file, &registry)
        .with_context(|| format!("Error saving the build projects registry {registry_file:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file;
    use crate::utils::constants::SETTINGS_FILE_MOCK;
    use crate::utils::test::scaffold_minimal_workspace;
    use crate::workspace;
    use tempfile::tempdir;

    #[test]
    fn test_build_without_generated_files_is_an_error() -> Result<()> {
        let temp = tempdir()?;
        scaffold_minimal_workspace(temp.path())?;
        let settings = config_file::settings_from_str(SETTINGS_FILE_MOCK)?;
        let workspace = workspace::load(temp.path().to_path_buf(), settings);

        utils::fs::create_file(temp.path(), "ninja", b"")?;
        let mut tool_paths = PathCache::default();
        tool_paths.insert(tool_names::NINJA, vec![temp.path().join("ninja")]);

        let request = BuildRequest {
            project: "regina".to_owned(),
            config: "debug_opt".to_owned(),
            compiler: NativeCompiler::Clang,
            clean: false,
            build: true,
        };

        let result = run(&workspace, &tool_paths, &request);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Did you generate the project first?"));

        Ok(())
    }

    #[test]
    fn test_ninja_files_are_matched_per_triple() -> Result<()> {
        let temp = tempdir()?;
        scaffold_minimal_workspace(temp.path())?;
        let settings = config_file::settings_from_str(SETTINGS_FILE_MOCK)?;
        let workspace = workspace::load(temp.path().to_path_buf(), settings);

        let build_dir = workspace.intermediate_build_dir().join("regina");
        utils::fs::create_directory(&build_dir)?;
        utils::fs::create_file(&build_dir, "regina.debug_opt.clang.ninja", b"")?;
        utils::fs::create_file(&build_dir, "regina.release.clang.ninja", b"")?;
        utils::fs::create_file(&build_dir, "rexstdexe.debug_opt.clang.ninja", b"")?;

        let request = BuildRequest {
            project: "Regina".to_owned(),
            config: "DEBUG_OPT".to_owned(),
            compiler: NativeCompiler::Clang,
            clean: false,
            build: true,
        };

        let found = find_ninja_files(&workspace, &request)?;
        assert_eq!(found, vec![build_dir.join("regina.debug_opt.clang.ninja")]);

        Ok(())
    }

    #[test]
    fn test_registry_defaults_to_empty_when_absent() -> Result<()> {
        let temp = tempdir()?;
        let registry = load_registry(&temp.path().join("build_projects.json"))?;
        assert!(registry.is_empty());
        Ok(())
    }
}
