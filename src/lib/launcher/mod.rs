//! The launch pipeline: runs a program produced by a previous build.
//!
//! Which programs exist is recorded in the build-projects registry
//! written during the build phase. This module only resolves the
//! requested project/config/compiler triple (and optionally a concrete
//! program name, for targets that produce more than one executable) to a
//! path and executes it with the pass-through arguments

use std::path::{Path, PathBuf};

use color_eyre::{eyre::eyre, Result};

use crate::builder::{self, BuildProjectsRegistry};
use crate::cli::input::NativeCompiler;
use crate::cli::output::executors;
use crate::utils::constants::error_messages;
use crate::workspace::WorkspaceModel;

/// Resolves and launches the requested program, propagating its exit
/// status as the regis result
pub fn run(
    workspace: &WorkspaceModel,
    project: &str,
    config: &str,
    compiler: NativeCompiler,
    program: Option<&str>,
    exe_args: &[String],
) -> Result<()> {
    let registry_file = workspace.build_projects_file();
    if !registry_file.exists() {
        return Err(eyre!(error_messages::BUILD_PROJECTS_NOT_FOUND));
    }

    let registry = builder::load_registry(&registry_file)?;
    let exe_path = find_program_path(&registry, project, config, compiler, program)?;

    let status = executors::launch_built_program(&exe_path, exe_args, None)?;
    if status.success() {
        Ok(())
    } else {
        Err(eyre!("{exe_path:?} exited with {status}"))
    }
}

/// Finds the path of the program for the project specified, using the
/// config and compiler specified. It's possible to name the concrete
/// program to launch in case the target produced more than one
pub fn find_program_path(
    registry: &BuildProjectsRegistry,
    project: &str,
    config: &str,
    compiler: NativeCompiler,
    program: Option<&str>,
) -> Result<PathBuf> {
    let project = project.to_lowercase();
    let config = config.to_lowercase();
    let compiler = compiler.to_string();

    // A launch request may come in for something that was never built.
    // Each level reports its own miss, so the user knows exactly what's
    // absent
    let build_project = registry
        .get(&project)
        .ok_or_else(|| eyre!("\"{project}\" has not been built."))?;
    let build_config = build_project
        .get(&config)
        .ok_or_else(|| eyre!("\"{project} - {config}\" has not been built."))?;
    let paths = build_config
        .get(&compiler)
        .ok_or_else(|| eyre!("\"{project} - {config} - {compiler}\" has not been built."))?;

    if paths.is_empty() {
        return Err(eyre!(
            "\"{project} - {config} - {compiler}\" hasn't produced any program yet"
        ));
    }

    match program {
        // An executable may depend on another executable, in which case
        // there's more than one produced program and the user has to
        // pick one
        None if paths.len() > 1 => {
            log::warn!("multiple programs were found for \"{project} - {config} - {compiler}\".");
            log::warn!("Please specify which program you want to launch with \"--program\"");
            display_program_options(paths);
            Err(eyre!("Ambiguous launch request"))
        }
        None => Ok(paths[0].clone()),
        Some(wanted) => paths
            .iter()
            .find(|path| program_name(path).eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| {
                log::warn!(
                    "no program was found with the name \"{wanted}\" for \
                    \"{project} - {config} - {compiler}\""
                );
                display_program_options(paths);
                eyre!("Unknown program \"{wanted}\"")
            }),
    }
}

/// Display all the possible program options to the user
fn display_program_options(program_paths: &[PathBuf]) {
    log::warn!("Options:");
    for path in program_paths {
        log::warn!("{}", program_name(path));
    }
}

fn program_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}
