//! Invocation of the C#-based project generator (sharpmake).
//!
//! The generator is an opaque external collaborator: regis resolves its
//! executable from the tools cache, points it at the entry script of the
//! generator sources checked in under `build/sharpmake/src`, forwards
//! whatever extra switches the caller needs (`/generateTests`,
//! `/enableCoverage`, ...) and judges the run purely by its exit code

use std::path::PathBuf;

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};

use crate::cache::PathCache;
use crate::cli::output::arguments::Arguments;
use crate::cli::output::executors::{self, EnvVars};
use crate::utils::constants::{error_messages, tool_names};
use crate::workspace::WorkspaceModel;

/// Entry script of the generator sources, relative to the build dir
const SHARPMAKE_MAIN: &str = "main.sharpmake.cs";

/// Runs the project generation with the given extra generator switches
pub fn run(
    workspace: &WorkspaceModel,
    tool_paths: &PathCache,
    sharpmake_args: &[String],
) -> Result<()> {
    log::info!("generating project files");

    let sharpmake = tool_paths
        .single_path(tool_names::SHARPMAKE)
        .ok_or_else(|| eyre!(error_messages::TOOL_NOT_IN_CACHE))
        .with_context(|| format!("While resolving {}", tool_names::SHARPMAKE))?;

    let main_script = sharpmake_main_script(workspace);
    if !main_script.is_file() {
        return Err(eyre!(
            "The generator entry script doesn't exist: {main_script:?}"
        ));
    }

    let mut arguments = Arguments::new();
    arguments.create_and_push(format!("/sources('{}')", main_script.display()));
    for extra in sharpmake_args {
        arguments.create_and_push(extra.clone());
    }

    let status = executors::execute_command(
        sharpmake,
        &arguments,
        &EnvVars::default(),
        Some(&workspace.root),
    )?;

    if status.success() {
        Ok(())
    } else {
        Err(eyre!("The project generator reported a failure"))
    }
}

pub fn sharpmake_main_script(workspace: &WorkspaceModel) -> PathBuf {
    workspace
        .build_dir()
        .join("sharpmake")
        .join("src")
        .join(SHARPMAKE_MAIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file;
    use crate::utils;
    use crate::utils::constants::SETTINGS_FILE_MOCK;
    use crate::utils::test::scaffold_minimal_workspace;
    use crate::workspace;
    use tempfile::tempdir;

    #[test]
    fn test_generation_requires_a_resolved_generator() -> Result<()> {
        let temp = tempdir()?;
        scaffold_minimal_workspace(temp.path())?;
        let settings = config_file::settings_from_str(SETTINGS_FILE_MOCK)?;
        let workspace = workspace::load(temp.path().to_path_buf(), settings);

        let result = run(&workspace, &PathCache::default(), &[]);
        assert!(result.is_err());

        Ok(())
    }

    #[test]
    fn test_generation_requires_the_entry_script() -> Result<()> {
        let temp = tempdir()?;
        scaffold_minimal_workspace(temp.path())?;
        let settings = config_file::settings_from_str(SETTINGS_FILE_MOCK)?;
        let workspace = workspace::load(temp.path().to_path_buf(), settings);

        utils::fs::create_file(temp.path(), "sharpmake", b"")?;
        let mut tool_paths = PathCache::default();
        tool_paths.insert(tool_names::SHARPMAKE, vec![temp.path().join("sharpmake")]);

        let result = run(&workspace, &tool_paths, &[]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("entry script doesn't exist"));

        Ok(())
    }
}
