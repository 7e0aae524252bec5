extern crate core;

pub mod builder;
pub mod cache;
pub mod cli;
pub mod config_file;
pub mod domain;
pub mod fetcher;
pub mod generator;
pub mod launcher;
pub mod resolver;
pub mod setup;
pub mod tester;
pub mod utils;
pub mod workspace;

/// The entry point for the execution of the program.
///
/// This module existence is motivated to let us run
/// integration tests for the whole operations of the program
/// without having to do fancy work about checking the
/// data sent to stdout/stderr
pub mod worker {
    use std::fs;
    use std::path::{Path, PathBuf};

    use color_eyre::{eyre::Context, Report, Result};

    use crate::builder::{self, BuildRequest};
    use crate::cache;
    use crate::cli::input::{CliArgs, Command, NativeCompiler};
    use crate::config_file;
    use crate::generator;
    use crate::launcher;
    use crate::setup;
    use crate::tester;
    use crate::utils;
    use crate::utils::constants::{error_messages, SETTINGS_PATH_FROM_ROOT};
    use crate::workspace;

    /// The main work of the project. Runs the pipeline
    /// requested in the CLI
    pub fn run_regis(cli_args: &CliArgs, base_path: &Path) -> std::result::Result<(), Report> {
        let abs_engine_root = determine_absolute_path_of_the_engine_root(cli_args, base_path)?;
        log::debug!("Launching a regis work event for the engine root: {abs_engine_root:?}");

        let raw_settings = fs::read_to_string(abs_engine_root.join(SETTINGS_PATH_FROM_ROOT))
            .with_context(|| error_messages::READ_SETTINGS_FILE)?;
        let settings = config_file::settings_from_str(&raw_settings)?;
        let workspace = workspace::load(abs_engine_root, settings);

        match &cli_args.command {
            Command::Version => {
                log::info!("Rex Engine version: {}", workspace.engine_version()?);
                Ok(())
            }
            Command::Setup {
                clean,
                query,
                light,
            } => {
                if *query {
                    setup::query(&workspace)
                } else {
                    setup::run(&workspace, *clean, *light)
                }
            }
            Command::Generate { sharpmake_args } => {
                let tool_paths = cache::load(&workspace.tool_paths_cache_file(), false)?;
                generator::run(&workspace, &tool_paths, sharpmake_args)
            }
            Command::Build {
                project,
                config,
                compiler,
                clean,
                nobuild,
            } => {
                let tool_paths = cache::load(&workspace.tool_paths_cache_file(), false)?;
                let request = BuildRequest {
                    project: project.clone(),
                    config: config.clone(),
                    compiler: compiler.unwrap_or_else(NativeCompiler::default_for_host),
                    clean: *clean,
                    build: !*nobuild,
                };
                builder::run(&workspace, &tool_paths, &request)
            }
            Command::Launch {
                project,
                config,
                compiler,
                program,
                exe_args,
            } => launcher::run(
                &workspace,
                project,
                config,
                compiler.unwrap_or_else(NativeCompiler::default_for_host),
                program.as_deref(),
                exe_args,
            ),
            Command::Test(test_args) => tester::run(&workspace, test_args),
        }
    }

    /// Resolves the full path of the engine root on the fs. If the
    /// `--root` [`CliArgs`] arg is present, it's taken as the root as-is;
    /// otherwise the root marker file is searched walking up from the
    /// directory regis was invoked in
    fn determine_absolute_path_of_the_engine_root(
        cli_args: &CliArgs,
        base_path: &Path,
    ) -> Result<PathBuf> {
        match cli_args.root.as_deref() {
            Some(root) => utils::fs::get_project_root_absolute_path(Path::new(root)),
            None => {
                let start = utils::fs::get_project_root_absolute_path(base_path)?;
                workspace::find_root(&start)
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use clap::Parser;
        use color_eyre::Result;
        use tempfile::tempdir;

        use crate::cli::input::CliArgs;
        use crate::utils::test::scaffold_minimal_workspace;

        use super::run_regis;

        #[test]
        fn test_version_reads_the_root_marker() -> Result<()> {
            let temp = tempdir()?;
            scaffold_minimal_workspace(temp.path())?;

            let cli_args = CliArgs::parse_from(["", "version"]);
            assert!(run_regis(&cli_args, temp.path()).is_ok());

            Ok(())
        }

        #[test]
        fn test_running_outside_a_repository_fails() -> Result<()> {
            let temp = tempdir()?;

            let cli_args = CliArgs::parse_from(["", "version"]);
            assert!(run_regis(&cli_args, temp.path()).is_err());

            Ok(())
        }

        #[test]
        fn test_explicit_root_skips_the_marker_search() -> Result<()> {
            let temp = tempdir()?;
            scaffold_minimal_workspace(temp.path())?;

            let cli_args = CliArgs::parse_from([
                "",
                "--root",
                temp.path().to_str().unwrap(),
                "version",
            ]);
            assert!(run_regis(&cli_args, std::env::temp_dir().as_path()).is_ok());

            Ok(())
        }

        #[test]
        fn test_setup_query_reports_without_installing() -> Result<()> {
            let temp = tempdir()?;
            scaffold_minimal_workspace(temp.path())?;

            let cli_args = CliArgs::parse_from(["", "setup", "--query"]);
            assert!(run_regis(&cli_args, temp.path()).is_ok());
            // Query never persists anything
            assert!(!temp.path().join(".rex").exists());

            Ok(())
        }

        #[test]
        fn test_light_setup_fails_when_requirements_are_missing() -> Result<()> {
            let temp = tempdir()?;
            scaffold_minimal_workspace(temp.path())?;

            let cli_args = CliArgs::parse_from(["", "setup", "--light"]);
            assert!(run_regis(&cli_args, temp.path()).is_err());

            Ok(())
        }

        #[test]
        fn test_launch_before_any_build_fails() -> Result<()> {
            let temp = tempdir()?;
            scaffold_minimal_workspace(temp.path())?;

            let cli_args = CliArgs::parse_from(["", "launch", "--project", "regina"]);
            let result = run_regis(&cli_args, temp.path());
            assert!(result.is_err());

            Ok(())
        }
    }
}
