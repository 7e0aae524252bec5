//! The test pipeline of the engine.
//!
//! Seven passes, all selectable from the command line: the two static
//! analysis ones (include-what-you-use, clang-tidy) that run over the
//! generated compilation databases, and the five flavored build+run ones
//! (unit tests, coverage, address sanitizer, UB sanitizer, fuzzy) that
//! regenerate the project files with the right generator switch, drive
//! the flavored ninja files and run whatever executables came out.
//!
//! Every stage folds its result into an ordered pass-results map, the
//! summary lists each entry as success/failed, and the run as a whole
//! fails when any entry failed. The external tools are judged strictly
//! by exit code and textual output; the reports they produce are never
//! interpreted here

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use indexmap::IndexMap;

use crate::builder::collect_glob;
use crate::cache::{self, PathCache};
use crate::cli::input::TestArgs;
use crate::cli::output::arguments::Arguments;
use crate::cli::output::executors::{self, EnvVars, FailureScanner};
use crate::generator;
use crate::utils;
use crate::utils::constants::{
    dir_names, env_vars, error_messages, file_names, tool_names,
};
use crate::workspace::WorkspaceModel;

const PASS_SEPARATOR: &str =
    "-----------------------------------------------------------------------------";

/// The clang tooling ships python wrappers; this is the interpreter they
/// are driven with
const PYTHON: &str = if cfg!(target_os = "windows") {
    "py"
} else {
    "python3"
};

const RUN_CLANG_TIDY_WRAPPER: &str = "run_clang_tidy.py";
const IWYU_TOOL_WRAPPER: &str = "iwyu_tool.py";
const IWYU_FIX_INCLUDES: &str = "fix_includes.py";
const CLANG_TIDY_CONFIG: &str = ".clang-tidy_first_pass";

/// Runs the selected test passes and reports the summary
pub fn run(workspace: &WorkspaceModel, args: &TestArgs) -> Result<()> {
    let start = Instant::now();

    if args.clean {
        clean(workspace)?;
    }

    let tool_paths = cache::load(&workspace.tool_paths_cache_file(), false)?;
    let mut pipeline = TestPipeline {
        workspace,
        tool_paths,
        pass_results: IndexMap::new(),
        auto_fix: args.auto_fix,
    };

    if args.all || args.iwyu {
        pipeline.include_what_you_use_pass();
    }
    if args.all || args.clang_tidy {
        pipeline.clang_tidy_pass();
    }
    if args.all || args.unit_tests {
        pipeline.unit_tests_pass();
    }
    if args.all || args.coverage {
        pipeline.coverage_pass();
    }
    if args.all || args.asan {
        pipeline.sanitizer_pass(Sanitizer::Address);
    }
    if args.all || args.ubsan {
        pipeline.sanitizer_pass(Sanitizer::UndefinedBehavior);
    }
    if args.all || args.fuzzy {
        pipeline.fuzzy_pass(args.fuzzy_runs);
    }

    pipeline.report_summary(start)
}

/// Wipes the intermediate tests folder, so the next run regenerates and
/// rebuilds everything from scratch
fn clean(workspace: &WorkspaceModel) -> Result<()> {
    let tests_dir = workspace.intermediate_tests_dir();
    if tests_dir.exists() {
        log::info!("Cleaning {tests_dir:?}");
        utils::fs::delete_directory(&tests_dir)?;
    }
    Ok(())
}

/// The two sanitizer passes only differ in naming and environment, so
/// they share one implementation
#[derive(Clone, Copy)]
enum Sanitizer {
    Address,
    UndefinedBehavior,
}

impl Sanitizer {
    fn pass_name(&self) -> &'static str {
        match self {
            Sanitizer::Address => "address sanitizer",
            Sanitizer::UndefinedBehavior => "undefined behavior sanitizer",
        }
    }

    fn generator_switch(&self) -> &'static str {
        match self {
            Sanitizer::Address => "/enableAddressSanitizer",
            Sanitizer::UndefinedBehavior => "/enableUBSanitizer",
        }
    }

    fn ninja_suffix(&self) -> &'static str {
        match self {
            Sanitizer::Address => "asan",
            Sanitizer::UndefinedBehavior => "ubsan",
        }
    }

    fn programs_dir(&self, workspace: &WorkspaceModel) -> PathBuf {
        let flavor = match self {
            Sanitizer::Address => dir_names::ASAN,
            Sanitizer::UndefinedBehavior => dir_names::UBSAN,
        };
        workspace.intermediate_tests_dir().join(flavor)
    }

    fn log_stem(&self) -> &'static str {
        match self {
            Sanitizer::Address => "asan.log",
            Sanitizer::UndefinedBehavior => "ubsan.log",
        }
    }

    fn env(&self) -> EnvVars {
        let options = format!("print_stacktrace=1:log_path={}", self.log_stem());
        let mut env = EnvVars::new();
        match self {
            Sanitizer::Address => {
                env.insert(env_vars::ASAN_OPTIONS.to_owned(), options);
            }
            Sanitizer::UndefinedBehavior => {
                env.insert(env_vars::UBSAN_OPTIONS.to_owned(), options);
            }
        }
        env
    }
}

struct TestPipeline<'a> {
    workspace: &'a WorkspaceModel<'a>,
    tool_paths: PathCache,
    pass_results: IndexMap<String, i32>,
    auto_fix: bool,
}

impl<'a> TestPipeline<'a> {
    fn record(&mut self, pass: &str, rc: i32) {
        if rc != 0 {
            log::error!("{pass} failed");
        }
        self.pass_results.insert(pass.to_owned(), rc);
    }

    fn tool(&self, name: &str) -> Result<&Path> {
        self.tool_paths
            .single_path(name)
            .ok_or_else(|| eyre!("{}: {name}", error_messages::TOOL_NOT_IN_CACHE))
    }

    /// Every `compile_commands.json` the generation phase emitted, one
    /// per generated project flavor
    fn compilation_databases(&self) -> Vec<PathBuf> {
        utils::fs::find_files_in_dir(
            &self.workspace.intermediate_build_dir(),
            file_names::COMPILATION_DATABASE,
        )
    }

    // ------------------------------------------------------------------
    // static analysis passes
    // ------------------------------------------------------------------

    fn include_what_you_use_pass(&mut self) {
        println!("{PASS_SEPARATOR}");
        log::info!("running include-what-you-use");

        let rc = match self.run_include_what_you_use() {
            Ok(rc) => rc,
            Err(error) => {
                log::error!("{error:#}");
                1
            }
        };
        self.record("include-what-you-use", rc);
    }

    fn run_include_what_you_use(&self) -> Result<i32> {
        let iwyu = self.tool(tool_names::INCLUDE_WHAT_YOU_USE)?;
        let iwyu_dir = iwyu
            .parent()
            .ok_or_else(|| eyre!("{iwyu:?} has no parent folder"))?;
        let iwyu_tool = iwyu_dir.join(IWYU_TOOL_WRAPPER);
        let fix_includes = iwyu_dir.join(IWYU_FIX_INCLUDES);

        let mut rc = 0;
        for compilation_db in self.compilation_databases() {
            let db_folder = compilation_db
                .parent()
                .ok_or_else(|| eyre!("{compilation_db:?} has no parent folder"))?;
            let output_log = db_folder.join("iwyu_output.log");

            let mut arguments = Arguments::new();
            arguments.create_and_push(&iwyu_tool);
            arguments.create_and_push("-v");
            arguments.create_and_push(format!("-p={}", db_folder.display()));

            let status = executors::execute_command_capturing(
                PYTHON,
                &arguments,
                &EnvVars::default(),
                None,
                &output_log,
            )?;
            rc |= i32::from(!status.success());

            if self.auto_fix {
                rc |= self.apply_iwyu_fixes(&fix_includes, &output_log)?;
            }
        }

        Ok(rc)
    }

    /// Feeds the collected iwyu report back into `fix_includes.py`,
    /// which reads it from stdin
    fn apply_iwyu_fixes(&self, fix_includes: &Path, output_log: &Path) -> Result<i32> {
        let log_file = std::fs::File::open(output_log)
            .with_context(|| format!("Could not open the iwyu report {output_log:?}"))?;

        let status = std::process::Command::new(PYTHON)
            .arg(fix_includes)
            .arg("--update_comments")
            .arg("--safe_headers")
            .stdin(log_file)
            .spawn()
            .with_context(|| "Failed to spawn fix_includes")?
            .wait()
            .with_context(|| "fix_includes failed!")?;

        Ok(i32::from(!status.success()))
    }

    fn clang_tidy_pass(&mut self) {
        println!("{PASS_SEPARATOR}");
        log::info!("running clang-tidy");

        let rc = match self.run_clang_tidy() {
            Ok(rc) => rc,
            Err(error) => {
                log::error!("{error:#}");
                1
            }
        };
        self.record("clang-tidy", rc);
    }

    fn run_clang_tidy(&self) -> Result<i32> {
        let clang_tidy = self.tool(tool_names::CLANG_TIDY)?;
        let clang_apply_replacements = self.tool(tool_names::CLANG_APPLY_REPLACEMENTS)?;
        let wrapper = self
            .workspace
            .build_dir()
            .join("scripts")
            .join(RUN_CLANG_TIDY_WRAPPER);
        let config_file = self
            .workspace
            .root
            .join("source")
            .join(CLANG_TIDY_CONFIG);

        let mut rc = 0;
        for compilation_db in self.compilation_databases() {
            let db_folder = compilation_db
                .parent()
                .ok_or_else(|| eyre!("{compilation_db:?} has no parent folder"))?;

            let mut arguments = Arguments::new();
            arguments.create_and_push(&wrapper);
            arguments.create_and_push(format!("-clang-tidy-binary={}", clang_tidy.display()));
            arguments.create_and_push(format!(
                "-clang-apply-replacements-binary={}",
                clang_apply_replacements.display()
            ));
            arguments.create_and_push(format!("-config-file={}", config_file.display()));
            arguments.create_and_push(format!("-p={}", db_folder.display()));
            arguments.create_and_push("-header-filter=.*");
            arguments.create_and_push("-quiet");
            if self.auto_fix {
                arguments.create_and_push("-fix");
            }

            let status =
                executors::execute_command(PYTHON, &arguments, &EnvVars::default(), None)?;
            if !status.success() {
                log::error!("clang-tidy failed for {compilation_db:?}");
                log::error!("config file: {config_file:?}");
            }
            rc |= i32::from(!status.success());
        }

        Ok(rc)
    }

    // ------------------------------------------------------------------
    // flavored build+run passes
    // ------------------------------------------------------------------

    fn unit_tests_pass(&mut self) {
        println!("{PASS_SEPARATOR}");
        let rc = self.generate_flavor(&["/generateTests"]);
        self.record("unit tests generation", rc);

        println!("{PASS_SEPARATOR}");
        let tests_build_dir = self
            .workspace
            .intermediate_tests_dir()
            .join(dir_names::BUILD);
        let rc = self.build_flavor(&tests_build_dir, "*.ninja");
        self.record("unit tests building", rc);

        println!("{PASS_SEPARATOR}");
        let mut rc = 0;
        for program in find_test_programs(&tests_build_dir) {
            log::info!("running: {:?}", program.file_name().unwrap_or_default());
            let passed = self.run_test_program(&program, &EnvVars::default(), &[], None);
            if !passed {
                log::error!("unit test failed for {program:?}");
                rc = 1;
            }
        }
        self.record("unit tests result", rc);
    }

    fn coverage_pass(&mut self) {
        println!("{PASS_SEPARATOR}");
        let rc = self.generate_flavor(&["/generateTests", "/enableCoverage"]);
        self.record("coverage generation", rc);

        println!("{PASS_SEPARATOR}");
        let rc = self.build_flavor(&self.workspace.intermediate_dir(), "*_coverage.ninja");
        self.record("coverage building", rc);

        println!("{PASS_SEPARATOR}");
        let programs = self.run_coverage_programs();

        println!("{PASS_SEPARATOR}");
        let rc = match self.create_coverage_reports(&programs) {
            Ok(rc) => rc,
            Err(error) => {
                log::error!("{error:#}");
                1
            }
        };
        self.record("coverage report creation", rc);
    }

    /// Runs every coverage-instrumented program with the llvm raw
    /// profile pointed next to the program itself
    fn run_coverage_programs(&self) -> Vec<PathBuf> {
        let mut programs_run = Vec::new();

        for program in find_test_programs(&self.workspace.coverage_dir()) {
            log::info!("running: {:?}", program.file_name().unwrap_or_default());

            // llvm reads this variable to decide where the raw coverage
            // data lands
            let mut env = EnvVars::new();
            env.insert(
                env_vars::LLVM_PROFILE_FILE.to_owned(),
                coverage_rawdata_file(&program).display().to_string(),
            );

            if !self.run_test_program(&program, &env, &[], None) {
                log::error!("unit test failed for {program:?}");
            }
            programs_run.push(program);
        }

        programs_run
    }

    /// Indexes each raw profile with `llvm-profdata` and emits the
    /// line-oriented and summary reports with `llvm-cov`. The reports are
    /// handed to the user as files; their content is never interpreted
    fn create_coverage_reports(&self, programs_run: &[PathBuf]) -> Result<i32> {
        let llvm_profdata = self.tool(tool_names::LLVM_PROFDATA)?;
        let llvm_cov = self.tool(tool_names::LLVM_COV)?;

        let mut rc = 0;
        for program in programs_run {
            let rawdata_file = coverage_rawdata_file(program);
            if !rawdata_file.exists() {
                log::error!("no coverage data was produced for {program:?}");
                rc = 1;
                continue;
            }

            let indexed_file = rawdata_file.with_extension("profdata");
            let mut arguments = Arguments::new();
            arguments.create_and_push("merge");
            arguments.create_and_push("-sparse");
            arguments.create_and_push(&rawdata_file);
            arguments.create_and_push("-o");
            arguments.create_and_push(&indexed_file);
            let status =
                executors::execute_command(llvm_profdata, &arguments, &EnvVars::default(), None)?;
            rc |= i32::from(!status.success());

            let mut arguments = Arguments::new();
            arguments.create_and_push("show");
            arguments.create_and_push(program);
            arguments.create_and_push(format!("-instr-profile={}", indexed_file.display()));
            let status = executors::execute_command_capturing(
                llvm_cov,
                &arguments,
                &EnvVars::default(),
                None,
                &indexed_file.with_extension("coverage.txt"),
            )?;
            rc |= i32::from(!status.success());

            let mut arguments = Arguments::new();
            arguments.create_and_push("report");
            arguments.create_and_push(program);
            arguments.create_and_push(format!("-instr-profile={}", indexed_file.display()));
            let status = executors::execute_command_capturing(
                llvm_cov,
                &arguments,
                &EnvVars::default(),
                None,
                &indexed_file.with_extension("summary.txt"),
            )?;
            rc |= i32::from(!status.success());
        }

        Ok(rc)
    }

    fn sanitizer_pass(&mut self, sanitizer: Sanitizer) {
        let pass_name = sanitizer.pass_name();

        println!("{PASS_SEPARATOR}");
        let rc = self.generate_flavor(&["/generateTests", sanitizer.generator_switch()]);
        self.record(&format!("{pass_name} generation"), rc);

        println!("{PASS_SEPARATOR}");
        let pattern = format!("*_{}.ninja", sanitizer.ninja_suffix());
        let rc = self.build_flavor(&self.workspace.intermediate_dir(), &pattern);
        self.record(&format!("{pass_name} building"), rc);

        println!("{PASS_SEPARATOR}");
        let mut rc = 0;
        for program in find_test_programs(&sanitizer.programs_dir(self.workspace)) {
            log::info!("running: {:?}", program.file_name().unwrap_or_default());
            let passed =
                self.run_test_program(&program, &sanitizer.env(), &[], Some(sanitizer.log_stem()));
            if !passed {
                log::error!("{pass_name} failed for {program:?}");
                rc = 1;
            }
        }
        self.record(&format!("{pass_name} result"), rc);
    }

    fn fuzzy_pass(&mut self, runs: u32) {
        println!("{PASS_SEPARATOR}");
        let rc = self.generate_flavor(&["/enableFuzzyTesting"]);
        self.record("fuzzy testing generation", rc);

        println!("{PASS_SEPARATOR}");
        let rc = self.build_flavor(&self.workspace.intermediate_dir(), "*_fuzzy.ninja");
        self.record("fuzzy testing building", rc);

        println!("{PASS_SEPARATOR}");
        // Fuzzers are built with both sanitizers linked in, and both
        // have to agree on the log file
        let mut env = EnvVars::new();
        env.insert(
            env_vars::ASAN_OPTIONS.to_owned(),
            "print_stacktrace=1:log_path=fuzzy.log".to_owned(),
        );
        env.insert(
            env_vars::UBSAN_OPTIONS.to_owned(),
            "print_stacktrace=1:log_path=fuzzy.log".to_owned(),
        );
        let runs_arg = format!("-runs={runs}");

        let fuzzy_dir = self
            .workspace
            .intermediate_tests_dir()
            .join(dir_names::FUZZY);
        let mut rc = 0;
        for program in find_test_programs(&fuzzy_dir) {
            log::info!("running: {:?}", program.file_name().unwrap_or_default());
            let passed =
                self.run_test_program(&program, &env, &[runs_arg.clone()], Some("fuzzy.log"));
            if !passed {
                log::error!("fuzzy testing failed for {program:?}");
                rc = 1;
            }
        }
        self.record("fuzzy testing result", rc);
    }

    // ------------------------------------------------------------------
    // shared helpers
    // ------------------------------------------------------------------

    /// Regenerates the project files with the given generator switches
    fn generate_flavor(&self, switches: &[&str]) -> i32 {
        let switches: Vec<String> = switches.iter().map(|s| (*s).to_owned()).collect();
        match generator::run(self.workspace, &self.tool_paths, &switches) {
            Ok(()) => 0,
            Err(error) => {
                log::error!("{error:#}");
                1
            }
        }
    }

    /// Drives every ninja file below `folder` matching `pattern`,
    /// scanning the output for failed edges
    fn build_flavor(&self, folder: &Path, pattern: &str) -> i32 {
        let ninja = match self.tool(tool_names::NINJA) {
            Ok(path) => path,
            Err(error) => {
                log::error!("{error:#}");
                return 1;
            }
        };

        let full_pattern = format!("{}/**/{}", folder.display(), pattern);
        let ninja_files = match collect_glob(&full_pattern) {
            Ok(files) => files,
            Err(error) => {
                log::error!("{error:#}");
                return 1;
            }
        };

        let mut rc = 0;
        for ninja_file in ninja_files {
            let mut arguments = Arguments::new();
            arguments.create_and_push("-f");
            arguments.create_and_push(&ninja_file);

            match executors::execute_command_scanning(
                ninja,
                &arguments,
                &EnvVars::default(),
                &FailureScanner::ninja(),
            ) {
                Ok(run) if run.success() => {}
                Ok(_) => {
                    log::error!("Failed to build {ninja_file:?}");
                    rc = 1;
                }
                Err(error) => {
                    log::error!("{error:#}");
                    rc = 1;
                }
            }
        }

        rc
    }

    /// Runs one produced test program with its working directory set to
    /// its own folder, so the sanitizer log files land next to it. The
    /// run only passes when the program exited cleanly AND, for
    /// sanitized runs, no `<log_stem>.<pid>` file appeared
    fn run_test_program(
        &self,
        program: &Path,
        env: &EnvVars,
        extra_args: &[String],
        log_stem: Option<&str>,
    ) -> bool {
        let program_dir = program.parent().unwrap_or(Path::new("."));

        let spawned = std::process::Command::new(program)
            .args(extra_args)
            .envs(env)
            .current_dir(program_dir)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(error) => {
                log::error!("Failed to run {program:?}: {error}");
                return false;
            }
        };
        let pid = child.id();

        let status = match child.wait() {
            Ok(status) => status,
            Err(error) => {
                log::error!("Failed to wait on {program:?}: {error}");
                return false;
            }
        };

        let mut passed = status.success();
        if let Some(log_stem) = log_stem {
            let log_file = program_dir.join(format!("{log_stem}.{pid}"));
            if log_file.exists() {
                log::error!("for more info, please check: {log_file:?}");
                passed = false;
            }
        }

        passed
    }

    fn report_summary(&self, start: Instant) -> Result<()> {
        println!();
        log::info!("Summary Report");
        println!("--------------------------------------");

        let mut end_result = 0;
        for (pass, rc) in &self.pass_results {
            end_result |= rc;
            if *rc == 0 {
                log::info!("{pass} - success");
            } else {
                log::error!("{pass} - failed");
            }
        }

        println!();
        println!("--------------------------------------");
        log::info!(
            "Finished at: {}",
            Local::now().format("%d %B %Y - %H:%M:%S %p")
        );
        log::info!("Tests took {:.4} seconds", start.elapsed().as_secs_f64());

        if end_result != 0 {
            Err(eyre!(error_messages::FAILED_TEST_PASSES))
        } else {
            Ok(())
        }
    }
}

/// Every executable below `folder`, the way the flavored builds leave
/// them behind
fn find_test_programs(folder: &Path) -> Vec<PathBuf> {
    log::info!("looking for executables in {folder:?}");

    walkdir::WalkDir::new(folder)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.into_path())
        .filter(|path| utils::fs::is_executable(path))
        .collect()
}

fn coverage_rawdata_file(program: &Path) -> PathBuf {
    program.with_extension("profraw")
}
