//! Contains helpers to run the external collaborator processes (ninja,
//! the project generator, the clang tooling, the engine binaries) and to
//! judge them the only way regis is allowed to: by exit code and by
//! their textual output

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use regex::Regex;

use crate::cli::output::arguments::Arguments;
use crate::utils::constants::NINJA_FAILURE_MARKER;

/// Type alias for the key-value collection of environmental variables
/// injected into the invoked processes
pub type EnvVars = HashMap<String, String>;

/// Line scanner that flags failures in the textual output of an external
/// tool. A match doesn't stop the process, it only flips the aggregate
/// result once the process is done
pub struct FailureScanner {
    pattern: Regex,
}

impl FailureScanner {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)
                .with_context(|| format!("Invalid failure pattern: {pattern}"))?,
        })
    }

    /// Scanner for ninja's output, which marks every failed edge with a
    /// `FAILED:` line
    pub fn ninja() -> Self {
        Self {
            pattern: Regex::new(NINJA_FAILURE_MARKER).expect("the ninja marker is a valid pattern"),
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

/// Executes a new [`std::process::Command`] for the given program,
/// inheriting the standard streams, and hands back its exit status
pub fn execute_command<P: AsRef<OsStr>>(
    program: P,
    arguments: &Arguments<'_>,
    env_vars: &EnvVars,
    cwd: Option<&Path>,
) -> Result<ExitStatus> {
    let program = program.as_ref();
    log::trace!(
        "Executing command => {:?}",
        format!("{} {arguments}", program.to_string_lossy())
    );

    let mut command = Command::new(program);
    command.args(arguments).envs(env_vars);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    command
        .spawn()?
        .wait()
        .with_context(|| format!("Command {arguments} failed!"))
}

/// Outcome of a scanned execution: the exit status of the process plus
/// whether any output line tripped the failure scanner
pub struct ScannedExecution {
    pub status: ExitStatus,
    pub failure_in_output: bool,
}

impl ScannedExecution {
    /// The run only passes when the process exited cleanly AND its
    /// output carried no failure marker
    pub fn success(&self) -> bool {
        self.status.success() && !self.failure_in_output
    }
}

/// Executes a new [`std::process::Command`] with its stdout piped back
/// into regis, echoing every line and flagging the ones that match the
/// failure scanner
pub fn execute_command_scanning<P: AsRef<OsStr>>(
    program: P,
    arguments: &Arguments<'_>,
    env_vars: &EnvVars,
    scanner: &FailureScanner,
) -> Result<ScannedExecution> {
    let program = program.as_ref();
    log::trace!(
        "Executing command => {:?}",
        format!("{} {arguments}", program.to_string_lossy())
    );

    let mut child = Command::new(program)
        .args(arguments)
        .envs(env_vars)
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {:?}", program.to_string_lossy()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| eyre!("Could not attach to the child process stdout"))?;

    let mut failure_in_output = false;
    for line in BufReader::new(stdout).lines() {
        let line = line.with_context(|| "Error reading the child process output")?;
        if scanner.matches(&line) {
            failure_in_output = true;
            log::error!("{line}");
        } else {
            println!("{line}");
        }
    }

    let status = child
        .wait()
        .with_context(|| format!("Command {arguments} failed!"))?;

    Ok(ScannedExecution {
        status,
        failure_in_output,
    })
}

/// Executes a new [`std::process::Command`] with its stdout redirected
/// into `output_file`, the way the clang tooling wrappers expect their
/// reports to be collected
pub fn execute_command_capturing<P: AsRef<OsStr>>(
    program: P,
    arguments: &Arguments<'_>,
    env_vars: &EnvVars,
    cwd: Option<&Path>,
    output_file: &Path,
) -> Result<ExitStatus> {
    let program = program.as_ref();
    log::trace!(
        "Executing command => {:?} > {output_file:?}",
        format!("{} {arguments}", program.to_string_lossy())
    );

    let output = std::fs::File::create(output_file)
        .with_context(|| format!("Could not create the output file {output_file:?}"))?;

    let mut command = Command::new(program);
    command.args(arguments).envs(env_vars).stdout(output);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    command
        .spawn()?
        .wait()
        .with_context(|| format!("Command {arguments} failed!"))
}

/// Executes one of the engine binaries produced by a previous build,
/// passing the user arguments through and propagating its exit status
pub fn launch_built_program(
    executable: &Path,
    exe_args: &[String],
    cwd: Option<&Path>,
) -> Result<ExitStatus> {
    log::info!("launching {executable:?} {exe_args:?}");

    let mut command = Command::new(executable);
    command.args(exe_args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    command
        .spawn()
        .with_context(|| format!("Failed to launch {executable:?}"))?
        .wait()
        .with_context(|| format!("{executable:?} failed!"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ninja_scanner_flags_failed_edges_only() {
        let scanner = FailureScanner::ninja();
        assert!(scanner.matches("FAILED: obj/engine/core.o"));
        assert!(!scanner.matches("[12/345] CXX obj/engine/core.o"));
        assert!(!scanner.matches("ninja: no work to do."));
    }

    #[test]
    fn test_scanned_execution_success_requires_both_signals() {
        // A zero exit code with a flagged line is still a failure: some
        // tools keep going after a failed edge and exit cleanly
        let status = exit_status_for(0);
        let run = ScannedExecution {
            status,
            failure_in_output: true,
        };
        assert!(!run.success());

        let run = ScannedExecution {
            status,
            failure_in_output: false,
        };
        assert!(run.success());
    }

    #[cfg(unix)]
    fn exit_status_for(code: i32) -> ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(code)
    }

    #[cfg(windows)]
    fn exit_status_for(code: u32) -> ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(code)
    }
}
