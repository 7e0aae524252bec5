use std::fmt::Display;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// [`CliArgs`] is the command line arguments parser
///
/// ```rust
/// use clap::Parser;
/// use regis::cli::input::{CliArgs, Command, NativeCompiler};
///
/// let parser = CliArgs::parse_from(["", "-v", "setup", "--light"]);
/// assert_eq!(1, parser.verbose);
/// assert_eq!(
///     parser.command,
///     Command::Setup { clean: false, query: false, light: true }
/// );
///
/// let parser = CliArgs::parse_from(["", "build", "--project", "regina", "--compiler", "clang"]);
/// if let Command::Build { project, compiler, .. } = parser.command {
///     assert_eq!(project, "regina");
///     assert_eq!(compiler, Some(NativeCompiler::Clang));
/// } else {
///     panic!("Expected the build subcommand");
/// }
/// ```
#[derive(Parser, Debug)]
#[command(name = "regis")]
#[command(author = "Rising Liberty")]
#[command(version)]
#[command(
    about = "regis is the developer workflow toolkit of the Rex game engine",
    long_about = "regis drives the Rex engine pipeline: Setup -> Generate -> Build -> Run/Test"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, help = "regis maximum allowed verbosity level is: '-v'")]
    pub verbose: u8,

    #[arg(
        long,
        help = "Root of the engine repository. When absent, regis walks up from the working directory looking for the root marker"
    )]
    pub root: Option<String>,
}

/// [`Command`] - The core enum commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Prepares the working copy for development: installs the required tools and libraries
    Setup {
        #[arg(long, help = "clean setup, as if run for the first time")]
        clean: bool,
        #[arg(long, help = "only report what still needs to get installed")]
        query: bool,
        #[arg(long, help = "don't download anything that's missing")]
        light: bool,
    },
    /// Generates the project files through the project generator
    Generate {
        #[arg(
            long = "sharpmake-arg",
            help = "Extra argument forwarded verbatim to the project generator"
        )]
        sharpmake_args: Vec<String>,
    },
    /// Builds a previously generated project
    Build {
        #[arg(long, default_value = "rexstdexe", help = "project to build")]
        project: String,
        #[arg(long, default_value = "debug_opt", help = "configuration to build for")]
        config: String,
        #[arg(long, help = "compiler to build with. Defaults to the platform compiler")]
        compiler: Option<NativeCompiler>,
        #[arg(long, help = "clean all intermediate files")]
        clean: bool,
        #[arg(long, help = "don't perform a build of the project")]
        nobuild: bool,
    },
    /// Launches a previously built program of the engine
    Launch {
        #[arg(long, default_value = "regina", help = "project to launch")]
        project: String,
        #[arg(long, default_value = "debug_opt", help = "config the project was compiled in")]
        config: String,
        #[arg(long, help = "compiler that was used to compile the project")]
        compiler: Option<NativeCompiler>,
        #[arg(
            long,
            help = "launch a specific program. If only one is found for this target, that's launched by default"
        )]
        program: Option<String>,
        #[arg(long = "exe-arg", help = "The arguments to pass to the exe")]
        exe_args: Vec<String>,
    },
    /// Runs the test pipeline on the engine
    Test(TestArgs),
    /// Displays the version of the engine and exits
    Version,
}

#[derive(Args, Debug, PartialEq, Eq)]
pub struct TestArgs {
    #[arg(long, help = "clean run, as if run for the first time")]
    pub clean: bool,
    #[arg(long, help = "run all tests")]
    pub all: bool,
    #[arg(long, help = "run include-what-you-use")]
    pub iwyu: bool,
    #[arg(long, help = "run clang-tidy")]
    pub clang_tidy: bool,
    #[arg(long, help = "run unit tests")]
    pub unit_tests: bool,
    #[arg(long, help = "run coverage tests")]
    pub coverage: bool,
    #[arg(long, help = "run address sanitizer")]
    pub asan: bool,
    #[arg(long, help = "run undefined behavior sanitizer")]
    pub ubsan: bool,
    #[arg(long, help = "run fuzzy testing")]
    pub fuzzy: bool,
    #[arg(
        long,
        default_value_t = 10_000,
        help = "num runs to perform (applies to fuzzy testing)"
    )]
    pub fuzzy_runs: u32,
    #[arg(long, help = "auto fix where possible (applies to iwyu and clang-tidy)")]
    pub auto_fix: bool,
}

/// [`NativeCompiler`] The C++ compilers the engine can be built with
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum NativeCompiler {
    Msvc,
    Clang,
}

impl NativeCompiler {
    /// The compiler assumed when the user didn't pick one: MSVC on
    /// Windows, clang everywhere else
    pub fn default_for_host() -> Self {
        if cfg!(target_os = "windows") {
            NativeCompiler::Msvc
        } else {
            NativeCompiler::Clang
        }
    }
}

impl Display for NativeCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            NativeCompiler::Msvc => write!(f, "msvc"),
            NativeCompiler::Clang => write!(f, "clang"),
        }
    }
}
