//! Constant value definitions to use across the whole program

/// Name of the marker file that identifies the root of the engine
/// repository. It also holds the engine version, so it doubles as the
/// source of truth for the `version` command
pub const ROOT_MARKER: &str = "rex.version";

pub const SETTINGS_PATH_FROM_ROOT: &str = "build/config/settings.json";

/// The names of the `regis` specific directories, not their paths
pub mod dir_names {
    pub const CONFIG: &str = "config";
    pub const BUILD: &str = "build";
    pub const ZIPS: &str = "zips";
    pub const ASAN: &str = "asan";
    pub const UBSAN: &str = "ubsan";
    pub const FUZZY: &str = "fuzzy";
    pub const GIT_HOOKS: &str = "hooks";
}

pub mod file_names {
    pub const TOOLS_MANIFEST: &str = "required_tools.json";
    pub const LIBS_MANIFEST: &str = "required_libs.json";
    pub const TOOL_PATHS_CACHE: &str = "tool_paths.json";
    pub const LIB_PATHS_CACHE: &str = "lib_paths.json";
    pub const COMPILATION_DATABASE: &str = "compile_commands.json";
}

/// Logical names under which the external tools are registered in the
/// tools manifest, and therefore in the resolved paths cache
pub mod tool_names {
    pub const NINJA: &str = "ninja_path";
    pub const SHARPMAKE: &str = "sharpmake_path";
    pub const CLANG_TIDY: &str = "clang_tidy_path";
    pub const CLANG_APPLY_REPLACEMENTS: &str = "clang_apply_replacements_path";
    pub const INCLUDE_WHAT_YOU_USE: &str = "include_what_you_use_path";
    pub const LLVM_PROFDATA: &str = "llvm_profdata_path";
    pub const LLVM_COV: &str = "llvm_cov_path";
}

pub mod env_vars {
    pub const PATH: &str = "PATH";
    pub const ASAN_OPTIONS: &str = "ASAN_OPTIONS";
    pub const UBSAN_OPTIONS: &str = "UBSAN_OPTIONS";
    pub const LLVM_PROFILE_FILE: &str = "LLVM_PROFILE_FILE";
}

pub mod error_messages {
    pub const READ_SETTINGS_FILE: &str = "Could not read the workspace settings file";
    pub const PARSE_SETTINGS_FILE: &str = "Could not parse the workspace settings file";
    pub const READ_MANIFEST_FILE: &str = "Could not read the requirements manifest";
    pub const PARSE_MANIFEST_FILE: &str = "Could not parse the requirements manifest";
    pub const FAILURE_LOADING_CACHE: &str = "Failed to load the resolved paths cache";
    pub const FAILURE_SAVING_CACHE: &str = "Error saving data to the resolved paths cache";
    pub const FAILURE_CLEANING_CACHE: &str = "Error cleaning the resolved paths cache";
    pub const ROOT_MARKER_NOT_FOUND: &str =
        "Unable to locate the root of the engine repository. Are you running regis from \
        inside the repository, or passing a valid --root?";
    pub const FAILURE_GATHERING_PROJECT_ROOT_ABS_PATH: &str =
        "Error getting the absolute path of the engine root";
    pub const TOOL_NOT_IN_CACHE: &str =
        "The tool is not registered in the resolved paths cache. Did you run `regis setup`?";
    pub const REQUIREMENTS_NOT_SATISFIED: &str =
        "Not every required tool/library could be resolved";
    pub const FAILURE_DOWNLOADING_ARCHIVES: &str = "Failed to download the missing archives";
    pub const FAILURE_EXTRACTING_ARCHIVES: &str = "Failed to extract the downloaded archives";
    pub const BUILD_PROJECTS_NOT_FOUND: &str =
        "The build projects registry doesn't exist yet. Did you build the engine first?";
    pub const FAILED_TEST_PASSES: &str = "Some of the test passes reported failures";
}

/// Everything related to where the missing archives are fetched from
pub mod download {
    /// Default mirror holding the split zip archives, overridable from
    /// the workspace settings
    pub const DEFAULT_ARCHIVE_MIRROR: &str =
        "https://github.com/RisingLiberty/RegisZip/raw/main/data";

    /// Width of the numeric suffix of an archive part, `<name>.zip.001`
    pub const PART_SUFFIX_WIDTH: usize = 3;
}

pub const EXECUTABLE_EXTENSION: &str = if cfg!(target_os = "windows") {
    ".exe"
} else {
    ""
};

/// Marker that ninja prints on the first line of a failed edge
pub const NINJA_FAILURE_MARKER: &str = "FAILED:";

pub const SETTINGS_FILE_MOCK: &str = r#"
{
    "intermediate_folder": ".rex",
    "build_folder": "build",
    "tools_folder": "tools",
    "libs_folder": "libs",
    "tests_folder": "tests",
    "coverage_folder": "coverage",
    "misc_folders": [ ".vscode" ],
    "misc_extensions": [ ".sln", ".nsln" ],
    "build_projects_filename": "build_projects.json"
}
"#;

pub const TOOLS_MANIFEST_MOCK: &str = r#"
{
    "ninja": {
        "config_name": "ninja_path",
        "stem": "ninja",
        "path": "ninja",
        "archive_name": "Ninja",
        "num_zip_files": 1
    },
    "sharpmake": {
        "config_name": "sharpmake_path",
        "stem": "Sharpmake.Application",
        "path": "sharpmake",
        "archive_name": "Sharpmake",
        "num_zip_files": 2,
        "extension": ".exe"
    }
}
"#;

pub const LIBS_MANIFEST_MOCK: &str = r#"
{
    "windows_sdk": {
        "config_name": "windows_sdk",
        "paths": [ "Windows Kits/10/Include", "Windows Kits/10/Lib" ],
        "archive_name": "WindowsSDK",
        "num_zip_files": 15
    }
}
"#;
