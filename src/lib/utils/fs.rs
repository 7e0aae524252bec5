use std::{
    fs,
    fs::{DirBuilder, File},
    io::Write,
    path::{Path, PathBuf},
};

use color_eyre::{eyre::Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use walkdir::WalkDir;

use crate::utils::constants::error_messages;

pub fn create_file<'a>(path: &Path, filename: &'a str, buff_write: &'a [u8]) -> Result<()> {
    let file_path = path.join(filename);

    File::create(&file_path)
        .with_context(|| format!("Could not create file {file_path:?}"))?
        .write_all(buff_write)
        .with_context(|| format!("Could not write to file {file_path:?}"))
}

pub fn create_directory(path_create: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .create(path_create)
        .with_context(|| format!("Could not create directory {path_create:?}"))
}

pub fn delete_directory(path: &Path) -> Result<()> {
    fs::remove_dir_all(path).with_context(|| format!("Could not delete directory {path:?}"))
}

/// Returns the canonicalized absolute path of the engine root received
/// via command line (or defaulted to the current working directory)
pub fn get_project_root_absolute_path(project_root: &Path) -> Result<PathBuf> {
    let mut canonical = project_root.canonicalize().with_context(|| {
        error_messages::FAILURE_GATHERING_PROJECT_ROOT_ABS_PATH
    })?;
    // Strip the Windows extended length path prefix, which the external
    // tools invoked later aren't able to digest
    if cfg!(target_os = "windows") {
        canonical = PathBuf::from(
            canonical
                .to_string_lossy()
                .strip_prefix(r"\\?\")
                .map(ToString::to_string)
                .unwrap_or(canonical.to_string_lossy().to_string()),
        )
    }
    Ok(canonical)
}

/// Deserializes a JSON file into a `T`. A missing or empty file yields
/// the default value of `T`, so freshly created cache files are valid
pub fn load_and_deserialize<T, P>(path: &P) -> Result<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Ok(T::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Error reading the file {path:?}"))?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&raw).with_context(|| format!("Error deserializing {path:?}"))
}

/// Serializes `data` as pretty printed JSON and dumps it to `path`
pub fn serialize_object_to_file<T, P>(path: P, data: &T) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    serde_json::to_string_pretty(data)
        .with_context(|| "Error serializing data to JSON")
        .and_then(|serialized| {
            fs::write(path, serialized)
                .with_context(|| format!("Error writing the serialized data to {path:?}"))
        })
}

/// Checks for the presence of `filename` directly joined under every
/// entry of `search_paths`, returning the first absolute path found.
/// This is the lookup used against the `PATH` entries, where a recursive
/// walk would be both slow and wrong
pub fn find_file_in_paths(filename: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    search_paths
        .iter()
        .map(|dir| dir.join(filename))
        .find(|candidate| candidate.is_file())
}

/// Recursively walks `dir` looking for a file named `filename`. Used for
/// the post-extraction lookup, where the archive layout below the install
/// subdirectory isn't known upfront
pub fn find_file_in_dir(dir: &Path, filename: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == filename)
        .map(|entry| entry.into_path())
}

/// Recursively collects every file under `dir` whose name matches
/// `filename`, in walk order
pub fn find_files_in_dir(dir: &Path, filename: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == filename)
        .map(|entry| entry.into_path())
        .collect()
}

/// Checks whether `dir_relative` exists as a directory below any of the
/// entries in `search_paths`, returning the joined absolute path
pub fn find_directory_in_paths(dir_relative: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    search_paths
        .iter()
        .map(|dir| dir.join(dir_relative))
        .find(|candidate| candidate.is_dir())
}

/// Whether the given path points to an executable program.
/// On Unix the executable permission bits decide, on Windows the
/// extension does
pub fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|md| md.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.extension()
            .map(|ext| ext.eq_ignore_ascii_case("exe"))
            .unwrap_or(false)
    }
}

/// Splits the `PATH` environment variable into its entries
pub fn env_paths() -> Vec<PathBuf> {
    std::env::var_os(crate::utils::constants::env_vars::PATH)
        .map(|paths| std::env::split_paths(&paths).collect())
        .unwrap_or_default()
}
