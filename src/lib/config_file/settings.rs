use serde::{Deserialize, Serialize};

use crate::utils::constants::download;

/// [`WorkspaceSettings`] maps `build/config/settings.json`, the file
/// that declares the folder layout of the engine repository and the
/// entries that a clean setup is allowed to wipe.
///
/// All folder values are relative to the engine root
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct WorkspaceSettings<'a> {
    /// Where every generated artifact lands, `.rex` by convention
    pub intermediate_folder: &'a str,
    pub build_folder: &'a str,
    pub tools_folder: &'a str,
    pub libs_folder: &'a str,
    pub tests_folder: &'a str,
    pub coverage_folder: &'a str,
    /// Folders outside the intermediate dir that a clean setup removes
    /// (the `.vscode` folder, generated IDE folders...)
    #[serde(default)]
    pub misc_folders: Vec<&'a str>,
    /// Files in the engine root whose name contains one of these get
    /// removed on a clean setup (generated solution files...)
    #[serde(default)]
    pub misc_extensions: Vec<&'a str>,
    /// Name of the registry the build phase writes and the launch phase
    /// reads, relative to `<intermediate>/<build_folder>`
    pub build_projects_filename: &'a str,
    #[serde(default = "default_archive_mirror")]
    pub archive_mirror: &'a str,
}

fn default_archive_mirror() -> &'static str {
    download::DEFAULT_ARCHIVE_MIRROR
}
