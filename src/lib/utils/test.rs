use std::path::Path;

use color_eyre::Result;

use crate::utils::constants;

/// Lays out the minimal on-disk skeleton of an engine repository inside
/// `root`: the root marker file with a version number, the workspace
/// settings and the requirement manifests. Test fixtures build on top of
/// this
pub fn scaffold_minimal_workspace(root: &Path) -> Result<()> {
    crate::utils::fs::create_file(root, constants::ROOT_MARKER, b"0.6.1")?;

    let config_dir = root
        .join(constants::dir_names::BUILD)
        .join(constants::dir_names::CONFIG);
    crate::utils::fs::create_directory(&config_dir)?;

    crate::utils::fs::create_file(
        &config_dir,
        "settings.json",
        constants::SETTINGS_FILE_MOCK.as_bytes(),
    )?;
    crate::utils::fs::create_file(
        &config_dir,
        constants::file_names::TOOLS_MANIFEST,
        constants::TOOLS_MANIFEST_MOCK.as_bytes(),
    )?;
    crate::utils::fs::create_file(
        &config_dir,
        constants::file_names::LIBS_MANIFEST,
        constants::LIBS_MANIFEST_MOCK.as_bytes(),
    )?;

    Ok(())
}
