//! root file for the module where the datastructures that hold the JSON
//! parsed configuration data live.
//!
//! Three kind of files drive a regis run, all of them JSON and all of
//! them living under `<root>/build/config/`:
//! - `settings.json`, the workspace settings (folder layout, misc
//!   cleanup entries, archive mirror)
//! - `required_tools.json`, the manifest of external tools the engine
//!   build needs (ninja, the project generator, the clang tooling...)
//! - `required_libs.json`, the manifest of external libraries (SDKs,
//!   standard library distributions...)
pub mod requirements;
pub mod settings;

use color_eyre::{eyre::Context, Result};

use self::requirements::{LibRequirement, ToolRequirement};
use self::settings::WorkspaceSettings;
use crate::utils::constants::error_messages;

/// ```rust
/// use regis::config_file;
/// use regis::utils::constants::{SETTINGS_FILE_MOCK, TOOLS_MANIFEST_MOCK};
///
/// let settings = config_file::settings_from_str(SETTINGS_FILE_MOCK)
///     .expect("A failure happened parsing the workspace settings");
/// assert_eq!(settings.intermediate_folder, ".rex");
/// assert_eq!(settings.misc_extensions, vec![".sln", ".nsln"]);
///
/// let tools = config_file::tools_from_str(TOOLS_MANIFEST_MOCK)
///     .expect("A failure happened parsing the tools manifest");
/// assert_eq!(tools.len(), 2);
/// assert_eq!(tools[0].config_name, "ninja_path");
/// assert_eq!(tools[1].extension.as_deref(), Some(".exe"));
/// ```
pub fn settings_from_str(raw: &str) -> Result<WorkspaceSettings<'_>> {
    serde_json::from_str::<WorkspaceSettings>(raw)
        .with_context(|| error_messages::PARSE_SETTINGS_FILE)
}

/// Loads the tools manifest. The manifest is a JSON object whose keys are
/// purely descriptive; only the values, in file order, matter
pub fn tools_from_str(raw: &str) -> Result<Vec<ToolRequirement<'_>>> {
    let manifest: indexmap::IndexMap<&str, ToolRequirement> =
        serde_json::from_str(raw).with_context(|| error_messages::PARSE_MANIFEST_FILE)?;
    Ok(manifest.into_values().collect())
}

/// Loads the libs manifest, with the same shape rules as the tools one
pub fn libs_from_str(raw: &str) -> Result<Vec<LibRequirement<'_>>> {
    let manifest: indexmap::IndexMap<&str, LibRequirement> =
        serde_json::from_str(raw).with_context(|| error_messages::PARSE_MANIFEST_FILE)?;
    Ok(manifest.into_values().collect())
}
