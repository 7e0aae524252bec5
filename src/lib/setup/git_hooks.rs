//! Installation of the repo-provided git hooks as the last setup step

use color_eyre::{eyre::Context, Result};

use crate::utils;
use crate::utils::constants::dir_names;
use crate::workspace::WorkspaceModel;

/// Copies every hook shipped under `build/scripts/git/hooks` into
/// `.git/hooks`. Skipped silently when the repository wasn't cloned via
/// git or doesn't ship hooks
pub(crate) fn install(workspace: &WorkspaceModel) -> Result<()> {
    let hooks_source = workspace
        .build_dir()
        .join("scripts")
        .join("git")
        .join(dir_names::GIT_HOOKS);
    let hooks_target = workspace.root.join(".git").join(dir_names::GIT_HOOKS);

    if !hooks_source.is_dir() || !workspace.root.join(".git").is_dir() {
        log::debug!("No git hooks to install");
        return Ok(());
    }

    log::info!("installing git hooks");
    utils::fs::create_directory(&hooks_target)?;

    let entries = std::fs::read_dir(&hooks_source)
        .with_context(|| format!("Could not list the git hooks at {hooks_source:?}"))?;
    for entry in entries.filter_map(Result::ok) {
        let source = entry.path();
        if !source.is_file() {
            continue;
        }

        let target = hooks_target.join(entry.file_name());
        std::fs::copy(&source, &target)
            .with_context(|| format!("Could not install the git hook {source:?}"))?;

        // Hooks have to carry the executable bit to be picked up
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))
                .with_context(|| format!("Could not mark the git hook {target:?} executable"))?;
        }
    }

    Ok(())
}
