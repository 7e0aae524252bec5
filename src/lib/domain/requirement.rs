//! The [`Requirement`] trait, the seam between the declarative manifests
//! and the resolver/fetcher/installer machinery.
//!
//! Tools and libraries share the full resolution pipeline (cache check,
//! search, download, install, re-check) and only differ on what exactly
//! they resolve to: a tool is a single executable file, a library is a
//! set of directories. Everything downstream of the manifests is written
//! against this trait

use std::path::{Path, PathBuf};

/// The directories a requirement is allowed to resolve against before
/// anything gets downloaded: the entries of the `PATH` environment
/// variable plus the regis install directory for this kind of
/// requirement
#[derive(Debug, Clone)]
pub struct SearchDirs {
    pub env_paths: Vec<PathBuf>,
    pub install_dir: PathBuf,
}

/// What a single search attempt yielded: the absolute paths of the
/// targets that were found, and a human readable description of every
/// target that wasn't
#[derive(Debug, Default)]
pub struct LocateOutcome {
    pub found: Vec<PathBuf>,
    pub missing: Vec<String>,
}

impl LocateOutcome {
    pub fn fully_resolved(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Common contract of every entry of the requirement manifests
pub trait Requirement {
    /// The logical name under which the resolved paths are cached
    fn config_name(&self) -> &str;

    /// The stem of the split archive holding this requirement on the
    /// mirror. Several requirements may share one archive
    fn archive_name(&self) -> &str;

    /// How many `<archive>.zip.NNN` parts the archive was split into
    fn num_archive_parts(&self) -> usize;

    /// Whether a previously cached set of paths still satisfies this
    /// requirement. Existence on disk is mandatory: a cached entry whose
    /// paths are gone is stale, and a stale entry is a miss
    fn is_satisfied_by(&self, cached_paths: &[PathBuf]) -> bool;

    /// Searches the pre-download locations for the requirement targets
    fn locate(&self, search_dirs: &SearchDirs) -> LocateOutcome;

    /// Searches below the install directory after the archive extraction.
    /// Unlike [`Requirement::locate`], this walk is recursive, since the
    /// layout inside the extracted archive isn't known upfront
    fn locate_installed(&self, install_dir: &Path) -> LocateOutcome;
}
