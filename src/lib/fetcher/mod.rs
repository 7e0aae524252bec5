//! Download and extraction of the split zip archives that hold the
//! missing tools and libraries.
//!
//! Archives live on the mirror as numbered parts
//! (`<name>.zip.001`, `<name>.zip.002`, ...). Every part is fetched on
//! its own thread and all threads are joined before anything else
//! happens: each thread writes to its own file, so the parallel phase
//! shares no mutable state. Parts already present on disk are skipped,
//! which makes an interrupted setup resumable. Once every part of an
//! archive is local, the parts are concatenated in filename order into
//! the combined `<name>.zip` and extracted into the install directory

use std::fs::File;
use std::path::{Path, PathBuf};

use color_eyre::{
    eyre::{eyre, Context},
    Result,
};
use indexmap::IndexMap;

use crate::domain::requirement::Requirement;
use crate::utils;
use crate::utils::constants::{download, error_messages};

/// Downloads the archives of every requirement in `missing` into
/// `zips_dir`. Requirements sharing an archive are deduplicated, so one
/// archive is never fetched twice
pub fn download_archives<R: Requirement>(
    missing: &[&R],
    zips_dir: &Path,
    mirror: &str,
) -> Result<()> {
    utils::fs::create_directory(zips_dir)?;

    let mut archives: IndexMap<&str, usize> = IndexMap::new();
    for requirement in missing {
        archives
            .entry(requirement.archive_name())
            .or_insert(requirement.num_archive_parts());
    }

    for (archive_name, num_parts) in archives {
        download_archive(archive_name, num_parts, zips_dir, mirror)
            .with_context(|| error_messages::FAILURE_DOWNLOADING_ARCHIVES)?;
    }

    Ok(())
}

/// Fetches the parts of one archive, one thread per part, joining all of
/// them before returning. The first failed part fails the archive
fn download_archive(
    archive_name: &str,
    num_parts: usize,
    zips_dir: &Path,
    mirror: &str,
) -> Result<()> {
    log::info!("Downloading {archive_name} ({num_parts} parts)");

    let handles: Vec<std::thread::JoinHandle<Result<()>>> = (1..=num_parts)
        .map(|part_number| {
            let part = part_filename(archive_name, part_number);
            let url = format!("{mirror}/{part}");
            let destination = zips_dir.join(&part);

            std::thread::spawn(move || download_part(&url, &destination))
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| eyre!("A download worker thread panicked"))??;
    }

    Ok(())
}

/// Fetches a single part, skipping the download when the file is already
/// on disk from a previous (possibly interrupted) run
fn download_part(url: &str, destination: &Path) -> Result<()> {
    if destination.exists() {
        log::debug!("{destination:?} already downloaded, skipping");
        return Ok(());
    }

    let response = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .with_context(|| format!("Failed to download {url}"))?;
    let body = response
        .bytes()
        .with_context(|| format!("Failed to read the body of {url}"))?;

    std::fs::write(destination, &body)
        .with_context(|| format!("Failed to write the downloaded part to {destination:?}"))
}

/// Concatenates the downloaded parts of every archive found in
/// `zips_dir` (in filename order, which the zero padded suffixes make
/// the numeric order as well) and extracts the combined archives into
/// `install_dir`
pub fn unpack_archives(zips_dir: &Path, install_dir: &Path) -> Result<()> {
    for (archive_name, parts) in enumerate_archive_parts(zips_dir)? {
        let combined = combine_parts(&archive_name, &parts, zips_dir)?;

        let mut archive = zip::ZipArchive::new(
            File::open(&combined)
                .with_context(|| format!("Could not open the combined archive {combined:?}"))?,
        )
        .with_context(|| error_messages::FAILURE_EXTRACTING_ARCHIVES)?;

        archive
            .extract(install_dir)
            .with_context(|| format!("Failed to extract {combined:?} into {install_dir:?}"))?;
    }

    log::info!("archives unpacked to {install_dir:?}");

    Ok(())
}

/// Removes the temporary downloads folder. Only called once the install
/// succeeded, so a broken run keeps its parts around both for inspection
/// and for the resumed download to skip
pub fn purge_downloads(zips_dir: &Path) -> Result<()> {
    utils::fs::delete_directory(zips_dir)
}

/// Groups the part files present in `zips_dir` by the archive they
/// belong to, each group sorted by filename. Combined archives from a
/// previous unpack round (plain `.zip`, no numeric suffix) are ignored
fn enumerate_archive_parts(zips_dir: &Path) -> Result<IndexMap<String, Vec<PathBuf>>> {
    let mut parts_by_archive: IndexMap<String, Vec<PathBuf>> = IndexMap::new();

    let entries = std::fs::read_dir(zips_dir)
        .with_context(|| format!("Could not list the downloads folder {zips_dir:?}"))?;

    let mut part_files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_archive_part(path))
        .collect();
    part_files.sort();

    for part in part_files {
        // `<name>.zip.001` stems to `<name>.zip`, the combined filename
        let combined_name = part
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(ToOwned::to_owned)
            .ok_or_else(|| eyre!("Ill-formed archive part filename: {part:?}"))?;

        parts_by_archive.entry(combined_name).or_default().push(part);
    }

    Ok(parts_by_archive)
}

fn is_archive_part(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| {
                !extension.is_empty() && extension.bytes().all(|byte| byte.is_ascii_digit())
            })
            .unwrap_or(false)
}

fn combine_parts(combined_name: &str, parts: &[PathBuf], zips_dir: &Path) -> Result<PathBuf> {
    let combined_path = zips_dir.join(combined_name);
    let mut combined = File::create(&combined_path)
        .with_context(|| format!("Could not create the combined archive {combined_path:?}"))?;

    for part in parts {
        let mut part_file = File::open(part)
            .with_context(|| format!("Could not open the archive part {part:?}"))?;
        std::io::copy(&mut part_file, &mut combined)
            .with_context(|| format!("Failed appending {part:?} to {combined_path:?}"))?;
    }

    Ok(combined_path)
}

fn part_filename(archive_name: &str, part_number: usize) -> String {
    format!(
        "{archive_name}.zip.{part_number:0width$}",
        width = download::PART_SUFFIX_WIDTH
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    /// Builds a real single-entry zip in memory, the way the archives on
    /// the mirror are built, and returns its raw bytes
    fn zipped_payload(entry_name: &str, content: &[u8]) -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer.start_file(entry_name, SimpleFileOptions::default())?;
        writer.write_all(content)?;
        Ok(writer.finish()?.into_inner())
    }

    #[test]
    fn test_part_filenames_carry_a_zero_padded_suffix() {
        assert_eq!(part_filename("Tools", 1), "Tools.zip.001");
        assert_eq!(part_filename("Tools", 15), "Tools.zip.015");
    }

    #[test]
    fn test_unpack_concatenates_parts_in_filename_order() -> Result<()> {
        let temp = tempdir()?;
        let zips_dir = temp.path().join("zips");
        let install_dir = temp.path().join("tools");
        utils::fs::create_directory(&zips_dir)?;
        utils::fs::create_directory(&install_dir)?;

        let payload = zipped_payload("ninja/ninja", b"fake ninja binary")?;

        // Split at an arbitrary boundary: only the in-order
        // concatenation of both parts is a valid zip again
        let (first, second) = payload.split_at(payload.len() / 2);
        utils::fs::create_file(&zips_dir, "Ninja.zip.001", first)?;
        utils::fs::create_file(&zips_dir, "Ninja.zip.002", second)?;

        unpack_archives(&zips_dir, &install_dir)?;

        let extracted = install_dir.join("ninja").join("ninja");
        assert_eq!(std::fs::read(extracted)?, b"fake ninja binary");

        Ok(())
    }

    #[test]
    fn test_unpack_handles_several_archives_at_once() -> Result<()> {
        let temp = tempdir()?;
        let zips_dir = temp.path().join("zips");
        let install_dir = temp.path().join("tools");
        utils::fs::create_directory(&zips_dir)?;
        utils::fs::create_directory(&install_dir)?;

        utils::fs::create_file(
            &zips_dir,
            "Ninja.zip.001",
            &zipped_payload("ninja/ninja", b"ninja")?,
        )?;
        utils::fs::create_file(
            &zips_dir,
            "Sharpmake.zip.001",
            &zipped_payload("sharpmake/Sharpmake.Application.exe", b"sharpmake")?,
        )?;

        unpack_archives(&zips_dir, &install_dir)?;

        assert!(install_dir.join("ninja").join("ninja").is_file());
        assert!(install_dir
            .join("sharpmake")
            .join("Sharpmake.Application.exe")
            .is_file());

        Ok(())
    }

    #[test]
    fn test_combined_archives_are_not_mistaken_for_parts() -> Result<()> {
        let temp = tempdir()?;
        utils::fs::create_file(temp.path(), "Ninja.zip.001", b"part")?;
        utils::fs::create_file(temp.path(), "Ninja.zip", b"combined")?;

        let groups = enumerate_archive_parts(temp.path())?;
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups.get("Ninja.zip"),
            Some(&vec![temp.path().join("Ninja.zip.001")])
        );

        Ok(())
    }

    #[test]
    fn test_purge_removes_the_downloads_folder() -> Result<()> {
        let temp = tempdir()?;
        let zips_dir = temp.path().join("zips");
        utils::fs::create_directory(&zips_dir)?;
        utils::fs::create_file(&zips_dir, "Ninja.zip.001", b"part")?;

        purge_downloads(&zips_dir)?;
        assert!(!zips_dir.exists());

        Ok(())
    }

    #[test]
    fn test_existing_parts_are_not_downloaded_again() -> Result<()> {
        let temp = tempdir()?;
        utils::fs::create_file(temp.path(), "Ninja.zip.001", b"already here")?;

        // An unreachable URL proves no request is made for a part that
        // is already on disk
        download_part(
            "http://127.0.0.1:1/Ninja.zip.001",
            &temp.path().join("Ninja.zip.001"),
        )?;
        assert_eq!(
            std::fs::read(temp.path().join("Ninja.zip.001"))?,
            b"already here"
        );

        Ok(())
    }
}
