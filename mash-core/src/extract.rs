// mash-core/src/extract.rs
// Stages a fetched source artifact into a build directory: archives are
// unpacked, anything else is copied in as a single file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use mash_common::error::{MashError, Result};
use tracing::debug;

const SUPPORTED_ARCHIVE_EXTENSIONS: [&str; 5] = ["gz", "bz2", "xz", "tar", "zip"];

/// Determines the archive type of an artifact, preferring content sniffing
/// over the file extension. Returns `None` for artifacts that are not a
/// recognized archive (single-file sources).
pub fn determine_archive_type(archive_path: &Path) -> Result<Option<&'static str>> {
    let inferred = infer::get_from_path(archive_path)?;
    let ext = match inferred {
        Some(kind) => kind.extension().to_string(),
        None => archive_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string(),
    };
    Ok(SUPPORTED_ARCHIVE_EXTENSIONS
        .iter()
        .find(|&&s| s == ext)
        .copied())
}

/// Unpacks an archive of the given type into `target_dir`.
pub fn extract_archive(archive_path: &Path, target_dir: &Path, archive_type: &str) -> Result<()> {
    debug!(
        "Extracting {} ({}) to {}",
        archive_path.display(),
        archive_type,
        target_dir.display()
    );
    fs::create_dir_all(target_dir)?;
    let file = File::open(archive_path)?;

    match archive_type {
        "tar" => tar::Archive::new(file).unpack(target_dir)?,
        "gz" => tar::Archive::new(flate2::read::GzDecoder::new(file)).unpack(target_dir)?,
        "bz2" => tar::Archive::new(bzip2::read::BzDecoder::new(file)).unpack(target_dir)?,
        "xz" => tar::Archive::new(xz2::read::XzDecoder::new(file)).unpack(target_dir)?,
        "zip" => {
            let mut archive = zip::ZipArchive::new(file).map_err(|e| {
                MashError::Generic(format!(
                    "Failed to open zip archive {}: {}",
                    archive_path.display(),
                    e
                ))
            })?;
            archive.extract(target_dir).map_err(|e| {
                MashError::Generic(format!(
                    "Failed to extract zip archive {}: {}",
                    archive_path.display(),
                    e
                ))
            })?;
        }
        other => {
            return Err(MashError::Generic(format!(
                "Unsupported archive type '{}' for {}",
                other,
                archive_path.display()
            )))
        }
    }
    Ok(())
}

/// Places the fetched artifact into the build directory, unpacking it when
/// it is an archive and copying it in verbatim otherwise.
pub fn stage_source(artifact_path: &Path, build_dir: &Path) -> Result<()> {
    match determine_archive_type(artifact_path)? {
        Some(archive_type) => extract_archive(artifact_path, build_dir, archive_type),
        None => {
            debug!(
                "Artifact {} is not a recognized archive, copying as single file",
                artifact_path.display()
            );
            fs::create_dir_all(build_dir)?;
            let file_name = artifact_path.file_name().ok_or_else(|| {
                MashError::Generic(format!(
                    "Source path {} has no file name",
                    artifact_path.display()
                ))
            })?;
            fs::copy(artifact_path, build_dir.join(file_name)).map_err(|e| {
                MashError::IoError(format!(
                    "Failed to copy {} into build dir: {}",
                    artifact_path.display(),
                    e
                ))
            })?;
            Ok(())
        }
    }
}

/// Finds the root of the staged source tree. GitHub tag tarballs unpack to
/// a single top-level directory; in that case the build runs inside it,
/// otherwise the build directory itself is the root.
pub fn source_root(build_dir: &Path) -> Result<PathBuf> {
    let mut subdirs = Vec::new();
    let mut has_files = false;
    let entries = fs::read_dir(build_dir).map_err(|e| {
        MashError::IoError(format!(
            "Failed to read build dir {}: {}",
            build_dir.display(),
            e
        ))
    })?;
    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().to_string();
        if file_name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path.is_file() {
            has_files = true;
        }
    }

    if subdirs.len() == 1 && !has_files {
        debug!("Source root is single subdirectory: {:?}", subdirs[0]);
        Ok(subdirs.remove(0))
    } else {
        debug!("Source root is the build directory itself");
        Ok(build_dir.to_path_buf())
    }
}
