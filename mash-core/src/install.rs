// mash-core/src/install.rs
// Applies a formula's install mapping: copies named build outputs into the
// prefix bin directory.

use std::fs;
use std::path::{Path, PathBuf};

use mash_common::error::{MashError, Result};
use mash_common::model::formula::InstallEntry;
use tracing::debug;

/// Copies each mapping entry, in order, from the built source tree into
/// `dest_dir`, applying the executable bit to every installed file.
/// Existing destination files are overwritten, so re-running an install is
/// idempotent.
///
/// A missing source or a failed copy aborts the sequence with an error
/// naming the failing pair. Entries copied before the failure are left in
/// place; there is no rollback.
pub fn install_mapping(
    source_root: &Path,
    mapping: &[InstallEntry],
    dest_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest_dir).map_err(|e| {
        MashError::IoError(format!(
            "Failed to create install directory {}: {}",
            dest_dir.display(),
            e
        ))
    })?;

    let mut installed = Vec::with_capacity(mapping.len());
    for entry in mapping {
        let source = source_root.join(&entry.source);
        let dest = dest_dir.join(&entry.dest);

        if !source.is_file() {
            return Err(MashError::Install {
                source_path: entry.source.clone(),
                dest: dest.clone(),
                cause: "source file missing from build tree".to_string(),
            });
        }

        debug!("Installing {} -> {}", source.display(), dest.display());
        fs::copy(&source, &dest).map_err(|e| MashError::Install {
            source_path: entry.source.clone(),
            dest: dest.clone(),
            cause: e.to_string(),
        })?;
        set_executable(&dest)?;
        installed.push(dest);
    }

    Ok(installed)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| {
        MashError::IoError(format!(
            "Failed to set permissions on {}: {}",
            path.display(),
            e
        ))
    })
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(source: &str, dest: &str) -> InstallEntry {
        InstallEntry {
            source: PathBuf::from(source),
            dest: dest.to_string(),
        }
    }

    #[test]
    fn installs_in_order_with_executable_bit() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("bin")).unwrap();
        fs::write(tree.join("bin/app"), "#!/bin/sh\nexit 0\n").unwrap();
        fs::write(tree.join("bin/helper"), "#!/bin/sh\nexit 0\n").unwrap();

        let dest = dir.path().join("prefix/bin");
        let installed = install_mapping(
            &tree,
            &[entry("bin/app", "app"), entry("bin/helper", "helper")],
            &dest,
        )
        .unwrap();

        assert_eq!(installed, vec![dest.join("app"), dest.join("helper")]);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("app")).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn missing_source_names_the_failing_pair() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(&tree).unwrap();

        let dest = dir.path().join("prefix/bin");
        let err = install_mapping(&tree, &[entry("bin/ghost", "ghost")], &dest).unwrap_err();
        match err {
            MashError::Install { source_path: source, cause, .. } => {
                assert_eq!(source, PathBuf::from("bin/ghost"));
                assert!(cause.contains("missing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failure_mid_sequence_keeps_earlier_copies() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("bin")).unwrap();
        fs::write(tree.join("bin/first"), "ok").unwrap();

        let dest = dir.path().join("prefix/bin");
        let err = install_mapping(
            &tree,
            &[entry("bin/first", "first"), entry("bin/second", "second")],
            &dest,
        )
        .unwrap_err();

        assert!(matches!(err, MashError::Install { .. }));
        // No rollback: the first copy survives.
        assert!(dest.join("first").is_file());
        assert!(!dest.join("second").exists());
    }

    #[test]
    fn reinstall_overwrites_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        let tree = dir.path().join("tree");
        fs::create_dir_all(tree.join("bin")).unwrap();
        fs::write(tree.join("bin/app"), "v2").unwrap();

        let dest = dir.path().join("prefix/bin");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("app"), "v1").unwrap();

        install_mapping(&tree, &[entry("bin/app", "app")], &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("app")).unwrap(), "v2");
    }
}
