use std::io::Write;
use tracing::info;
use crate::error::ToolError;
use crate::manifest::ToolSpec;
use crate::util::parse_mode;

/// Places verified content at a tool's destination with all-or-nothing
/// semantics.
///
/// The caller passes the exact bytes the verifier read, never a path: the
/// source is read once per attempt, so the destination can never hold
/// content other than what was digested. The bytes are staged in a
/// temporary file in the destination's own directory (same filesystem, so
/// the final rename is atomic), permission bits are set while the file is
/// still invisible at the final name, and the temp file is then renamed
/// onto the destination in one step. On any failure the temp file is
/// removed and the destination is left untouched.
///
/// No partial file is ever observable at the destination, and there is no
/// window where the destination has the new content but the wrong mode.
pub fn install(spec: &ToolSpec, content: &[u8]) -> Result<(), ToolError> {
    let tool = spec.name.as_str();
    let mode = parse_mode(&spec.mode).map_err(|e| ToolError::install_failed(tool, e))?;
    let dest_dir = spec
        .dest
        .parent()
        .ok_or_else(|| ToolError::install_failed(tool, "destination path has no parent"))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".toolpin-")
        .tempfile_in(dest_dir)
        .map_err(|e| ToolError::install_failed(tool, e))?;
    staged
        .write_all(content)
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| ToolError::install_failed(tool, e))?;

    // Mode must be fixed before the file is exposed at the final name.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))
            .map_err(|e| ToolError::install_failed(tool, e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    staged
        .persist(&spec.dest)
        .map_err(|e| ToolError::install_failed(tool, e.error))?;

    // Make the rename itself durable.
    #[cfg(unix)]
    std::fs::File::open(dest_dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| ToolError::install_failed(tool, e))?;

    info!(tool, dest = %spec.dest.display(), mode = %spec.mode, "installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn spec(dest: PathBuf) -> ToolSpec {
        ToolSpec {
            name: "kpmmgr".to_string(),
            source: PathBuf::from("payload/kpmmgr"),
            dest,
            mode: "0755".to_string(),
            sha256: None,
        }
    }

    #[test]
    fn test_install_places_content_and_mode() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("bin").join("kpmmgr");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();

        install(&spec(dest.clone()), b"#!/bin/sh\nexit 0\n").unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"#!/bin/sh\nexit 0\n");
        #[cfg(unix)]
        assert_eq!(crate::util::file_mode(&dest).unwrap(), 0o755);
    }

    #[test]
    fn test_install_replaces_prior_content() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("kpmmgr");
        std::fs::write(&dest, b"old").unwrap();

        install(&spec(dest.clone()), b"#!/bin/sh\nnew\n").unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"#!/bin/sh\nnew\n");
    }

    #[test]
    fn test_install_places_exactly_the_given_bytes() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("kpmmgr");
        let verified = b"#!/bin/sh\nverified\n";
        // a diverging file at the source path must not matter; only the
        // passed bytes reach the destination
        std::fs::write(dir.path().join("payload-kpmmgr"), b"#!/bin/sh\nswapped\n").unwrap();

        install(&spec(dest.clone()), verified).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), verified);
    }

    #[test]
    fn test_failed_install_leaves_destination_untouched() {
        let dir = tempdir().unwrap();
        // staging in a nonexistent destination directory fails before
        // anything is exposed
        let dest = dir.path().join("no-such-dir").join("kpmmgr");

        let err = install(&spec(dest.clone()), b"#!/bin/sh\n").unwrap_err();
        assert!(matches!(err, ToolError::InstallFailed { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("kpmmgr");

        install(&spec(dest), b"#!/bin/sh\n").unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".toolpin-"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
