use std::path::{Path, PathBuf};
use anyhow::Result;
use sha2::{Digest, Sha256};

/// Returns the path to the `toolpin.toml` manifest in the current working directory.
pub fn get_manifest_path() -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join("toolpin.toml"))
}

/// Computes the hex-encoded SHA-256 digest of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

/// Strips the `sha256:` prefix from a digest if present.
/// This is useful for formatting digests uniformly.
pub fn format_digest(digest: &str) -> String {
    if let Some(digest) = digest.strip_prefix("sha256:") {
        digest.to_string()
    } else {
        digest.to_string()
    }
}

/// Validates whether a mode string is a parseable octal permission value.
pub fn is_valid_mode(mode: &str) -> bool {
    parse_mode(mode).is_ok()
}

/// Parses an octal mode string (e.g. `"0755"`) into permission bits.
/// Only the low 12 bits are meaningful.
pub fn parse_mode(mode: &str) -> Result<u32> {
    let bits = u32::from_str_radix(mode, 8)?;
    if bits > 0o7777 {
        anyhow::bail!("mode out of range: {}", mode);
    }
    Ok(bits)
}

/// Checks whether a byte buffer starts with a recognized executable header:
/// an ELF magic or a `#!` interpreter line.
pub fn has_executable_header(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x7f, b'E', b'L', b'F']) || bytes.starts_with(b"#!")
}

/// Checks if a given path is an executable file on Unix.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Checks if a given path has a Windows executable extension (.exe, .bat, .cmd).
#[cfg(windows)]
pub fn is_executable(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        let ext = ext.to_ascii_lowercase();
        matches!(ext.as_str(), "exe" | "bat" | "cmd")
    } else {
        false
    }
}

/// Returns the permission bits of a file, masked to the mode range.
#[cfg(unix)]
pub fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let meta = std::fs::metadata(path)?;
    Ok(meta.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
pub fn file_mode(_path: &Path) -> Result<u32> {
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        // sha256 of the empty string
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_format_digest_removes_prefix() {
        let input = "sha256:abcdef123456";
        let expected = "abcdef123456";
        assert_eq!(format_digest(input), expected);
    }

    #[test]
    fn test_format_digest_without_prefix() {
        let input = "abcdef123456";
        assert_eq!(format_digest(input), input);
    }

    #[test]
    fn test_parse_mode_valid() {
        assert_eq!(parse_mode("0755").unwrap(), 0o755);
        assert_eq!(parse_mode("644").unwrap(), 0o644);
        assert_eq!(parse_mode("4755").unwrap(), 0o4755);
    }

    #[test]
    fn test_parse_mode_invalid() {
        assert!(parse_mode("rwx").is_err());
        assert!(parse_mode("0999").is_err());
        assert!(parse_mode("77777").is_err());
    }

    #[test]
    fn test_has_executable_header() {
        assert!(has_executable_header(&[0x7f, b'E', b'L', b'F', 2, 1, 1]));
        assert!(has_executable_header(b"#!/bin/sh\nexit 0\n"));
        assert!(!has_executable_header(b""));
        assert!(!has_executable_header(b"MZ\x90\x00"));
        assert!(!has_executable_header(b"plain text"));
    }

    #[cfg(unix)]
    #[test]
    fn test_is_executable_respects_mode_bits() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        assert!(!is_executable(&path));
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_executable(&path));
    }
}
