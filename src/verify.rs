use std::path::Path;
use tracing::debug;
use crate::error::ToolError;
use crate::util::{format_digest, has_executable_header, sha256_hex};

/// Result of verifying one candidate binary. Produced per install attempt
/// and carried into the ledger entry; not persisted on its own.
#[derive(Debug, Clone)]
pub struct Verification {
    /// Hex-encoded SHA-256 of the full file content.
    pub digest: String,
    /// Whether the digest was checked against a configured pin. An absent
    /// pin is not an error; the ledger records the install as unpinned.
    pub pinned: bool,
    /// The exact bytes that were read and digested. The installer places
    /// these rather than re-reading the source, so the recorded digest and
    /// the destination content cannot diverge if the staging file changes
    /// after verification.
    pub content: Vec<u8>,
}

/// Reads the candidate file fully and checks that it is non-empty, carries
/// an executable header, and (if a pin is configured) matches the expected
/// SHA-256 digest.
///
/// Returns [`ToolError::CorruptOrUntrusted`] on any check failure and
/// [`ToolError::NotFound`] if the source file is missing. Has no side
/// effects beyond the read.
pub fn verify(
    tool: &str,
    source: &Path,
    expected_sha256: Option<&str>,
) -> Result<Verification, ToolError> {
    let bytes = std::fs::read(source).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ToolError::NotFound(tool.to_string()),
        _ => ToolError::untrusted(tool, format!("could not read source: {e}")),
    })?;

    if bytes.is_empty() {
        return Err(ToolError::untrusted(tool, "source file is empty"));
    }
    if !has_executable_header(&bytes) {
        return Err(ToolError::untrusted(
            tool,
            "source file has no executable header (expected ELF or shebang)",
        ));
    }

    let digest = sha256_hex(&bytes);
    let pinned = match expected_sha256 {
        Some(expected) => {
            let expected = format_digest(expected).to_lowercase();
            if expected != digest {
                return Err(ToolError::untrusted(
                    tool,
                    format!("digest mismatch: expected {expected}, got {digest}"),
                ));
            }
            true
        }
        None => false,
    };

    debug!(tool, %digest, pinned, size = bytes.len(), "verified source");
    Ok(Verification {
        digest,
        pinned,
        content: bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ELF_STUB: &[u8] = &[0x7f, b'E', b'L', b'F', 2, 1, 1, 0, 0xde, 0xad];

    #[test]
    fn test_verify_accepts_elf_without_pin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kpmmgr");
        std::fs::write(&path, ELF_STUB).unwrap();

        let v = verify("kpmmgr", &path, None).unwrap();
        assert!(!v.pinned);
        assert_eq!(v.content, ELF_STUB);
        assert_eq!(v.digest, sha256_hex(ELF_STUB));
    }

    #[test]
    fn test_verify_accepts_matching_pin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kpmmgr");
        std::fs::write(&path, ELF_STUB).unwrap();

        let pin = format!("sha256:{}", sha256_hex(ELF_STUB));
        let v = verify("kpmmgr", &path, Some(pin.as_str())).unwrap();
        assert!(v.pinned);
    }

    #[test]
    fn test_verify_rejects_digest_mismatch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kpmmgr");
        std::fs::write(&path, ELF_STUB).unwrap();

        let err = verify("kpmmgr", &path, Some(sha256_hex(b"other").as_str())).unwrap_err();
        assert!(matches!(err, ToolError::CorruptOrUntrusted { .. }));
    }

    #[test]
    fn test_verify_rejects_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kpmmgr");
        std::fs::write(&path, b"").unwrap();

        let err = verify("kpmmgr", &path, None).unwrap_err();
        assert!(matches!(err, ToolError::CorruptOrUntrusted { .. }));
    }

    #[test]
    fn test_verify_rejects_truncated_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kpmmgr");
        // first bytes of an ELF magic, cut short
        std::fs::write(&path, &[0x7f, b'E']).unwrap();

        let err = verify("kpmmgr", &path, None).unwrap_err();
        assert!(matches!(err, ToolError::CorruptOrUntrusted { .. }));
    }

    #[test]
    fn test_verify_unreadable_source_is_untrusted() {
        let dir = tempdir().unwrap();
        // a directory at the source path exists but cannot be read as a file
        let path = dir.path().join("kpmmgr");
        std::fs::create_dir(&path).unwrap();

        let err = verify("kpmmgr", &path, None).unwrap_err();
        assert!(matches!(err, ToolError::CorruptOrUntrusted { .. }));
    }

    #[test]
    fn test_verify_missing_source_is_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope");
        let err = verify("nope", &path, None).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
