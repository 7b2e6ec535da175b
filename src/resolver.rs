use crate::error::ToolError;
use crate::manifest::{Manifest, ToolSpec};

/// Looks up the spec for a logical tool name in the manifest.
///
/// Pure lookup over static configuration; no filesystem access. Returns
/// [`ToolError::NotFound`] if the name is not configured.
pub fn resolve<'a>(manifest: &'a Manifest, name: &str) -> Result<&'a ToolSpec, ToolError> {
    manifest
        .tools
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| ToolError::NotFound(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn manifest() -> Manifest {
        let mut manifest = Manifest::default("ksu-tools");
        manifest
            .add(ToolSpec {
                name: "kpmmgr".to_string(),
                source: PathBuf::from("payload/kpmmgr"),
                dest: PathBuf::from("/data/adb/bin/kpmmgr"),
                mode: "0755".to_string(),
                sha256: None,
            })
            .unwrap();
        manifest
    }

    #[test]
    fn test_resolve_known_tool() {
        let manifest = manifest();
        let spec = resolve(&manifest, "kpmmgr").unwrap();
        assert_eq!(spec.source, PathBuf::from("payload/kpmmgr"));
    }

    #[test]
    fn test_resolve_unknown_tool_is_not_found() {
        let manifest = manifest();
        let err = resolve(&manifest, "susfsd").unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "susfsd"));
    }
}
